//! Seerbridge - availability resolution and request orchestration core
//!
//! Given a loosely-identified media item detected on a third-party catalog
//! page, this crate decides which endpoint of each backend service to use,
//! resolves the item's canonical availability against the user's media
//! server, and submits acquisition requests through the request-management
//! service when content is missing. The messaging boundary that talks to
//! the browser extension consumes [`Orchestrator`] and the types
//! re-exported here.

pub mod config;
pub mod error;
pub mod matching;
pub mod media;
pub mod orchestrator;
pub mod resolver;
pub mod services;
pub mod status;

pub use config::BridgeSettings;
pub use error::BridgeError;
pub use media::{DetectedMedia, MediaType, ProviderIds};
pub use orchestrator::{EnrichedResult, Orchestrator, RequestOutcome, ServiceTarget};
pub use resolver::{EndpointResolver, ServiceEndpoints};
pub use services::media_server::ServerKind;
pub use status::CanonicalAvailability;
