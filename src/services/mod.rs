//! Upstream service clients

pub mod media_server;
pub mod overseerr;

pub use media_server::{MediaServerClient, ServerItem, ServerKind};
pub use overseerr::{CatalogSearchResult, MediaInfo, RequestServiceClient, SubmittedRequest};
