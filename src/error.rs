//! Error taxonomy for the bridge core
//!
//! Every external call site terminates in exactly one of these variants;
//! raw transport errors never escape to callers.

use thiserror::Error;

/// Classified error returned by all fallible bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    /// A required URL or API key is missing from the settings
    #[error("configuration incomplete: {0}")]
    Configuration(String),

    /// Timeout, DNS failure, connection refused, or any other transport error
    #[error("could not reach {url}: {message}")]
    Network { url: String, message: String },

    /// The upstream returned a non-2xx response
    #[error("{url} rejected the request (HTTP {status}): {body}")]
    RemoteRejection { url: String, status: u16, body: String },

    /// A rejection whose body matched the CSRF marker. Remediation is to
    /// disable CSRF protection in the request service's network settings.
    #[error("request blocked by CSRF protection; disable it at {url}/settings/network")]
    Csrf { url: String },

    /// The matching cascade produced no upstream record
    #[error("no matching title found upstream")]
    NotFound,

    /// The search query was empty; rejected before any network call
    #[error("empty search query")]
    EmptyQuery,
}

impl BridgeError {
    /// Wrap a transport-level failure against the given base URL
    pub fn network(url: &str, err: &reqwest::Error) -> Self {
        Self::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

/// Classify a non-2xx upstream response.
///
/// The request service exposes no structured error code for CSRF rejections,
/// so detection is a case-insensitive substring match on the body. This is
/// the only place that rule lives.
pub fn classify_rejection(url: &str, status: u16, body: &str) -> BridgeError {
    if body.to_lowercase().contains("csrf") {
        BridgeError::Csrf {
            url: url.to_string(),
        }
    } else {
        BridgeError::RemoteRejection {
            url: url.to_string(),
            status,
            body: body.to_string(),
        }
    }
}
