//! Canonical availability vocabulary and the remote status code mapping
//!
//! The request service reports availability as a small numeric enum on each
//! search row (`mediaInfo.status`); the media server reports it as item
//! presence. Both are translated here into one vocabulary that the rest of
//! the system consumes. Upstream code changes must be absorbed in this
//! table and nowhere else.

use serde::{Deserialize, Serialize};

/// Unified availability state consumed by all callers.
///
/// `Available` and `Partial` carry a media-server item id and deep link once
/// the orchestrator has resolved them; the raw status mapping leaves them
/// unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CanonicalAvailability {
    Available {
        item_id: Option<String>,
        server_url: Option<String>,
    },
    Partial {
        item_id: Option<String>,
        server_url: Option<String>,
        details: Option<String>,
    },
    Unavailable,
    Pending,
    Processing,
    NotRequested,
    Unknown,
    Unconfigured,
    Error {
        message: String,
    },
}

impl CanonicalAvailability {
    /// True for states that indicate content present on the media server,
    /// fully or partially
    pub fn is_on_server(&self) -> bool {
        matches!(
            self,
            CanonicalAvailability::Available { .. } | CanonicalAvailability::Partial { .. }
        )
    }

    /// Attach the media-server item id and deep link resolved by the
    /// orchestrator; a no-op for states without link payloads
    pub fn with_server_item(self, item_id: String, server_url: String) -> Self {
        match self {
            CanonicalAvailability::Available { .. } => CanonicalAvailability::Available {
                item_id: Some(item_id),
                server_url: Some(server_url),
            },
            CanonicalAvailability::Partial { details, .. } => CanonicalAvailability::Partial {
                item_id: Some(item_id),
                server_url: Some(server_url),
                details,
            },
            other => other,
        }
    }
}

/// Map a remote numeric status code to the canonical state.
///
/// `None` means the search row carried no `mediaInfo` block, which the
/// request service uses for titles nobody has requested. Codes outside the
/// documented range also mean not requested.
pub fn map_status(code: Option<i64>) -> CanonicalAvailability {
    match code {
        None | Some(0) => CanonicalAvailability::NotRequested,
        Some(1) => CanonicalAvailability::Unknown,
        Some(2) => CanonicalAvailability::Pending,
        Some(3) => CanonicalAvailability::Processing,
        Some(4) => CanonicalAvailability::Partial {
            item_id: None,
            server_url: None,
            details: None,
        },
        Some(5) => CanonicalAvailability::Available {
            item_id: None,
            server_url: None,
        },
        Some(_) => CanonicalAvailability::NotRequested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_codes() {
        assert_eq!(map_status(None), CanonicalAvailability::NotRequested);
        assert_eq!(map_status(Some(0)), CanonicalAvailability::NotRequested);
        assert_eq!(map_status(Some(1)), CanonicalAvailability::Unknown);
        assert_eq!(map_status(Some(2)), CanonicalAvailability::Pending);
        assert_eq!(map_status(Some(3)), CanonicalAvailability::Processing);
        assert!(matches!(
            map_status(Some(4)),
            CanonicalAvailability::Partial { .. }
        ));
        assert!(matches!(
            map_status(Some(5)),
            CanonicalAvailability::Available { .. }
        ));
    }

    #[test]
    fn test_unknown_codes_map_to_not_requested() {
        for code in [-1, 6, 7, 42, i64::MAX, i64::MIN] {
            assert_eq!(
                map_status(Some(code)),
                CanonicalAvailability::NotRequested,
                "code: {code}"
            );
        }
    }

    #[test]
    fn test_mapping_is_idempotent_per_code() {
        for code in [None, Some(0), Some(3), Some(5), Some(99)] {
            assert_eq!(map_status(code), map_status(code));
        }
    }

    #[test]
    fn test_with_server_item_only_touches_link_states() {
        let available = map_status(Some(5))
            .with_server_item("abc123".into(), "http://media.local/web".into());
        match available {
            CanonicalAvailability::Available {
                item_id,
                server_url,
            } => {
                assert_eq!(item_id.as_deref(), Some("abc123"));
                assert_eq!(server_url.as_deref(), Some("http://media.local/web"));
            }
            other => panic!("expected Available, got {other:?}"),
        }

        let pending = map_status(Some(2)).with_server_item("x".into(), "y".into());
        assert_eq!(pending, CanonicalAvailability::Pending);
    }
}
