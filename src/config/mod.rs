//! Bridge settings supplied by the configuration collaborator
//!
//! Settings are read at the start of every orchestrator operation and never
//! cached here; the endpoint cache is invalidated separately when they
//! change. `from_env` exists for host processes configured through the
//! environment; the messaging boundary usually deserializes settings from
//! its own storage instead.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::resolver::ServiceEndpoints;
use crate::services::media_server::ServerKind;

/// Unauthenticated media-server path probed for local reachability
const MEDIA_SERVER_PROBE_PATH: &str = "/System/Info/Public";

/// Request-service path probed for local reachability
const REQUEST_SERVICE_PROBE_PATH: &str = "/api/v1/status";

/// User-facing configuration for both backend services
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeSettings {
    pub server_type: Option<ServerKind>,
    pub server_url: Option<String>,
    pub local_server_url: Option<String>,
    pub api_key: Option<String>,
    pub request_service_enabled: bool,
    pub request_service_url: Option<String>,
    pub request_service_local_url: Option<String>,
    pub request_service_api_key: Option<String>,
}

impl BridgeSettings {
    /// Load settings from `SEERBRIDGE_*` environment variables
    pub fn from_env() -> Result<Self, BridgeError> {
        let server_type = match env::var("SEERBRIDGE_SERVER_TYPE") {
            Ok(value) => Some(
                value
                    .parse::<ServerKind>()
                    .map_err(BridgeError::Configuration)?,
            ),
            Err(_) => None,
        };

        Ok(Self {
            server_type,
            server_url: env::var("SEERBRIDGE_SERVER_URL").ok(),
            local_server_url: env::var("SEERBRIDGE_LOCAL_SERVER_URL").ok(),
            api_key: env::var("SEERBRIDGE_API_KEY").ok(),
            request_service_enabled: env::var("SEERBRIDGE_REQUEST_SERVICE_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            request_service_url: env::var("SEERBRIDGE_REQUEST_SERVICE_URL").ok(),
            request_service_local_url: env::var("SEERBRIDGE_REQUEST_SERVICE_LOCAL_URL").ok(),
            request_service_api_key: env::var("SEERBRIDGE_REQUEST_SERVICE_API_KEY").ok(),
        })
    }

    /// Endpoint pair for the media server; `None` until a public URL is
    /// configured
    pub fn media_server_endpoints(&self) -> Option<ServiceEndpoints> {
        let public_url = non_empty(self.server_url.as_deref())?;
        Some(ServiceEndpoints {
            local_url: non_empty(self.local_server_url.as_deref()),
            public_url,
            probe_path: MEDIA_SERVER_PROBE_PATH.to_string(),
        })
    }

    /// Endpoint pair for the request service; `None` until a public URL is
    /// configured
    pub fn request_service_endpoints(&self) -> Option<ServiceEndpoints> {
        let public_url = non_empty(self.request_service_url.as_deref())?;
        Some(ServiceEndpoints {
            local_url: non_empty(self.request_service_local_url.as_deref()),
            public_url,
            probe_path: REQUEST_SERVICE_PROBE_PATH.to_string(),
        })
    }

    /// True when the media server has enough configuration to query
    pub fn media_server_configured(&self) -> bool {
        self.media_server_endpoints().is_some()
            && non_empty(self.api_key.as_deref()).is_some()
            && self.server_type.is_some()
    }

    /// True when the request service is enabled and fully configured
    pub fn request_service_configured(&self) -> bool {
        self.request_service_enabled
            && self.request_service_endpoints().is_some()
            && non_empty(self.request_service_api_key.as_deref()).is_some()
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
