//! Request orchestration: the entry point invoked per user action
//!
//! Each operation reads the current settings, resolves the endpoint(s) it
//! needs, queries the relevant upstream, and translates the outcome into
//! the canonical vocabulary or a classified error. No step retries
//! automatically; retries are the caller's responsibility.

use futures::future::join_all;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::BridgeSettings;
use crate::error::BridgeError;
use crate::matching;
use crate::media::{parse_year, DetectedMedia, MediaType, ProviderIds};
use crate::resolver::EndpointResolver;
use crate::services::media_server::{MediaServerClient, ServerItem};
use crate::services::overseerr::{CatalogSearchResult, RequestServiceClient};
use crate::status::{map_status, CanonicalAvailability};

/// Which backend a connection test should exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceTarget {
    MediaServer,
    RequestService,
}

/// Outcome of a request submission, shaped for direct display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RequestOutcome {
    fn disabled() -> Self {
        Self {
            success: false,
            request_id: None,
            message: Some("request service is disabled".to_string()),
        }
    }
}

/// One catalog search row with its canonical availability attached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedResult {
    #[serde(flatten)]
    pub result: CatalogSearchResult,
    pub availability: CanonicalAvailability,
}

/// Coordinates the resolver, the matching cascade, and both upstream
/// clients. One instance lives for the session; settings updates invalidate
/// the endpoint cache.
pub struct Orchestrator {
    settings: RwLock<BridgeSettings>,
    resolver: EndpointResolver,
    client: reqwest::Client,
}

impl Orchestrator {
    pub fn new(settings: BridgeSettings) -> Self {
        let client = reqwest::Client::new();
        Self {
            settings: RwLock::new(settings),
            resolver: EndpointResolver::new(client.clone()),
            client,
        }
    }

    /// Replace the active settings and drop all cached endpoint
    /// resolutions, called by the configuration collaborator on change
    pub fn update_settings(&self, settings: BridgeSettings) {
        *self.settings.write() = settings;
        self.resolver.invalidate();
    }

    fn settings(&self) -> BridgeSettings {
        self.settings.read().clone()
    }

    async fn media_server_client(
        &self,
        settings: &BridgeSettings,
    ) -> Result<MediaServerClient, BridgeError> {
        let endpoints = settings.media_server_endpoints().ok_or_else(|| {
            BridgeError::Configuration("media server URL is not set".to_string())
        })?;
        let api_key = settings.api_key.clone().filter(|k| !k.is_empty()).ok_or_else(|| {
            BridgeError::Configuration("media server API key is not set".to_string())
        })?;
        let kind = settings.server_type.ok_or_else(|| {
            BridgeError::Configuration("media server type is not set".to_string())
        })?;

        let base_url = self.resolver.resolve(&endpoints).await;
        Ok(MediaServerClient::new(
            base_url,
            api_key,
            kind,
            self.client.clone(),
        ))
    }

    async fn request_service_client(
        &self,
        settings: &BridgeSettings,
    ) -> Result<RequestServiceClient, BridgeError> {
        let endpoints = settings.request_service_endpoints().ok_or_else(|| {
            BridgeError::Configuration("request service URL is not set".to_string())
        })?;
        let api_key = settings
            .request_service_api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                BridgeError::Configuration("request service API key is not set".to_string())
            })?;

        let base_url = self.resolver.resolve(&endpoints).await;
        Ok(RequestServiceClient::new(
            base_url,
            api_key,
            self.client.clone(),
        ))
    }

    /// Check whether a detected item already exists on the media server.
    ///
    /// Searches the server's own library (provider-id lookup first, then
    /// title search), never the request service. Failures fold into the
    /// `Error` state so the caller always receives one availability value.
    pub async fn check_availability(&self, media: &DetectedMedia) -> CanonicalAvailability {
        let settings = self.settings();
        if !settings.media_server_configured() {
            return CanonicalAvailability::Unconfigured;
        }

        info!(title = %media.title(), "checking library availability");

        match self.check_on_server(&settings, media).await {
            Ok(state) => state,
            Err(e) => {
                warn!(title = %media.title(), error = %e, "availability check failed");
                CanonicalAvailability::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    async fn check_on_server(
        &self,
        settings: &BridgeSettings,
        media: &DetectedMedia,
    ) -> Result<CanonicalAvailability, BridgeError> {
        let server = self.media_server_client(settings).await?;

        if !media.ids().is_empty() {
            if let Some(item) = server
                .find_by_provider(media.ids(), media.media_type())
                .await?
            {
                return Ok(found_on_server(&server, &item));
            }
        }

        let items = server
            .search_by_title(media.title(), media.media_type())
            .await?;
        let year = media.year();
        let matched = items
            .into_iter()
            .find(|item| title_matches(item, media.title(), year));

        Ok(match matched {
            Some(item) => found_on_server(&server, &item),
            None => CanonicalAvailability::Unavailable,
        })
    }

    /// Search the request-service catalog and attach availability to each
    /// of up to five results.
    ///
    /// Results already on the media server additionally get a deep link,
    /// looked up concurrently per item when the server is configured; a
    /// failed lookup downgrades that one item, never the batch. Ordering
    /// follows the upstream search. Zero results is a valid success.
    pub async fn search_and_enrich(
        &self,
        query: &str,
        media_type: Option<MediaType>,
        year: Option<&str>,
    ) -> Result<Vec<EnrichedResult>, BridgeError> {
        let settings = self.settings();
        if !settings.request_service_configured() {
            return Err(BridgeError::Configuration(
                "request service is not configured".to_string(),
            ));
        }

        let catalog = self.request_service_client(&settings).await?;
        let results =
            matching::candidates(query, media_type, parse_year(year), &catalog).await?;

        let server = if settings.media_server_configured() {
            self.media_server_client(&settings).await.ok()
        } else {
            None
        };

        let lookups = results.into_iter().map(|result| {
            let server = server.as_ref();
            async move {
                let availability = map_status(result.status_code());
                let availability = match (server, row_media_type(&result)) {
                    (Some(server), Some(media_type)) if availability.is_on_server() => {
                        attach_deep_link(server, &result, media_type, availability).await
                    }
                    _ => availability,
                };
                EnrichedResult {
                    result,
                    availability,
                }
            }
        });

        let enriched = join_all(lookups).await;
        debug!(count = enriched.len(), "enriched search results");
        Ok(enriched)
    }

    /// Submit an acquisition request for a detected item.
    ///
    /// A disabled request service short-circuits without any network call.
    /// A caller-supplied TMDB id bypasses the matching cascade entirely;
    /// otherwise the cascade supplies the catalog id or the submission
    /// fails with `NotFound`.
    pub async fn submit_request(
        &self,
        media: &DetectedMedia,
    ) -> Result<RequestOutcome, BridgeError> {
        let settings = self.settings();
        if !settings.request_service_enabled {
            debug!("request service disabled, skipping submission");
            return Ok(RequestOutcome::disabled());
        }

        let catalog = self.request_service_client(&settings).await?;

        let media_id = match media.ids().tmdb {
            Some(id) => id,
            None => matching::locate(media, &catalog).await?.id,
        };

        let seasons = media.requested_seasons();
        let submitted = catalog
            .submit(media.media_type(), media_id, seasons.as_deref())
            .await?;

        info!(media_id, request_id = ?submitted.id, "request submitted");
        Ok(RequestOutcome {
            success: true,
            request_id: submitted.id,
            message: None,
        })
    }

    /// Resolve a service's endpoint and perform one authenticated call
    /// against it; returns the resolved base URL on success
    pub async fn test_connection(&self, target: ServiceTarget) -> Result<String, BridgeError> {
        let settings = self.settings();
        match target {
            ServiceTarget::MediaServer => {
                let server = self.media_server_client(&settings).await?;
                server.system_info().await?;
                Ok(server.base_url().to_string())
            }
            ServiceTarget::RequestService => {
                let catalog = self.request_service_client(&settings).await?;
                catalog.check_status().await?;
                Ok(catalog.base_url().to_string())
            }
        }
    }
}

fn found_on_server(server: &MediaServerClient, item: &ServerItem) -> CanonicalAvailability {
    CanonicalAvailability::Available {
        item_id: Some(item.id.clone()),
        server_url: Some(server.deep_link(item)),
    }
}

/// Case-insensitive title match; a known year on both sides must agree
fn title_matches(item: &ServerItem, title: &str, year: Option<i32>) -> bool {
    let name_matches = item
        .name
        .as_deref()
        .is_some_and(|name| name.eq_ignore_ascii_case(title));
    if !name_matches {
        return false;
    }
    match (year, item.production_year) {
        (Some(expected), Some(actual)) => expected == actual,
        _ => true,
    }
}

/// Media type of a catalog row; `None` for rows this core does not enrich
/// (e.g. person results)
fn row_media_type(result: &CatalogSearchResult) -> Option<MediaType> {
    match result.media_type.as_str() {
        "movie" => Some(MediaType::Movie),
        "tv" => Some(MediaType::Tv),
        _ => None,
    }
}

async fn attach_deep_link(
    server: &MediaServerClient,
    result: &CatalogSearchResult,
    media_type: MediaType,
    availability: CanonicalAvailability,
) -> CanonicalAvailability {
    let ids = ProviderIds {
        imdb: result
            .media_info
            .as_ref()
            .and_then(|info| info.imdb_id.clone()),
        tmdb: Some(result.id),
    };

    match server.find_by_provider(&ids, media_type).await {
        Ok(Some(item)) => availability.with_server_item(item.id.clone(), server.deep_link(&item)),
        Ok(None) => availability,
        Err(e) => {
            warn!(
                title = %result.display_title(),
                error = %e,
                "deep link lookup failed, keeping bare availability"
            );
            availability
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn item(name: &str, year: Option<i32>) -> ServerItem {
        ServerItem {
            id: "abc".to_string(),
            name: Some(name.to_string()),
            item_type: Some("Movie".to_string()),
            production_year: year,
            server_id: None,
            provider_ids: HashMap::new(),
        }
    }

    #[test]
    fn test_title_matches_ignores_case() {
        assert!(title_matches(&item("The Matrix", None), "the matrix", None));
        assert!(!title_matches(&item("The Matrix", None), "Matrix", None));
    }

    #[test]
    fn test_title_matches_requires_year_agreement_when_both_known() {
        assert!(title_matches(
            &item("The Matrix", Some(1999)),
            "The Matrix",
            Some(1999)
        ));
        assert!(!title_matches(
            &item("The Matrix", Some(2021)),
            "The Matrix",
            Some(1999)
        ));
        assert!(title_matches(&item("The Matrix", None), "The Matrix", Some(1999)));
    }

    #[test]
    fn test_row_media_type_skips_person_rows() {
        let mut row = CatalogSearchResult {
            id: 1,
            media_type: "person".to_string(),
            title: None,
            name: Some("Keanu Reeves".to_string()),
            release_date: None,
            first_air_date: None,
            overview: None,
            poster_path: None,
            media_info: None,
        };
        assert_eq!(row_media_type(&row), None);
        row.media_type = "movie".to_string();
        assert_eq!(row_media_type(&row), Some(MediaType::Movie));
    }
}
