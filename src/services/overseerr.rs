//! Request-management service client (Overseerr/Jellyseerr API family)
//!
//! Searches the global metadata catalog and submits acquisition requests.
//! All calls carry the `X-Api-Key` header and a bounded timeout; non-2xx
//! responses are classified through [`classify_rejection`] so the CSRF
//! remediation path stays in one place.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{classify_rejection, BridgeError};
use crate::matching::CatalogSearch;
use crate::media::{parse_year, MediaType, ProviderIds};

const CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// One row from the request service's catalog search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSearchResult {
    /// Catalog id; for movie and tv rows this is the TMDB id
    pub id: u64,
    pub media_type: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub media_info: Option<MediaInfo>,
}

/// Server-side record attached to catalog rows the service already tracks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaInfo {
    #[serde(default)]
    pub status: Option<i64>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub tmdb_id: Option<u64>,
}

impl CatalogSearchResult {
    /// Movies carry `title`, series carry `name`
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or_default()
    }

    /// Release date for movies, first air date for series
    pub fn date(&self) -> Option<&str> {
        self.release_date
            .as_deref()
            .or(self.first_air_date.as_deref())
    }

    pub fn year(&self) -> Option<i32> {
        parse_year(self.date())
    }

    pub fn is_type(&self, media_type: MediaType) -> bool {
        self.media_type == media_type.as_str()
    }

    /// Remote availability status code, absent when the service has no
    /// record for the title
    pub fn status_code(&self) -> Option<i64> {
        self.media_info.as_ref().and_then(|info| info.status)
    }

    /// Exact provider-id match against a detected item's external ids
    pub fn matches_provider(&self, ids: &ProviderIds) -> bool {
        if let Some(tmdb) = ids.tmdb {
            if self.id == tmdb {
                return true;
            }
            if self
                .media_info
                .as_ref()
                .and_then(|info| info.tmdb_id)
                .is_some_and(|id| id == tmdb)
            {
                return true;
            }
        }
        if let Some(imdb) = ids.imdb.as_deref() {
            if self
                .media_info
                .as_ref()
                .and_then(|info| info.imdb_id.as_deref())
                .is_some_and(|id| id.eq_ignore_ascii_case(imdb))
            {
                return true;
            }
        }
        false
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<CatalogSearchResult>,
}

/// Body for `POST /api/v1/request`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBody<'a> {
    media_type: &'a str,
    media_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    seasons: Option<&'a [i32]>,
}

/// Acknowledgement returned by a successful request submission
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedRequest {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub status: Option<i64>,
}

/// Client for the request-management service, bound to one resolved base URL
pub struct RequestServiceClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl RequestServiceClient {
    pub fn new(base_url: String, api_key: String, client: reqwest::Client) -> Self {
        Self {
            base_url,
            api_key,
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Free-text catalog search
    pub async fn search(&self, query: &str) -> Result<Vec<CatalogSearchResult>, BridgeError> {
        if query.trim().is_empty() {
            return Err(BridgeError::EmptyQuery);
        }

        info!(query = %query, "searching request service catalog");

        let url = format!("{}/api/v1/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("query", query)])
            .header("X-Api-Key", &self.api_key)
            .timeout(CALL_TIMEOUT)
            .send()
            .await
            .map_err(|e| BridgeError::network(&self.base_url, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_rejection(&self.base_url, status.as_u16(), &body));
        }

        let parsed: SearchResponse = response.json().await.map_err(|e| BridgeError::Network {
            url: self.base_url.clone(),
            message: format!("invalid search response: {e}"),
        })?;

        debug!(count = parsed.results.len(), "catalog search returned results");
        Ok(parsed.results)
    }

    /// Submit an acquisition request for a catalog item
    pub async fn submit(
        &self,
        media_type: MediaType,
        media_id: u64,
        seasons: Option<&[i32]>,
    ) -> Result<SubmittedRequest, BridgeError> {
        info!(
            media_type = media_type.as_str(),
            media_id, "submitting media request"
        );

        let url = format!("{}/api/v1/request", self.base_url);
        let body = SubmitBody {
            media_type: media_type.as_str(),
            media_id,
            seasons,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .header("X-Api-Key", &self.api_key)
            .timeout(CALL_TIMEOUT)
            .send()
            .await
            .map_err(|e| BridgeError::network(&self.base_url, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_rejection(&self.base_url, status.as_u16(), &body));
        }

        let submitted: SubmittedRequest =
            response.json().await.map_err(|e| BridgeError::Network {
                url: self.base_url.clone(),
                message: format!("invalid request response: {e}"),
            })?;

        debug!(request_id = ?submitted.id, "request accepted");
        Ok(submitted)
    }

    /// Authenticated status call used by connection tests
    pub async fn check_status(&self) -> Result<(), BridgeError> {
        let url = format!("{}/api/v1/status", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .timeout(CALL_TIMEOUT)
            .send()
            .await
            .map_err(|e| BridgeError::network(&self.base_url, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_rejection(&self.base_url, status.as_u16(), &body));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogSearch for RequestServiceClient {
    async fn search(&self, query: &str) -> Result<Vec<CatalogSearchResult>, BridgeError> {
        RequestServiceClient::search(self, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: u64, media_type: &str) -> CatalogSearchResult {
        CatalogSearchResult {
            id,
            media_type: media_type.to_string(),
            title: Some("The Matrix".to_string()),
            name: None,
            release_date: Some("1999-03-31".to_string()),
            first_air_date: None,
            overview: None,
            poster_path: None,
            media_info: None,
        }
    }

    #[test]
    fn test_display_title_prefers_movie_title() {
        let mut result = row(603, "movie");
        result.name = Some("wrong".to_string());
        assert_eq!(result.display_title(), "The Matrix");

        result.title = None;
        assert_eq!(result.display_title(), "wrong");
    }

    #[test]
    fn test_year_comes_from_leading_date_digits() {
        assert_eq!(row(603, "movie").year(), Some(1999));

        let mut undated = row(603, "movie");
        undated.release_date = None;
        assert_eq!(undated.year(), None);
    }

    #[test]
    fn test_matches_provider_by_tmdb_row_id() {
        let result = row(603, "movie");
        let ids = ProviderIds {
            imdb: None,
            tmdb: Some(603),
        };
        assert!(result.matches_provider(&ids));

        let other = ProviderIds {
            imdb: None,
            tmdb: Some(604),
        };
        assert!(!result.matches_provider(&other));
    }

    #[test]
    fn test_matches_provider_by_imdb_case_insensitive() {
        let mut result = row(603, "movie");
        result.media_info = Some(MediaInfo {
            status: Some(5),
            imdb_id: Some("tt0133093".to_string()),
            tmdb_id: None,
        });
        let ids = ProviderIds {
            imdb: Some("TT0133093".to_string()),
            tmdb: None,
        };
        assert!(result.matches_provider(&ids));
    }

    #[test]
    fn test_empty_ids_never_match() {
        assert!(!row(603, "movie").matches_provider(&ProviderIds::default()));
    }
}
