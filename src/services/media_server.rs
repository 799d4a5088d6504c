//! Media server client (Jellyfin/Emby API family)
//!
//! Both families share the `/Items` search surface and the `X-Emby-Token`
//! auth header; they differ in the shape of the web-interface deep link.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{classify_rejection, BridgeError};
use crate::media::{MediaType, ProviderIds};

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Supported media server families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerKind {
    Jellyfin,
    Emby,
}

impl ServerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerKind::Jellyfin => "jellyfin",
            ServerKind::Emby => "emby",
        }
    }
}

impl std::str::FromStr for ServerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jellyfin" => Ok(ServerKind::Jellyfin),
            "emby" => Ok(ServerKind::Emby),
            other => Err(format!("unknown server type: {other}")),
        }
    }
}

/// One library item returned by the server's `/Items` endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerItem {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Type", default)]
    pub item_type: Option<String>,
    #[serde(rename = "ProductionYear", default)]
    pub production_year: Option<i32>,
    #[serde(rename = "ServerId", default)]
    pub server_id: Option<String>,
    #[serde(rename = "ProviderIds", default)]
    pub provider_ids: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ItemsResponse {
    #[serde(rename = "Items", default)]
    items: Vec<ServerItem>,
}

/// Client for the user's media server, bound to one resolved base URL
pub struct MediaServerClient {
    base_url: String,
    api_key: String,
    kind: ServerKind,
    client: reqwest::Client,
}

impl MediaServerClient {
    pub fn new(
        base_url: String,
        api_key: String,
        kind: ServerKind,
        client: reqwest::Client,
    ) -> Self {
        Self {
            base_url,
            api_key,
            kind,
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Exact library lookup by external provider id
    pub async fn find_by_provider(
        &self,
        ids: &ProviderIds,
        media_type: MediaType,
    ) -> Result<Option<ServerItem>, BridgeError> {
        let mut filters = Vec::new();
        if let Some(imdb) = ids.imdb.as_deref() {
            filters.push(format!("Imdb.{imdb}"));
        }
        if let Some(tmdb) = ids.tmdb {
            filters.push(format!("Tmdb.{tmdb}"));
        }
        if filters.is_empty() {
            return Ok(None);
        }

        debug!(filter = %filters.join(","), "looking up library item by provider id");

        let items = self
            .items_query(&[
                ("Recursive", "true".to_string()),
                ("IncludeItemTypes", include_types(media_type).to_string()),
                ("AnyProviderIdEquals", filters.join(",")),
            ])
            .await?;

        Ok(items.into_iter().next())
    }

    /// Library title search, scoped to the expected item type
    pub async fn search_by_title(
        &self,
        title: &str,
        media_type: MediaType,
    ) -> Result<Vec<ServerItem>, BridgeError> {
        if title.trim().is_empty() {
            return Err(BridgeError::EmptyQuery);
        }

        info!(title = %title, "searching media server library");

        let items = self
            .items_query(&[
                ("Recursive", "true".to_string()),
                ("IncludeItemTypes", include_types(media_type).to_string()),
                ("SearchTerm", title.to_string()),
                ("Limit", "10".to_string()),
            ])
            .await?;

        debug!(count = items.len(), "library search returned items");
        Ok(items)
    }

    async fn items_query(&self, params: &[(&str, String)]) -> Result<Vec<ServerItem>, BridgeError> {
        let url = format!("{}/Items", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(params)
            .header("X-Emby-Token", &self.api_key)
            .timeout(LOOKUP_TIMEOUT)
            .send()
            .await
            .map_err(|e| BridgeError::network(&self.base_url, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_rejection(&self.base_url, status.as_u16(), &body));
        }

        let parsed: ItemsResponse = response.json().await.map_err(|e| BridgeError::Network {
            url: self.base_url.clone(),
            message: format!("invalid items response: {e}"),
        })?;

        Ok(parsed.items)
    }

    /// URL that opens the item inside the server's own web interface.
    /// Pure and total over the two supported families.
    pub fn deep_link(&self, item: &ServerItem) -> String {
        let mut link = match self.kind {
            ServerKind::Emby => {
                format!("{}/web/index.html#!/item?id={}", self.base_url, item.id)
            }
            ServerKind::Jellyfin => {
                format!("{}/web/#/details?id={}", self.base_url, item.id)
            }
        };
        if let Some(server_id) = item.server_id.as_deref() {
            link.push_str(&format!("&serverId={server_id}"));
        }
        link
    }

    /// Authenticated info call used by connection tests
    pub async fn system_info(&self) -> Result<(), BridgeError> {
        let url = format!("{}/System/Info", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("X-Emby-Token", &self.api_key)
            .timeout(LOOKUP_TIMEOUT)
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

fn include_types(media_type: MediaType) -> &'static str {
    match media_type {
        MediaType::Movie => "Movie",
        MediaType::Tv => "Series",
    }
}
