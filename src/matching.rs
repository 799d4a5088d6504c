//! Matching cascade turning a loosely-identified item into an upstream record
//!
//! Strategies run in order, stopping at the first that yields candidates:
//! exact provider-id match, year-scoped title search, unscoped title search.
//! Tie-breaking is deterministic: after filtering, candidate 0 wins.

use async_trait::async_trait;
use tracing::debug;

use crate::error::BridgeError;
use crate::media::{DetectedMedia, MediaType};
use crate::services::overseerr::CatalogSearchResult;

/// Upper bound on candidates kept after narrowing; bounds downstream
/// per-candidate lookups
pub const MAX_CANDIDATES: usize = 5;

/// Catalog search surface the cascade runs against. Implemented by the
/// request-service client; test doubles implement it for call-count
/// assertions.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<CatalogSearchResult>, BridgeError>;
}

/// Locate the single best upstream record for a detected item.
///
/// A caller-supplied provider id short-circuits the title search entirely;
/// otherwise the title cascade runs and candidate 0 of the narrowed set is
/// taken with no further scoring.
pub async fn locate(
    media: &DetectedMedia,
    catalog: &dyn CatalogSearch,
) -> Result<CatalogSearchResult, BridgeError> {
    let ids = media.ids();
    if !ids.is_empty() {
        let query = ids
            .imdb
            .clone()
            .or_else(|| ids.tmdb.map(|id| id.to_string()))
            .unwrap_or_default();
        let results = catalog.search(&query).await?;
        if let Some(exact) = results.into_iter().find(|r| r.matches_provider(ids)) {
            debug!(id = exact.id, "provider id matched exactly");
            return Ok(exact);
        }
    }

    let results = candidates(media.title(), Some(media.media_type()), media.year(), catalog).await?;
    results.into_iter().next().ok_or(BridgeError::NotFound)
}

/// Title search with media-type and year narrowing, truncated to
/// [`MAX_CANDIDATES`]. The same narrowing serves the request-submission
/// cascade and the enriched-search path.
pub async fn candidates(
    query: &str,
    media_type: Option<MediaType>,
    year: Option<i32>,
    catalog: &dyn CatalogSearch,
) -> Result<Vec<CatalogSearchResult>, BridgeError> {
    if query.trim().is_empty() {
        return Err(BridgeError::EmptyQuery);
    }

    let mut results = catalog.search(query).await?;

    if let Some(media_type) = media_type {
        results.retain(|r| r.is_type(media_type));
    }

    if let Some(year) = year {
        results = narrow_by_year(results, year);
    }

    results.truncate(MAX_CANDIDATES);
    debug!(count = results.len(), "narrowed catalog candidates");
    Ok(results)
}

/// Keep candidates whose release/air date starts with the given year.
/// Narrowing that would empty a non-empty set is discarded: a wrong or
/// missing upstream date must not hide every candidate.
pub fn narrow_by_year(
    results: Vec<CatalogSearchResult>,
    year: i32,
) -> Vec<CatalogSearchResult> {
    let narrowed: Vec<CatalogSearchResult> = results
        .iter()
        .filter(|r| r.year() == Some(year))
        .cloned()
        .collect();

    if narrowed.is_empty() { results } else { narrowed }
}
