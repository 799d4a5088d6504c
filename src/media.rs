//! Media identification types supplied by the detection collaborator
//!
//! The detection layer pattern-matches titles out of third-party catalog
//! pages; this crate only consumes its output and never parses page content.

use serde::{Deserialize, Serialize};

/// Upstream media type used for search filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Tv => "tv",
        }
    }
}

/// External provider identifiers for exact cross-service matching
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderIds {
    pub imdb: Option<String>,
    pub tmdb: Option<u64>,
}

impl ProviderIds {
    pub fn is_empty(&self) -> bool {
        self.imdb.is_none() && self.tmdb.is_none()
    }
}

/// A loosely-identified media item detected on a third-party page.
///
/// Season and episode carry the series title. Years are kept as the raw
/// detected string; [`DetectedMedia::year`] parses the leading four digits
/// and treats unparseable values as unknown.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DetectedMedia {
    Movie {
        title: String,
        year: Option<String>,
        #[serde(default)]
        ids: ProviderIds,
    },
    Series {
        title: String,
        year: Option<String>,
        #[serde(default)]
        ids: ProviderIds,
    },
    Season {
        title: String,
        year: Option<String>,
        #[serde(default)]
        ids: ProviderIds,
        season: Option<i32>,
    },
    Episode {
        title: String,
        year: Option<String>,
        #[serde(default)]
        ids: ProviderIds,
        season: Option<i32>,
        episode: Option<i32>,
    },
}

impl DetectedMedia {
    pub fn title(&self) -> &str {
        match self {
            DetectedMedia::Movie { title, .. }
            | DetectedMedia::Series { title, .. }
            | DetectedMedia::Season { title, .. }
            | DetectedMedia::Episode { title, .. } => title,
        }
    }

    /// Detected year, if present and parseable
    pub fn year(&self) -> Option<i32> {
        match self {
            DetectedMedia::Movie { year, .. }
            | DetectedMedia::Series { year, .. }
            | DetectedMedia::Season { year, .. }
            | DetectedMedia::Episode { year, .. } => parse_year(year.as_deref()),
        }
    }

    pub fn ids(&self) -> &ProviderIds {
        match self {
            DetectedMedia::Movie { ids, .. }
            | DetectedMedia::Series { ids, .. }
            | DetectedMedia::Season { ids, .. }
            | DetectedMedia::Episode { ids, .. } => ids,
        }
    }

    pub fn media_type(&self) -> MediaType {
        match self {
            DetectedMedia::Movie { .. } => MediaType::Movie,
            _ => MediaType::Tv,
        }
    }

    /// Seasons to submit for a TV request; `None` for movies.
    ///
    /// When a season or episode was detected without a usable number the
    /// request defaults to season 1. A detection whose number extraction
    /// failed can therefore check the wrong season; see DESIGN.md.
    pub fn requested_seasons(&self) -> Option<Vec<i32>> {
        match self {
            DetectedMedia::Movie { .. } => None,
            DetectedMedia::Series { .. } => Some(vec![1]),
            DetectedMedia::Season { season, .. } => Some(vec![season.unwrap_or(1)]),
            DetectedMedia::Episode { season, .. } => Some(vec![season.unwrap_or(1)]),
        }
    }
}

/// Parse the leading four digits of a year string; anything else is unknown
pub fn parse_year(year: Option<&str>) -> Option<i32> {
    let year = year?.trim();
    let digits: String = year.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() == 4 {
        digits.parse().ok()
    } else {
        None
    }
}
