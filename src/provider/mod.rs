//! Metadata Provider
//!
//! The pipeline talks to the content site only through [`ProviderGateway`].
//! [`EpornerClient`] is the live implementation; tests substitute their own.

pub mod eporner;

pub use eporner::EpornerClient;

use async_trait::async_trait;

/// Any provider failure: network, parsing or not-found
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ProviderError(pub String);

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        Self(e.to_string())
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        Self(format!("invalid response: {}", e))
    }
}

/// A single video
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: String,
    pub views: u64,
    pub rate: f64,
    pub publish_date: String,
    pub length_minutes: u64,
    pub tags: Vec<String>,
    pub thumbnail: Option<String>,
    pub url: String,
}

/// A performer profile; attributes the site does not publish stay `None`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformerRecord {
    pub name: String,
    pub subscribers: Option<String>,
    pub pornstar_rank: Option<String>,
    pub profile_views: Option<String>,
    pub video_amount: Option<String>,
    pub photos_amount: Option<String>,
    pub video_views: Option<String>,
    pub photo_views: Option<String>,
    pub country: Option<String>,
    pub age: Option<String>,
    pub eye_color: Option<String>,
    pub hair_color: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub measurements: Option<String>,
    pub cup: Option<String>,
    pub ethnicity: Option<String>,
    pub picture: Option<String>,
}

/// Search result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Latest,
    MostPopular,
    TopRated,
    Longest,
    Shortest,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::MostPopular => "most-popular",
            Self::TopRated => "top-rated",
            Self::Longest => "longest",
            Self::Shortest => "shortest",
        }
    }
}

/// Whether a content class is excluded, included, or the only one returned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Inclusion {
    #[default]
    Exclude,
    Include,
    Only,
}

impl Inclusion {
    /// Query value used by the search API (0 / 1 / 2)
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Exclude => "0",
            Self::Include => "1",
            Self::Only => "2",
        }
    }
}

/// Sort and filter options for `search`
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchSort {
    pub order: SortOrder,
    pub gay: Inclusion,
    pub low_quality: Inclusion,
}

/// Concurrency hints for category listings
#[derive(Debug, Clone, Copy)]
pub struct ListingHints {
    pub videos_concurrency: usize,
    pub pages_concurrency: usize,
    /// Upper bound on videos resolved
    pub limit: usize,
}

impl Default for ListingHints {
    fn default() -> Self {
        Self {
            videos_concurrency: 3,
            pages_concurrency: 1,
            limit: 5,
        }
    }
}

/// Capability the pipeline needs from the content site
#[async_trait]
pub trait ProviderGateway: Send + Sync {
    /// Fetch one video by its page URL
    async fn resolve_video(&self, url: &str) -> Result<VideoRecord, ProviderError>;

    /// Fetch one performer profile by its page URL
    async fn resolve_performer(&self, url: &str) -> Result<PerformerRecord, ProviderError>;

    /// Keyword search, already ordered
    async fn search(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
        sort: SearchSort,
    ) -> Result<Vec<VideoRecord>, ProviderError>;

    /// Videos of a category, already ordered
    async fn list_category(
        &self,
        name: &str,
        hints: ListingHints,
    ) -> Result<Vec<VideoRecord>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_params() {
        assert_eq!(SortOrder::default().as_str(), "latest");
        assert_eq!(Inclusion::default().as_param(), "0");
        assert_eq!(Inclusion::Only.as_param(), "2");
    }

    #[test]
    fn test_error_display_is_message() {
        let err = ProviderError::new("video not found");
        assert_eq!(err.to_string(), "video not found");
    }
}
