//! EPorner client
//!
//! Videos and search go through the public JSON API (`/api/v2/video/...`).
//! Performer profiles and category listings have no API endpoint and are
//! scraped from the HTML pages.

use super::{
    ListingHints, PerformerRecord, ProviderError, ProviderGateway, SearchSort, VideoRecord,
};
use async_trait::async_trait;
use futures_util::{stream, StreamExt, TryStreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Fixed remote base address
pub const ROOT_URL: &str = "https://www.eporner.com";

/// Hosts a user-supplied link may point at
const SITE_HOSTS: &[&str] = &["www.eporner.com", "eporner.com"];

static RE_VIDEO_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:/video-|/hd-porn/)([A-Za-z0-9]+)").unwrap()
});

static RE_PERFORMER_SLUG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/pornstar/([^/?#\s]+)").unwrap());

static RE_H1: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<h1[^>]*>\s*(.*?)\s*</h1>").unwrap());

static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

static RE_OG_IMAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta\s+property="og:image"\s+content="([^"]+)""#).unwrap()
});

/// Profile labels as printed on the performer page
const PROFILE_LABELS: &[&str] = &[
    "Subscribers",
    "Pornstar Rank",
    "Profile Views",
    "Videos",
    "Photos",
    "Video Views",
    "Photo Views",
    "Country",
    "Age",
    "Eye Color",
    "Hair Color",
    "Height",
    "Weight",
    "Measurements",
    "Cup Size",
    "Ethnicity",
];

/// `>Label:</span> <b>value</b>`: label directly after a tag, value is the next text node
static RE_PROFILE_ATTRS: Lazy<HashMap<&'static str, Regex>> = Lazy::new(|| {
    PROFILE_LABELS
        .iter()
        .map(|label| {
            let pattern = format!(
                r"(?is)>\s*{}\s*:?\s*</[a-z0-9]+>\s*(?:<[^>]+>\s*)*([^<]+?)\s*<",
                regex::escape(label)
            );
            (*label, Regex::new(&pattern).unwrap())
        })
        .collect()
});

/// Video entry as returned by the JSON API
#[derive(Debug, Deserialize)]
struct ApiVideo {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    keywords: String,
    #[serde(default)]
    views: Value,
    #[serde(default)]
    rate: Value,
    #[serde(default)]
    url: String,
    #[serde(default)]
    added: String,
    #[serde(default)]
    length_sec: Value,
    #[serde(default)]
    default_thumb: Option<ApiThumb>,
}

#[derive(Debug, Deserialize)]
struct ApiThumb {
    src: String,
}

#[derive(Debug, Deserialize)]
struct ApiSearchResponse {
    #[serde(default)]
    videos: Vec<ApiVideo>,
}

impl From<ApiVideo> for VideoRecord {
    fn from(v: ApiVideo) -> Self {
        let tags = v
            .keywords
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();

        Self {
            video_id: v.id,
            title: v.title,
            views: number_u64(&v.views),
            rate: number_f64(&v.rate),
            publish_date: v.added,
            length_minutes: number_u64(&v.length_sec) / 60,
            tags,
            thumbnail: v.default_thumb.map(|t| t.src).filter(|s| !s.is_empty()),
            url: v.url,
        }
    }
}

/// The API mixes numbers and numeric strings
fn number_u64(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n.as_u64().unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn number_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Extract the video id from a page URL (`/video-{id}/` or `/hd-porn/{id}/`)
pub fn video_id_from_url(url: &str) -> Option<String> {
    RE_VIDEO_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Extract the performer slug from a profile URL (`/pornstar/{slug}`)
pub fn performer_slug_from_url(url: &str) -> Option<String> {
    RE_PERFORMER_SLUG
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// `http(s)` link on the EPorner site itself
pub fn is_site_url(url: &str) -> bool {
    reqwest::Url::parse(url)
        .map(|u| {
            matches!(u.scheme(), "http" | "https")
                && u.host_str().is_some_and(|h| SITE_HOSTS.contains(&h))
        })
        .unwrap_or(false)
}

/// Parse the single-video API response; `[]` or `{}` means not found
fn parse_video_response(body: &str, id: &str) -> Result<VideoRecord, ProviderError> {
    let value: Value = serde_json::from_str(body)?;
    let found = matches!(&value, Value::Object(map) if !map.is_empty());
    if !found {
        return Err(ProviderError::new(format!("video {} not found", id)));
    }
    let video: ApiVideo = serde_json::from_value(value)?;
    Ok(video.into())
}

fn parse_search_response(body: &str) -> Result<Vec<VideoRecord>, ProviderError> {
    let response: ApiSearchResponse = serde_json::from_str(body)?;
    Ok(response.videos.into_iter().map(VideoRecord::from).collect())
}

/// Video ids on a listing page, in page order, deduplicated
fn parse_listing_ids(html: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    RE_VIDEO_ID
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn profile_attribute(html: &str, label: &str) -> Option<String> {
    RE_PROFILE_ATTRS
        .get(label)?
        .captures(html)?
        .get(1)
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|v| !v.is_empty())
}

/// Parse a performer profile page
fn parse_performer_page(html: &str) -> Result<PerformerRecord, ProviderError> {
    let name = RE_H1
        .captures(html)
        .and_then(|c| c.get(1))
        .map(|m| decode_entities(RE_TAG.replace_all(m.as_str(), "").trim()))
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ProviderError::new("pornstar not found"))?;

    let attr = |label: &str| profile_attribute(html, label);

    Ok(PerformerRecord {
        name,
        subscribers: attr("Subscribers"),
        pornstar_rank: attr("Pornstar Rank"),
        profile_views: attr("Profile Views"),
        video_amount: attr("Videos"),
        photos_amount: attr("Photos"),
        video_views: attr("Video Views"),
        photo_views: attr("Photo Views"),
        country: attr("Country"),
        age: attr("Age"),
        eye_color: attr("Eye Color"),
        hair_color: attr("Hair Color"),
        height: attr("Height"),
        weight: attr("Weight"),
        measurements: attr("Measurements"),
        cup: attr("Cup Size"),
        ethnicity: attr("Ethnicity"),
        picture: RE_OG_IMAGE
            .captures(html)
            .and_then(|c| c.get(1))
            .map(|m| decode_entities(m.as_str())),
    })
}

/// `Big Tits` → `big-tits`
fn category_slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Live client for www.eporner.com
#[derive(Clone)]
pub struct EpornerClient {
    client: reqwest::Client,
    base_url: String,
}

impl EpornerClient {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, ROOT_URL)
    }

    /// Point the client at another host (mirrors, local fixtures)
    pub fn with_base_url(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, ProviderError> {
        debug!("GET {} {:?}", url, query);
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    async fn video_by_id(&self, id: &str) -> Result<VideoRecord, ProviderError> {
        let url = format!("{}/api/v2/video/id/", self.base_url);
        let body = self
            .get_text(&url, &[("id", id), ("thumbsize", "big"), ("format", "json")])
            .await?;
        parse_video_response(&body, id)
    }

    async fn category_page(&self, slug: &str, page: usize) -> Result<Vec<String>, ProviderError> {
        let url = if page <= 1 {
            format!("{}/cat/{}/", self.base_url, slug)
        } else {
            format!("{}/cat/{}/{}/", self.base_url, slug, page)
        };
        let html = self.get_text(&url, &[]).await?;
        Ok(parse_listing_ids(&html))
    }
}

#[async_trait]
impl ProviderGateway for EpornerClient {
    async fn resolve_video(&self, url: &str) -> Result<VideoRecord, ProviderError> {
        let id = video_id_from_url(url)
            .ok_or_else(|| ProviderError::new(format!("no video id in {}", url)))?;
        self.video_by_id(&id).await
    }

    /// Only the slug is taken from `url`; the page is always read from `base_url`
    async fn resolve_performer(&self, url: &str) -> Result<PerformerRecord, ProviderError> {
        let slug = performer_slug_from_url(url)
            .ok_or_else(|| ProviderError::new(format!("no pornstar id in {}", url)))?;
        let page = format!("{}/pornstar/{}", self.base_url, slug);
        let html = self.get_text(&page, &[]).await?;
        parse_performer_page(&html)
    }

    async fn search(
        &self,
        query: &str,
        page: u32,
        per_page: u32,
        sort: SearchSort,
    ) -> Result<Vec<VideoRecord>, ProviderError> {
        let url = format!("{}/api/v2/video/search/", self.base_url);
        let page = page.max(1).to_string();
        let per_page = per_page.clamp(1, 1000).to_string();
        let body = self
            .get_text(
                &url,
                &[
                    ("query", query),
                    ("per_page", per_page.as_str()),
                    ("page", page.as_str()),
                    ("thumbsize", "big"),
                    ("order", sort.order.as_str()),
                    ("gay", sort.gay.as_param()),
                    ("lq", sort.low_quality.as_param()),
                    ("format", "json"),
                ],
            )
            .await?;
        parse_search_response(&body)
    }

    async fn list_category(
        &self,
        name: &str,
        hints: ListingHints,
    ) -> Result<Vec<VideoRecord>, ProviderError> {
        let slug = category_slug(name);
        let pages = hints.pages_concurrency.max(1);

        let page_ids: Vec<Vec<String>> = stream::iter(1..=pages)
            .map(|page| self.category_page(&slug, page))
            .buffered(pages)
            .try_collect()
            .await?;

        let mut seen = HashSet::new();
        let ids: Vec<String> = page_ids
            .into_iter()
            .flatten()
            .filter(|id| seen.insert(id.clone()))
            .take(hints.limit)
            .collect();
        info!("Category '{}': resolving {} videos", slug, ids.len());

        // `buffered` keeps page order
        stream::iter(ids)
            .map(|id| async move { self.video_by_id(&id).await })
            .buffered(hints.videos_concurrency.max(1))
            .try_collect()
            .await
    }
}
