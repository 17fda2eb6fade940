//! Thumbnail download into the asset cache

use crate::cache::{AssetCache, LocalAsset};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("eporner-bot/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Image file extensions kept as-is when naming downloads
const KNOWN_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Why a thumbnail could not be fetched
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the shared HTTP client, routed through `proxy` when set
pub fn build_http_client(proxy: Option<&str>) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT);

    if let Some(proxy) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }

    builder.build()
}

/// Downloads remote images into the current cache epoch
#[derive(Clone)]
pub struct ImageFetcher {
    client: reqwest::Client,
    cache: Arc<AssetCache>,
}

impl ImageFetcher {
    pub fn new(client: reqwest::Client, cache: Arc<AssetCache>) -> Self {
        Self { client, cache }
    }

    /// Download `url` to a fresh file in the cache directory.
    ///
    /// Exactly one file is registered on success, none on failure.
    pub async fn fetch(&self, url: &str) -> Result<LocalAsset, FetchError> {
        debug!("Downloading image: {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let path = self.cache.dir().join(unique_file_name(url));

        if let Err(e) = tokio::fs::write(&path, &body).await {
            // Don't leave a truncated file behind
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                debug!("No partial file to remove at {}: {}", path.display(), cleanup);
            }
            return Err(e.into());
        }

        self.cache.register(&path);
        info!("Downloaded {} bytes to {}", body.len(), path.display());
        Ok(LocalAsset::original(path))
    }

    /// Like `fetch`, but a failure is logged and turned into `None`
    pub async fn fetch_optional(&self, url: &str) -> Option<LocalAsset> {
        match self.fetch(url).await {
            Ok(asset) => Some(asset),
            Err(e) => {
                warn!("Image download failed for {}: {}", url, e);
                None
            }
        }
    }
}

/// `temp_{unix_millis}_{random}.{ext}`
fn unique_file_name(url: &str) -> String {
    let token = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "temp_{}_{}.{}",
        chrono::Utc::now().timestamp_millis(),
        &token[..8],
        extension_for(url)
    )
}

fn extension_for(url: &str) -> &'static str {
    let ext = reqwest::Url::parse(url).ok().and_then(|u| {
        u.path()
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    });

    match ext {
        Some(ext) => KNOWN_EXTENSIONS
            .iter()
            .copied()
            .find(|known| *known == ext)
            .unwrap_or("jpg"),
        None => "jpg",
    }
}
