//! Command Pipeline
//!
//! Per command: validate → clear previous epoch → resolve target → query
//! provider → fetch + blur thumbnail → compose → emit.
//!
//! Metadata failures become the visible reply. Thumbnail, blur and cleanup
//! failures only degrade the reply (text-only, unblurred) and are logged.
//!
//! Commands on one pipeline run one at a time: the epoch is shared, so an
//! overlapping command would otherwise delete files still being sent.

use crate::cache::{AssetCache, LocalAsset};
use crate::command::{Command, HELP_TEXT};
use crate::config::Config;
use crate::fetcher::{build_http_client, ImageFetcher};
use crate::obfuscator::{BlurCapability, ImageObfuscator};
use crate::provider::eporner::{is_site_url, ROOT_URL};
use crate::provider::{EpornerClient, ListingHints, ProviderGateway, SearchSort};
use crate::reply::{self, Reply, LISTING_LIMIT};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub const UNAVAILABLE_TEXT: &str = "EPorner 客户端不可用，请联系管理员";
pub const NO_SEARCH_RESULTS_TEXT: &str = "未找到相关视频";
pub const FOREIGN_PERFORMER_LINK_TEXT: &str = "获取演员信息失败: 仅支持 eporner.com 的演员链接";

/// An identifier that already looks like a URL is used as-is
pub fn resolve_video_url(arg: &str) -> String {
    if arg.starts_with("http") {
        arg.to_string()
    } else {
        format!("{}/video-{}/", ROOT_URL, arg)
    }
}

/// Ids are templated onto the site; links are accepted only on the site host
pub fn resolve_performer_url(arg: &str) -> Option<String> {
    if !arg.starts_with("http") {
        return Some(format!("{}/pornstar/{}", ROOT_URL, arg));
    }
    is_site_url(arg).then(|| arg.to_string())
}

fn usage(command: &Command) -> &'static str {
    match command {
        Command::Video(_) => "请提供视频ID\n用法: /ep_video <视频ID>",
        Command::Search(_) => "请提供搜索关键词\n用法: /ep_search <关键词>",
        Command::Pornstar(_) => "请提供演员ID\n用法: /ep_pornstar <演员ID>",
        Command::Category(_) => "请提供分类名\n用法: /ep_category <分类名>",
        Command::Help => HELP_TEXT,
    }
}

/// Orchestrates one command at a time against a provider and the asset cache
pub struct CommandPipeline {
    provider: Option<Arc<dyn ProviderGateway>>,
    cache: Arc<AssetCache>,
    fetcher: ImageFetcher,
    obfuscator: ImageObfuscator,
    blur_level: u32,
    in_flight: Mutex<()>,
}

impl CommandPipeline {
    /// `provider = None` models a client that failed to initialize
    pub fn new(
        provider: Option<Arc<dyn ProviderGateway>>,
        cache: Arc<AssetCache>,
        fetcher: ImageFetcher,
        obfuscator: ImageObfuscator,
        blur_level: u32,
    ) -> Self {
        Self {
            provider,
            cache,
            fetcher,
            obfuscator,
            blur_level,
            in_flight: Mutex::new(()),
        }
    }

    /// Wire up the live client, cache directory and blur capability
    pub async fn from_config(config: &Config) -> Self {
        let cache = Arc::new(AssetCache::new(&config.cache_dir));
        if let Err(e) = cache.ensure_dir().await {
            error!("Failed to create cache dir {}: {}", config.cache_dir.display(), e);
        }

        let (provider, client): (Option<Arc<dyn ProviderGateway>>, reqwest::Client) =
            match build_http_client(config.proxy.as_deref()) {
                Ok(client) => {
                    let provider: Arc<dyn ProviderGateway> =
                        Arc::new(EpornerClient::new(client.clone()));
                    (Some(provider), client)
                }
                Err(e) => {
                    error!("EPorner client initialization failed: {}", e);
                    (None, reqwest::Client::new())
                }
            };

        let capability = BlurCapability::detect();
        info!(
            "Pipeline ready (proxy: {}, blur level: {}, blur: {:?})",
            config.proxy.as_deref().unwrap_or("none"),
            config.blur_level,
            capability
        );

        Self::new(
            provider,
            Arc::clone(&cache),
            ImageFetcher::new(client, Arc::clone(&cache)),
            ImageObfuscator::new(cache, capability),
            config.blur_level,
        )
    }

    /// Run one command to completion and return what to send back
    pub async fn execute(&self, command: &Command) -> Reply {
        let _guard = self.in_flight.lock().await;
        self.execute_locked(command).await
    }

    /// Run one command and hand the reply to `emit` before releasing the
    /// command lock, so the next command cannot clear files still being sent
    pub async fn run_and_emit<F, Fut, T>(&self, command: &Command, emit: F) -> T
    where
        F: FnOnce(Reply) -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.in_flight.lock().await;
        let reply = self.execute_locked(command).await;
        emit(reply).await
    }

    async fn execute_locked(&self, command: &Command) -> Reply {
        debug!("Executing /{}", command.name());

        if let Command::Help = command {
            return Reply::text(HELP_TEXT);
        }

        let Some(provider) = self.provider.as_deref() else {
            return Reply::text(UNAVAILABLE_TEXT);
        };

        match command {
            Command::Video(arg) if !arg.trim().is_empty() => self.video(provider, arg.trim()).await,
            Command::Search(arg) if !arg.trim().is_empty() => self.search(provider, arg.trim()).await,
            Command::Pornstar(arg) if !arg.trim().is_empty() => {
                self.performer(provider, arg.trim()).await
            }
            Command::Category(arg) if !arg.trim().is_empty() => {
                self.category(provider, arg.trim()).await
            }
            other => Reply::text(usage(other)),
        }
    }

    /// Teardown: delete the last epoch's files
    pub async fn shutdown(&self) {
        let _guard = self.in_flight.lock().await;
        let stats = self.cache.clear_epoch().await;
        info!("Pipeline shut down, removed {} cache files", stats.removed);
    }

    async fn video(&self, provider: &dyn ProviderGateway, arg: &str) -> Reply {
        self.cache.clear_epoch().await;

        let url = resolve_video_url(arg);
        info!("Fetching video info: {}", url);

        match provider.resolve_video(&url).await {
            Ok(video) => {
                let image = self.thumbnail(video.thumbnail.as_deref()).await;
                Reply::compose(reply::video_text(&video), image)
            }
            Err(e) => {
                error!("Failed to fetch video info: {}", e);
                Reply::text(format!("获取视频信息失败: {}", e))
            }
        }
    }

    async fn search(&self, provider: &dyn ProviderGateway, query: &str) -> Reply {
        self.cache.clear_epoch().await;
        info!("Searching videos: {}", query);

        match provider
            .search(query, 1, LISTING_LIMIT as u32, SearchSort::default())
            .await
        {
            Ok(videos) if videos.is_empty() => Reply::text(NO_SEARCH_RESULTS_TEXT),
            Ok(videos) => Reply::text(reply::listing_text(&format!("🔍 搜索结果: {}", query), &videos)),
            Err(e) => {
                error!("Video search failed: {}", e);
                Reply::text(format!("搜索视频失败: {}", e))
            }
        }
    }

    async fn performer(&self, provider: &dyn ProviderGateway, arg: &str) -> Reply {
        self.cache.clear_epoch().await;

        let Some(url) = resolve_performer_url(arg) else {
            warn!("Rejected pornstar link outside {}: {}", ROOT_URL, arg);
            return Reply::text(FOREIGN_PERFORMER_LINK_TEXT);
        };
        info!("Fetching pornstar info: {}", url);

        match provider.resolve_performer(&url).await {
            Ok(performer) => {
                let image = self.thumbnail(performer.picture.as_deref()).await;
                Reply::compose(reply::performer_text(&performer), image)
            }
            Err(e) => {
                error!("Failed to fetch pornstar info: {}", e);
                Reply::text(format!("获取演员信息失败: {}", e))
            }
        }
    }

    async fn category(&self, provider: &dyn ProviderGateway, name: &str) -> Reply {
        self.cache.clear_epoch().await;
        info!("Listing category: {}", name);

        let hints = ListingHints {
            limit: LISTING_LIMIT,
            ..ListingHints::default()
        };

        match provider.list_category(name, hints).await {
            Ok(videos) if videos.is_empty() => Reply::text(format!("未找到分类 '{}' 的视频", name)),
            Ok(videos) => Reply::text(reply::listing_text(&format!("📂 分类: {}", name), &videos)),
            Err(e) => {
                error!("Category listing failed: {}", e);
                Reply::text(format!("获取分类视频失败: {}", e))
            }
        }
    }

    /// Download and blur; any failure means no image
    async fn thumbnail(&self, url: Option<&str>) -> Option<LocalAsset> {
        let url = url.map(str::trim).filter(|u| !u.is_empty())?;
        let asset = self.fetcher.fetch_optional(url).await?;
        Some(self.obfuscator.apply(asset, self.blur_level).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_video_url() {
        assert_eq!(resolve_video_url("12345"), "https://www.eporner.com/video-12345/");
        assert_eq!(
            resolve_video_url("https://www.eporner.com/video-abc/title/"),
            "https://www.eporner.com/video-abc/title/"
        );
    }

    #[test]
    fn test_resolve_performer_url() {
        assert_eq!(
            resolve_performer_url("jane-doe").as_deref(),
            Some("https://www.eporner.com/pornstar/jane-doe")
        );
        assert_eq!(
            resolve_performer_url("https://www.eporner.com/pornstar/jane-doe").as_deref(),
            Some("https://www.eporner.com/pornstar/jane-doe")
        );
    }

    #[test]
    fn test_resolve_performer_url_rejects_foreign_host() {
        assert_eq!(resolve_performer_url("http://mirror/pornstar/x"), None);
        assert_eq!(resolve_performer_url("http://127.0.0.1:8080/internal/secret"), None);
    }

    #[test]
    fn test_usage_texts() {
        assert!(usage(&Command::Video(String::new())).contains("/ep_video"));
        assert!(usage(&Command::Category(String::new())).contains("/ep_category"));
    }
}
