//! Configuration management

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default blur intensity applied to thumbnails
pub const DEFAULT_BLUR_LEVEL: u32 = 5;

/// Default location of the ephemeral thumbnail directory
pub const DEFAULT_CACHE_DIR: &str = "data/plugins/eporner_cache";

/// Bot configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Proxy for all outbound HTTP (None = direct)
    pub proxy: Option<String>,

    /// Gaussian blur sigma for thumbnails (0 = no blur)
    pub blur_level: u32,

    /// Directory holding per-command thumbnail files
    pub cache_dir: PathBuf,

    /// Telegram users allowed to talk to the bot (empty = all)
    pub allowed_users: Vec<i64>,
}

/// On-disk form, keys match the plugin's global config names
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    eporner_proxy: Option<String>,
    #[serde(default)]
    eporner_blur_level: Option<i64>,
    #[serde(default)]
    cache_dir: Option<PathBuf>,
    #[serde(default)]
    allowed_users: Vec<i64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proxy: None,
            blur_level: DEFAULT_BLUR_LEVEL,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            allowed_users: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration: optional TOML file at `EPORNER_CONFIG`, then env overrides
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("EPORNER_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Read a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Parse TOML config text
    pub fn from_toml(raw: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(raw)?;
        let defaults = Self::default();

        Ok(Self {
            proxy: normalize_proxy(file.eporner_proxy),
            blur_level: file
                .eporner_blur_level
                .map(blur_level_from_int)
                .unwrap_or(DEFAULT_BLUR_LEVEL),
            cache_dir: file.cache_dir.unwrap_or(defaults.cache_dir),
            allowed_users: file.allowed_users,
        })
    }

    fn apply_env(&mut self) {
        if let Ok(proxy) = std::env::var("EPORNER_PROXY") {
            self.proxy = normalize_proxy(Some(proxy));
        }

        if let Ok(level) = std::env::var("EPORNER_BLUR_LEVEL") {
            self.blur_level = parse_blur_level(&level);
        }

        if let Ok(dir) = std::env::var("EPORNER_CACHE_DIR") {
            self.cache_dir = PathBuf::from(dir);
        }

        if let Ok(users) = std::env::var("TELEGRAM_ALLOWED_USERS") {
            self.allowed_users = users
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
        }
    }

    /// Check a Telegram user against the allow-list
    pub fn is_allowed(&self, user_id: i64) -> bool {
        self.allowed_users.is_empty() || self.allowed_users.contains(&user_id)
    }
}

/// Empty proxy string means "no proxy"
fn normalize_proxy(proxy: Option<String>) -> Option<String> {
    proxy
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}

/// Non-negative integer, anything else falls back to the default
fn parse_blur_level(raw: &str) -> u32 {
    match raw.trim().parse::<u32>() {
        Ok(level) => level,
        Err(_) => {
            tracing::warn!("Invalid blur level {:?}, using {}", raw, DEFAULT_BLUR_LEVEL);
            DEFAULT_BLUR_LEVEL
        }
    }
}

fn blur_level_from_int(level: i64) -> u32 {
    u32::try_from(level).unwrap_or_else(|_| {
        tracing::warn!("Invalid blur level {}, using {}", level, DEFAULT_BLUR_LEVEL);
        DEFAULT_BLUR_LEVEL
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.blur_level, 5);
        assert!(config.proxy.is_none());
        assert_eq!(config.cache_dir, PathBuf::from(DEFAULT_CACHE_DIR));
        assert!(config.is_allowed(42));
    }

    #[test]
    fn test_from_toml() {
        let config = Config::from_toml(
            r#"
            eporner_proxy = "http://127.0.0.1:7890"
            eporner_blur_level = 0
            cache_dir = "/tmp/ep"
            allowed_users = [1, 2]
            "#,
        )
        .unwrap();

        assert_eq!(config.proxy.as_deref(), Some("http://127.0.0.1:7890"));
        assert_eq!(config.blur_level, 0);
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/ep"));
        assert!(config.is_allowed(2));
        assert!(!config.is_allowed(3));
    }

    #[test]
    fn test_empty_proxy_means_direct() {
        let config = Config::from_toml(r#"eporner_proxy = "  ""#).unwrap();
        assert!(config.proxy.is_none());
    }

    #[test]
    fn test_negative_blur_level_falls_back() {
        let config = Config::from_toml("eporner_blur_level = -3").unwrap();
        assert_eq!(config.blur_level, DEFAULT_BLUR_LEVEL);
    }

    #[test]
    fn test_blur_level_from_int() {
        assert_eq!(blur_level_from_int(7), 7);
        assert_eq!(blur_level_from_int(-1), DEFAULT_BLUR_LEVEL);
        assert_eq!(blur_level_from_int(i64::MAX), DEFAULT_BLUR_LEVEL);
    }

    #[test]
    fn test_parse_blur_level() {
        assert_eq!(parse_blur_level("8"), 8);
        assert_eq!(parse_blur_level(" 0 "), 0);
        assert_eq!(parse_blur_level("high"), DEFAULT_BLUR_LEVEL);
    }
}
