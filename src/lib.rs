//! EPorner Bot
//!
//! Message-bot command handler for EPorner video, search, performer and
//! category lookups, with optionally blurred thumbnails.
//!
//! # Architecture
//!
//! ```text
//! Telegram ──► Command ──► CommandPipeline ──► ProviderGateway (EpornerClient)
//!                               │
//!                               ├── ImageFetcher   (download into cache)
//!                               ├── ImageObfuscator (Gaussian blur)
//!                               ├── AssetCache     (per-command epoch)
//!                               └── reply          (text / image+text)
//! ```

pub mod cache;
pub mod command;
pub mod config;
pub mod fetcher;
pub mod obfuscator;
pub mod pipeline;
pub mod provider;
pub mod reply;
pub mod telegram;

pub use cache::{AssetCache, ClearStats, LocalAsset};
pub use command::Command;
pub use config::Config;
pub use fetcher::{FetchError, ImageFetcher};
pub use obfuscator::{BlurCapability, ImageObfuscator};
pub use pipeline::CommandPipeline;
pub use provider::{
    EpornerClient, ListingHints, PerformerRecord, ProviderError, ProviderGateway, SearchSort,
    VideoRecord,
};
pub use reply::Reply;
