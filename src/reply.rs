//! Reply composition
//!
//! Field order and labels are what users see; keep them stable.

use crate::cache::LocalAsset;
use crate::provider::{PerformerRecord, VideoRecord};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Appended to every text so the transport does not trim trailing content
pub const TRAILING_MARKER: char = '\u{200E}';

/// Entries shown in search / category listings
pub const LISTING_LIMIT: usize = 5;

/// Tags shown for a single video
pub const TAG_LIMIT: usize = 5;

const SEPARATOR: &str = "━━━━━━━━━━━━━━━━";
const UNKNOWN: &str = "未知";

/// What a command emits
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    ImageText { image: PathBuf, text: String },
}

impl Reply {
    /// Text-only reply, marker appended
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(with_marker(text))
    }

    /// Image+text when an image survived the pipeline, text-only otherwise
    pub fn compose(text: impl Into<String>, image: Option<LocalAsset>) -> Self {
        match image {
            Some(asset) => Self::ImageText {
                image: asset.path,
                text: with_marker(text),
            },
            None => Self::text(text),
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Self::Text(text) | Self::ImageText { text, .. } => text,
        }
    }

    pub fn image(&self) -> Option<&Path> {
        match self {
            Self::Text(_) => None,
            Self::ImageText { image, .. } => Some(image),
        }
    }
}

pub fn with_marker(text: impl Into<String>) -> String {
    let mut text = text.into();
    text.push(TRAILING_MARKER);
    text
}

pub fn video_text(video: &VideoRecord) -> String {
    let tags = video
        .tags
        .iter()
        .take(TAG_LIMIT)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "📹 视频信息\n\
         {SEPARATOR}\n\
         📌 标题: {}\n\
         👁️ 观看: {}\n\
         ⭐ 评分: {}\n\
         📅 发布: {}\n\
         ⏱️ 时长: {}分钟\n\
         🏷️ 标签: {}",
        video.title, video.views, video.rate, video.publish_date, video.length_minutes, tags
    )
}

pub fn performer_text(p: &PerformerRecord) -> String {
    let rows: [(&str, Option<&str>); 17] = [
        ("📌 姓名", Some(p.name.as_str())),
        ("👥 订阅者", p.subscribers.as_deref()),
        ("📊 排名", p.pornstar_rank.as_deref()),
        ("👁️ 个人主页浏览", p.profile_views.as_deref()),
        ("🎬 视频数", p.video_amount.as_deref()),
        ("📷 照片数", p.photos_amount.as_deref()),
        ("🎥 视频观看", p.video_views.as_deref()),
        ("📸 照片观看", p.photo_views.as_deref()),
        ("🌍 国家", p.country.as_deref()),
        ("🎂 年龄", p.age.as_deref()),
        ("👁️ 眼睛颜色", p.eye_color.as_deref()),
        ("💇 发色", p.hair_color.as_deref()),
        ("📏 身高", p.height.as_deref()),
        ("⚖️ 体重", p.weight.as_deref()),
        ("📏 三围", p.measurements.as_deref()),
        ("🍷 罩杯", p.cup.as_deref()),
        ("🎭 种族", p.ethnicity.as_deref()),
    ];

    let mut text = format!("👤 演员信息\n{SEPARATOR}");
    for (label, value) in rows {
        let _ = write!(text, "\n{}: {}", label, value.unwrap_or(UNKNOWN));
    }
    text
}

/// Numbered listing of at most `LISTING_LIMIT` videos under `header`
pub fn listing_text(header: &str, videos: &[VideoRecord]) -> String {
    let mut text = format!("{header}\n{SEPARATOR}\n");
    for (i, video) in videos.iter().take(LISTING_LIMIT).enumerate() {
        let _ = write!(
            text,
            "{}. {}\n   ID: {}\n   时长: {}分钟 | 观看: {}\n   查看详情: /ep_video {}\n\n",
            i + 1,
            video.title,
            video.video_id,
            video.length_minutes,
            video.views,
            video.video_id
        );
    }
    text
}
