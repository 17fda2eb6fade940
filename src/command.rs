//! Command parsing
//!
//! `/ep_video 123`, `/ep_search@MyBot some words` and friends.

/// A recognized bot command with its (possibly empty) argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Video(String),
    Search(String),
    Pornstar(String),
    Category(String),
    Help,
}

impl Command {
    /// Parse message text; `None` for anything that is not one of our commands.
    ///
    /// A `/cmd@name` suffix must match `bot_username` (case-insensitive) when
    /// the username is known; commands addressed to other bots are ignored.
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Self> {
        let text = text.trim();
        let rest = text.strip_prefix('/')?;

        let (head, arg) = match rest.split_once(char::is_whitespace) {
            Some((head, arg)) => (head, arg.trim().to_string()),
            None => (rest, String::new()),
        };

        // Telegram appends @botname in groups
        let (name, target) = match head.split_once('@') {
            Some((name, target)) => (name, Some(target)),
            None => (head, None),
        };
        if let (Some(target), Some(me)) = (target, bot_username) {
            if !target.eq_ignore_ascii_case(me) {
                return None;
            }
        }

        match name.to_ascii_lowercase().as_str() {
            "ep_video" => Some(Self::Video(arg)),
            "ep_search" => Some(Self::Search(arg)),
            "ep_pornstar" => Some(Self::Pornstar(arg)),
            "ep_category" => Some(Self::Category(arg)),
            "start" | "help" => Some(Self::Help),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Video(_) => "ep_video",
            Self::Search(_) => "ep_search",
            Self::Pornstar(_) => "ep_pornstar",
            Self::Category(_) => "ep_category",
            Self::Help => "help",
        }
    }
}

pub const HELP_TEXT: &str = "EPorner 视频信息查询\n\n\
    /ep_video <视频ID或链接> - 视频信息\n\
    /ep_search <关键词> - 搜索视频\n\
    /ep_pornstar <演员ID> - 演员信息\n\
    /ep_category <分类名> - 分类视频";
