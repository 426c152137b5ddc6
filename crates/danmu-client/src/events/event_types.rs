//! Built-in event kinds
//!
//! The closed set of events this crate understands. Notification commands
//! outside this set are still delivered to custom handlers by name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Built-in event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    // Control replies
    /// Heartbeat reply carrying the room popularity
    OnlineCount,
    /// Reply to the enter frame
    AuthReply,

    // Notification commands
    /// Chat message
    Danmaku,
    /// Gift sent
    Gift,
    /// Paid pinned message
    SuperChat,
    /// Membership purchase
    GuardBuy,
    /// User entered or followed
    InteractWord,
    /// Stream went live
    Live,
    /// Stream ended
    Preparing,
    /// Watched counter changed
    WatchedChange,
    /// Like counter changed
    LikeInfoUpdate,
    /// Online rank size changed
    OnlineRankCount,
}

impl EventKind {
    /// Command name on the wire, or the internal name for control replies
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OnlineCount => "ONLINE_COUNT",
            Self::AuthReply => "AUTH_REPLY",
            Self::Danmaku => "DANMU_MSG",
            Self::Gift => "SEND_GIFT",
            Self::SuperChat => "SUPER_CHAT_MESSAGE",
            Self::GuardBuy => "GUARD_BUY",
            Self::InteractWord => "INTERACT_WORD",
            Self::Live => "LIVE",
            Self::Preparing => "PREPARING",
            Self::WatchedChange => "WATCHED_CHANGE",
            Self::LikeInfoUpdate => "LIKE_INFO_V3_UPDATE",
            Self::OnlineRankCount => "ONLINE_RANK_COUNT",
        }
    }

    /// Map a notification `cmd` to its built-in kind.
    ///
    /// Anything after a `:` is ignored, so `DANMU_MSG:4:0:2:2:2:0` is a
    /// [`EventKind::Danmaku`]. Control replies never match.
    #[must_use]
    pub fn from_cmd(cmd: &str) -> Option<Self> {
        let base = cmd.split_once(':').map_or(cmd, |(base, _)| base);
        match base {
            "DANMU_MSG" => Some(Self::Danmaku),
            "SEND_GIFT" => Some(Self::Gift),
            "SUPER_CHAT_MESSAGE" => Some(Self::SuperChat),
            "GUARD_BUY" => Some(Self::GuardBuy),
            "INTERACT_WORD" => Some(Self::InteractWord),
            "LIVE" => Some(Self::Live),
            "PREPARING" => Some(Self::Preparing),
            "WATCHED_CHANGE" => Some(Self::WatchedChange),
            "LIKE_INFO_V3_UPDATE" => Some(Self::LikeInfoUpdate),
            "ONLINE_RANK_COUNT" => Some(Self::OnlineRankCount),
            _ => None,
        }
    }

    /// Whether this kind arrives as a notification command
    #[must_use]
    pub const fn is_command(self) -> bool {
        !matches!(self, Self::OnlineCount | Self::AuthReply)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
