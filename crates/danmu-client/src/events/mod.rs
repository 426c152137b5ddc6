//! Client events
//!
//! What handlers receive: control replies and notification commands, typed
//! where this crate knows the shape and raw otherwise.

mod error;
mod event_types;
mod payloads;

pub use error::{EventError, EventResult};
pub use event_types::EventKind;
pub use payloads::{
    CommandEvent, DanmakuEvent, FanMedal, GiftEvent, GuardBuyEvent, SuperChatEvent,
    SuperChatUser,
};

use crate::protocol::AuthReplyPayload;

/// An event delivered to a handler
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Room popularity from a heartbeat reply
    OnlineCount(u32),
    /// Server reply to the enter frame
    AuthReply(AuthReplyPayload),
    Danmaku(DanmakuEvent),
    Gift(GiftEvent),
    SuperChat(SuperChatEvent),
    GuardBuy(GuardBuyEvent),
    /// Any notification, delivered untyped
    Command(CommandEvent),
}

impl Event {
    /// Build the built-in event for a notification of the given kind.
    ///
    /// Kinds without a typed payload are delivered as [`Event::Command`].
    pub fn from_command(kind: EventKind, command: CommandEvent) -> EventResult<Self> {
        Ok(match kind {
            EventKind::Danmaku => Self::Danmaku(DanmakuEvent::parse(&command)?),
            EventKind::Gift => Self::Gift(GiftEvent::parse(&command)?),
            EventKind::SuperChat => Self::SuperChat(SuperChatEvent::parse(&command)?),
            EventKind::GuardBuy => Self::GuardBuy(GuardBuyEvent::parse(&command)?),
            _ => Self::Command(command),
        })
    }

    /// Built-in kind of this event, if it has one
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Self::OnlineCount(_) => Some(EventKind::OnlineCount),
            Self::AuthReply(_) => Some(EventKind::AuthReply),
            Self::Danmaku(_) => Some(EventKind::Danmaku),
            Self::Gift(_) => Some(EventKind::Gift),
            Self::SuperChat(_) => Some(EventKind::SuperChat),
            Self::GuardBuy(_) => Some(EventKind::GuardBuy),
            Self::Command(command) => EventKind::from_cmd(&command.cmd),
        }
    }

    /// Command name for notification events
    pub fn cmd(&self) -> Option<&str> {
        match self {
            Self::Command(command) => Some(&command.cmd),
            Self::Danmaku(_) | Self::Gift(_) | Self::SuperChat(_) | Self::GuardBuy(_) => {
                self.kind().map(EventKind::as_str)
            }
            Self::OnlineCount(_) | Self::AuthReply(_) => None,
        }
    }
}
