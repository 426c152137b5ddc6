//! Event payload definitions
//!
//! Typed payloads for the commands this crate knows how to read. Every
//! notification is also available untyped as a [`CommandEvent`].

use super::error::{EventError, EventResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A notification command with its raw JSON body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEvent {
    /// Command name exactly as received
    pub cmd: String,
    /// Whole notification body, `cmd` included
    pub raw: Value,
}

impl CommandEvent {
    /// Read `cmd` from a notification body
    pub fn from_value(raw: Value) -> EventResult<Self> {
        let cmd = raw
            .get("cmd")
            .and_then(Value::as_str)
            .ok_or(EventError::MissingField("cmd"))?
            .to_string();
        Ok(Self { cmd, raw })
    }

    /// The `data` object most commands carry
    pub fn data(&self) -> Option<&Value> {
        self.raw.get("data")
    }

    fn parse_data<T: serde::de::DeserializeOwned>(&self) -> EventResult<T> {
        let data = self.data().ok_or(EventError::MissingField("data"))?;
        Ok(T::deserialize(data)?)
    }
}

// === Chat ===

/// Fan medal shown next to a sender's name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanMedal {
    pub level: u32,
    pub name: String,
}

/// DANMU_MSG payload
///
/// The command carries a positional `info` array rather than an object:
/// `info[0][3]` color, `info[0][4]` send time in ms, `info[1]` text,
/// `info[2][0..2]` sender uid and name, `info[3]` medal (empty when none).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DanmakuEvent {
    pub uid: u64,
    pub uname: String,
    pub text: String,
    pub color: u32,
    pub sent_at: Option<DateTime<Utc>>,
    pub medal: Option<FanMedal>,
}

impl DanmakuEvent {
    pub fn parse(command: &CommandEvent) -> EventResult<Self> {
        let info = command
            .raw
            .get("info")
            .and_then(Value::as_array)
            .ok_or(EventError::MissingField("info"))?;

        let meta = info.first();
        let text = info
            .get(1)
            .and_then(Value::as_str)
            .ok_or(EventError::MissingField("info[1]"))?;
        let user = info
            .get(2)
            .and_then(Value::as_array)
            .ok_or(EventError::MissingField("info[2]"))?;

        let medal = info.get(3).and_then(Value::as_array).and_then(|medal| {
            Some(FanMedal {
                level: u32::try_from(medal.first()?.as_u64()?).ok()?,
                name: medal.get(1)?.as_str()?.to_string(),
            })
        });

        Ok(Self {
            uid: user.first().and_then(Value::as_u64).unwrap_or_default(),
            uname: user
                .get(1)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            text: text.to_string(),
            color: meta
                .and_then(|m| m.get(3))
                .and_then(Value::as_u64)
                .and_then(|c| u32::try_from(c).ok())
                .unwrap_or(0x00FF_FFFF),
            sent_at: meta
                .and_then(|m| m.get(4))
                .and_then(Value::as_i64)
                .and_then(DateTime::from_timestamp_millis),
            medal,
        })
    }
}

// === Gifts and payments ===

/// SEND_GIFT payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftEvent {
    pub uid: u64,
    pub uname: String,
    #[serde(rename = "giftId", default)]
    pub gift_id: u64,
    #[serde(rename = "giftName")]
    pub gift_name: String,
    #[serde(default)]
    pub num: u32,
    /// Unit price; paid gifts are in 1/1000 of the platform currency
    #[serde(default)]
    pub price: u64,
    /// `gold` for paid gifts, `silver` for free ones
    #[serde(default)]
    pub coin_type: String,
    #[serde(default)]
    pub action: String,
}

impl GiftEvent {
    pub fn parse(command: &CommandEvent) -> EventResult<Self> {
        command.parse_data()
    }

    /// Whether the gift cost real currency
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.coin_type == "gold"
    }
}

/// Sender of a super chat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperChatUser {
    pub uname: String,
}

/// SUPER_CHAT_MESSAGE payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuperChatEvent {
    pub id: u64,
    pub uid: u64,
    pub message: String,
    /// Whole currency units
    pub price: u64,
    /// Seconds the message stays pinned
    #[serde(default)]
    pub time: u64,
    pub user_info: SuperChatUser,
}

impl SuperChatEvent {
    pub fn parse(command: &CommandEvent) -> EventResult<Self> {
        command.parse_data()
    }
}

/// GUARD_BUY payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardBuyEvent {
    pub uid: u64,
    pub username: String,
    /// 1 governor, 2 admiral, 3 captain
    pub guard_level: u8,
    #[serde(default)]
    pub num: u32,
    #[serde(default)]
    pub price: u64,
    #[serde(default)]
    pub gift_name: String,
}

impl GuardBuyEvent {
    pub fn parse(command: &CommandEvent) -> EventResult<Self> {
        command.parse_data()
    }
}
