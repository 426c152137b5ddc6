//! Control frame bodies
//!
//! JSON bodies the client sends, plus the server's reply to the enter frame.

use serde::{Deserialize, Serialize};

/// Fixed body of the heartbeat packet
pub const HEARTBEAT_BODY: &[u8] = b"[object Object]";

/// Compression the client asks the server to use (brotli)
pub const PREFERRED_PROTOVER: u16 = 3;

/// Body of the enter-room (authentication) packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnterRoomPayload {
    /// 0 when anonymous
    pub uid: u64,
    #[serde(rename = "roomid")]
    pub room_id: u64,
    pub protover: u16,
    /// Device identifier from the cookie; may be empty
    pub buvid: String,
    pub platform: String,
    #[serde(rename = "type")]
    pub kind: u8,
    /// One-time token from discovery; may be empty
    pub key: String,
}

impl EnterRoomPayload {
    pub fn new(uid: u64, buvid: impl Into<String>, room_id: u64, token: impl Into<String>) -> Self {
        Self {
            uid,
            room_id,
            protover: PREFERRED_PROTOVER,
            buvid: buvid.into(),
            platform: "web".to_string(),
            kind: 2,
            key: token.into(),
        }
    }
}

/// Body of the authentication reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthReplyPayload {
    pub code: i64,
}

impl AuthReplyPayload {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}
