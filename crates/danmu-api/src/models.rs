//! Response models for the room discovery endpoints

use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};

/// Common response envelope: `{"code": 0, "message": "...", "data": {...}}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Unwrap the payload, turning a non-zero code or missing data into an error
    pub fn into_result(self) -> ApiResult<T> {
        if self.code != 0 {
            return Err(ApiError::Status {
                code: self.code,
                message: self.message,
            });
        }
        self.data
            .ok_or_else(|| ApiError::InvalidResponse("response has no data".to_string()))
    }
}

/// Room metadata. `room_id` is the real id even when a short id was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub room_id: u64,
    #[serde(default)]
    pub short_id: u64,
    /// Anchor's user id
    #[serde(default)]
    pub uid: u64,
    #[serde(default)]
    pub live_status: u8,
}

impl RoomInfo {
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live_status == 1
    }
}

/// Chat-server connection info for one room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DanmuInfo {
    /// One-time key sent in the enter-room frame
    pub token: String,
    #[serde(default)]
    pub host_list: Vec<HostInfo>,
}

impl DanmuInfo {
    /// Host names in server-preferred order
    #[must_use]
    pub fn hosts(&self) -> Vec<String> {
        self.host_list
            .iter()
            .filter(|h| !h.host.is_empty())
            .map(|h| h.host.clone())
            .collect()
    }
}

/// One chat-server candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfo {
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub wss_port: u16,
    #[serde(default)]
    pub ws_port: u16,
}

/// Account info behind a cookie
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NavInfo {
    #[serde(rename = "isLogin", default)]
    pub is_login: bool,
    #[serde(default)]
    pub mid: u64,
}
