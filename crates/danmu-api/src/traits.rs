//! Room discovery port
//!
//! The session only depends on this trait, so tests can swap in a static
//! implementation and callers can route discovery through their own client.

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::models::{DanmuInfo, RoomInfo};

#[async_trait]
pub trait RoomApi: Send + Sync {
    /// Resolve a (possibly short) room id to its room metadata
    async fn room_info(&self, room_id: u64) -> ApiResult<RoomInfo>;

    /// Fetch the chat-server host list and one-time token for a room
    async fn danmu_info(&self, room_id: u64, cookie: Option<&str>) -> ApiResult<DanmuInfo>;

    /// Look up the numeric user id of the account behind `cookie`
    async fn user_id(&self, cookie: &str) -> ApiResult<u64>;
}
