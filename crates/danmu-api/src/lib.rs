//! # danmu-api
//!
//! Room discovery for the live danmu client.
//!
//! The session needs three facts before it can open a chat socket: the real
//! (long) room id, the chat-server host list with its one-time token, and the
//! numeric user id behind the login cookie. [`RoomApi`] is the port the
//! session depends on; [`HttpRoomApi`] is the default adapter that talks to the
//! public HTTP endpoints.

mod error;
mod http;
mod models;
mod traits;

pub use error::{ApiError, ApiResult};
pub use http::{HttpRoomApi, USER_AGENT};
pub use models::{ApiResponse, DanmuInfo, HostInfo, NavInfo, RoomInfo};
pub use traits::RoomApi;
