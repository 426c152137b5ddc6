//! # danmu-client
//!
//! Live-room chat client: discovers the room's chat server, keeps a
//! binary-framed WebSocket session alive and dispatches decoded events to
//! registered handlers.
//!
//! ```no_run
//! use danmu_client::Session;
//!
//! # async fn run() -> Result<(), danmu_client::SessionError> {
//! let session = Session::builder(21_452_505).build()?;
//! session.handlers().on_danmaku(|danmaku| {
//!     println!("{}: {}", danmaku.uname, danmaku.text);
//! });
//! session.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod dispatch;
pub mod events;
pub mod handlers;
pub mod protocol;

pub use connection::{
    Connector, Session, SessionBuilder, SessionConfig, SessionError, SessionResult, SessionState,
    TransportError, WsConnector,
};
pub use dispatch::{EventDispatcher, EventDispatcherConfig};
pub use events::{Event, EventKind};
pub use handlers::{HandlerKey, HandlerRegistry};
