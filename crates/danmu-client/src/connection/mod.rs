//! Connection lifecycle
//!
//! Session state machine, host rotation, cookie checks and the socket
//! transport the session runs on.

mod config;
mod credentials;
mod error;
mod hosts;
mod session;
mod state;
mod transport;

pub use config::SessionConfig;
pub use credentials::Credentials;
pub use error::{SessionError, SessionResult, TransportError};
pub use hosts::{HostRotation, DEFAULT_HOST};
pub use session::{Session, SessionBuilder};
pub use state::SessionState;
pub use transport::{Connector, Frame, FrameSink, FrameStream, WsConnector};
