//! Packet operation codes and protocol versions
//!
//! Both live in the fixed packet header. Unknown values are carried through
//! as raw integers so a newer server never breaks decoding.

use std::fmt;

/// Operation codes that select packet semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum OpCode {
    /// Heartbeat (client only)
    Heartbeat = 2,
    /// Heartbeat reply carrying the room's online count (server only)
    HeartbeatReply = 3,
    /// Notification carrying a JSON command (server only)
    Notification = 5,
    /// Enter room / authenticate (client only)
    Authentication = 7,
    /// Reply to [`OpCode::Authentication`] (server only)
    AuthenticationReply = 8,
}

impl OpCode {
    /// Create an `OpCode` from a raw header value
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            2 => Some(Self::Heartbeat),
            3 => Some(Self::HeartbeatReply),
            5 => Some(Self::Notification),
            7 => Some(Self::Authentication),
            8 => Some(Self::AuthenticationReply),
            _ => None,
        }
    }

    /// Get the raw header value
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Check if the client sends this op code
    #[must_use]
    pub const fn is_client_op(self) -> bool {
        matches!(self, Self::Heartbeat | Self::Authentication)
    }

    /// Get the name of this op code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Heartbeat => "Heartbeat",
            Self::HeartbeatReply => "HeartbeatReply",
            Self::Notification => "Notification",
            Self::Authentication => "Authentication",
            Self::AuthenticationReply => "AuthenticationReply",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u32())
    }
}

/// Body encoding announced by the header's version field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ProtocolVersion {
    /// Uncompressed JSON body
    Json = 0,
    /// Uncompressed body: heartbeat payloads, the online count, the enter frame
    Plain = 1,
    /// Body is a zlib-compressed frame of further packets
    Zlib = 2,
    /// Body is a brotli-compressed frame of further packets
    Brotli = 3,
}

impl ProtocolVersion {
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 => Some(Self::Json),
            1 => Some(Self::Plain),
            2 => Some(Self::Zlib),
            3 => Some(Self::Brotli),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Whether the body is a nested, compressed frame
    #[must_use]
    pub const fn is_compressed(self) -> bool {
        matches!(self, Self::Zlib | Self::Brotli)
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Json => "Json",
            Self::Plain => "Plain",
            Self::Zlib => "Zlib",
            Self::Brotli => "Brotli",
        };
        write!(f, "{name} ({})", self.as_u16())
    }
}
