//! Protocol error types

use thiserror::Error;

/// A frame or a single packet that could not be decoded
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Fewer bytes than a header or than the declared packet length
    #[error("Truncated packet: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    /// Header length field is below the fixed header size or exceeds the total length
    #[error("Invalid header length {header_len} for packet of {total_len} bytes")]
    InvalidHeaderLength { total_len: u32, header_len: u16 },

    /// Compressing or decompressing a nested frame failed
    #[error("{algorithm} stream error: {source}")]
    Compression {
        algorithm: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Nested frames deeper than the decoder is willing to follow
    #[error("Nested compression exceeds depth {0}")]
    TooDeep(usize),

    /// Body is not the JSON the op code promises
    #[error("Invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// Heartbeat reply body shorter than 4 bytes
    #[error("Invalid online count body of {0} bytes")]
    InvalidOnlineCount(usize),
}

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;
