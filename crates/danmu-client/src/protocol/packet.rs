//! Packet envelope
//!
//! Every unit on the wire is a 16-byte big-endian header followed by a body:
//!
//! | offset | size | field        |
//! |--------|------|--------------|
//! | 0      | 4    | total length |
//! | 4      | 2    | header length|
//! | 6      | 2    | version      |
//! | 8      | 4    | operation    |
//! | 12     | 4    | sequence     |

use super::error::{ProtocolError, ProtocolResult};
use super::opcodes::{OpCode, ProtocolVersion};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;

/// Size of the fixed packet header
pub const HEADER_LEN: usize = 16;

/// Decoded packet header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketHeader {
    /// Header plus body, in bytes
    pub total_len: u32,
    pub header_len: u16,
    /// Raw [`ProtocolVersion`]
    pub version: u16,
    /// Raw [`OpCode`]
    pub operation: u32,
    /// Not validated by the receiver
    pub sequence: u32,
}

impl PacketHeader {
    /// Read the fixed header fields from the front of `buf`
    pub fn parse(mut buf: &[u8]) -> ProtocolResult<Self> {
        if buf.len() < HEADER_LEN {
            return Err(ProtocolError::Truncated {
                needed: HEADER_LEN,
                available: buf.len(),
            });
        }

        Ok(Self {
            total_len: buf.get_u32(),
            header_len: buf.get_u16(),
            version: buf.get_u16(),
            operation: buf.get_u32(),
            sequence: buf.get_u32(),
        })
    }

    /// Check `total_len >= header_len >= HEADER_LEN`
    pub fn validate(&self) -> ProtocolResult<()> {
        let header_len = usize::from(self.header_len);
        if header_len < HEADER_LEN || self.total_len < u32::from(self.header_len) {
            return Err(ProtocolError::InvalidHeaderLength {
                total_len: self.total_len,
                header_len: self.header_len,
            });
        }
        Ok(())
    }

    /// Append the header to `buf`, zero-padding up to `header_len`
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u32(self.total_len);
        buf.put_u16(self.header_len);
        buf.put_u16(self.version);
        buf.put_u32(self.operation);
        buf.put_u32(self.sequence);
        let padding = usize::from(self.header_len).saturating_sub(HEADER_LEN);
        buf.put_bytes(0, padding);
    }
}

/// A leaf packet: header plus an uncompressed body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    header: PacketHeader,
    body: Bytes,
}

impl Packet {
    /// Build an outbound packet with sequence 1
    pub fn new(operation: OpCode, version: ProtocolVersion, body: impl Into<Bytes>) -> Self {
        Self::from_raw(operation.as_u32(), version.as_u16(), body)
    }

    /// Build a packet from raw header values, for op codes or versions this crate does not know
    pub fn from_raw(operation: u32, version: u16, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self {
            header: PacketHeader {
                total_len: (HEADER_LEN + body.len()) as u32,
                header_len: HEADER_LEN as u16,
                version,
                operation,
                sequence: 1,
            },
            body,
        }
    }

    /// Reassemble a decoded packet; `header.total_len` must describe `body`
    pub(crate) fn from_parts(header: PacketHeader, body: Bytes) -> Self {
        Self { header, body }
    }

    #[must_use]
    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.header.sequence = sequence;
        self
    }

    /// The header as it appeared on the wire
    pub fn header(&self) -> PacketHeader {
        self.header
    }

    /// Known op code, if any
    pub fn op(&self) -> Option<OpCode> {
        OpCode::from_u32(self.header.operation)
    }

    /// Raw op code
    pub fn operation(&self) -> u32 {
        self.header.operation
    }

    /// Known protocol version, if any
    pub fn version(&self) -> Option<ProtocolVersion> {
        ProtocolVersion::from_u16(self.header.version)
    }

    pub fn sequence(&self) -> u32 {
        self.header.sequence
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Deserialize a JSON body
    pub fn json<T: DeserializeOwned>(&self) -> ProtocolResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Read the big-endian online count carried by a heartbeat reply
    pub fn online_count(&self) -> ProtocolResult<u32> {
        let mut body = self.body.as_ref();
        if body.len() < 4 {
            return Err(ProtocolError::InvalidOnlineCount(body.len()));
        }
        Ok(body.get_u32())
    }

    /// Serialize header and body into one buffer
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(usize::from(self.header.header_len) + self.body.len());
        self.header.write_to(&mut buf);
        buf.put_slice(&self.body);
        buf.freeze()
    }
}

impl std::fmt::Display for Packet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.op() {
            Some(op) => write!(f, "Packet(op={op}")?,
            None => write!(f, "Packet(op=unknown {}", self.header.operation)?,
        }
        write!(
            f,
            ", version={}, seq={}, body={}B)",
            self.header.version,
            self.header.sequence,
            self.body.len()
        )
    }
}
