//! Frame codec
//!
//! Inbound: one socket frame holds zero or more packets back to back; a
//! compressed packet holds another such frame. [`decode`] flattens all of it
//! into leaf packets in arrival order. A bad packet is logged and skipped,
//! the rest of the frame still decodes.
//!
//! Outbound: the client only ever sends the enter frame and heartbeats.

use super::compression;
use super::error::{ProtocolError, ProtocolResult};
use super::opcodes::{OpCode, ProtocolVersion};
use super::packet::{Packet, PacketHeader, HEADER_LEN};
use super::payloads::{EnterRoomPayload, HEARTBEAT_BODY};
use bytes::Bytes;

/// Compressed packets nested deeper than this are dropped
pub const MAX_NESTING_DEPTH: usize = 4;

/// Decode a frame into its leaf packets
pub fn decode(frame: &[u8]) -> Vec<Packet> {
    let mut packets = Vec::new();
    decode_into(frame, 0, &mut packets);
    packets
}

fn decode_into(mut buf: &[u8], depth: usize, out: &mut Vec<Packet>) {
    while !buf.is_empty() {
        let header = match PacketHeader::parse(buf) {
            Ok(header) => header,
            Err(e) => {
                tracing::warn!(error = %e, depth, "Dropping trailing bytes of frame");
                return;
            }
        };

        // Without a trustworthy total length the next packet cannot be located.
        let total = header.total_len as usize;
        if total < HEADER_LEN || total > buf.len() {
            let error = if total < HEADER_LEN {
                ProtocolError::InvalidHeaderLength {
                    total_len: header.total_len,
                    header_len: header.header_len,
                }
            } else {
                ProtocolError::Truncated {
                    needed: total,
                    available: buf.len(),
                }
            };
            tracing::warn!(error = %error, depth, "Dropping rest of frame");
            return;
        }

        let (packet_bytes, rest) = buf.split_at(total);
        buf = rest;

        if let Err(e) = decode_packet(header, packet_bytes, depth, out) {
            tracing::warn!(
                error = %e,
                operation = header.operation,
                version = header.version,
                depth,
                "Dropping packet"
            );
        }
    }
}

fn decode_packet(
    header: PacketHeader,
    bytes: &[u8],
    depth: usize,
    out: &mut Vec<Packet>,
) -> ProtocolResult<()> {
    header.validate()?;
    let body = &bytes[usize::from(header.header_len)..];

    match ProtocolVersion::from_u16(header.version) {
        Some(version) if version.is_compressed() => {
            if depth >= MAX_NESTING_DEPTH {
                return Err(ProtocolError::TooDeep(MAX_NESTING_DEPTH));
            }
            let inflated = compression::decompress(version, body)?;
            decode_into(&inflated, depth + 1, out);
        }
        // Unknown versions are passed through as opaque leaves.
        _ => out.push(Packet::from_parts(header, Bytes::copy_from_slice(body))),
    }
    Ok(())
}

/// Build the enter-room frame sent right after the handshake
pub fn encode_enter(uid: u64, buvid: &str, room_id: u64, token: &str) -> ProtocolResult<Bytes> {
    let payload = EnterRoomPayload::new(uid, buvid, room_id, token);
    let body = serde_json::to_vec(&payload)?;
    Ok(Packet::new(OpCode::Authentication, ProtocolVersion::Plain, body).encode())
}

/// The fixed heartbeat frame
pub fn encode_heartbeat() -> Bytes {
    Packet::new(OpCode::Heartbeat, ProtocolVersion::Plain, HEARTBEAT_BODY).encode()
}

/// Wrap already-encoded packets into one compressed packet
pub fn encode_nested(version: ProtocolVersion, frame: &[u8]) -> ProtocolResult<Bytes> {
    let body = compression::compress(version, frame)?;
    Ok(Packet::new(OpCode::Notification, version, body).encode())
}
