//! Wire protocol
//!
//! Packet envelope, op codes, nested compression and the frame codec.

pub mod codec;
mod compression;
mod error;
mod opcodes;
mod packet;
mod payloads;

pub use codec::{decode, encode_enter, encode_heartbeat, encode_nested, MAX_NESTING_DEPTH};
pub use compression::{compress, decompress};
pub use error::{ProtocolError, ProtocolResult};
pub use opcodes::{OpCode, ProtocolVersion};
pub use packet::{Packet, PacketHeader, HEADER_LEN};
pub use payloads::{AuthReplyPayload, EnterRoomPayload, HEARTBEAT_BODY, PREFERRED_PROTOVER};
