//! Wire fixtures
//!
//! Server-side frames as the chat server would send them.

use bytes::Bytes;
use danmu_client::protocol::{encode_nested, OpCode, Packet, ProtocolVersion};
use serde_json::{json, Value};

/// A cookie with both login markers and a device id
pub const TEST_COOKIE: &str = "_uuid=TEST-UUID-infoc; SESSDATA=sess; bili_jct=csrf; other=1";

/// Device id carried by [`TEST_COOKIE`]
pub const TEST_BUVID: &str = "TEST-UUID-infoc";

/// Notification packet with a JSON body
pub fn notification(body: &Value) -> Bytes {
    Packet::new(OpCode::Notification, ProtocolVersion::Json, body.to_string()).encode()
}

/// Notification for an arbitrary command with an empty `data`
pub fn command(cmd: &str) -> Bytes {
    notification(&json!({ "cmd": cmd, "data": {} }))
}

pub fn danmaku(uid: u64, uname: &str, text: &str) -> Bytes {
    notification(&json!({
        "cmd": "DANMU_MSG",
        "info": [[0, 1, 25, 16_777_215, 1_700_000_000_000_i64, 0], text, [uid, uname, 0, 0, 0], []]
    }))
}

pub fn gift(uname: &str, gift_name: &str, num: u32) -> Bytes {
    notification(&json!({
        "cmd": "SEND_GIFT",
        "data": {
            "uid": 1,
            "uname": uname,
            "giftId": 1,
            "giftName": gift_name,
            "num": num,
            "price": 100,
            "coin_type": "gold"
        }
    }))
}

pub fn heartbeat_reply(online: u32) -> Bytes {
    Packet::new(
        OpCode::HeartbeatReply,
        ProtocolVersion::Plain,
        online.to_be_bytes().to_vec(),
    )
    .encode()
}

pub fn auth_reply(code: i64) -> Bytes {
    Packet::new(
        OpCode::AuthenticationReply,
        ProtocolVersion::Plain,
        json!({ "code": code }).to_string(),
    )
    .encode()
}

/// Concatenate packets into one frame
pub fn frame(packets: &[Bytes]) -> Bytes {
    Bytes::from(packets.concat())
}

/// One zlib packet wrapping the given packets
pub fn zlib_batch(packets: &[Bytes]) -> Bytes {
    encode_nested(ProtocolVersion::Zlib, &frame(packets)).unwrap_or_default()
}

/// One brotli packet wrapping the given packets
pub fn brotli_batch(packets: &[Bytes]) -> Bytes {
    encode_nested(ProtocolVersion::Brotli, &frame(packets)).unwrap_or_default()
}
