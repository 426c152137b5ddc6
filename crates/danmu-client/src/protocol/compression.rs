//! Nested frame compression
//!
//! Versions 2 and 3 wrap a whole frame of further packets in zlib or brotli.

use super::error::{ProtocolError, ProtocolResult};
use super::opcodes::ProtocolVersion;
use std::io::{Read, Write};

const BROTLI_BUFFER_SIZE: usize = 4096;
const BROTLI_QUALITY: u32 = 5;
const BROTLI_WINDOW: u32 = 22;

/// Inflate a compressed body. Uncompressed versions are returned as-is.
pub fn decompress(version: ProtocolVersion, body: &[u8]) -> ProtocolResult<Vec<u8>> {
    let mut out = Vec::with_capacity(body.len() * 4);
    let result = match version {
        ProtocolVersion::Zlib => flate2::read::ZlibDecoder::new(body).read_to_end(&mut out),
        ProtocolVersion::Brotli => {
            brotli::Decompressor::new(body, BROTLI_BUFFER_SIZE).read_to_end(&mut out)
        }
        ProtocolVersion::Json | ProtocolVersion::Plain => return Ok(body.to_vec()),
    };

    result.map_err(|source| ProtocolError::Compression {
        algorithm: algorithm(version),
        source,
    })?;
    Ok(out)
}

/// Compress a frame for a nested packet of the given version
pub fn compress(version: ProtocolVersion, frame: &[u8]) -> ProtocolResult<Vec<u8>> {
    let wrap = |source: std::io::Error| ProtocolError::Compression {
        algorithm: algorithm(version),
        source,
    };

    match version {
        ProtocolVersion::Zlib => {
            let mut encoder =
                flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(frame).map_err(wrap)?;
            encoder.finish().map_err(wrap)
        }
        ProtocolVersion::Brotli => {
            let mut writer = brotli::CompressorWriter::new(
                Vec::new(),
                BROTLI_BUFFER_SIZE,
                BROTLI_QUALITY,
                BROTLI_WINDOW,
            );
            writer.write_all(frame).map_err(wrap)?;
            writer.flush().map_err(wrap)?;
            Ok(writer.into_inner())
        }
        ProtocolVersion::Json | ProtocolVersion::Plain => Ok(frame.to_vec()),
    }
}

fn algorithm(version: ProtocolVersion) -> &'static str {
    match version {
        ProtocolVersion::Zlib => "zlib",
        ProtocolVersion::Brotli => "brotli",
        ProtocolVersion::Json | ProtocolVersion::Plain => "plain",
    }
}
