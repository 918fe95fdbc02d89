use std::io::Read;

use flate2::Crc;
use flate2::read::DeflateDecoder;

use crate::error::{Error, Result};

use super::structures::CompressionMethod;

/// Upper bound on the up-front allocation taken from an untrusted size hint.
const MAX_PREALLOC: usize = 16 << 20;

/// Inflate raw DEFLATE data (no zlib or gzip wrapper).
///
/// `size_hint` only sizes the initial buffer and is capped at 16 MiB; larger
/// outputs grow as they are inflated.
pub fn inflate_raw(data: &[u8], size_hint: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(size_hint.min(MAX_PREALLOC));
    DeflateDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(Error::Decompress)?;
    Ok(out)
}

/// Decode an entry payload according to its compression method.
pub fn decompress(method: CompressionMethod, payload: &[u8], size_hint: usize) -> Result<Vec<u8>> {
    match method {
        CompressionMethod::Stored => Ok(payload.to_vec()),
        CompressionMethod::Deflate => inflate_raw(payload, size_hint),
        CompressionMethod::Unsupported(code) => Err(Error::UnsupportedCompression(code)),
    }
}

/// CRC-32 of `data` as stored in ZIP headers.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(data);
    crc.sum()
}
