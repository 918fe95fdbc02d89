//! Bounds-checked little-endian field access on raw record buffers.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

fn slice(buf: &[u8], start: usize, end: usize) -> Result<&[u8]> {
    if start >= end || end > buf.len() {
        return Err(Error::Bounds {
            start,
            end,
            len: buf.len(),
        });
    }
    Ok(&buf[start..end])
}

/// Read a little-endian `u16` at `offset`.
pub fn read_u16(buf: &[u8], offset: usize) -> Result<u16> {
    Ok(LittleEndian::read_u16(slice(buf, offset, offset + 2)?))
}

/// Read a little-endian `u32` at `offset`.
pub fn read_u32(buf: &[u8], offset: usize) -> Result<u32> {
    Ok(LittleEndian::read_u32(slice(buf, offset, offset + 4)?))
}

/// Decode `buf[start..end]` as UTF-8, replacing invalid sequences.
///
/// The range must be non-empty and lie inside `buf`.
pub fn read_utf8(buf: &[u8], start: usize, end: usize) -> Result<String> {
    Ok(String::from_utf8_lossy(slice(buf, start, end)?).into_owned())
}
