//! Low-level ZIP archive parser.
//!
//! ZIP files are designed to be read from the end:
//! 1. Fetch the End of Central Directory (EOCD) from the object's tail
//! 2. Fetch the Central Directory at the offset and size the EOCD names
//! 3. Walk the Central Directory records to build the entry index
//!
//! Only two range requests are needed in the common case, no matter how
//! large the archive is.

use tracing::debug;

use crate::error::{Error, Record, Result};
use crate::io::{ArchiveLocator, RangeSource};

use super::fields::read_u32;
use super::structures::*;

/// Walk Central Directory records from the start of `buf`.
///
/// Stops at the first record without the Central Directory signature,
/// even if the EOCD announced more entries. The first record must be valid.
pub fn parse_central_directory(buf: &[u8]) -> Result<Vec<FileEntry>> {
    let mut entries = Vec::new();
    let mut offset = 0;

    while offset + 4 <= buf.len() {
        let signature = read_u32(buf, offset)?;
        if signature != CDFH_SIGNATURE {
            if entries.is_empty() {
                return Err(Error::MalformedArchive {
                    record: Record::CentralDirectoryEntry,
                    found: signature,
                });
            }
            break;
        }

        let (entry, record_len) = FileEntry::from_central_directory(buf, offset)?;
        entries.push(entry);
        offset += record_len;
    }

    Ok(entries)
}

/// Search `tail` backwards for an EOCD whose comment runs exactly to the end.
///
/// Returns the offset of the record within `tail`.
pub fn find_eocd(tail: &[u8]) -> Option<usize> {
    let last = tail.len().checked_sub(EndOfCentralDirectory::SIZE)?;
    let signature = EndOfCentralDirectory::SIGNATURE.to_le_bytes();

    (0..=last).rev().find(|&i| {
        if tail[i..i + 4] != signature {
            return false;
        }
        let comment_len = u16::from_le_bytes([tail[i + 20], tail[i + 21]]) as usize;
        comment_len == tail.len() - i - EndOfCentralDirectory::SIZE
    })
}

async fn fetch_tail<S: RangeSource + ?Sized>(
    source: &S,
    locator: &ArchiveLocator,
    count: usize,
) -> Result<bytes::Bytes> {
    source
        .fetch_last_bytes(locator, count as u64)
        .await
        .map_err(|e| Error::transport(format!("last {count} bytes of {locator}"), e))
}

/// Read the End of Central Directory record of the archive.
///
/// The comment-less 22-byte trailer is tried first. If it is not an EOCD,
/// the tail is searched once more with room for the longest comment.
pub async fn read_eocd<S: RangeSource + ?Sized>(
    source: &S,
    locator: &ArchiveLocator,
) -> Result<EndOfCentralDirectory> {
    let tail = fetch_tail(source, locator, EndOfCentralDirectory::SIZE).await?;

    let first_error = match EndOfCentralDirectory::from_bytes(&tail) {
        Ok(eocd) => return Ok(eocd),
        Err(e) => e,
    };

    // Smaller than a bare EOCD: there is nothing further back to search.
    if tail.len() < EndOfCentralDirectory::SIZE {
        return Err(first_error);
    }

    debug!(%locator, "EOCD not at end of archive, searching comment area");
    let search_size = EndOfCentralDirectory::SIZE + EndOfCentralDirectory::MAX_COMMENT_SIZE;
    let tail = fetch_tail(source, locator, search_size).await?;

    match find_eocd(&tail) {
        Some(i) => EndOfCentralDirectory::from_bytes(&tail[i..]),
        None => Err(first_error),
    }
}

/// Resolve the ordered entry index of an archive.
///
/// Fetches the EOCD, then the whole Central Directory in one request.
pub async fn resolve_entries<S: RangeSource + ?Sized>(
    source: &S,
    locator: &ArchiveLocator,
) -> Result<Vec<FileEntry>> {
    let eocd = read_eocd(source, locator).await?;

    if eocd.is_multi_disk() {
        return Err(Error::Unsupported("multi-disk archives"));
    }
    if eocd.is_zip64() {
        return Err(Error::Unsupported("ZIP64 archives"));
    }

    debug!(
        %locator,
        total_entries = eocd.total_entries,
        cd_offset = eocd.cd_offset,
        cd_size = eocd.cd_size,
        "decoded EOCD"
    );

    if eocd.cd_size == 0 {
        return Ok(Vec::new());
    }

    let start = eocd.cd_offset as u64;
    let end = start + eocd.cd_size as u64 - 1;
    let cd_data = source
        .fetch_range(locator, start, end)
        .await
        .map_err(|e| {
            Error::transport(
                format!("central directory (bytes {start}-{end}) of {locator}"),
                e,
            )
        })?;

    let entries = parse_central_directory(&cd_data)?;
    debug!(%locator, entries = entries.len(), "resolved central directory");

    Ok(entries)
}
