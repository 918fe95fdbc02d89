//! Error types returned by archive resolution and extraction.

use std::fmt;

use thiserror::Error;

/// The ZIP record whose signature check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Record {
    EndOfCentralDirectory,
    CentralDirectoryEntry,
    LocalFileHeader,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::EndOfCentralDirectory => f.write_str("End of Central Directory"),
            Record::CentralDirectoryEntry => f.write_str("Central Directory File Header"),
            Record::LocalFileHeader => f.write_str("Local File Header"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// A range fetch failed, returned a non-success status, or the object is missing.
    #[error("failed to fetch {what}: {source}")]
    Transport {
        what: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("invalid {record} signature: {found:#010x}")]
    MalformedArchive { record: Record, found: u32 },

    #[error("file {0} not found in zip")]
    EntryNotFound(String),

    #[error("unsupported compression method: {0}")]
    UnsupportedCompression(u16),

    #[error("invalid byte range {start}..{end} for buffer of {len} bytes")]
    Bounds { start: usize, end: usize, len: usize },

    #[error("failed to inflate entry data: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("CRC-32 mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Archive features this crate deliberately does not handle.
    #[error("unsupported archive: {0}")]
    Unsupported(&'static str),
}

impl Error {
    pub(crate) fn transport(what: impl Into<String>, source: anyhow::Error) -> Self {
        Error::Transport {
            what: what.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
