//! Byte-range access to remote objects.
//!
//! The core never talks to a network directly. Everything it needs is a
//! [`RangeSource`]: something that can hand back an inclusive byte range of
//! an object, or its trailing bytes, identified by an [`ArchiveLocator`].

mod http;
mod local;

pub use http::{HttpRangeSource, HttpSourceConfig};
pub use local::LocalRangeSource;

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Identifies one remote object, e.g. an S3 bucket and key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveLocator {
    pub bucket: String,
    pub key: String,
}

impl ArchiveLocator {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ArchiveLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Trait for fetching byte ranges of a remote object
#[async_trait]
pub trait RangeSource: Send + Sync {
    /// Fetch bytes `start..=end` of the object.
    async fn fetch_range(&self, locator: &ArchiveLocator, start: u64, end: u64) -> Result<Bytes>;

    /// Fetch the trailing `count` bytes of the object.
    async fn fetch_last_bytes(&self, locator: &ArchiveLocator, count: u64) -> Result<Bytes>;

    /// Fetch bytes `start..=end` as a sequence of chunks.
    ///
    /// Sources that cannot stream serve the whole range as one chunk.
    async fn stream_range(
        &self,
        locator: &ArchiveLocator,
        start: u64,
        end: u64,
    ) -> Result<Box<dyn ChunkStream>> {
        let data = self.fetch_range(locator, start, end).await?;
        Ok(Box::new(SingleChunk::new(data)))
    }
}

/// A range response delivered piece by piece, in arrival order.
#[async_trait]
pub trait ChunkStream: Send {
    /// Total length the source declared for this response, if any.
    fn content_length(&self) -> Option<u64>;

    /// Next chunk, or `None` once the response is exhausted.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;
}

/// A [`ChunkStream`] over an already fetched buffer.
pub struct SingleChunk {
    data: Option<Bytes>,
    len: u64,
}

impl SingleChunk {
    pub fn new(data: Bytes) -> Self {
        let len = data.len() as u64;
        Self {
            data: Some(data),
            len,
        }
    }
}

#[async_trait]
impl ChunkStream for SingleChunk {
    fn content_length(&self) -> Option<u64> {
        Some(self.len)
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        Ok(self.data.take().filter(|d| !d.is_empty()))
    }
}
