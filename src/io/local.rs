use super::{ArchiveLocator, ChunkStream, RangeSource};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

/// Default chunk size used when streaming a range
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Range source over a local directory laid out as `root/bucket/key`
pub struct LocalRangeSource {
    root: PathBuf,
    chunk_size: usize,
}

impl LocalRangeSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Stream ranges in chunks of `chunk_size` bytes
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn path(&self, locator: &ArchiveLocator) -> PathBuf {
        self.root.join(&locator.bucket).join(&locator.key)
    }

    /// Open the object and position it at `start`, checking `start..=end` fits
    async fn open_at(&self, locator: &ArchiveLocator, start: u64, end: u64) -> Result<File> {
        if start > end {
            bail!("Invalid byte range {start}-{end}");
        }

        let path = self.path(locator);
        let mut file = open(&path).await?;
        let size = file.metadata().await?.len();
        if end >= size {
            bail!(
                "Range {start}-{end} not satisfiable for {} ({size} bytes)",
                path.display()
            );
        }

        file.seek(SeekFrom::Start(start)).await?;
        Ok(file)
    }
}

async fn open(path: &Path) -> Result<File> {
    File::open(path)
        .await
        .with_context(|| format!("No such object: {}", path.display()))
}

#[async_trait]
impl RangeSource for LocalRangeSource {
    async fn fetch_range(&self, locator: &ArchiveLocator, start: u64, end: u64) -> Result<Bytes> {
        debug!(%locator, start, end, "reading local range");
        let mut file = self.open_at(locator, start, end).await?;

        let mut buf = vec![0u8; (end - start + 1) as usize];
        file.read_exact(&mut buf).await?;

        Ok(Bytes::from(buf))
    }

    async fn fetch_last_bytes(&self, locator: &ArchiveLocator, count: u64) -> Result<Bytes> {
        let mut file = open(&self.path(locator)).await?;
        let size = file.metadata().await?.len();

        // Like an HTTP suffix range, an oversized request returns the whole object.
        let count = count.min(size);
        debug!(%locator, count, "reading local tail");
        file.seek(SeekFrom::Start(size - count)).await?;

        let mut buf = vec![0u8; count as usize];
        file.read_exact(&mut buf).await?;

        Ok(Bytes::from(buf))
    }

    async fn stream_range(
        &self,
        locator: &ArchiveLocator,
        start: u64,
        end: u64,
    ) -> Result<Box<dyn ChunkStream>> {
        let file = self.open_at(locator, start, end).await?;

        Ok(Box::new(LocalChunks {
            file,
            remaining: end - start + 1,
            total: end - start + 1,
            chunk_size: self.chunk_size,
        }))
    }
}

struct LocalChunks {
    file: File,
    remaining: u64,
    total: u64,
    chunk_size: usize,
}

#[async_trait]
impl ChunkStream for LocalChunks {
    fn content_length(&self) -> Option<u64> {
        Some(self.total)
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if self.remaining == 0 {
            return Ok(None);
        }

        let len = self.remaining.min(self.chunk_size as u64) as usize;
        let mut buf = vec![0u8; len];
        self.file.read_exact(&mut buf).await?;
        self.remaining -= len as u64;

        Ok(Some(Bytes::from(buf)))
    }
}
