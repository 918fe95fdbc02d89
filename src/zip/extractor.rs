use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use crate::error::{Error, Result};
use crate::io::{ArchiveLocator, RangeSource};

use super::decompress::{crc32, decompress};
use super::options::{DownloadOptions, FileContents, ProgressObserver};
use super::parser::resolve_entries;
use super::structures::{FileEntry, LocalFileHeader};

/// Entry index of one archive; empty until the first successful resolution.
type IndexCell = Arc<OnceCell<Arc<[FileEntry]>>>;

/// Archive accessor over a [`RangeSource`].
///
/// Entry indexes are cached per [`ArchiveLocator`]. Concurrent first calls
/// for the same archive share one resolution; a failed resolution leaves
/// nothing behind, so the next call starts over.
pub struct RangeZip<S: RangeSource + ?Sized> {
    source: Arc<S>,
    index: Mutex<HashMap<ArchiveLocator, IndexCell>>,
}

impl<S: RangeSource + ?Sized> RangeZip<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            index: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    async fn index_cell(&self, locator: &ArchiveLocator) -> IndexCell {
        let mut index = self.index.lock().await;
        Arc::clone(index.entry(locator.clone()).or_default())
    }

    /// Resolved entries of `locator`, resolving them on first use
    async fn entries(&self, locator: &ArchiveLocator) -> Result<Arc<[FileEntry]>> {
        let cell = self.index_cell(locator).await;
        let result = cell
            .get_or_try_init(|| async {
                let entries = resolve_entries(self.source.as_ref(), locator).await?;
                Ok::<_, Error>(Arc::from(entries))
            })
            .await
            .map(Arc::clone);

        if result.is_err() {
            self.forget_failed(locator, &cell).await;
        }
        result
    }

    /// Drop an unresolved cell once no other caller is waiting on it
    async fn forget_failed(&self, locator: &ArchiveLocator, cell: &IndexCell) {
        let mut index = self.index.lock().await;
        // Held by the map and by `cell`; any other holder will retry the resolution.
        if let Some(current) = index.get(locator)
            && Arc::ptr_eq(current, cell)
            && !current.initialized()
            && Arc::strong_count(current) == 2
        {
            index.remove(locator);
        }
    }

    /// List all entries of the archive in Central Directory order
    pub async fn fetch_file_list(&self, locator: &ArchiveLocator) -> Result<Vec<FileEntry>> {
        Ok(self.entries(locator).await?.to_vec())
    }

    /// Entries already resolved for `locator`, without fetching anything
    pub async fn cached_entries(&self, locator: &ArchiveLocator) -> Option<Arc<[FileEntry]>> {
        let index = self.index.lock().await;
        index.get(locator)?.get().cloned()
    }

    /// Drop the cached index of `locator` so the next call resolves it again
    pub async fn invalidate(&self, locator: &ArchiveLocator) {
        self.index.lock().await.remove(locator);
    }

    /// Download and decode a single entry by exact name
    pub async fn download_file(
        &self,
        locator: &ArchiveLocator,
        file_name: &str,
        options: DownloadOptions<'_>,
    ) -> Result<FileContents> {
        let entries = self.entries(locator).await?;
        let entry = entries
            .iter()
            .find(|e| e.file_name == file_name)
            .ok_or_else(|| Error::EntryNotFound(file_name.to_string()))?;

        let data = self.extract_entry(locator, entry, &options).await?;
        Ok(FileContents::decode(data, options.encoding))
    }

    /// Fetch and decompress the data of `entry`.
    ///
    /// One range request covers the Local File Header and the compressed
    /// data. The header is sized from the stored name length; a local extra
    /// field is neither requested nor skipped.
    pub async fn extract_entry(
        &self,
        locator: &ArchiveLocator,
        entry: &FileEntry,
        options: &DownloadOptions<'_>,
    ) -> Result<Vec<u8>> {
        let start = entry.relative_offset_of_local_header;
        let end = start + entry.local_header_size() + entry.compressed_size - 1;

        debug!(%locator, file_name = %entry.file_name, start, end, "fetching entry");
        let data = self
            .fetch_chunked(locator, start, end, options.on_progress)
            .await?;

        let header = LocalFileHeader::from_bytes(&data)?;
        if header.is_encrypted() {
            return Err(Error::Unsupported("encrypted entries"));
        }

        let data_offset = header.data_offset();
        if data_offset > data.len() {
            return Err(Error::Bounds {
                start: data_offset,
                end: data.len(),
                len: data.len(),
            });
        }
        debug!(
            method = header.compression_method.as_u16(),
            data_offset,
            compressed = data.len() - data_offset,
            "parsed local file header"
        );

        let out = decompress(
            header.compression_method,
            &data[data_offset..],
            entry.uncompressed_size as usize,
        )?;

        if options.verify_checksum && header.crc32 != 0 {
            let actual = crc32(&out);
            if actual != header.crc32 {
                return Err(Error::ChecksumMismatch {
                    expected: header.crc32,
                    actual,
                });
            }
        }

        debug!(file_name = %entry.file_name, size = out.len(), "extracted entry");
        Ok(out)
    }

    /// Stream `start..=end` into one buffer, reporting each chunk
    async fn fetch_chunked(
        &self,
        locator: &ArchiveLocator,
        start: u64,
        end: u64,
        observer: Option<&dyn ProgressObserver>,
    ) -> Result<Vec<u8>> {
        let what = || format!("bytes {start}-{end} of {locator}");

        let mut stream = self
            .source
            .stream_range(locator, start, end)
            .await
            .map_err(|e| Error::transport(what(), e))?;

        let total = stream.content_length();
        let expected = end - start + 1;
        let mut buf = Vec::with_capacity(total.unwrap_or(expected).min(expected) as usize);

        while let Some(chunk) = stream
            .next_chunk()
            .await
            .map_err(|e| Error::transport(what(), e))?
        {
            if chunk.is_empty() {
                continue;
            }
            buf.extend_from_slice(&chunk);
            if let Some(observer) = observer {
                observer.on_progress(buf.len() as u64, total);
            }
        }

        Ok(buf)
    }
}
