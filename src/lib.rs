//! # rangezip
//!
//! Extract single entries from ZIP archives stored in remote, range-readable
//! object stores without downloading the whole archive.
//!
//! Listing an archive costs two range requests: one for the End of Central
//! Directory record at the tail, one for the Central Directory it points
//! to. Extracting an entry costs one more request, covering exactly that
//! entry's Local File Header and compressed data, which is inflated on the
//! fly.
//!
//! ## Features
//!
//! - Pluggable transport through the [`RangeSource`] trait
//! - HTTP/S3 Range requests via [`HttpRangeSource`], local files via [`LocalRangeSource`]
//! - STORED and DEFLATE entries
//! - Chunked transfers with per-chunk progress reporting
//! - Per-archive entry index cache with single-flight resolution
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use rangezip::{ArchiveLocator, DownloadOptions, HttpRangeSource, HttpSourceConfig, RangeZip};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let source = Arc::new(HttpRangeSource::new(HttpSourceConfig::from_env())?);
//!     let zip = RangeZip::new(source);
//!     let locator = ArchiveLocator::new("example-bucket", "test.zip");
//!
//!     for entry in zip.fetch_file_list(&locator).await? {
//!         println!("{} ({} bytes)", entry.file_name, entry.uncompressed_size);
//!     }
//!
//!     let progress = |received: u64, total: Option<u64>| {
//!         eprintln!("{received}/{}", total.unwrap_or(0));
//!     };
//!     let text = zip
//!         .download_file(
//!             &locator,
//!             "packages/circuits/src/semaphore.circom",
//!             DownloadOptions::new().utf8().on_progress(&progress),
//!         )
//!         .await?;
//!     println!("{}", text.as_text().unwrap_or_default());
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod io;
pub mod zip;

pub use error::{Error, Record, Result};
pub use io::{
    ArchiveLocator, ChunkStream, HttpRangeSource, HttpSourceConfig, LocalRangeSource, RangeSource,
    SingleChunk,
};
pub use zip::{DownloadOptions, Encoding, FileContents, FileEntry, ProgressObserver, RangeZip};
