//! ZIP archive parsing and single-entry extraction.
//!
//! ## Architecture
//!
//! - [`fields`]: bounds-checked little-endian field reads
//! - [`structures`]: ZIP records (EOCD, Central Directory entries, Local File Headers)
//! - [`parser`]: record decoding and Central Directory resolution
//! - [`decompress`]: raw DEFLATE and STORED payload decoding
//! - [`extractor`]: the [`RangeZip`] accessor that ties it together
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! Reading the EOCD first and then the Central Directory allows listing
//! files without touching the rest of the archive. Extracting one entry then
//! costs a single range request over its Local File Header and data.
//!
//! ## Limitations
//!
//! - No ZIP64 support
//! - No encryption support
//! - No multi-disk archive support
//! - Only STORED and DEFLATE compression
//! - A Local File Header extra field is not skipped; the data is assumed to
//!   follow the file name directly

pub mod decompress;
mod extractor;
pub mod fields;
mod options;
pub mod parser;
mod structures;

pub use extractor::RangeZip;
pub use options::{DownloadOptions, Encoding, FileContents, ProgressObserver};
pub use structures::*;
