//! Per-download options and results.

/// Observer notified after each chunk of an entry's range arrives.
pub trait ProgressObserver: Send + Sync {
    /// `received` is cumulative; `total` is the length the source declared.
    fn on_progress(&self, received: u64, total: Option<u64>);
}

impl<F> ProgressObserver for F
where
    F: Fn(u64, Option<u64>) + Send + Sync,
{
    fn on_progress(&self, received: u64, total: Option<u64>) {
        self(received, total)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    /// Return the decompressed bytes unchanged
    #[default]
    Raw,
    /// Decode the decompressed bytes as UTF-8 text
    Utf8,
}

/// Options for [`RangeZip::download_file`](super::RangeZip::download_file)
#[derive(Clone, Copy, Default)]
pub struct DownloadOptions<'a> {
    pub encoding: Encoding,
    pub on_progress: Option<&'a dyn ProgressObserver>,
    /// Compare the data against the Local File Header CRC-32
    pub verify_checksum: bool,
}

impl<'a> DownloadOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn utf8(mut self) -> Self {
        self.encoding = Encoding::Utf8;
        self
    }

    pub fn on_progress(mut self, observer: &'a dyn ProgressObserver) -> Self {
        self.on_progress = Some(observer);
        self
    }

    pub fn verify_checksum(mut self, verify: bool) -> Self {
        self.verify_checksum = verify;
        self
    }
}

impl std::fmt::Debug for DownloadOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadOptions")
            .field("encoding", &self.encoding)
            .field("on_progress", &self.on_progress.is_some())
            .field("verify_checksum", &self.verify_checksum)
            .finish()
    }
}

/// Contents of an extracted entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContents {
    Bytes(Vec<u8>),
    Text(String),
}

impl FileContents {
    /// Decode `data` per `encoding`; invalid UTF-8 becomes U+FFFD.
    pub fn decode(data: Vec<u8>, encoding: Encoding) -> Self {
        match encoding {
            Encoding::Raw => FileContents::Bytes(data),
            Encoding::Utf8 => FileContents::Text(match String::from_utf8(data) {
                Ok(text) => text,
                Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
            }),
        }
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        match self {
            FileContents::Bytes(b) => b.len(),
            FileContents::Text(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            FileContents::Bytes(b) => b,
            FileContents::Text(t) => t.as_bytes(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FileContents::Text(t) => Some(t),
            FileContents::Bytes(_) => None,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            FileContents::Bytes(b) => b,
            FileContents::Text(t) => t.into_bytes(),
        }
    }
}
