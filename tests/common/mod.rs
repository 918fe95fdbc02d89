#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, bail};
use async_trait::async_trait;
use bytes::Bytes;
use flate2::Compression;
use flate2::write::DeflateEncoder;
use rangezip::{ArchiveLocator, ChunkStream, RangeSource};

pub const SEMAPHORE_PATH: &str = "packages/circuits/src/semaphore.circom";

pub fn init_logger() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = flate2::Crc::new();
    crc.update(data);
    crc.sum()
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Writes ZIP archives byte by byte so every header field is under test control.
#[derive(Default)]
pub struct ZipBuilder {
    body: Vec<u8>,
    central: Vec<u8>,
    count: u16,
    comment: Vec<u8>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(self, name: &str, contents: &[u8]) -> Self {
        let crc = crc32(contents);
        self.raw(name, 0, contents, contents.len(), crc, &[])
    }

    pub fn deflated(self, name: &str, contents: &[u8]) -> Self {
        let crc = crc32(contents);
        self.raw(name, 8, &deflate(contents), contents.len(), crc, &[])
    }

    pub fn directory(self, name: &str) -> Self {
        self.raw(name, 0, &[], 0, 0, &[])
    }

    /// Add an entry with full control over method, CRC and local extra field.
    pub fn raw(
        mut self,
        name: impl AsRef<[u8]>,
        method: u16,
        payload: &[u8],
        uncompressed_size: usize,
        crc: u32,
        local_extra: &[u8],
    ) -> Self {
        let name = name.as_ref();
        let offset = self.body.len() as u32;

        let mut header = Vec::new();
        header.extend_from_slice(&0x04034b50u32.to_le_bytes());
        header.extend_from_slice(&20u16.to_le_bytes());
        header.extend_from_slice(&0u16.to_le_bytes());
        header.extend_from_slice(&method.to_le_bytes());
        header.extend_from_slice(&0x5a2c_6b21u32.to_le_bytes()); // time + date
        header.extend_from_slice(&crc.to_le_bytes());
        header.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        header.extend_from_slice(&(uncompressed_size as u32).to_le_bytes());
        header.extend_from_slice(&(name.len() as u16).to_le_bytes());
        header.extend_from_slice(&(local_extra.len() as u16).to_le_bytes());
        header.extend_from_slice(name);
        header.extend_from_slice(local_extra);
        self.body.extend(header);
        self.body.extend_from_slice(payload);

        let cd = &mut self.central;
        cd.extend_from_slice(&0x02014b50u32.to_le_bytes());
        cd.extend_from_slice(&0x031eu16.to_le_bytes());
        cd.extend_from_slice(&20u16.to_le_bytes());
        cd.extend_from_slice(&0u16.to_le_bytes());
        cd.extend_from_slice(&method.to_le_bytes());
        cd.extend_from_slice(&0x5a2c_6b21u32.to_le_bytes());
        cd.extend_from_slice(&crc.to_le_bytes());
        cd.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        cd.extend_from_slice(&(uncompressed_size as u32).to_le_bytes());
        cd.extend_from_slice(&(name.len() as u16).to_le_bytes());
        cd.extend_from_slice(&4u16.to_le_bytes()); // extra field
        cd.extend_from_slice(&0u16.to_le_bytes()); // comment
        cd.extend_from_slice(&0u16.to_le_bytes()); // disk start
        cd.extend_from_slice(&0u16.to_le_bytes()); // internal attributes
        cd.extend_from_slice(&0u32.to_le_bytes()); // external attributes
        cd.extend_from_slice(&offset.to_le_bytes());
        cd.extend_from_slice(name);
        cd.extend_from_slice(&[0xca, 0xfe, 0x00, 0x00]);

        self.count += 1;
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    pub fn finish(self) -> Vec<u8> {
        let cd_offset = self.body.len() as u32;
        let mut out = self.body;
        out.extend_from_slice(&self.central);

        out.extend_from_slice(&0x06054b50u32.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&self.count.to_le_bytes());
        out.extend_from_slice(&self.count.to_le_bytes());
        out.extend_from_slice(&(self.central.len() as u32).to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&(self.comment.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.comment);
        out
    }
}

pub fn semaphore_circom() -> String {
    let mut text = String::from("pragma circom 2.1.5;\n\ninclude \"babyjub.circom\";\ninclude \"poseidon.circom\";\ninclude \"binary-merkle-root.circom\";\n\n");
    text.push_str("template Semaphore(MAX_DEPTH) {\n");
    for i in 0..64 {
        text.push_str(&format!(
            "    signal input merkleProofSiblings{i}; // sibling at depth {i}\n"
        ));
    }
    text.push_str("    signal output nullifier;\n}\n\ncomponent main {public [message, scope]} = Semaphore(10);\n");
    text
}

/// The eight-entry archive the extraction tests run against.
pub fn semaphore_zip() -> Vec<u8> {
    ZipBuilder::new()
        .directory("packages/")
        .directory("packages/circuits/")
        .deflated(
            "packages/circuits/package.json",
            br#"{ "name": "@semaphore-protocol/circuits", "version": "4.0.0" }"#,
        )
        .directory("packages/circuits/src/")
        .deflated(SEMAPHORE_PATH, semaphore_circom().as_bytes())
        .deflated(
            "packages/circuits/src/tree.circom",
            "pragma circom 2.1.5;\n\ntemplate Tree() {}\n".repeat(20).as_bytes(),
        )
        .stored("README.md", b"# Semaphore circuits\n")
        .deflated("LICENSE", "MIT License\n".repeat(50).as_bytes())
        .finish()
}

/// In-memory object store that serves range bodies in a fixed number of chunks.
pub struct MemorySource {
    objects: HashMap<ArchiveLocator, Bytes>,
    chunk_count: usize,
    /// Streams fail after this many chunks; `Some(0)` fails the request itself
    fail_after: Option<usize>,
    pub tail_requests: AtomicUsize,
    pub range_requests: AtomicUsize,
    pub stream_requests: AtomicUsize,
    pub chunks_delivered: AtomicUsize,
    pub bytes_delivered: AtomicUsize,
}

impl MemorySource {
    pub fn new(chunk_count: usize) -> Self {
        Self {
            objects: HashMap::new(),
            chunk_count: chunk_count.max(1),
            fail_after: None,
            tail_requests: AtomicUsize::new(0),
            range_requests: AtomicUsize::new(0),
            stream_requests: AtomicUsize::new(0),
            chunks_delivered: AtomicUsize::new(0),
            bytes_delivered: AtomicUsize::new(0),
        }
    }

    pub fn with_object(mut self, locator: &ArchiveLocator, data: Vec<u8>) -> Self {
        self.objects.insert(locator.clone(), Bytes::from(data));
        self
    }

    pub fn failing_after(mut self, chunks: usize) -> Self {
        self.fail_after = Some(chunks);
        self
    }

    fn object(&self, locator: &ArchiveLocator) -> Result<&Bytes> {
        match self.objects.get(locator) {
            Some(data) => Ok(data),
            None => bail!("NoSuchKey: The specified key does not exist."),
        }
    }

    fn slice(&self, locator: &ArchiveLocator, start: u64, end: u64) -> Result<Bytes> {
        let data = self.object(locator)?;
        if start > end || end >= data.len() as u64 {
            bail!("416 Range Not Satisfiable: bytes {start}-{end}/{}", data.len());
        }
        Ok(data.slice(start as usize..=end as usize))
    }

    pub fn total_requests(&self) -> usize {
        self.tail_requests.load(Ordering::SeqCst)
            + self.range_requests.load(Ordering::SeqCst)
            + self.stream_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RangeSource for MemorySource {
    async fn fetch_range(&self, locator: &ArchiveLocator, start: u64, end: u64) -> Result<Bytes> {
        self.range_requests.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.slice(locator, start, end)
    }

    async fn fetch_last_bytes(&self, locator: &ArchiveLocator, count: u64) -> Result<Bytes> {
        self.tail_requests.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let data = self.object(locator)?;
        let count = (count as usize).min(data.len());
        Ok(data.slice(data.len() - count..))
    }

    async fn stream_range(
        &self,
        locator: &ArchiveLocator,
        start: u64,
        end: u64,
    ) -> Result<Box<dyn ChunkStream>> {
        self.stream_requests.fetch_add(1, Ordering::SeqCst);
        if self.fail_after == Some(0) {
            bail!("503 Service Unavailable: SlowDown");
        }
        let data = self.slice(locator, start, end)?;

        let chunk_size = data.len().div_ceil(self.chunk_count).max(1);
        let chunks = (0..data.len())
            .step_by(chunk_size)
            .map(|i| data.slice(i..(i + chunk_size).min(data.len())))
            .collect::<Vec<_>>();

        self.chunks_delivered.fetch_add(chunks.len(), Ordering::SeqCst);
        self.bytes_delivered.fetch_add(data.len(), Ordering::SeqCst);

        Ok(Box::new(MemoryChunks {
            total: data.len() as u64,
            chunks: chunks.into_iter(),
            remaining: self.fail_after,
        }))
    }
}

struct MemoryChunks {
    total: u64,
    chunks: std::vec::IntoIter<Bytes>,
    remaining: Option<usize>,
}

#[async_trait]
impl ChunkStream for MemoryChunks {
    fn content_length(&self) -> Option<u64> {
        Some(self.total)
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        tokio::task::yield_now().await;
        match &mut self.remaining {
            Some(0) => bail!("connection reset by peer"),
            Some(n) => *n -= 1,
            None => {}
        }
        Ok(self.chunks.next())
    }
}
