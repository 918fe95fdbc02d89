use crate::error::{Error, Record, Result};

use super::fields::{read_u16, read_u32, read_utf8};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unsupported(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unsupported(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unsupported(v) => *v,
        }
    }
}

/// Check the 4-byte signature at `offset` before trusting the rest of a record.
fn expect_signature(buf: &[u8], offset: usize, expected: u32, record: Record) -> Result<()> {
    let found = read_u32(buf, offset)?;
    if found != expected {
        return Err(Error::MalformedArchive { record, found });
    }
    Ok(())
}

/// End of Central Directory (EOCD) - 22 bytes plus comment
#[derive(Debug, Clone)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
    pub comment: Vec<u8>,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: u32 = 0x06054b50;
    pub const SIZE: usize = 22;
    pub const MAX_COMMENT_SIZE: usize = 65535;

    /// Parse an EOCD starting at the first byte of `data`.
    ///
    /// Comment bytes are kept as far as `data` reaches.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        expect_signature(data, 0, Self::SIGNATURE, Record::EndOfCentralDirectory)?;

        let comment_len = read_u16(data, 20)?;
        let comment = data[Self::SIZE..]
            .iter()
            .take(comment_len as usize)
            .copied()
            .collect();

        Ok(Self {
            disk_number: read_u16(data, 4)?,
            disk_with_cd: read_u16(data, 6)?,
            disk_entries: read_u16(data, 8)?,
            total_entries: read_u16(data, 10)?,
            cd_size: read_u32(data, 12)?,
            cd_offset: read_u32(data, 16)?,
            comment_len,
            comment,
        })
    }

    pub fn is_zip64(&self) -> bool {
        self.disk_entries == 0xFFFF
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFFFFFF
            || self.cd_offset == 0xFFFFFFFF
    }

    pub fn is_multi_disk(&self) -> bool {
        self.disk_number != 0 || self.disk_with_cd != 0
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: u32 = 0x02014b50;
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: u32 = 0x04034b50;
pub const LFH_SIZE: usize = 30;

/// One archive entry as listed in the Central Directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub file_name: String,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    /// Absolute offset of the entry's Local File Header
    pub relative_offset_of_local_header: u64,
    pub compression_method: CompressionMethod,
    pub crc32: u32,
    /// Name length as stored; `file_name` may be longer after lossy decoding
    pub(crate) file_name_length: u16,
}

impl FileEntry {
    /// Parse the Central Directory record at `offset`.
    ///
    /// Returns the entry and the record's total length, including the
    /// extra field and comment that are skipped.
    pub fn from_central_directory(buf: &[u8], offset: usize) -> Result<(Self, usize)> {
        expect_signature(buf, offset, CDFH_SIGNATURE, Record::CentralDirectoryEntry)?;

        let compression_method = read_u16(buf, offset + 10)?;
        let crc32 = read_u32(buf, offset + 16)?;
        let compressed_size = read_u32(buf, offset + 20)?;
        let uncompressed_size = read_u32(buf, offset + 24)?;
        let file_name_length = read_u16(buf, offset + 28)?;
        let extra_field_length = read_u16(buf, offset + 30)? as usize;
        let file_comment_length = read_u16(buf, offset + 32)? as usize;
        let lfh_offset = read_u32(buf, offset + 42)?;

        let name_start = offset + CDFH_MIN_SIZE;
        let file_name = read_utf8(buf, name_start, name_start + file_name_length as usize)?;

        let entry = FileEntry {
            file_name,
            compressed_size: compressed_size as u64,
            uncompressed_size: uncompressed_size as u64,
            relative_offset_of_local_header: lfh_offset as u64,
            compression_method: CompressionMethod::from_u16(compression_method),
            crc32,
            file_name_length,
        };
        let record_len =
            CDFH_MIN_SIZE + file_name_length as usize + extra_field_length + file_comment_length;

        Ok((entry, record_len))
    }

    /// Local File Header size up to the entry data, extra field excluded
    pub fn local_header_size(&self) -> u64 {
        (LFH_SIZE + self.file_name_length as usize) as u64
    }

    /// Directory entries end with '/'
    pub fn is_directory(&self) -> bool {
        self.file_name.ends_with('/')
    }
}

/// Local File Header preceding each entry's data
#[derive(Debug, Clone)]
pub struct LocalFileHeader {
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
    pub file_name: String,
}

impl LocalFileHeader {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        expect_signature(data, 0, LFH_SIGNATURE, Record::LocalFileHeader)?;

        let file_name_length = read_u16(data, 26)?;
        let file_name = read_utf8(data, LFH_SIZE, LFH_SIZE + file_name_length as usize)?;

        Ok(Self {
            flags: read_u16(data, 6)?,
            compression_method: CompressionMethod::from_u16(read_u16(data, 8)?),
            crc32: read_u32(data, 14)?,
            compressed_size: read_u32(data, 18)?,
            uncompressed_size: read_u32(data, 22)?,
            file_name_length,
            extra_field_length: read_u16(data, 28)?,
            file_name,
        })
    }

    /// Offset of the entry data from the start of the header.
    ///
    /// Only the file name is accounted for; a local extra field is not
    /// skipped.
    pub fn data_offset(&self) -> usize {
        LFH_SIZE + self.file_name_length as usize
    }

    pub fn is_encrypted(&self) -> bool {
        self.flags & 0x0001 != 0
    }
}
