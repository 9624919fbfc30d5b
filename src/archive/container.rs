//! Uncompressed ZIP container encoder and decoder.
//!
//! Layout: `[local header + bytes]*`, then one central directory record per
//! entry, then the end-of-central-directory record. Every integer is
//! little-endian, every entry is stored (method 0) so compressed and
//! uncompressed sizes are equal, and header timestamps are pinned to the DOS
//! epoch so identical input yields identical bytes.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use serde::Serialize;
use std::collections::HashSet;
use std::io::Write;
use tracing::{debug, trace};

use super::crc::crc32;
use super::ArchiveError;

const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4B50;
const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4B50;
const END_OF_DIRECTORY_SIGNATURE: u32 = 0x0605_4B50;

const LOCAL_HEADER_LEN: usize = 30;
const CENTRAL_HEADER_LEN: usize = 46;
const END_OF_DIRECTORY_LEN: usize = 22;

/// Version 2.0: the minimum for stored entries inside directories.
const VERSION: u16 = 20;
const METHOD_STORED: u16 = 0;
const FLAG_ENCRYPTED: u16 = 1 << 0;
const FLAG_UTF8_NAME: u16 = 1 << 11;

/// 1980-01-01 00:00:00 in MS-DOS date/time encoding.
const DOS_TIME: u16 = 0;
const DOS_DATE: u16 = (1 << 5) | 1;

const MAX_COMMENT_LEN: usize = u16::MAX as usize;

/// Directory information about one stored entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryInfo {
    pub name: String,
    pub size: u32,
    pub crc32: u32,
    pub header_offset: u32,
}

/// Builds a container in memory, entry by entry.
#[derive(Debug, Default)]
pub struct ArchiveWriter {
    buffer: Vec<u8>,
    entries: Vec<EntryInfo>,
    names: HashSet<String>,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[EntryInfo] {
        &self.entries
    }

    pub fn add_entry(&mut self, name: &str, data: &[u8]) -> Result<(), ArchiveError> {
        if name.is_empty() {
            return Err(ArchiveError::InvalidName(name.to_string()));
        }
        if self.names.contains(name) {
            return Err(ArchiveError::DuplicateEntry(name.to_string()));
        }
        let name_len = u16::try_from(name.len())
            .map_err(|_| ArchiveError::InvalidName(name.to_string()))?;
        let size = u32::try_from(data.len()).map_err(|_| ArchiveError::EntryTooLarge {
            name: name.to_string(),
            size: data.len() as u64,
        })?;
        let header_offset =
            u32::try_from(self.buffer.len()).map_err(|_| ArchiveError::ArchiveTooLarge)?;
        let checksum = crc32(data);
        self.names.insert(name.to_string());

        let w = &mut self.buffer;
        w.write_u32::<LittleEndian>(LOCAL_HEADER_SIGNATURE)?;
        w.write_u16::<LittleEndian>(VERSION)?;
        w.write_u16::<LittleEndian>(name_flags(name))?;
        w.write_u16::<LittleEndian>(METHOD_STORED)?;
        w.write_u16::<LittleEndian>(DOS_TIME)?;
        w.write_u16::<LittleEndian>(DOS_DATE)?;
        w.write_u32::<LittleEndian>(checksum)?;
        w.write_u32::<LittleEndian>(size)?;
        w.write_u32::<LittleEndian>(size)?;
        w.write_u16::<LittleEndian>(name_len)?;
        w.write_u16::<LittleEndian>(0)?;
        w.write_all(name.as_bytes())?;
        w.write_all(data)?;

        trace!(entry = name, size, crc32 = checksum, "stored archive entry");
        self.entries.push(EntryInfo {
            name: name.to_string(),
            size,
            crc32: checksum,
            header_offset,
        });
        Ok(())
    }

    /// Append the central directory and end record, returning the finished bytes.
    pub fn finish(self) -> Result<Vec<u8>, ArchiveError> {
        let ArchiveWriter {
            mut buffer,
            entries,
            ..
        } = self;
        let count = u16::try_from(entries.len()).map_err(|_| ArchiveError::TooManyEntries)?;
        let directory_offset =
            u32::try_from(buffer.len()).map_err(|_| ArchiveError::ArchiveTooLarge)?;

        for entry in &entries {
            let w = &mut buffer;
            w.write_u32::<LittleEndian>(CENTRAL_HEADER_SIGNATURE)?;
            w.write_u16::<LittleEndian>(VERSION)?;
            w.write_u16::<LittleEndian>(VERSION)?;
            w.write_u16::<LittleEndian>(name_flags(&entry.name))?;
            w.write_u16::<LittleEndian>(METHOD_STORED)?;
            w.write_u16::<LittleEndian>(DOS_TIME)?;
            w.write_u16::<LittleEndian>(DOS_DATE)?;
            w.write_u32::<LittleEndian>(entry.crc32)?;
            w.write_u32::<LittleEndian>(entry.size)?;
            w.write_u32::<LittleEndian>(entry.size)?;
            w.write_u16::<LittleEndian>(entry.name.len() as u16)?;
            w.write_u16::<LittleEndian>(0)?; // extra
            w.write_u16::<LittleEndian>(0)?; // comment
            w.write_u16::<LittleEndian>(0)?; // disk
            w.write_u16::<LittleEndian>(0)?; // internal attributes
            w.write_u32::<LittleEndian>(0)?; // external attributes
            w.write_u32::<LittleEndian>(entry.header_offset)?;
            w.write_all(entry.name.as_bytes())?;
        }

        let directory_size = u32::try_from(buffer.len() - directory_offset as usize)
            .map_err(|_| ArchiveError::ArchiveTooLarge)?;

        buffer.write_u32::<LittleEndian>(END_OF_DIRECTORY_SIGNATURE)?;
        buffer.write_u16::<LittleEndian>(0)?;
        buffer.write_u16::<LittleEndian>(0)?;
        buffer.write_u16::<LittleEndian>(count)?;
        buffer.write_u16::<LittleEndian>(count)?;
        buffer.write_u32::<LittleEndian>(directory_size)?;
        buffer.write_u32::<LittleEndian>(directory_offset)?;
        buffer.write_u16::<LittleEndian>(0)?;

        debug!(
            entries = count,
            bytes = buffer.len(),
            "archive container finished"
        );
        Ok(buffer)
    }
}

fn name_flags(name: &str) -> u16 {
    if name.is_ascii() {
        0
    } else {
        FLAG_UTF8_NAME
    }
}

/// Read-only view over a container held in memory.
#[derive(Debug)]
pub struct ArchiveReader<'a> {
    bytes: &'a [u8],
    entries: Vec<EntryInfo>,
}

impl<'a> ArchiveReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self, ArchiveError> {
        let end = find_end_of_directory(bytes)?;
        let record = slice(bytes, end, END_OF_DIRECTORY_LEN, "end of central directory")?;
        let disk = LittleEndian::read_u16(&record[4..6]);
        let directory_disk = LittleEndian::read_u16(&record[6..8]);
        if disk != 0 || directory_disk != 0 {
            return Err(ArchiveError::Unsupported("multi-disk archives".into()));
        }
        let count = LittleEndian::read_u16(&record[10..12]) as usize;
        let directory_size = LittleEndian::read_u32(&record[12..16]) as usize;
        let directory_offset = LittleEndian::read_u32(&record[16..20]) as usize;
        let directory = slice(bytes, directory_offset, directory_size, "central directory")?;

        let mut entries = Vec::with_capacity(count);
        let mut cursor = 0usize;
        for _ in 0..count {
            let header = slice(directory, cursor, CENTRAL_HEADER_LEN, "central directory record")?;
            if LittleEndian::read_u32(&header[0..4]) != CENTRAL_HEADER_SIGNATURE {
                return Err(ArchiveError::BadSignature {
                    offset: directory_offset + cursor,
                    record: "central directory record",
                });
            }
            let flags = LittleEndian::read_u16(&header[8..10]);
            let method = LittleEndian::read_u16(&header[10..12]);
            let checksum = LittleEndian::read_u32(&header[16..20]);
            let compressed = LittleEndian::read_u32(&header[20..24]);
            let size = LittleEndian::read_u32(&header[24..28]);
            let name_len = LittleEndian::read_u16(&header[28..30]) as usize;
            let extra_len = LittleEndian::read_u16(&header[30..32]) as usize;
            let comment_len = LittleEndian::read_u16(&header[32..34]) as usize;
            let header_offset = LittleEndian::read_u32(&header[42..46]);

            let raw_name = slice(
                directory,
                cursor + CENTRAL_HEADER_LEN,
                name_len,
                "central directory entry name",
            )?;
            let name = String::from_utf8(raw_name.to_vec()).map_err(|_| {
                ArchiveError::InvalidName(String::from_utf8_lossy(raw_name).into_owned())
            })?;

            if flags & FLAG_ENCRYPTED != 0 {
                return Err(ArchiveError::Unsupported(format!("encrypted entry {name}")));
            }
            if method != METHOD_STORED || compressed != size {
                return Err(ArchiveError::UnsupportedCompression { name, method });
            }

            entries.push(EntryInfo {
                name,
                size,
                crc32: checksum,
                header_offset,
            });
            cursor += CENTRAL_HEADER_LEN + name_len + extra_len + comment_len;
        }

        Ok(Self { bytes, entries })
    }

    pub fn entries(&self) -> &[EntryInfo] {
        &self.entries
    }

    pub fn find(&self, name: &str) -> Option<&EntryInfo> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    /// Entry bytes, after checking the local header and the stored checksum.
    pub fn read(&self, entry: &EntryInfo) -> Result<&'a [u8], ArchiveError> {
        let offset = entry.header_offset as usize;
        let header = slice(self.bytes, offset, LOCAL_HEADER_LEN, "local header")?;
        if LittleEndian::read_u32(&header[0..4]) != LOCAL_HEADER_SIGNATURE {
            return Err(ArchiveError::BadSignature {
                offset,
                record: "local header",
            });
        }
        let name_len = LittleEndian::read_u16(&header[26..28]) as usize;
        let extra_len = LittleEndian::read_u16(&header[28..30]) as usize;
        let data_start = offset + LOCAL_HEADER_LEN + name_len + extra_len;
        let data = slice(self.bytes, data_start, entry.size as usize, "entry data")?;

        let actual = crc32(data);
        if actual != entry.crc32 {
            return Err(ArchiveError::ChecksumMismatch {
                name: entry.name.clone(),
                expected: entry.crc32,
                actual,
            });
        }
        Ok(data)
    }

    pub fn read_by_name(&self, name: &str) -> Result<Option<&'a [u8]>, ArchiveError> {
        self.find(name).map(|entry| self.read(entry)).transpose()
    }
}

/// Scan backwards for the end record; a trailing archive comment may follow it.
fn find_end_of_directory(bytes: &[u8]) -> Result<usize, ArchiveError> {
    if bytes.len() < END_OF_DIRECTORY_LEN {
        return Err(ArchiveError::MissingEndOfDirectory);
    }
    let last = bytes.len() - END_OF_DIRECTORY_LEN;
    let first = last.saturating_sub(MAX_COMMENT_LEN);
    (first..=last)
        .rev()
        .find(|&pos| {
            LittleEndian::read_u32(&bytes[pos..pos + 4]) == END_OF_DIRECTORY_SIGNATURE
                && pos
                    + END_OF_DIRECTORY_LEN
                    + LittleEndian::read_u16(&bytes[pos + 20..pos + 22]) as usize
                    == bytes.len()
        })
        .ok_or(ArchiveError::MissingEndOfDirectory)
}

fn slice<'b>(
    bytes: &'b [u8],
    start: usize,
    len: usize,
    what: &'static str,
) -> Result<&'b [u8], ArchiveError> {
    start
        .checked_add(len)
        .and_then(|end| bytes.get(start..end))
        .ok_or(ArchiveError::Truncated(what))
}
