//! Portable page archives.
//!
//! - [`crc`] - CRC-32 used for per-entry checksums
//! - [`container`] - the stored-only ZIP container encoder/decoder
//! - [`pack`] - captured page to archive bytes
//! - [`import`] - archive bytes back to a page document and asset table

pub mod container;
pub mod crc;
pub mod import;
pub mod pack;

use thiserror::Error;

pub use container::{ArchiveReader, ArchiveWriter, EntryInfo};
pub use crc::{crc32, EMPTY_CRC32};
pub use import::{import_archive, validate_page_value, ImportedArchive};
pub use pack::{archive_filename, pack_page, Manifest, ManifestSource, PackedArchive};

pub const MANIFEST_ENTRY: &str = "manifest.json";
pub const DATA_ENTRY: &str = "data.json";
pub const ARCHIVE_FORMAT: &str = "zip-pack";
pub const ARCHIVE_FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error while writing archive: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid entry name: {0:?}")]
    InvalidName(String),

    #[error("Duplicate archive entry: {0}")]
    DuplicateEntry(String),

    #[error("Entry {name} is too large to store ({size} bytes)")]
    EntryTooLarge { name: String, size: u64 },

    #[error("Archive exceeds the 4 GiB container limit")]
    ArchiveTooLarge,

    #[error("Archive exceeds the 65535 entry limit")]
    TooManyEntries,

    #[error("Not an archive: end of central directory record not found")]
    MissingEndOfDirectory,

    #[error("Archive is truncated: {0} runs past the end of the data")]
    Truncated(&'static str),

    #[error("Bad {record} signature at byte {offset}")]
    BadSignature { offset: usize, record: &'static str },

    #[error("Entry {name} uses compression method {method}; only stored entries are supported")]
    UnsupportedCompression { name: String, method: u16 },

    #[error("Unsupported archive feature: {0}")]
    Unsupported(String),

    #[error("Checksum mismatch for {name}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },

    #[error("Archive is missing required entry {0}")]
    MissingEntry(&'static str),

    #[error("Invalid page data structure: {0}")]
    InvalidDocument(String),

    #[error("Malformed JSON in {entry}: {source}")]
    Json {
        entry: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl ArchiveError {
    /// Errors caused by the content of the archive rather than by the encoder.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ArchiveError::MissingEntry(_)
                | ArchiveError::InvalidDocument(_)
                | ArchiveError::Json { .. }
        )
    }
}
