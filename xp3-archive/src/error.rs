//! Error types for XP3 parsing and construction

use std::path::PathBuf;

use thiserror::Error;

use crate::stream::Whence;

/// Result type for XP3 operations
pub type Result<T> = std::result::Result<T, Error>;

/// XP3 error types
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backing storage could not be obtained or grown
    #[error("Allocation of {requested} bytes failed")]
    Allocation { requested: usize },

    /// External byte source missing or unreadable
    #[error("Source unavailable: {}: {source}", path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Read or write past the stream's logical bounds
    #[error("Out of range: requested {requested} bytes, {available} available")]
    OutOfRange { requested: usize, available: usize },

    /// Seek target outside the stream
    #[error("Seek out of range: {target:?} in a stream of {len} bytes")]
    SeekOutOfRange { target: Whence, len: usize },

    /// Invalid XP3 magic bytes
    #[error("Invalid XP3 magic: {}", hex::encode(.0))]
    InvalidMagic([u8; 11]),

    /// Archive version other than 1
    #[error("Unsupported archive version: {0}")]
    UnsupportedVersion(u32),

    /// Flags field missing the KiriKiriZ compatibility bit
    #[error("Incompatible archive flags: {0:#04x}")]
    IncompatibleFlags(u8),

    /// Compression or decompression failed
    #[error("Compression failed: {0}")]
    Compression(String),

    /// Entry table malformed
    #[error("Malformed entry table: {0}")]
    MalformedTable(String),

    /// Entry name is not valid UTF-16
    #[error("Invalid entry name: {0}")]
    BadName(String),

    /// Checksum mismatch for an extracted entry
    #[error("Checksum mismatch for {name}: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },

    /// Entry is protected and no key was supplied
    #[error("Key required to read protected entry: {0}")]
    KeyRequired(String),

    /// Entry name would escape the extraction root
    #[error("Entry name is unsafe to extract: {0}")]
    UnsafeEntryName(String),

    /// Two entries share the same name
    #[error("Duplicate entry name: {0}")]
    DuplicateEntry(String),
}
