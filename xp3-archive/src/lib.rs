//! XP3 archive reading and writing
//!
//! XP3 is the container format of the KiriKiri visual novel engine. An
//! archive is a fixed 40-byte header, entry payloads, and a (usually
//! deflated) entry table locating each packed file. This crate provides
//! parsing and construction for the whole container: the cursor-addressed
//! [`Stream`] buffer all byte access goes through, the header codec, the
//! zlib adapters, the entry table, and high-level [`Archive`] /
//! [`ArchiveBuilder`] types on top of them.

pub mod adler;
pub mod compress;
pub mod error;
pub mod header;
pub mod reader;
pub mod stream;
pub mod table;
pub mod text;
pub mod writer;

pub use error::{Error, Result};
pub use header::Header;
pub use reader::Archive;
pub use stream::{Stream, Whence};
pub use table::{Entry, Segment, Table};
pub use writer::ArchiveBuilder;

/// XP3 magic bytes, including the trailing format marker.
pub const XP3_MAGIC: [u8; 11] = [
    0x58, 0x50, 0x33, 0x0d, 0x0a, 0x20, 0x0a, 0x1a, 0x8b, 0x67, 0x01,
];

/// Serialized size of the archive header in bytes.
pub const HEADER_LEN: usize = 40;

/// The only archive version this crate accepts.
pub const SUPPORTED_VERSION: u32 = 1;

/// Flag bit marking an archive as KiriKiriZ-compatible.
pub const FLAG_KIRIKIRIZ: u8 = 0x80;
