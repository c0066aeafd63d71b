//! XP3 header parsing and serialization
//!
//! The header is a fixed 40-byte block at the start of the archive with
//! little-endian multi-byte fields:
//!
//! | offset | size | field          |
//! |--------|------|----------------|
//! | 0      | 11   | magic          |
//! | 11     | 8    | `info_offset`  |
//! | 19     | 4    | `version`      |
//! | 23     | 1    | `flags`        |
//! | 24     | 8    | `table_size`   |
//! | 32     | 8    | `table_offset` |

use tracing::debug;

use crate::stream::Stream;
use crate::{Error, FLAG_KIRIKIRIZ, Result, SUPPORTED_VERSION, XP3_MAGIC};

/// `info_offset` value written into fresh headers: the continuation
/// block starts right after the first 23 bytes.
pub const INFO_OFFSET: u64 = 0x17;

/// Parsed XP3 archive header.
///
/// The magic is validated during parsing and written back verbatim
/// during serialization, so it is not carried as a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Offset of the continuation block holding the fields after
    /// `version`. Opaque to archive processing.
    pub info_offset: u64,

    /// Format version. Only version 1 exists in the wild.
    pub version: u32,

    /// Flag bitfield. Bit `0x80` marks KiriKiriZ compatibility.
    pub flags: u8,

    /// Size in bytes of the entry table region.
    pub table_size: u64,

    /// Offset of the entry table region within the archive.
    pub table_offset: u64,
}

impl Header {
    /// Create a header for a new archive.
    ///
    /// `table_size` and `table_offset` stay zero until the entry table
    /// has been serialized and its location is known.
    pub fn new() -> Self {
        Self {
            info_offset: INFO_OFFSET,
            version: SUPPORTED_VERSION,
            flags: FLAG_KIRIKIRIZ,
            table_size: 0,
            table_offset: 0,
        }
    }

    /// Parse and validate a header at `stream`'s cursor.
    ///
    /// Magic, version, and the compatibility flag are all checked; a
    /// header failing any of them yields an error, never a
    /// partially-valid value. On success the cursor is left just past
    /// the header.
    pub fn parse(stream: &mut Stream) -> Result<Self> {
        let magic: [u8; 11] = stream.read_array()?;
        if magic != XP3_MAGIC {
            return Err(Error::InvalidMagic(magic));
        }

        let info_offset = stream.read_u64_le()?;
        let version = stream.read_u32_le()?;
        let flags = stream.read_u8()?;
        let table_size = stream.read_u64_le()?;
        let table_offset = stream.read_u64_le()?;

        if version != SUPPORTED_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        if flags & FLAG_KIRIKIRIZ == 0 {
            return Err(Error::IncompatibleFlags(flags));
        }

        debug!("Parsed header: table {table_size} bytes at {table_offset:#x}");

        Ok(Self {
            info_offset,
            version,
            flags,
            table_size,
            table_offset,
        })
    }

    /// Serialize the header at `stream`'s cursor.
    ///
    /// Writes the six fields in parse order; for any header passing
    /// validation this is the exact inverse of [`Header::parse`].
    pub fn write_to(&self, stream: &mut Stream) -> Result<()> {
        stream.write(&XP3_MAGIC)?;
        stream.write_u64_le(self.info_offset)?;
        stream.write_u32_le(self.version)?;
        stream.write_u8(self.flags)?;
        stream.write_u64_le(self.table_size)?;
        stream.write_u64_le(self.table_offset)?;
        Ok(())
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}
