//! Entry table parsing and construction
//!
//! The entry table is a byte region located by the header's
//! `table_offset`/`table_size`. The region opens with a compression
//! flag byte: `1` is followed by the compressed and decompressed sizes
//! (u64 LE each) and a zlib stream, `0` by a size and the raw bytes.
//!
//! The decompressed table is a sequence of tagged chunks, each a 4-byte
//! tag plus a u64 LE payload size. Entries are `File` chunks whose
//! payload nests further chunks:
//!
//! - `info`: u32 flags (bit 31 = protected), u64 decompressed size,
//!   u64 stored size, u16 name length in UTF-16 units, the UTF-16LE name
//! - `segm`: 28-byte segment records (u32 flags with bit 0 = deflated,
//!   u64 archive offset, u64 decompressed size, u64 stored size)
//! - `adlr`: u32 Adler-32 of the decompressed payload
//! - `time`: u64 modification time, milliseconds since the Unix epoch
//!
//! Unknown tags at either level are skipped, which keeps archives
//! carrying obfuscation chunks readable.

use std::path::PathBuf;

use tracing::debug;

use crate::header::Header;
use crate::stream::{Stream, Whence};
use crate::{Error, Result, compress, text};

const TAG_FILE: [u8; 4] = *b"File";
const TAG_INFO: [u8; 4] = *b"info";
const TAG_SEGM: [u8; 4] = *b"segm";
const TAG_ADLR: [u8; 4] = *b"adlr";
const TAG_TIME: [u8; 4] = *b"time";

/// Protected-entry bit in the info flags.
const FLAG_PROTECTED: u32 = 1 << 31;

/// Deflated bit in the segment flags.
const FLAG_SEGMENT_DEFLATED: u32 = 1;

/// Serialized size of one segment record.
const SEGMENT_LEN: usize = 28;

/// One contiguous piece of an entry's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Whether the stored bytes are deflated.
    pub compressed: bool,
    /// Offset of the stored bytes within the archive.
    pub offset: u64,
    /// Decompressed size.
    pub original_size: u64,
    /// Stored size.
    pub archived_size: u64,
}

/// One packed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Path inside the archive, `/`-separated.
    pub name: String,
    /// Whether the payload is XOR-protected.
    pub protected: bool,
    /// Decompressed size across all segments.
    pub original_size: u64,
    /// Stored size across all segments.
    pub archived_size: u64,
    /// Adler-32 of the decompressed payload.
    pub checksum: u32,
    /// Modification time in milliseconds since the Unix epoch, when
    /// the archive recorded one.
    pub timestamp: Option<u64>,
    /// Payload pieces in order.
    pub segments: Vec<Segment>,
}

/// Parsed entry table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Entries in table order.
    pub entries: Vec<Entry>,
}

impl Table {
    /// Locate, decompress and parse the entry table of a whole-archive
    /// stream.
    pub fn parse(archive: &mut Stream, header: &Header) -> Result<Self> {
        archive.seek(Whence::Start(header.table_offset as usize))?;
        let mut region = archive.clone_region(header.table_size as usize)?;

        let flag = region.read_u8()?;
        let mut table = match flag {
            0 => {
                let size = region.read_u64_le()?;
                if size > region.remaining() as u64 {
                    return Err(Error::MalformedTable(format!(
                        "stored table of {size} bytes overruns its region"
                    )));
                }
                Stream::from_vec(region.read_vec(size as usize)?)
            }
            1 => {
                let archived = region.read_u64_le()?;
                let original = region.read_u64_le()?;
                if archived > region.remaining() as u64 {
                    return Err(Error::MalformedTable(format!(
                        "compressed table of {archived} bytes overruns its region"
                    )));
                }
                compress::inflate(&region, archived as usize, original as usize)?
            }
            other => {
                return Err(Error::MalformedTable(format!(
                    "unknown table compression flag {other:#x}"
                )));
            }
        };

        Self::from_chunks(&mut table)
    }

    /// Parse a decompressed table chunk stream.
    pub fn from_chunks(table: &mut Stream) -> Result<Self> {
        let mut entries = Vec::new();

        while table.remaining() > 0 {
            let (tag, size) = read_chunk_header(table)?;
            let mut payload = Stream::from_vec(table.read_vec(size)?);

            if tag == TAG_FILE {
                entries.push(Entry::parse(&mut payload)?);
            } else {
                debug!(
                    "Skipping unknown table chunk '{}' ({size} bytes)",
                    tag_display(tag)
                );
            }
        }

        debug!("Parsed {} table entries", entries.len());
        Ok(Self { entries })
    }

    /// Serialize all entries into a chunk stream, rewound.
    ///
    /// The result is the raw table; region framing and compression are
    /// applied by whoever installs it into an archive.
    pub fn build(&self) -> Result<Stream> {
        let mut out = Stream::new(0)?;
        for entry in &self.entries {
            entry.write_to(&mut out)?;
        }
        out.rewind();
        Ok(out)
    }
}

impl Entry {
    fn parse(payload: &mut Stream) -> Result<Self> {
        let mut info = None;
        let mut segments = None;
        let mut checksum = None;
        let mut timestamp = None;

        while payload.remaining() > 0 {
            let (tag, size) = read_chunk_header(payload)?;
            let mut chunk = Stream::from_vec(payload.read_vec(size)?);

            match tag {
                TAG_INFO => info = Some(parse_info(&mut chunk)?),
                TAG_SEGM => segments = Some(parse_segments(&mut chunk)?),
                TAG_ADLR => checksum = Some(chunk.read_u32_le()?),
                TAG_TIME => timestamp = Some(chunk.read_u64_le()?),
                _ => debug!(
                    "Skipping unknown File chunk '{}' ({size} bytes)",
                    tag_display(tag)
                ),
            }
        }

        let info =
            info.ok_or_else(|| Error::MalformedTable("File chunk without info".to_string()))?;
        let segments = segments.ok_or_else(|| {
            Error::MalformedTable(format!("entry {} has no segm chunk", info.name))
        })?;
        let checksum = checksum.ok_or_else(|| {
            Error::MalformedTable(format!("entry {} has no adlr chunk", info.name))
        })?;

        Ok(Self {
            name: info.name,
            protected: info.protected,
            original_size: info.original_size,
            archived_size: info.archived_size,
            checksum,
            timestamp,
            segments,
        })
    }

    fn write_to(&self, out: &mut Stream) -> Result<()> {
        let name_bytes = text::encode_utf16le(&self.name);
        let name_units = u16::try_from(name_bytes.len() / 2).map_err(|_| {
            Error::BadName(format!("name too long: {} UTF-16 units", name_bytes.len() / 2))
        })?;

        let mut info = Stream::new(0)?;
        let flags = if self.protected { FLAG_PROTECTED } else { 0 };
        info.write_u32_le(flags)?;
        info.write_u64_le(self.original_size)?;
        info.write_u64_le(self.archived_size)?;
        info.write_u16_le(name_units)?;
        info.write(&name_bytes)?;

        let mut segm = Stream::new(0)?;
        for segment in &self.segments {
            let flags = if segment.compressed {
                FLAG_SEGMENT_DEFLATED
            } else {
                0
            };
            segm.write_u32_le(flags)?;
            segm.write_u64_le(segment.offset)?;
            segm.write_u64_le(segment.original_size)?;
            segm.write_u64_le(segment.archived_size)?;
        }

        let mut payload = Stream::new(0)?;
        write_chunk(&mut payload, TAG_INFO, info.as_bytes())?;
        write_chunk(&mut payload, TAG_SEGM, segm.as_bytes())?;
        write_chunk(&mut payload, TAG_ADLR, &self.checksum.to_le_bytes())?;
        if let Some(time) = self.timestamp {
            write_chunk(&mut payload, TAG_TIME, &time.to_le_bytes())?;
        }

        write_chunk(out, TAG_FILE, payload.as_bytes())
    }
}

/// Validate an entry name and map it to a relative filesystem path.
///
/// Names use `/` separators; `\` is treated the same way for archives
/// packed on Windows. Absolute names, drive prefixes, `.`/`..` and
/// empty components are rejected so a hostile table cannot address
/// anything outside the extraction root.
pub fn sanitize_name(name: &str) -> Result<PathBuf> {
    if name.is_empty() || name.contains('\0') || name.contains(':') {
        return Err(Error::UnsafeEntryName(name.to_string()));
    }

    let mut path = PathBuf::new();
    for component in name.split(['/', '\\']) {
        match component {
            "" | "." | ".." => return Err(Error::UnsafeEntryName(name.to_string())),
            _ => path.push(component),
        }
    }
    Ok(path)
}

fn read_chunk_header(stream: &mut Stream) -> Result<([u8; 4], usize)> {
    let tag = stream.read_array::<4>()?;
    let size = stream.read_u64_le()?;

    if size > stream.remaining() as u64 {
        return Err(Error::MalformedTable(format!(
            "chunk '{}' of {size} bytes overruns its container ({} left)",
            tag_display(tag),
            stream.remaining()
        )));
    }
    Ok((tag, size as usize))
}

fn write_chunk(out: &mut Stream, tag: [u8; 4], payload: &[u8]) -> Result<()> {
    out.write(&tag)?;
    out.write_u64_le(payload.len() as u64)?;
    out.write(payload)
}

fn tag_display(tag: [u8; 4]) -> String {
    String::from_utf8_lossy(&tag).into_owned()
}

struct Info {
    protected: bool,
    original_size: u64,
    archived_size: u64,
    name: String,
}

fn parse_info(chunk: &mut Stream) -> Result<Info> {
    let flags = chunk.read_u32_le()?;
    let original_size = chunk.read_u64_le()?;
    let archived_size = chunk.read_u64_le()?;
    let name_units = chunk.read_u16_le()?;
    let name_bytes = chunk.read_vec(usize::from(name_units) * 2)?;

    Ok(Info {
        protected: flags & FLAG_PROTECTED != 0,
        original_size,
        archived_size,
        name: text::decode_utf16le(&name_bytes)?,
    })
}

fn parse_segments(chunk: &mut Stream) -> Result<Vec<Segment>> {
    if chunk.len() % SEGMENT_LEN != 0 {
        return Err(Error::MalformedTable(format!(
            "segm payload of {} bytes is not a whole number of records",
            chunk.len()
        )));
    }

    let mut segments = Vec::with_capacity(chunk.len() / SEGMENT_LEN);
    while chunk.remaining() > 0 {
        let flags = chunk.read_u32_le()?;
        segments.push(Segment {
            compressed: flags & FLAG_SEGMENT_DEFLATED != 0,
            offset: chunk.read_u64_le()?,
            original_size: chunk.read_u64_le()?,
            archived_size: chunk.read_u64_le()?,
        });
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_entry() -> Entry {
        Entry {
            name: "scenario/prologue.ks".to_string(),
            protected: true,
            original_size: 300,
            archived_size: 220,
            checksum: 0xdeadbeef,
            timestamp: Some(1_500_000_000_000),
            segments: vec![
                Segment {
                    compressed: true,
                    offset: 40,
                    original_size: 200,
                    archived_size: 120,
                },
                Segment {
                    compressed: false,
                    offset: 160,
                    original_size: 100,
                    archived_size: 100,
                },
            ],
        }
    }

    fn plain_entry() -> Entry {
        Entry {
            name: "data.bin".to_string(),
            protected: false,
            original_size: 16,
            archived_size: 16,
            checksum: 42,
            timestamp: None,
            segments: vec![Segment {
                compressed: false,
                offset: 500,
                original_size: 16,
                archived_size: 16,
            }],
        }
    }

    #[test]
    fn test_chunk_roundtrip() {
        let table = Table {
            entries: vec![sample_entry(), plain_entry()],
        };

        let mut chunks = table.build().unwrap();
        assert_eq!(chunks.position(), 0);

        let parsed = Table::from_chunks(&mut chunks).unwrap();
        assert_eq!(parsed, table);
    }

    #[test]
    fn test_unknown_chunks_are_skipped() {
        let table = Table {
            entries: vec![plain_entry()],
        };
        let entry_chunks = table.build().unwrap();

        let mut stream = Stream::new(0).unwrap();
        write_chunk(&mut stream, *b"eliF", &[0xff; 9]).unwrap();
        stream.write(entry_chunks.as_bytes()).unwrap();
        write_chunk(&mut stream, *b"hash", &[0xee; 4]).unwrap();
        stream.rewind();

        let parsed = Table::from_chunks(&mut stream).unwrap();
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0], plain_entry());
    }

    #[test]
    fn test_empty_table() {
        let mut empty = Stream::new(0).unwrap();
        let parsed = Table::from_chunks(&mut empty).unwrap();
        assert!(parsed.entries.is_empty());
    }

    #[test]
    fn test_missing_adlr_rejected() {
        // File payload with info and segm but no adlr
        let entry = plain_entry();
        let mut full = Table {
            entries: vec![entry],
        }
        .build()
        .unwrap();

        // Rebuild the File chunk without its adlr sub-chunk: parse the
        // outer frame, then strip the last 16 bytes (adlr tag + size +
        // payload).
        let (tag, size) = read_chunk_header(&mut full).unwrap();
        assert_eq!(tag, TAG_FILE);
        let payload = full.read_vec(size).unwrap();
        let trimmed = &payload[..payload.len() - 16];

        let mut stream = Stream::new(0).unwrap();
        write_chunk(&mut stream, TAG_FILE, trimmed).unwrap();
        stream.rewind();

        let err = Table::from_chunks(&mut stream).unwrap_err();
        assert!(matches!(err, Error::MalformedTable(msg) if msg.contains("adlr")));
    }

    #[test]
    fn test_chunk_overrun_rejected() {
        let mut stream = Stream::new(0).unwrap();
        stream.write(&TAG_FILE).unwrap();
        stream.write_u64_le(1000).unwrap();
        stream.write(&[0; 8]).unwrap();
        stream.rewind();

        let err = Table::from_chunks(&mut stream).unwrap_err();
        assert!(matches!(err, Error::MalformedTable(_)));
    }

    #[test]
    fn test_ragged_segm_rejected() {
        let mut payload = Stream::new(0).unwrap();
        write_chunk(&mut payload, TAG_SEGM, &[0; 27]).unwrap();

        let mut stream = Stream::new(0).unwrap();
        write_chunk(&mut stream, TAG_FILE, payload.as_bytes()).unwrap();
        stream.rewind();

        let err = Table::from_chunks(&mut stream).unwrap_err();
        assert!(matches!(err, Error::MalformedTable(msg) if msg.contains("segm")));
    }

    #[test]
    fn test_overlong_name_rejected() {
        let mut entry = plain_entry();
        entry.name = "x".repeat(70_000);

        let err = Table {
            entries: vec![entry],
        }
        .build()
        .unwrap_err();
        assert!(matches!(err, Error::BadName(_)));
    }

    fn region_fixture(compress_region: bool) -> (Stream, Header) {
        let table = Table {
            entries: vec![sample_entry()],
        };
        let chunks = table.build().unwrap();

        let mut archive = Stream::new(0).unwrap();
        let mut header = Header::new();
        header.write_to(&mut archive).unwrap();

        let table_offset = archive.position();
        if compress_region {
            let deflated = compress::deflate(&chunks, chunks.len()).unwrap();
            archive.write_u8(1).unwrap();
            archive.write_u64_le(deflated.len() as u64).unwrap();
            archive.write_u64_le(chunks.len() as u64).unwrap();
            archive.write(deflated.as_bytes()).unwrap();
        } else {
            archive.write_u8(0).unwrap();
            archive.write_u64_le(chunks.len() as u64).unwrap();
            archive.write(chunks.as_bytes()).unwrap();
        }

        header.table_size = (archive.position() - table_offset) as u64;
        header.table_offset = table_offset as u64;
        (archive, header)
    }

    #[test]
    fn test_parse_stored_region() {
        let (mut archive, header) = region_fixture(false);
        let table = Table::parse(&mut archive, &header).unwrap();
        assert_eq!(table.entries, vec![sample_entry()]);
    }

    #[test]
    fn test_parse_compressed_region() {
        let (mut archive, header) = region_fixture(true);
        let table = Table::parse(&mut archive, &header).unwrap();
        assert_eq!(table.entries, vec![sample_entry()]);
    }

    #[test]
    fn test_unknown_region_flag_rejected() {
        let (mut archive, header) = region_fixture(false);
        // Clobber the region's compression flag
        archive.as_bytes_mut()[header.table_offset as usize] = 2;

        let err = Table::parse(&mut archive, &header).unwrap_err();
        assert!(matches!(err, Error::MalformedTable(msg) if msg.contains("flag")));
    }

    #[test]
    fn test_sanitize_name_accepts_nested_paths() {
        assert_eq!(
            sanitize_name("data/sound/bgm01.ogg").unwrap(),
            PathBuf::from("data").join("sound").join("bgm01.ogg")
        );
        assert_eq!(
            sanitize_name("win\\style.ks").unwrap(),
            PathBuf::from("win").join("style.ks")
        );
    }

    #[test]
    fn test_sanitize_name_rejects_escapes() {
        for name in [
            "",
            "../evil.ks",
            "data/../../evil.ks",
            "/etc/passwd",
            "a//b",
            "a/./b",
            "C:\\windows\\system.ini",
            "..\\evil.ks",
            "trailing/",
        ] {
            let err = sanitize_name(name).unwrap_err();
            assert!(
                matches!(err, Error::UnsafeEntryName(_)),
                "{name} should be rejected"
            );
        }
    }
}
