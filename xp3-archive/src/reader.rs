//! Archive reading and extraction

use std::fs;
use std::path::Path;

use tracing::{debug, trace};
use xp3_crypto::XorKey;

use crate::adler::adler32;
use crate::header::Header;
use crate::stream::{Stream, Whence};
use crate::table::{Entry, Table, sanitize_name};
use crate::{Error, Result, compress};

/// A parsed archive, ready for entry extraction.
///
/// The whole archive is held in memory; entry payloads are assembled
/// on demand from their segments.
#[derive(Debug, Clone)]
pub struct Archive {
    stream: Stream,
    header: Header,
    table: Table,
}

impl Archive {
    /// Load and parse an archive from disk.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        debug!("Opening archive {}", path.as_ref().display());
        Self::from_stream(Stream::from_file(path)?)
    }

    /// Parse an archive held in a stream.
    pub fn from_stream(mut stream: Stream) -> Result<Self> {
        stream.rewind();
        let header = Header::parse(&mut stream)?;
        let table = Table::parse(&mut stream, &header)?;
        debug!("Archive holds {} entries", table.entries.len());

        Ok(Self {
            stream,
            header,
            table,
        })
    }

    /// The parsed header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// All table entries, in table order.
    pub fn entries(&self) -> &[Entry] {
        &self.table.entries
    }

    /// Look up an entry by its archive name.
    pub fn entry(&self, name: &str) -> Option<&Entry> {
        self.table.entries.iter().find(|e| e.name == name)
    }

    /// Assemble, decrypt and verify one entry's payload.
    ///
    /// Protected entries need `key`; unprotected entries ignore it.
    /// The Adler-32 recorded in the table is checked against the
    /// recovered plaintext, so a wrong key surfaces as
    /// [`Error::ChecksumMismatch`].
    pub fn read_entry(&mut self, entry: &Entry, key: Option<XorKey>) -> Result<Vec<u8>> {
        let mut plain = Stream::new(0)?;
        plain.grow(entry.original_size as usize)?;

        for segment in &entry.segments {
            trace!(
                "Segment at {:#x}: {} -> {} bytes (compressed: {})",
                segment.offset, segment.archived_size, segment.original_size, segment.compressed
            );
            self.stream.seek(Whence::Start(segment.offset as usize))?;

            let mut piece = if segment.compressed {
                compress::inflate(
                    &self.stream,
                    segment.archived_size as usize,
                    segment.original_size as usize,
                )?
            } else {
                self.stream.clone_region(segment.archived_size as usize)?
            };
            let piece_len = piece.len();
            plain.concat(&mut piece, piece_len)?;
        }

        if entry.protected {
            let key = key.ok_or_else(|| Error::KeyRequired(entry.name.clone()))?;
            plain.apply_keystream(key);
        }

        let actual = adler32(plain.as_bytes());
        if actual != entry.checksum {
            return Err(Error::ChecksumMismatch {
                name: entry.name.clone(),
                expected: entry.checksum,
                actual,
            });
        }

        Ok(plain.into_vec())
    }

    /// Extract every entry under `dir`, creating directories as needed.
    ///
    /// Entry names are validated before any filesystem path is built;
    /// a name that escapes `dir` aborts the extraction.
    pub fn extract_to<P: AsRef<Path>>(&mut self, dir: P, key: Option<XorKey>) -> Result<()> {
        let dir = dir.as_ref();
        let entries = self.table.entries.clone();

        for entry in &entries {
            let relative = sanitize_name(&entry.name)?;
            let target = dir.join(relative);

            debug!("Extracting {} ({} bytes)", entry.name, entry.original_size);
            let data = self.read_entry(entry, key)?;

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, data)?;
        }
        Ok(())
    }
}
