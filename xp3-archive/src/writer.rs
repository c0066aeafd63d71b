//! Archive construction

use std::fs::File;
use std::path::Path;

use tracing::{debug, trace};
use xp3_crypto::XorKey;

use crate::adler::adler32;
use crate::header::Header;
use crate::stream::Stream;
use crate::table::{Entry, Segment, Table, sanitize_name};
use crate::{Error, Result, compress};

/// Builds an archive from in-memory payloads.
///
/// Payloads are deflated when that actually shrinks them and stored
/// verbatim otherwise. With a key installed, every payload is
/// XOR-protected before compression.
#[derive(Debug)]
pub struct ArchiveBuilder {
    files: Vec<PendingFile>,
    key: Option<XorKey>,
    compress: bool,
}

#[derive(Debug)]
struct PendingFile {
    name: String,
    data: Vec<u8>,
    timestamp: Option<u64>,
}

impl ArchiveBuilder {
    /// New builder with compression enabled and no key.
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            key: None,
            compress: true,
        }
    }

    /// Protect every payload with `key`.
    #[must_use]
    pub fn with_key(mut self, key: XorKey) -> Self {
        self.key = Some(key);
        self
    }

    /// Enable or disable deflate for payloads and the entry table.
    #[must_use]
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Queue one file.
    ///
    /// The name is validated the same way extraction validates it, and
    /// duplicates are rejected.
    pub fn add_entry(
        &mut self,
        name: impl Into<String>,
        data: Vec<u8>,
        timestamp: Option<u64>,
    ) -> Result<()> {
        let name = name.into();
        sanitize_name(&name)?;
        if self.files.iter().any(|f| f.name == name) {
            return Err(Error::DuplicateEntry(name));
        }

        self.files.push(PendingFile {
            name,
            data,
            timestamp,
        });
        Ok(())
    }

    /// Number of queued files.
    pub fn entry_count(&self) -> usize {
        self.files.len()
    }

    /// Assemble the archive, rewound to its first byte.
    pub fn build(&self) -> Result<Stream> {
        let mut archive = Stream::new(0)?;
        let mut header = Header::new();
        header.write_to(&mut archive)?;

        let mut table = Table::default();
        for file in &self.files {
            table.entries.push(self.pack_file(&mut archive, file)?);
        }

        let chunks = table.build()?;
        let table_offset = archive.position() as u64;
        self.write_table_region(&mut archive, &chunks)?;
        header.table_offset = table_offset;
        header.table_size = archive.position() as u64 - table_offset;

        // Re-emit the header now that the table location is known.
        archive.rewind();
        header.write_to(&mut archive)?;
        archive.rewind();

        debug!(
            "Built archive: {} entries, {} bytes",
            table.entries.len(),
            archive.len()
        );
        Ok(archive)
    }

    /// Assemble the archive and write it to `path`.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let archive = self.build()?;
        let mut file = File::create(path)?;
        archive.dump_to(&mut file, archive.len())
    }

    fn pack_file(&self, archive: &mut Stream, file: &PendingFile) -> Result<Entry> {
        let checksum = adler32(&file.data);

        let mut payload = file.data.clone();
        if let Some(key) = self.key {
            xp3_crypto::apply_keystream(&mut payload, key);
        }

        let plain = Stream::from_vec(payload);
        let deflated = if self.compress {
            let candidate = compress::deflate(&plain, plain.len())?;
            (candidate.len() < plain.len()).then_some(candidate)
        } else {
            None
        };

        let offset = archive.position() as u64;
        let (stored, compressed) = match deflated {
            Some(stream) => (stream, true),
            None => (plain, false),
        };
        archive.write(stored.as_bytes())?;

        trace!(
            "Packed {}: {} -> {} bytes at {:#x} (compressed: {})",
            file.name,
            file.data.len(),
            stored.len(),
            offset,
            compressed
        );

        Ok(Entry {
            name: file.name.clone(),
            protected: self.key.is_some(),
            original_size: file.data.len() as u64,
            archived_size: stored.len() as u64,
            checksum,
            timestamp: file.timestamp,
            segments: vec![Segment {
                compressed,
                offset,
                original_size: file.data.len() as u64,
                archived_size: stored.len() as u64,
            }],
        })
    }

    fn write_table_region(&self, archive: &mut Stream, chunks: &Stream) -> Result<()> {
        if self.compress {
            let deflated = compress::deflate(chunks, chunks.len())?;
            if deflated.len() < chunks.len() {
                archive.write_u8(1)?;
                archive.write_u64_le(deflated.len() as u64)?;
                archive.write_u64_le(chunks.len() as u64)?;
                return archive.write(deflated.as_bytes());
            }
        }

        archive.write_u8(0)?;
        archive.write_u64_le(chunks.len() as u64)?;
        archive.write(chunks.as_bytes())
    }
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}
