//! In-memory byte streams with an explicit position cursor
//!
//! Every other part of the crate addresses archive bytes through
//! [`Stream`]: an owned, growable buffer plus a cursor. Reads and seeks
//! are bounds-checked against the logical length, writes grow the
//! backing storage geometrically, and allocation failures surface as
//! [`Error::Allocation`] instead of aborting.

use std::fs;
use std::io::Write;
use std::path::Path;

use tracing::trace;
use xp3_crypto::XorKey;

use crate::{Error, Result};

/// Where a seek offset is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// Absolute offset from the start of the stream.
    Start(usize),
    /// Signed offset from the current cursor.
    Current(i64),
    /// Offset counted backwards from the end: `End(0)` is the end of
    /// the stream, `End(len)` is the start.
    End(usize),
}

/// Backing storage for a stream.
///
/// Heap-owned is the only variant today; the enum leaves room for
/// non-owning or memory-mapped storage without changing call sites.
#[derive(Debug, Clone)]
enum Backing {
    Heap(Vec<u8>),
}

impl Backing {
    fn bytes(&self) -> &Vec<u8> {
        match self {
            Self::Heap(bytes) => bytes,
        }
    }

    fn bytes_mut(&mut self) -> &mut Vec<u8> {
        match self {
            Self::Heap(bytes) => bytes,
        }
    }
}

/// An owned, growable byte buffer with a position cursor.
///
/// The cursor always stays within `0..=len`. Logical length (valid
/// payload bytes) is tracked separately from allocated capacity, so
/// growth never exposes uninitialized trailing bytes to readers.
/// Cloning deep-copies the backing bytes.
#[derive(Debug, Clone)]
pub struct Stream {
    backing: Backing,
    pos: usize,
}

impl Stream {
    /// Create a stream of `len` zeroed bytes with the cursor at the start.
    pub fn new(len: usize) -> Result<Self> {
        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(len)
            .map_err(|_| Error::Allocation { requested: len })?;
        bytes.resize(len, 0);

        Ok(Self {
            backing: Backing::Heap(bytes),
            pos: 0,
        })
    }

    /// Wrap an existing byte vector with the cursor at the start.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            backing: Backing::Heap(bytes),
            pos: 0,
        }
    }

    /// Read the file at `path` in full, cursor at the start.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| Error::SourceUnavailable {
            path: path.to_path_buf(),
            source,
        })?;

        trace!("Loaded {} bytes from {}", bytes.len(), path.display());
        Ok(Self::from_vec(bytes))
    }

    /// Copy `n` bytes at the cursor into a new stream positioned at its
    /// start. The source cursor is unaffected.
    pub fn clone_region(&self, n: usize) -> Result<Self> {
        let region = self.peek(n)?;

        let mut bytes = Vec::new();
        bytes
            .try_reserve_exact(n)
            .map_err(|_| Error::Allocation { requested: n })?;
        bytes.extend_from_slice(region);

        Ok(Self::from_vec(bytes))
    }

    /// Logical length in bytes.
    pub fn len(&self) -> usize {
        self.backing.bytes().len()
    }

    /// Whether the stream holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.backing.bytes().is_empty()
    }

    /// Allocated capacity in bytes. Always at least `len`.
    pub fn capacity(&self) -> usize {
        self.backing.bytes().capacity()
    }

    /// Bytes between the cursor and the end of the stream.
    pub fn remaining(&self) -> usize {
        self.len() - self.pos
    }

    /// Current cursor offset from the start of the stream.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The stream's bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.backing.bytes()
    }

    /// The stream's bytes, mutably.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.backing.bytes_mut()
    }

    /// Consume the stream and return the backing bytes.
    pub fn into_vec(self) -> Vec<u8> {
        match self.backing {
            Backing::Heap(bytes) => bytes,
        }
    }

    fn check_available(&self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(Error::OutOfRange {
                requested: n,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    /// Borrow `n` bytes at the cursor without advancing it.
    pub fn peek(&self, n: usize) -> Result<&[u8]> {
        self.check_available(n)?;
        Ok(&self.backing.bytes()[self.pos..self.pos + n])
    }

    /// Fill `dest` with bytes from the cursor, advancing it.
    pub fn read_into(&mut self, dest: &mut [u8]) -> Result<()> {
        let n = dest.len();
        dest.copy_from_slice(self.peek(n)?);
        self.pos += n;
        Ok(())
    }

    /// Read `n` bytes from the cursor into a new vector, advancing it.
    pub fn read_vec(&mut self, n: usize) -> Result<Vec<u8>> {
        let bytes = self.peek(n)?.to_vec();
        self.pos += n;
        Ok(bytes)
    }

    /// Read a fixed-size byte array from the cursor, advancing it.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut array = [0; N];
        self.read_into(&mut array)?;
        Ok(array)
    }

    /// Read a `u8` from the cursor.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a little-endian `u16` from the cursor.
    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Read a little-endian `u32` from the cursor.
    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Read a little-endian `u64` from the cursor.
    pub fn read_u64_le(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Increase allocated capacity by `n` bytes.
    ///
    /// Contents, logical length and the cursor are untouched, and stay
    /// untouched when the allocation fails.
    pub fn grow(&mut self, n: usize) -> Result<()> {
        let bytes = self.backing.bytes_mut();
        let target = bytes
            .capacity()
            .checked_add(n)
            .ok_or(Error::Allocation { requested: n })?;

        bytes
            .try_reserve_exact(target - bytes.len())
            .map_err(|_| Error::Allocation { requested: target })?;
        Ok(())
    }

    /// Write `src` at the cursor, advancing it.
    ///
    /// Storage grows by the stream's current capacity per round until
    /// the write fits, so repeated appends stay amortized-linear. A
    /// stream with no capacity jumps straight to the required size. On
    /// allocation failure the stream is left unmodified.
    pub fn write(&mut self, src: &[u8]) -> Result<()> {
        let end = self.pos + src.len();

        while end > self.capacity() {
            let step = if self.capacity() == 0 {
                end
            } else {
                self.capacity()
            };
            self.grow(step)?;
        }

        let bytes = self.backing.bytes_mut();
        if end > bytes.len() {
            bytes.resize(end, 0);
        }
        bytes[self.pos..end].copy_from_slice(src);
        self.pos = end;
        Ok(())
    }

    /// Write a `u8` at the cursor.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write(&[value])
    }

    /// Write a little-endian `u16` at the cursor.
    pub fn write_u16_le(&mut self, value: u16) -> Result<()> {
        self.write(&value.to_le_bytes())
    }

    /// Write a little-endian `u32` at the cursor.
    pub fn write_u32_le(&mut self, value: u32) -> Result<()> {
        self.write(&value.to_le_bytes())
    }

    /// Write a little-endian `u64` at the cursor.
    pub fn write_u64_le(&mut self, value: u64) -> Result<()> {
        self.write(&value.to_le_bytes())
    }

    /// Append `n` bytes read from `src`'s cursor at this stream's
    /// cursor. Equivalent to a read from `src` followed by a write, so
    /// both cursors advance.
    pub fn concat(&mut self, src: &mut Self, n: usize) -> Result<()> {
        src.check_available(n)?;
        self.write(&src.as_bytes()[src.pos..src.pos + n])?;
        src.pos += n;
        Ok(())
    }

    /// Write `n` bytes at the cursor to `sink` without advancing the
    /// cursor.
    pub fn dump_to<W: Write>(&self, sink: &mut W, n: usize) -> Result<()> {
        sink.write_all(self.peek(n)?)?;
        Ok(())
    }

    /// XOR the whole buffer with `key`, regardless of cursor position.
    ///
    /// Applying the same key twice restores the original bytes.
    pub fn apply_keystream(&mut self, key: XorKey) {
        xp3_crypto::apply_keystream(self.as_bytes_mut(), key);
    }

    /// Move the cursor and return its new absolute offset.
    ///
    /// Targets outside `0..=len` are rejected and leave the cursor
    /// where it was.
    pub fn seek(&mut self, whence: Whence) -> Result<usize> {
        let len = self.len();
        let target = match whence {
            Whence::Start(pos) => Some(pos),
            Whence::Current(delta) => self.pos.checked_add_signed(delta as isize),
            Whence::End(back) => len.checked_sub(back),
        };

        match target {
            Some(pos) if pos <= len => {
                self.pos = pos;
                Ok(pos)
            }
            _ => Err(Error::SeekOutOfRange {
                target: whence,
                len,
            }),
        }
    }

    /// Move the cursor back to the start of the stream.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }
}
