//! Length-exact zlib adapters over stream regions
//!
//! XP3 stores plain zlib streams without embedding the decompressed
//! size. The entry table records both sizes, so the adapters here take
//! them as explicit parameters instead of probing the data. Neither
//! adapter moves the source cursor.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use tracing::{debug, trace};

use crate::stream::Stream;
use crate::{Error, Result};

/// Inflate `compressed_len` bytes at `stream`'s cursor into a new
/// stream of exactly `decompressed_len` bytes.
///
/// The caller must supply the true decompressed length; zlib data in
/// this usage does not self-describe its total output size. An
/// undercounted length yields truncated output, an overcounted one
/// fails.
pub fn inflate(stream: &Stream, compressed_len: usize, decompressed_len: usize) -> Result<Stream> {
    let region = stream.peek(compressed_len)?;
    trace!("Inflating {compressed_len} bytes, expecting {decompressed_len}");

    let mut out = Stream::new(decompressed_len)?;
    let mut decoder = ZlibDecoder::new(region);
    decoder
        .read_exact(out.as_bytes_mut())
        .map_err(|e| Error::Compression(format!("inflate failed: {e}")))?;

    debug!("Inflated {compressed_len} bytes -> {decompressed_len} bytes");
    Ok(out)
}

/// Deflate `len` bytes at `stream`'s cursor into a new stream.
///
/// The result's length is the compressed size, which the caller must
/// record separately (it cannot be reproduced from the input length).
pub fn deflate(stream: &Stream, len: usize) -> Result<Stream> {
    let region = stream.peek(len)?;
    trace!("Deflating {len} bytes");

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(region)
        .map_err(|e| Error::Compression(format!("deflate failed: {e}")))?;
    let compressed = encoder
        .finish()
        .map_err(|e| Error::Compression(format!("deflate failed: {e}")))?;

    debug!("Deflated {} bytes -> {} bytes", len, compressed.len());
    Ok(Stream::from_vec(compressed))
}
