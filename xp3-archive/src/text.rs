//! UTF-16LE entry name codec
//!
//! The entry table stores names as UTF-16LE code units without a
//! terminator; the unit count is recorded alongside the name.

use crate::{Error, Result};

/// Decode UTF-16LE `bytes` into a string.
pub fn decode_utf16le(bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(Error::BadName(format!(
            "odd UTF-16 byte length: {}",
            bytes.len()
        )));
    }

    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    String::from_utf16(&units).map_err(|_| Error::BadName("unpaired UTF-16 surrogate".to_string()))
}

/// Encode `name` as UTF-16LE bytes.
pub fn encode_utf16le(name: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(name.len() * 2);
    for unit in name.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}
