//! Built-in encryption keys for known KiriKiri titles.
//!
//! XP3 obfuscation keys are two plain bytes per title. The values here
//! are publicly known and circulate in the extraction community.

use std::collections::HashMap;

/// XOR key pair for one title.
///
/// `initial` is folded into the first byte of an entry, `primary` into
/// every byte after that fold. Both operations are their own inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XorKey {
    /// Key XORed into every byte of the payload.
    pub primary: u8,
    /// Key XORed into the first byte only, before `primary` is applied.
    pub initial: u8,
}

impl XorKey {
    /// Create a key pair from its two bytes.
    #[must_use]
    pub const fn new(primary: u8, initial: u8) -> Self {
        Self { primary, initial }
    }
}

/// Create a map of built-in title keys.
pub fn builtin_keys() -> HashMap<String, XorKey> {
    let mut keys = HashMap::new();

    // Nekopara retail releases
    keys.insert("nekopara-vol0".to_string(), XorKey::new(0xd7, 0x6b));
    keys.insert("nekopara-vol1".to_string(), XorKey::new(0x9c, 0x2f));

    // Steam builds ship re-keyed archives
    keys.insert("nekopara-vol0-steam".to_string(), XorKey::new(0x44, 0x93));
    keys.insert("nekopara-vol1-steam".to_string(), XorKey::new(0x1e, 0xc5));

    // Additional titles can be loaded from a key file at runtime.

    keys
}

/// Parse a key from a hex string (primary byte, then initial byte).
pub fn parse_key_hex(hex_str: &str) -> Result<XorKey, String> {
    let hex_str = hex_str.trim();
    let bytes = hex::decode(hex_str).map_err(|e| format!("invalid hex: {e}"))?;

    if bytes.len() != 2 {
        return Err(format!("key must be 2 bytes, got {}", bytes.len()));
    }

    Ok(XorKey::new(bytes[0], bytes[1]))
}

/// Normalize a title identifier.
pub fn parse_title(name: &str) -> Result<String, String> {
    let name = name.trim();

    if name.is_empty() {
        return Err("empty title identifier".to_string());
    }

    Ok(name.to_ascii_lowercase())
}
