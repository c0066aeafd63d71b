//! Encryption support for XP3 archives.
//!
//! This crate provides:
//! - The two-key XOR keystream KiriKiri titles use to obfuscate entry data
//! - Built-in keys for known titles
//! - Key file loading for titles the crate does not ship keys for

pub mod error;
pub mod key_service;
pub mod keys;
pub mod keystream;

pub use error::CryptoError;
pub use key_service::KeyService;
pub use keys::{XorKey, parse_key_hex, parse_title};
pub use keystream::apply_keystream;

/// Result type for crypto operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
