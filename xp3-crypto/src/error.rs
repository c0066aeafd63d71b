//! Error types for xp3-crypto operations.

use thiserror::Error;

/// Errors that can occur during key management.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// No key registered for the requested title.
    #[error("no encryption key registered for title: {0}")]
    KeyNotFound(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
