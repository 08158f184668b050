//! Error types for cryptpack

use std::io;
use thiserror::Error;

use crate::crypto::MIN_PACKET_SIZE;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for cryptpack
#[derive(Error, Debug)]
pub enum Error {
    // Crypto errors
    #[error("No encryption password configured")]
    EncryptionUnavailable,

    #[error("Iteration count {0} is below the minimum of 5000000")]
    IterationTooLow(u32),

    #[error("Malformed packet: {0} bytes, need at least {MIN_PACKET_SIZE}")]
    MalformedPacket(usize),

    #[error("Decryption failed: corrupted data or wrong password")]
    DecryptionFailed,

    #[error("Encryption error: {0}")]
    Encryption(String),

    // Archive errors
    #[error("Archive creation failed: {0}")]
    ArchiveCreation(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Config(e.to_string())
    }
}
