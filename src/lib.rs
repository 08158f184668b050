//! cryptpack - Password-derived encrypted directory backups
//!
//! This library turns a directory into a self-contained encrypted packet:
//! zip the tree, stretch a password through PBKDF2 with an iteration count
//! that is either derived from the password pair or chosen at random, and
//! seal the bytes under AES-256-GCM. The packet stores salt, nonce and tag
//! but deliberately not the iteration count; the decrypt path recomputes or
//! guesses it instead.

pub mod archive;
pub mod backup;
pub mod config;
pub mod crypto;
pub mod error;

pub use config::Config;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::archive::ArchiveEncryptor;
    pub use crate::backup::BackupJob;
    pub use crate::config::Config;
    pub use crate::crypto::{Cipher, Secret};
    pub use crate::error::{Error, Result};
}
