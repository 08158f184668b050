//! Password-based key derivation
//!
//! PBKDF2-HMAC-SHA256 stretches the password into an AES-256 key. The
//! iteration counts in play are in the millions, which makes a single
//! derivation the dominant CPU cost of the whole pipeline — intentional,
//! since it is what slows offline brute force.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use crate::crypto::{KEY_SIZE, SALT_SIZE};

/// Derive a 256-bit AES key from a password, salt and iteration count.
pub fn derive_key(password: &[u8], salt: &[u8; SALT_SIZE], iterations: u32) -> [u8; KEY_SIZE] {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut key);
    key
}
