//! Cryptography module for cryptpack
//!
//! Provides AES-256-GCM encryption with PBKDF2-HMAC-SHA256 key derivation.
//! The iteration count is either derived deterministically from the
//! configured passwords or chosen at random per encryption; it is never
//! stored inside the packet itself.

mod cipher;
mod iterations;
mod kdf;
mod packet;

pub use cipher::{Cipher, Secret};
pub use iterations::derive_iterations;
pub use kdf::derive_key;
pub use packet::{encode_packet, Packet};

/// Size of AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// Size of the KDF salt in bytes
pub const SALT_SIZE: usize = 16;

/// Size of the GCM nonce in bytes (wider than the usual 96 bits; fixed by
/// the packet format)
pub const NONCE_SIZE: usize = 16;

/// Size of the GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Smallest possible packet: salt + nonce + tag around an empty ciphertext
pub const MIN_PACKET_SIZE: usize = SALT_SIZE + NONCE_SIZE + TAG_SIZE;

/// Lowest iteration count ever accepted or produced
pub const ITERATIONS_MIN: u32 = 5_000_000;

/// Highest iteration count ever produced
pub const ITERATIONS_MAX: u32 = 6_000_000;
