//! AES-256-GCM cipher with password-derived iteration counts
//!
//! Encryption picks an iteration count (deterministic, explicit or random),
//! stretches the password with PBKDF2 and seals the payload under a fresh
//! salt and nonce. Decryption tries a caller-supplied guess first, then
//! falls back to the deterministic recomputation. A packet encrypted with a
//! random count that was never recorded out-of-band is unrecoverable by
//! design; there is no brute-force sweep over the random range.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use rand::{Rng, RngCore};
use tracing::debug;
use zeroize::Zeroizing;

use crate::crypto::{
    derive_iterations, derive_key, encode_packet, Packet, ITERATIONS_MAX, ITERATIONS_MIN,
    NONCE_SIZE, SALT_SIZE, TAG_SIZE,
};
use crate::error::{Error, Result};

/// AES-256-GCM instantiated with the packet format's 16-byte nonce
type Aes256Gcm16 = AesGcm<Aes256, U16>;

/// Password pair a cipher is constructed with.
///
/// The primary password feeds the KDF; the secondary one, when non-empty,
/// switches iteration selection to deterministic mode. Both are zeroized on
/// drop.
pub struct Secret {
    password: Zeroizing<String>,
    iterations_password: Zeroizing<String>,
}

impl Secret {
    /// Create a secret from a primary password and an optional (possibly
    /// empty) secondary password.
    pub fn new(password: impl Into<String>, iterations_password: impl Into<String>) -> Self {
        Secret {
            password: Zeroizing::new(password.into()),
            iterations_password: Zeroizing::new(iterations_password.into()),
        }
    }

    /// Whether a usable primary password is present
    pub fn is_configured(&self) -> bool {
        !self.password.is_empty()
    }

    /// Whether deterministic iteration selection is in effect
    pub fn deterministic(&self) -> bool {
        !self.iterations_password.is_empty()
    }
}

/// Authenticated encryption bound to one immutable [`Secret`]
pub struct Cipher {
    secret: Secret,
}

impl Cipher {
    /// Create a cipher owning the given secret.
    pub fn new(secret: Secret) -> Self {
        Cipher { secret }
    }

    /// Encrypt `data`, returning the packet and the iteration count used.
    ///
    /// Iteration selection, in priority order:
    /// 1. secondary password configured: deterministic derivation, even when
    ///    an explicit count was requested;
    /// 2. explicit count: used as-is, rejected (not clamped) below the
    ///    5,000,000 floor;
    /// 3. otherwise: uniform random in `[5_000_000, 6_000_000]`.
    ///
    /// In random mode the caller must record the returned count somewhere
    /// (filename, message, ...) or the packet cannot be decrypted later.
    pub fn encrypt(&self, data: &[u8], iterations: Option<u32>) -> Result<(Vec<u8>, u32)> {
        if !self.secret.is_configured() {
            return Err(Error::EncryptionUnavailable);
        }

        let iterations = self.choose_iterations(iterations)?;

        let mut salt = [0u8; SALT_SIZE];
        rand::thread_rng().fill_bytes(&mut salt);

        let key = Zeroizing::new(derive_key(
            self.secret.password.as_bytes(),
            &salt,
            iterations,
        ));
        let cipher = Aes256Gcm16::new_from_slice(key.as_slice())
            .map_err(|_| Error::Encryption("Failed to create encryption key".to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let mut ciphertext = cipher
            .encrypt(nonce, data)
            .map_err(|_| Error::Encryption("AES-GCM encryption failed".to_string()))?;
        let tag = ciphertext.split_off(ciphertext.len() - TAG_SIZE);

        debug!(
            iterations,
            payload = data.len(),
            "Encrypted payload into packet"
        );

        Ok((
            encode_packet(&salt, &nonce_bytes, &ciphertext, &tag),
            iterations,
        ))
    }

    /// Decrypt a packet, trying `preferred_iterations` first.
    ///
    /// The preferred count is a cheap first guess (for callers who recorded
    /// the count used at encryption time). If it fails to authenticate, the
    /// deterministic count is recomputed from the password pair and tried
    /// once more; after that the operation fails with
    /// [`Error::DecryptionFailed`]. Wrong password and corrupted data are
    /// deliberately indistinguishable in the result.
    pub fn decrypt(&self, packet: &[u8], preferred_iterations: u32) -> Result<Vec<u8>> {
        if !self.secret.is_configured() {
            return Err(Error::EncryptionUnavailable);
        }

        let packet = Packet::decode(packet)?;

        if let Some(plaintext) = self.try_open(&packet, preferred_iterations) {
            return Ok(plaintext);
        }

        let derived = derive_iterations(&self.secret.password, &self.secret.iterations_password);
        debug!(
            preferred = preferred_iterations,
            derived, "Preferred iteration count failed, retrying with derived count"
        );

        self.try_open(&packet, derived).ok_or(Error::DecryptionFailed)
    }

    fn choose_iterations(&self, requested: Option<u32>) -> Result<u32> {
        if self.secret.deterministic() {
            return Ok(derive_iterations(
                &self.secret.password,
                &self.secret.iterations_password,
            ));
        }

        match requested {
            Some(iterations) if iterations < ITERATIONS_MIN => {
                Err(Error::IterationTooLow(iterations))
            }
            Some(iterations) => Ok(iterations),
            None => Ok(rand::thread_rng().gen_range(ITERATIONS_MIN..=ITERATIONS_MAX)),
        }
    }

    /// One decrypt-and-verify attempt. All cryptographic failures collapse
    /// into `None` so the caller cannot tell a bad key from a bad tag.
    fn try_open(&self, packet: &Packet<'_>, iterations: u32) -> Option<Vec<u8>> {
        let salt: [u8; SALT_SIZE] = packet.salt.try_into().ok()?;
        let key = Zeroizing::new(derive_key(
            self.secret.password.as_bytes(),
            &salt,
            iterations,
        ));
        let cipher = Aes256Gcm16::new_from_slice(key.as_slice()).ok()?;

        let mut sealed = Vec::with_capacity(packet.ciphertext.len() + TAG_SIZE);
        sealed.extend_from_slice(packet.ciphertext);
        sealed.extend_from_slice(packet.tag);

        cipher
            .decrypt(Nonce::from_slice(packet.nonce), sealed.as_slice())
            .ok()
    }
}
