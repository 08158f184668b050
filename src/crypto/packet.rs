//! Encrypted packet framing
//!
//! Binary layout, fixed and version-less:
//!
//! ```text
//! offset 0..16   : salt (16 raw bytes)
//! offset 16..32  : nonce (16 raw bytes)
//! offset 32..N-16: ciphertext (N-48 bytes)
//! offset N-16..N : authentication tag (16 raw bytes)
//! ```
//!
//! There is no magic number, no version byte and no stored iteration count.
//! Existing archives were produced in exactly this layout, so any change
//! here is a format break. Authenticity is checked during decryption, not
//! here; this layer only slices.

use crate::crypto::{MIN_PACKET_SIZE, NONCE_SIZE, SALT_SIZE, TAG_SIZE};
use crate::error::{Error, Result};

/// Borrowed view over the fields of an encrypted packet
#[derive(Debug)]
pub struct Packet<'a> {
    /// KDF salt
    pub salt: &'a [u8],
    /// GCM nonce
    pub nonce: &'a [u8],
    /// Ciphertext (may be empty)
    pub ciphertext: &'a [u8],
    /// GCM authentication tag
    pub tag: &'a [u8],
}

impl<'a> Packet<'a> {
    /// Slice a raw packet into its fields.
    ///
    /// Fails with [`Error::MalformedPacket`] when the input is shorter than
    /// the 48-byte minimum (empty ciphertext).
    pub fn decode(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < MIN_PACKET_SIZE {
            return Err(Error::MalformedPacket(bytes.len()));
        }

        let tag_start = bytes.len() - TAG_SIZE;
        Ok(Packet {
            salt: &bytes[..SALT_SIZE],
            nonce: &bytes[SALT_SIZE..SALT_SIZE + NONCE_SIZE],
            ciphertext: &bytes[SALT_SIZE + NONCE_SIZE..tag_start],
            tag: &bytes[tag_start..],
        })
    }
}

/// Assemble a packet from its fields by plain concatenation.
pub fn encode_packet(salt: &[u8], nonce: &[u8], ciphertext: &[u8], tag: &[u8]) -> Vec<u8> {
    let mut packet = Vec::with_capacity(salt.len() + nonce.len() + ciphertext.len() + tag.len());
    packet.extend_from_slice(salt);
    packet.extend_from_slice(nonce);
    packet.extend_from_slice(ciphertext);
    packet.extend_from_slice(tag);
    packet
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let salt = [1u8; SALT_SIZE];
        let nonce = [2u8; NONCE_SIZE];
        let ciphertext = b"not really encrypted";
        let tag = [3u8; TAG_SIZE];

        let bytes = encode_packet(&salt, &nonce, ciphertext, &tag);
        assert_eq!(bytes.len(), MIN_PACKET_SIZE + ciphertext.len());

        let packet = Packet::decode(&bytes).unwrap();
        assert_eq!(packet.salt, salt);
        assert_eq!(packet.nonce, nonce);
        assert_eq!(packet.ciphertext, ciphertext);
        assert_eq!(packet.tag, tag);
    }

    #[test]
    fn test_empty_ciphertext() {
        let bytes = encode_packet(&[1u8; SALT_SIZE], &[2u8; NONCE_SIZE], &[], &[3u8; TAG_SIZE]);
        assert_eq!(bytes.len(), MIN_PACKET_SIZE);

        let packet = Packet::decode(&bytes).unwrap();
        assert!(packet.ciphertext.is_empty());
    }

    #[test]
    fn test_too_short_rejected() {
        let bytes = vec![0u8; MIN_PACKET_SIZE - 1];
        match Packet::decode(&bytes) {
            Err(Error::MalformedPacket(len)) => assert_eq!(len, MIN_PACKET_SIZE - 1),
            other => panic!("expected MalformedPacket, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(
            Packet::decode(&[]),
            Err(Error::MalformedPacket(0))
        ));
    }
}
