//! Deterministic iteration-count derivation
//!
//! Hashing the password pair down to a number in a fixed window lets two
//! parties agree on a PBKDF2 work factor without ever writing it down:
//! the count is recomputed from the secrets instead of being stored in
//! the packet.

use sha2::{Digest, Sha256};

use crate::crypto::{ITERATIONS_MAX, ITERATIONS_MIN};

/// Derive an iteration count from the password pair.
///
/// SHA-256 over the UTF-8 concatenation of both passwords; the first four
/// digest bytes, read big-endian, select a count in
/// `[ITERATIONS_MIN, ITERATIONS_MAX]` inclusive. The secondary password may
/// be empty — the result is still deterministic.
pub fn derive_iterations(password: &str, iterations_password: &str) -> u32 {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hasher.update(iterations_password.as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 4];
    prefix.copy_from_slice(&digest[..4]);
    let h = u32::from_be_bytes(prefix);

    ITERATIONS_MIN + h % (ITERATIONS_MAX - ITERATIONS_MIN + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::distributions::{Alphanumeric, DistString};

    #[test]
    fn test_deterministic() {
        let a = derive_iterations("hunter2", "extra");
        let b = derive_iterations("hunter2", "extra");
        assert_eq!(a, b);
    }

    #[test]
    fn test_inputs_change_output() {
        let base = derive_iterations("hunter2", "extra");
        assert_ne!(base, derive_iterations("hunter3", "extra"));
        assert_ne!(base, derive_iterations("hunter2", "other"));
    }

    #[test]
    fn test_empty_secondary_is_valid() {
        let a = derive_iterations("hunter2", "");
        let b = derive_iterations("hunter2", "");
        assert_eq!(a, b);
        assert!(a >= ITERATIONS_MIN && a <= ITERATIONS_MAX);
    }

    #[test]
    fn test_range_invariant() {
        let mut rng = rand::thread_rng();
        for _ in 0..10_000 {
            let pw = Alphanumeric.sample_string(&mut rng, 12);
            let pw2 = Alphanumeric.sample_string(&mut rng, 8);
            let iters = derive_iterations(&pw, &pw2);
            assert!(
                iters >= ITERATIONS_MIN && iters <= ITERATIONS_MAX,
                "derived count {} out of range for ({}, {})",
                iters,
                pw,
                pw2
            );
        }
    }

    #[test]
    fn test_concatenation_boundary() {
        // ("ab", "c") and ("a", "bc") hash the same combined string
        assert_eq!(derive_iterations("ab", "c"), derive_iterations("a", "bc"));
    }
}
