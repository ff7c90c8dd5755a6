//! Secret comparison helpers.
//!
//! API keys are compared through fixed-length SHA-256 digests with
//! `subtle::ConstantTimeEq`, so neither the content nor the length of the
//! configured key leaks through response timing.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Compare two secrets in constant time.
///
/// Both inputs are hashed first, so the comparison always runs over two
/// 32-byte digests. An attacker timing `/DevOps` responses learns neither
/// how many leading bytes of a guessed API key were right nor how long the
/// configured key is. Use this for every comparison against a configured
/// secret (API key, metrics bearer token), never `==`.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let ha = Sha256::digest(a);
    let hb = Sha256::digest(b);
    ha.ct_eq(&hb).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_inputs_match() {
        assert!(constant_time_eq(
            b"2f5ae96c-b558-4c7b-a590-a501ae1c3f6c",
            b"2f5ae96c-b558-4c7b-a590-a501ae1c3f6c"
        ));
    }

    #[test]
    fn different_inputs_do_not_match() {
        assert!(!constant_time_eq(b"api-key", b"wrong-api-key"));
    }

    #[test]
    fn prefix_does_not_match() {
        assert!(!constant_time_eq(b"api", b"api-key"));
    }

    #[test]
    fn empty_vs_nonempty_do_not_match() {
        assert!(!constant_time_eq(b"", b"api-key"));
    }
}
