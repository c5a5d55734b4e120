//! Deterministic content hashing for numeric sequences.
//!
//! Constant pools bucket candidate entries by a 64-bit content hash and fall
//! back to element-wise comparison, so the only requirements here are
//! determinism and a reasonable collision rate. The hash is derived from
//! SHA-256 over the raw element encoding; floating values hash their IEEE-754
//! bit patterns so `-0.0` and every NaN payload are distinguished.

use sha2::{Digest, Sha256};

/// Content hash of an integer sequence.
pub fn hash_ints(values: &[i64]) -> u64 {
    let mut hasher = Sha256::new();
    for v in values {
        hasher.update(v.to_le_bytes());
    }
    finish64(hasher)
}

/// Content hash of a floating sequence, over the raw bit patterns.
pub fn hash_reals(values: &[f64]) -> u64 {
    let mut hasher = Sha256::new();
    for v in values {
        hasher.update(v.to_bits().to_le_bytes());
    }
    finish64(hasher)
}

/// Fold a SHA-256 digest into a 64-bit bucket key.
fn finish64(hasher: Sha256) -> u64 {
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        assert_eq!(hash_ints(&[1, 2, 3]), hash_ints(&[1, 2, 3]));
        assert_eq!(hash_reals(&[1.0, 2.0]), hash_reals(&[1.0, 2.0]));
    }

    #[test]
    fn different_inputs_different_hash() {
        assert_ne!(hash_ints(&[1, 2, 3]), hash_ints(&[3, 2, 1]));
        assert_ne!(hash_reals(&[1.0]), hash_reals(&[2.0]));
    }

    #[test]
    fn empty_sequences() {
        assert_eq!(hash_ints(&[]), hash_ints(&[]));
        assert_ne!(hash_ints(&[]), hash_ints(&[0]));
    }

    #[test]
    fn bit_patterns_distinguished() {
        assert_ne!(hash_reals(&[0.0]), hash_reals(&[-0.0]));
        assert_eq!(hash_reals(&[f64::NAN]), hash_reals(&[f64::NAN]));
    }
}
