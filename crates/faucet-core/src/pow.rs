//! SHA-256 proof-of-work primitives.
//!
//! The canonical input concatenation must stay bit-exact with the browser
//! miner: lowercase hex address, decimal block number, seed hex, and nonce
//! joined with no separators.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Canonical miner input: `address || block_number || seed_hex || nonce`.
pub fn canonical_input(address: &str, block_number: u64, seed_hex: &str, nonce: &str) -> String {
    format!("{address}{block_number}{seed_hex}{nonce}")
}

/// SHA-256 over the canonical input, as a lowercase hex digest.
pub fn pow_hash(address: &str, block_number: u64, seed_hex: &str, nonce: &str) -> String {
    let input = canonical_input(address, block_number, seed_hex, nonce);
    hex::encode(Sha256::digest(input.as_bytes()))
}

/// Count leading zero bits of a hex digest read as a big-endian bit string.
///
/// Stops at the first nibble that is not valid hex, so malformed input
/// never passes a positive difficulty.
pub fn leading_zero_bits(hash_hex: &str) -> u32 {
    let mut bits = 0;
    for c in hash_hex.chars() {
        let nibble = match c.to_digit(16) {
            Some(n) => n,
            None => break,
        };
        if nibble == 0 {
            bits += 4;
        } else {
            bits += nibble.leading_zeros() - 28;
            break;
        }
    }
    bits
}

/// Difficulty check: at least `bits` leading zero bits.
pub fn meets_difficulty(hash_hex: &str, bits: u32) -> bool {
    leading_zero_bits(hash_hex) >= bits
}

/// 16 cryptographically secure random bytes, hex-encoded.
pub fn generate_seed_hex() -> String {
    let mut seed = [0u8; 16];
    OsRng.fill_bytes(&mut seed);
    hex::encode(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_input_has_no_separators() {
        let input = canonical_input(
            "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            7,
            "00112233445566778899aabbccddeeff",
            "n-42",
        );
        assert_eq!(
            input,
            "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa700112233445566778899aabbccddeeffn-42"
        );
    }

    #[test]
    fn pow_hash_is_deterministic_lowercase_hex() {
        let a = pow_hash("0xaa", 1, "seed", "nonce");
        let b = pow_hash("0xaa", 1, "seed", "nonce");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));

        let c = pow_hash("0xaa", 1, "seed", "nonce2");
        assert_ne!(a, c);
    }

    #[test]
    fn pow_hash_matches_direct_sha256_of_canonical_input() {
        use sha2::{Digest, Sha256};
        let input = canonical_input("0xab", 3, "feed", "n");
        let expected = hex::encode(Sha256::digest(input.as_bytes()));
        assert_eq!(pow_hash("0xab", 3, "feed", "n"), expected);
    }

    #[test]
    fn leading_zero_bits_counts_nibbles() {
        assert_eq!(leading_zero_bits("ffff"), 0);
        assert_eq!(leading_zero_bits("8000"), 0);
        assert_eq!(leading_zero_bits("7fff"), 1);
        assert_eq!(leading_zero_bits("4000"), 1);
        assert_eq!(leading_zero_bits("2000"), 2);
        assert_eq!(leading_zero_bits("1000"), 3);
        assert_eq!(leading_zero_bits("0f00"), 4);
        assert_eq!(leading_zero_bits("00ff"), 8);
        assert_eq!(leading_zero_bits("0001"), 15);
        assert_eq!(leading_zero_bits("0000"), 16);
    }

    #[test]
    fn leading_zero_bits_stops_at_non_hex() {
        assert_eq!(leading_zero_bits("zz"), 0);
        assert_eq!(leading_zero_bits("0z"), 4);
        assert_eq!(leading_zero_bits(""), 0);
    }

    #[test]
    fn meets_difficulty_boundary() {
        assert!(meets_difficulty("0f00", 4));
        assert!(!meets_difficulty("0f00", 5));
        assert!(meets_difficulty("anything", 0));
    }

    #[test]
    fn seed_is_sixteen_bytes_of_hex() {
        let seed = generate_seed_hex();
        assert_eq!(seed.len(), 32);
        assert!(seed.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(seed, generate_seed_hex());
    }
}
