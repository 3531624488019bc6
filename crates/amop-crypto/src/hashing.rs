//! # Digest Functions
//!
//! Challenge nonces are hashed before signing. Keccak-256 is the default
//! digest (Ethereum-compatible suites); SHA-256 is kept for suites that
//! sign SHA-256 digests.

use sha2::Sha256;
use sha3::{Digest, Keccak256};

/// 256-bit digest.
pub type Hash = [u8; 32];

/// Keccak-256 digest (one-shot).
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 digest (one-shot).
pub fn sha256(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}
