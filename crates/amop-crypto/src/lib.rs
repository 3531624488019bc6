//! # AMOP Crypto - Signing Primitives for Private Topics
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | Keccak-256, SHA-256 | Challenge digests |
//! | `ecdsa` | secp256k1 | Topic key pairs, challenge signatures |
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic nonces, low-S normalization
//! - Signing operates on a pre-computed digest (hash-then-sign), so the
//!   caller picks the hash function and the signer never sees raw input

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;
pub mod hashing;

// Re-exports
pub use ecdsa::{Secp256k1KeyPair, Secp256k1PublicKey, Secp256k1Signature};
pub use errors::CryptoError;
pub use hashing::{keccak256, sha256, Hash};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
