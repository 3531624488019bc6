//! Errors raised while handling topic key material.

use thiserror::Error;

/// Key parsing, signing and verification failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Well-formed signature that does not match the key and digest
    #[error("Challenge signature does not match the topic key")]
    SignatureVerificationFailed,

    /// Bytes are not a point on secp256k1
    #[error("Malformed secp256k1 public key")]
    InvalidPublicKey,

    /// Bytes are not a valid secp256k1 scalar
    #[error("Malformed secp256k1 secret key")]
    InvalidPrivateKey,

    /// Not a 64-byte r||s signature
    #[error("Malformed challenge signature")]
    InvalidSignature,

    /// Digest was rejected by the signer (too short)
    #[error("Digest of {0} bytes cannot be signed")]
    InvalidDigest(usize),

    /// Hex input could not be decoded
    #[error("Key is not valid hex: {0}")]
    InvalidHex(String),
}
