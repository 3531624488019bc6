//! # ECDSA Signatures (secp256k1)
//!
//! Key material for private topics using the secp256k1 curve.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Low-S normalization on signing
//! - Hash-then-sign: callers pass a 32-byte digest, never the raw challenge
//!
//! ## Use Cases
//!
//! - Subscriber side: sign the digest of a verification challenge
//! - Publisher side: check a challenge signature against authorized keys

use crate::CryptoError;
use k256::ecdsa::{
    signature::hazmat::{PrehashSigner, PrehashVerifier},
    Signature, SigningKey, VerifyingKey,
};
use std::fmt;

/// Compressed secp256k1 public key (33 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Secp256k1PublicKey([u8; 33]);

impl Secp256k1PublicKey {
    /// Create from SEC1 bytes, compressed (33 bytes) or uncompressed (65 bytes).
    ///
    /// The key is always stored compressed, so the two encodings of one
    /// point compare equal.
    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self::from_verifying_key(&verifying_key))
    }

    /// Parse a hex-encoded SEC1 key (optional `0x` prefix).
    pub fn from_hex(input: &str) -> Result<Self, CryptoError> {
        let bytes = decode_hex(input)?;
        Self::from_sec1_bytes(&bytes)
    }

    fn from_verifying_key(verifying_key: &VerifyingKey) -> Self {
        let sec1_bytes = verifying_key.to_sec1_bytes();
        // SEC1 compressed encoding is always 33 bytes
        let mut bytes = [0u8; 33];
        bytes.copy_from_slice(&sec1_bytes[..33]);
        Self(bytes)
    }

    /// Get raw compressed bytes.
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    /// Lowercase hex of the compressed encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Verify a signature over a pre-computed digest.
    pub fn verify_prehash(
        &self,
        digest: &[u8],
        signature: &Secp256k1Signature,
    ) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_sec1_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig = Signature::from_slice(&signature.0).map_err(|_| CryptoError::InvalidSignature)?;

        verifying_key
            .verify_prehash(digest, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

impl fmt::Debug for Secp256k1PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secp256k1PublicKey({})", self.to_hex())
    }
}

/// ECDSA signature (64 bytes, r||s format).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Secp256k1Signature([u8; 64]);

impl Secp256k1Signature {
    /// Create from bytes (64 bytes).
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, rejecting anything that is not exactly 64 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; 64] = bytes.try_into().map_err(|_| CryptoError::InvalidSignature)?;
        Ok(Self(array))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

/// secp256k1 ECDSA keypair.
///
/// The secret scalar is zeroized by `k256` when the key pair is dropped.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_slice(bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Parse a hex-encoded 32-byte secret (optional `0x` prefix).
    pub fn from_hex(input: &str) -> Result<Self, CryptoError> {
        let mut bytes = decode_hex(input)?;
        let result = Self::from_bytes(&bytes);
        zeroize::Zeroize::zeroize(&mut bytes);
        result
    }

    /// Get public key (compressed, 33 bytes).
    pub fn public_key(&self) -> Secp256k1PublicKey {
        Secp256k1PublicKey::from_verifying_key(self.signing_key.verifying_key())
    }

    /// Sign a pre-computed digest (deterministic RFC 6979).
    ///
    /// # Errors
    ///
    /// `CryptoError::InvalidDigest` if the digest is shorter than 16 bytes.
    pub fn sign_prehash(&self, digest: &[u8]) -> Result<Secp256k1Signature, CryptoError> {
        let sig: Signature = self
            .signing_key
            .sign_prehash(digest)
            .map_err(|_| CryptoError::InvalidDigest(digest.len()))?;
        let bytes: [u8; 64] = sig.to_bytes().into();
        Ok(Secp256k1Signature(bytes))
    }

    /// Get secret key bytes (for serialization).
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }
}

impl fmt::Debug for Secp256k1KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secp256k1KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

fn decode_hex(input: &str) -> Result<Vec<u8>, CryptoError> {
    let trimmed = input.trim();
    let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(stripped).map_err(|e| CryptoError::InvalidHex(e.to_string()))
}
