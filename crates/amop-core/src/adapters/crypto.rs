//! secp256k1 ECDSA adapter for the [`CryptoSuite`] port.

use amop_crypto::{
    keccak256, sha256, CryptoError, Secp256k1KeyPair, Secp256k1PublicKey, Secp256k1Signature,
};

use crate::ports::CryptoSuite;

/// Digest applied to a challenge before signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Keccak256,
    Sha256,
}

/// ECDSA over secp256k1 with a configurable digest.
#[derive(Debug, Clone, Copy)]
pub struct EcdsaSuite {
    digest: DigestAlgorithm,
}

impl EcdsaSuite {
    pub fn keccak() -> Self {
        Self {
            digest: DigestAlgorithm::Keccak256,
        }
    }

    pub fn sha256() -> Self {
        Self {
            digest: DigestAlgorithm::Sha256,
        }
    }

    pub fn digest_algorithm(&self) -> DigestAlgorithm {
        self.digest
    }
}

impl Default for EcdsaSuite {
    fn default() -> Self {
        Self::keccak()
    }
}

impl CryptoSuite for EcdsaSuite {
    fn hash(&self, data: &[u8]) -> Vec<u8> {
        match self.digest {
            DigestAlgorithm::Keccak256 => keccak256(data).to_vec(),
            DigestAlgorithm::Sha256 => sha256(data).to_vec(),
        }
    }

    fn sign(&self, key: &Secp256k1KeyPair, digest: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(key.sign_prehash(digest)?.as_bytes().to_vec())
    }

    fn verify(&self, key: &Secp256k1PublicKey, digest: &[u8], signature: &[u8]) -> bool {
        Secp256k1Signature::from_slice(signature)
            .and_then(|sig| key.verify_prehash(digest, &sig))
            .is_ok()
    }
}
