//! Port adapters.
//!
//! - **crypto**: `EcdsaSuite`, secp256k1 behind `CryptoSuite`
//! - **memory**: `RecordingTransport`, in-memory `PeerTransport`

pub mod crypto;
pub mod memory;

pub use crypto::{DigestAlgorithm, EcdsaSuite};
pub use memory::{Destination, RecordingTransport, Sent};
