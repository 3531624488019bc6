//! # Outbound Ports
//!
//! What the AMOP core needs from its surroundings: a way to put messages
//! on the wire and a signature scheme for private topics.

use amop_crypto::{CryptoError, Secp256k1KeyPair, Secp256k1PublicKey};
use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{codes, Message, PeerId};

/// Transport failures, as seen by the core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No connected peer can take the message.
    #[error("No available peer")]
    NoAvailablePeer,

    /// Addressed peer is not connected.
    #[error("Peer not connected: {0}")]
    PeerNotConnected(PeerId),

    /// Write failed.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Transport has shut down.
    #[error("Transport closed")]
    Closed,
}

impl TransportError {
    /// Error code reported to callers.
    pub fn error_code(&self) -> i32 {
        match self {
            Self::NoAvailablePeer => codes::NO_AVAILABLE_SESSION,
            Self::PeerNotConnected(_) | Self::SendFailed(_) | Self::Closed => {
                codes::MESSAGE_SEND_EXCEPTION
            }
        }
    }
}

/// Connection layer to the routing nodes.
///
/// Implementations queue the message and return; they must not wait for
/// the remote side to answer.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Send to one identified peer.
    async fn send_to_peer(&self, peer: &PeerId, message: Message) -> Result<(), TransportError>;

    /// Send to any one available peer. Returns the peer chosen.
    async fn send_to_random_peer(&self, message: Message) -> Result<PeerId, TransportError>;

    /// Send to every connected peer. Returns how many peers took it.
    async fn broadcast(&self, message: Message) -> Result<usize, TransportError>;

    /// Currently connected peers.
    fn connected_peers(&self) -> Vec<PeerId>;
}

/// Hash and signature capability for private topic handshakes.
pub trait CryptoSuite: Send + Sync {
    /// Digest the challenge nonce before signing or verifying.
    fn hash(&self, data: &[u8]) -> Vec<u8>;

    /// Sign a digest.
    fn sign(&self, key: &Secp256k1KeyPair, digest: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Check a signature. Malformed input is a failed check, not an error.
    fn verify(&self, key: &Secp256k1PublicKey, digest: &[u8], signature: &[u8]) -> bool;
}
