//! Hexagonal ports.

pub mod inbound;
pub mod outbound;

pub use inbound::{AmopApi, PeerEventHandler};
pub use outbound::{CryptoSuite, PeerTransport, TransportError};
