//! # AMOP Core
//!
//! Topic-based publish/subscribe over persistent connections to routing
//! nodes, with challenge-response authentication for private topics.
//!
//! ## Architecture Role
//!
//! ```text
//! application ──AmopApi──→ [Amop] ──PeerTransport──→ routing nodes
//!                             ↑                            │
//!                             └────PeerEventHandler────────┘
//! ```
//!
//! ## Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | `domain` | envelope codec, topic naming, registry, pending-call table, config |
//! | `ports` | `AmopApi`, `PeerEventHandler`, `PeerTransport`, `CryptoSuite` |
//! | `adapters` | `EcdsaSuite`, `RecordingTransport` |
//! | `service` | `MessageRouter`, `HandshakeEngine` |
//! | `facade` | `Amop` |
//!
//! ## Delivery Semantics
//!
//! Best effort. Lost messages surface as `TIMEOUT` responses and are never
//! retried. Each sequence id resolves at most once.

pub mod adapters;
pub mod domain;
pub mod facade;
pub mod ports;
pub mod service;

pub use adapters::{EcdsaSuite, RecordingTransport};
pub use domain::*;
pub use facade::Amop;
pub use ports::{AmopApi, CryptoSuite, PeerEventHandler, PeerTransport, TransportError};
