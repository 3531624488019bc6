//! # Domain Layer for AMOP
//!
//! Wire types and the shared state the router works on. Nothing here
//! touches a transport.
//!
//! ## Contents
//!
//! - **message**: envelope codec (`Message`, `MessageType`, `SequenceId`)
//! - **topic**: private topic naming and validation
//! - **payloads**: JSON bodies of control messages
//! - **response**: `Response` and error codes
//! - **pending**: `PendingCallTable`, exactly-once request correlation
//! - **registry**: `TopicRegistry`, subscriptions, peer views and keys
//! - **entities**: `PeerId`, `Delivery`, `AmopCallback`
//! - **config**: `AmopConfig`

mod config;
mod entities;
mod errors;
mod message;
mod payloads;
mod pending;
mod registry;
mod response;
pub mod topic;

pub use config::*;
pub use entities::*;
pub use errors::*;
pub use message::*;
pub use payloads::*;
pub use pending::*;
pub use registry::*;
pub use response::*;
