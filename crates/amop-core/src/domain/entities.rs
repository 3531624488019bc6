//! Peers, deliveries and subscriber callbacks.

use std::fmt;
use std::sync::Arc;

use super::message::SequenceId;

/// Identifier of a connected routing node, as assigned by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PeerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A message handed to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Peer the message arrived from.
    pub peer: PeerId,
    pub seq: SequenceId,
    /// Plain topic name, with any private prefix removed.
    pub topic: String,
    pub content: Vec<u8>,
    /// Fire-and-forget delivery; the return value is discarded.
    pub multicast: bool,
    /// Arrived on a private topic.
    pub private: bool,
}

/// Subscriber handler.
///
/// Runs on the thread that delivered the message, so it must not block.
/// The returned bytes become the response payload for request deliveries.
pub trait AmopCallback: Send + Sync {
    fn receive(&self, delivery: &Delivery) -> Vec<u8>;
}

impl<F> AmopCallback for F
where
    F: Fn(&Delivery) -> Vec<u8> + Send + Sync,
{
    fn receive(&self, delivery: &Delivery) -> Vec<u8> {
        self(delivery)
    }
}

/// Shared subscriber handler.
pub type SharedCallback = Arc<dyn AmopCallback>;
