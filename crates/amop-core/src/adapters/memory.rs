//! In-memory [`PeerTransport`] that records every send.
//!
//! Used by tests and by embedders that want to inspect traffic before
//! wiring a real connection layer.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;

use crate::domain::{Message, MessageType, PeerId};
use crate::ports::{PeerTransport, TransportError};

/// Where a recorded message was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Peer(PeerId),
    /// Chosen by `send_to_random_peer`.
    Random(PeerId),
    Broadcast,
}

/// One recorded send.
#[derive(Debug, Clone)]
pub struct Sent {
    pub destination: Destination,
    pub message: Message,
}

/// Recording transport with a fixed peer set.
///
/// `send_to_random_peer` always picks the first peer, so tests stay
/// deterministic.
#[derive(Default)]
pub struct RecordingTransport {
    peers: RwLock<Vec<PeerId>>,
    sent: Mutex<Vec<Sent>>,
    failure: Mutex<Option<TransportError>>,
    notify: Notify,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_peers<I, P>(peers: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PeerId>,
    {
        let transport = Self::new();
        *transport.peers.write() = peers.into_iter().map(Into::into).collect();
        transport
    }

    pub fn connect(&self, peer: PeerId) {
        let mut peers = self.peers.write();
        if !peers.contains(&peer) {
            peers.push(peer);
        }
    }

    pub fn disconnect(&self, peer: &PeerId) {
        self.peers.write().retain(|p| p != peer);
    }

    /// Fail every send with `error` until cleared with `None`.
    pub fn set_failure(&self, error: Option<TransportError>) {
        *self.failure.lock() = error;
    }

    /// Everything sent so far.
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().clone()
    }

    /// Drain the record.
    pub fn take_sent(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.sent.lock())
    }

    pub fn sent_of_type(&self, msg_type: MessageType) -> Vec<Sent> {
        self.sent
            .lock()
            .iter()
            .filter(|s| s.message.msg_type == msg_type)
            .cloned()
            .collect()
    }

    /// Wait until a recorded send matches `predicate`.
    pub async fn wait_for<F>(&self, timeout: Duration, predicate: F) -> Option<Sent>
    where
        F: Fn(&Sent) -> bool,
    {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                if let Some(found) = self.sent.lock().iter().find(|s| predicate(s)).cloned() {
                    return found;
                }
                notified.await;
            }
        })
        .await
        .ok()
    }

    fn record(&self, destination: Destination, message: Message) -> Result<(), TransportError> {
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        self.sent.lock().push(Sent {
            destination,
            message,
        });
        self.notify.notify_waiters();
        Ok(())
    }
}

#[async_trait]
impl PeerTransport for RecordingTransport {
    async fn send_to_peer(&self, peer: &PeerId, message: Message) -> Result<(), TransportError> {
        if !self.peers.read().contains(peer) {
            return Err(TransportError::PeerNotConnected(peer.clone()));
        }
        self.record(Destination::Peer(peer.clone()), message)
    }

    async fn send_to_random_peer(&self, message: Message) -> Result<PeerId, TransportError> {
        let peer = self
            .peers
            .read()
            .first()
            .cloned()
            .ok_or(TransportError::NoAvailablePeer)?;
        self.record(Destination::Random(peer.clone()), message)?;
        Ok(peer)
    }

    async fn broadcast(&self, message: Message) -> Result<usize, TransportError> {
        let count = self.peers.read().len();
        if count == 0 {
            return Err(TransportError::NoAvailablePeer);
        }
        self.record(Destination::Broadcast, message)?;
        Ok(count)
    }

    fn connected_peers(&self) -> Vec<PeerId> {
        self.peers.read().clone()
    }
}
