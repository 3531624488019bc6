//! # AMOP Service Layer
//!
//! [`AmopCore`] holds the shared state every path works on. The
//! [`MessageRouter`] dispatches inbound messages; the [`HandshakeEngine`]
//! runs private topic verification on top of the same state.

mod handshake;
mod router;

pub use handshake::HandshakeEngine;
pub use router::MessageRouter;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, error, warn};

use crate::domain::topic::need_verify_topic;
use crate::domain::{
    AmopConfig, ClientTopics, JsonPayload, Message, MessageType, PeerId, PendingCallTable,
    Response, ResponseCallback, TopicRegistry,
};
use crate::ports::{CryptoSuite, PeerTransport};

/// Where a request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Any available peer.
    Random,
    /// This peer if it is connected, otherwise any available peer.
    Prefer(PeerId),
}

/// State shared by router, handshake engine and facade.
pub struct AmopCore {
    pub(crate) config: AmopConfig,
    pub(crate) registry: TopicRegistry,
    pub(crate) pending: PendingCallTable,
    pub(crate) transport: Arc<dyn PeerTransport>,
    pub(crate) crypto: Arc<dyn CryptoSuite>,
    pub(crate) runtime: Handle,
    running: AtomicBool,
}

impl AmopCore {
    pub fn new(
        config: AmopConfig,
        transport: Arc<dyn PeerTransport>,
        crypto: Arc<dyn CryptoSuite>,
        runtime: Handle,
    ) -> Self {
        Self {
            config,
            registry: TopicRegistry::new(),
            pending: PendingCallTable::new(runtime.clone()),
            transport,
            crypto,
            runtime,
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn set_running(&self, running: bool) -> bool {
        self.running.swap(running, Ordering::AcqRel)
    }

    /// Register `callback` under the message's sequence id, then send.
    ///
    /// Send failures resolve the call immediately with the transport's
    /// error code, so the callback still runs exactly once.
    pub(crate) async fn send_request(
        &self,
        message: Message,
        target: Target,
        timeout: Duration,
        callback: ResponseCallback,
    ) {
        let seq = message.seq.clone();
        let topic = message.topic.clone();
        self.pending.register(seq.clone(), &topic, timeout, callback);

        let sent = match target {
            Target::Prefer(peer) if self.transport.connected_peers().contains(&peer) => self
                .transport
                .send_to_peer(&peer, message)
                .await
                .map(|()| peer),
            _ => self.transport.send_to_random_peer(message).await,
        };

        match sent {
            Ok(peer) => debug!(seq = %seq, topic = %topic, peer = %peer, "Request sent"),
            Err(e) => {
                error!(seq = %seq, topic = %topic, error = %e, "Request send failed");
                self.pending
                    .resolve(&seq, Response::error(e.error_code(), e.to_string()));
            }
        }
    }

    /// Wire topics we announce: subscriptions plus the private topics we
    /// can verify.
    pub(crate) fn announced_topics(&self) -> Vec<String> {
        let mut topics = self.registry.local_topics();
        topics.extend(
            self.registry
                .published_private_topics()
                .iter()
                .map(|t| need_verify_topic(t)),
        );
        topics.sort();
        topics.dedup();
        topics
    }

    /// `CLIENT_TOPICS` announcement of [`announced_topics`](Self::announced_topics).
    pub(crate) fn client_topics_message(&self) -> Result<Message, serde_json::Error> {
        let body = ClientTopics {
            topics: self.announced_topics(),
        };
        Ok(Message::new(
            MessageType::AmopClientTopics,
            "",
            body.to_bytes()?,
        ))
    }

    /// Announce local topics to one peer.
    pub(crate) async fn announce_to(&self, peer: &PeerId) {
        let message = match self.client_topics_message() {
            Ok(message) => message,
            Err(e) => {
                warn!(peer = %peer, error = %e, "Failed to serialize topic announcement");
                return;
            }
        };
        if let Err(e) = self.transport.send_to_peer(peer, message).await {
            warn!(peer = %peer, error = %e, "Failed to announce topics");
        }
    }

    /// Announce local topics to every connected peer, if configured to.
    pub(crate) async fn announce_all(&self) {
        if !self.is_running() || !self.config.announce_topics_on_subscribe {
            return;
        }
        let message = match self.client_topics_message() {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Failed to serialize topic announcement");
                return;
            }
        };
        match self.transport.broadcast(message).await {
            Ok(peers) => debug!(peers, "Announced topics"),
            Err(e) => debug!(error = %e, "Topic announcement not delivered"),
        }
    }
}
