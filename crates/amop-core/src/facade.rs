//! # AMOP Facade
//!
//! Public entry point. Composes the registry, pending-call table, router
//! and handshake engine behind [`AmopApi`] and [`PeerEventHandler`].
//!
//! ```ignore
//! let amop = Amop::new(AmopConfig::default(), transport, Arc::new(EcdsaSuite::keccak()));
//! amop.start().await;
//! amop.subscribe("prices", Arc::new(|d: &Delivery| d.content.clone())).await?;
//! let resp = amop.publish("prices", b"42".to_vec(), None).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use amop_crypto::{Secp256k1KeyPair, Secp256k1PublicKey};
use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::domain::topic::{need_verify_topic, validate_private_topic, validate_topic};
use crate::domain::{
    codes, AmopConfig, AmopError, Message, PeerId, PendingStatsSnapshot, Response,
    ResponseCallback, SharedCallback,
};
use crate::ports::{AmopApi, CryptoSuite, PeerEventHandler, PeerTransport};
use crate::service::{AmopCore, MessageRouter, Target};

/// AMOP instance bound to one transport.
#[derive(Clone)]
pub struct Amop {
    core: Arc<AmopCore>,
    router: MessageRouter,
}

impl Amop {
    /// Create a stopped instance on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Outside a Tokio runtime. Use [`with_runtime`](Self::with_runtime)
    /// to supply a handle explicitly.
    pub fn new(
        config: AmopConfig,
        transport: Arc<dyn PeerTransport>,
        crypto: Arc<dyn CryptoSuite>,
    ) -> Self {
        Self::with_runtime(config, transport, crypto, Handle::current())
    }

    pub fn with_runtime(
        config: AmopConfig,
        transport: Arc<dyn PeerTransport>,
        crypto: Arc<dyn CryptoSuite>,
        runtime: Handle,
    ) -> Self {
        let core = Arc::new(AmopCore::new(config, transport, crypto, runtime));
        let router = MessageRouter::new(Arc::clone(&core));
        Self { core, router }
    }

    pub fn config(&self) -> &AmopConfig {
        &self.core.config
    }

    /// Start routing and announce local topics to every connected peer.
    pub async fn start(&self) {
        if self.core.set_running(true) {
            return;
        }
        info!("AMOP started");
        for peer in self.core.transport.connected_peers() {
            self.core.announce_to(&peer).await;
        }
    }

    /// Stop routing. Subscriptions and pending calls are kept.
    pub fn stop(&self) {
        if self.core.set_running(false) {
            info!("AMOP stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.core.is_running()
    }

    /// Stop, fail every pending call with `SHUTDOWN` and drop all
    /// subscriptions and key material. Returns the calls cancelled.
    pub fn shutdown(&self) -> usize {
        self.stop();
        let cancelled = self.core.pending.cancel_all();
        self.core.registry.clear();
        info!(cancelled, "AMOP shut down");
        cancelled
    }

    /// [`AmopApi::publish`] for callers outside the runtime.
    ///
    /// # Panics
    ///
    /// When called from within an async context.
    pub fn publish_blocking(
        &self,
        topic: &str,
        payload: Vec<u8>,
        timeout: Option<Duration>,
    ) -> Result<Response, AmopError> {
        validate_topic(topic)?;
        self.ensure_running()?;

        let (tx, rx) = oneshot::channel();
        let amop = self.clone();
        let topic = topic.to_string();
        self.core.runtime.spawn(async move {
            let _ = tx.send(amop.publish(&topic, payload, timeout).await);
        });
        rx.blocking_recv().unwrap_or_else(|_| Ok(Response::shutdown()))
    }

    fn ensure_running(&self) -> Result<(), AmopError> {
        if self.core.is_running() {
            Ok(())
        } else {
            Err(AmopError::NotRunning)
        }
    }

    fn timeout_or_default(&self, timeout: Option<Duration>) -> Duration {
        timeout.unwrap_or_else(|| self.core.config.default_timeout())
    }

    async fn request(
        &self,
        wire_topic: String,
        payload: Vec<u8>,
        timeout: Option<Duration>,
    ) -> Response {
        let (tx, rx) = oneshot::channel();
        let callback: ResponseCallback = Box::new(move |resp| {
            let _ = tx.send(resp);
        });
        self.core
            .send_request(
                Message::request(wire_topic, payload),
                Target::Random,
                self.timeout_or_default(timeout),
                callback,
            )
            .await;
        rx.await.unwrap_or_else(|_| {
            Response::error(codes::MESSAGE_SEND_EXCEPTION, "Response channel closed")
        })
    }
}

#[async_trait]
impl AmopApi for Amop {
    async fn subscribe(&self, topic: &str, callback: SharedCallback) -> Result<(), AmopError> {
        validate_topic(topic)?;
        if self.core.registry.subscribe(topic, callback) {
            debug!(topic = topic, "Replaced topic callback");
        }
        info!(topic = topic, "Subscribed");
        self.core.announce_all().await;
        Ok(())
    }

    async fn subscribe_private_topic(
        &self,
        topic: &str,
        key: Arc<Secp256k1KeyPair>,
        callback: SharedCallback,
    ) -> Result<(), AmopError> {
        validate_private_topic(topic)?;
        self.core.registry.set_private_key(topic, key);
        self.core
            .registry
            .subscribe(&need_verify_topic(topic), callback);
        info!(topic = topic, "Subscribed to private topic");
        self.core.announce_all().await;
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> bool {
        let public = self.core.registry.unsubscribe(topic);
        let private = self.core.registry.unsubscribe(&need_verify_topic(topic));
        if private {
            self.core.registry.remove_private_key(topic);
        }
        if !(public || private) {
            return false;
        }
        info!(topic = topic, "Unsubscribed");
        self.core.announce_all().await;
        true
    }

    fn set_default_callback(&self, callback: Option<SharedCallback>) {
        self.core.registry.set_default_callback(callback);
    }

    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        timeout: Option<Duration>,
    ) -> Result<Response, AmopError> {
        validate_topic(topic)?;
        self.ensure_running()?;
        Ok(self.request(topic.to_string(), payload, timeout).await)
    }

    async fn publish_with_callback(
        &self,
        topic: &str,
        payload: Vec<u8>,
        timeout: Option<Duration>,
        callback: ResponseCallback,
    ) -> Result<(), AmopError> {
        validate_topic(topic)?;
        self.ensure_running()?;
        self.core
            .send_request(
                Message::request(topic, payload),
                Target::Random,
                self.timeout_or_default(timeout),
                callback,
            )
            .await;
        Ok(())
    }

    async fn publish_private(
        &self,
        topic: &str,
        payload: Vec<u8>,
        timeout: Option<Duration>,
    ) -> Result<Response, AmopError> {
        validate_private_topic(topic)?;
        self.ensure_running()?;
        if !self.core.registry.has_public_keys(topic) {
            return Err(AmopError::PrivateTopicNotPublished(topic.to_string()));
        }
        Ok(self
            .request(need_verify_topic(topic), payload, timeout)
            .await)
    }

    async fn broadcast(&self, topic: &str, payload: Vec<u8>) -> Result<usize, AmopError> {
        validate_topic(topic)?;
        self.ensure_running()?;
        match self
            .core
            .transport
            .broadcast(Message::multicast(topic, payload))
            .await
        {
            Ok(peers) => {
                debug!(topic = topic, peers, "Broadcast sent");
                Ok(peers)
            }
            Err(e) => {
                warn!(topic = topic, error = %e, error_code = e.error_code(), "Broadcast failed");
                Ok(0)
            }
        }
    }

    async fn multicast(
        &self,
        peers: &[PeerId],
        topic: &str,
        payload: Vec<u8>,
    ) -> Result<usize, AmopError> {
        validate_topic(topic)?;
        self.ensure_running()?;
        let message = Message::multicast(topic, payload);
        let mut reached = 0;
        for peer in peers {
            match self.core.transport.send_to_peer(peer, message.clone()).await {
                Ok(()) => reached += 1,
                Err(e) => warn!(topic = topic, peer = %peer, error = %e, "Multicast send failed"),
            }
        }
        debug!(topic = topic, reached, requested = peers.len(), "Multicast sent");
        Ok(reached)
    }

    async fn publish_private_topic(
        &self,
        topic: &str,
        keys: Vec<Secp256k1PublicKey>,
    ) -> Result<usize, AmopError> {
        validate_private_topic(topic)?;
        if keys.is_empty() {
            return Err(AmopError::EmptyKeySet(topic.to_string()));
        }
        self.ensure_running()?;

        let total = self.core.registry.add_public_keys(topic, &keys);
        info!(topic = topic, keys = total, "Published private topic");
        self.core.announce_all().await;

        let peers = self.core.transport.connected_peers();
        for peer in &peers {
            self.router
                .handshake()
                .start_verification(topic, peer.to_string(), peer.clone())
                .await;
        }
        Ok(peers.len())
    }

    fn subscribed_topics(&self) -> Vec<String> {
        self.core.registry.local_topics()
    }

    fn peer_topics(&self, peer: &PeerId) -> Vec<String> {
        self.core.registry.peer_topics(peer)
    }

    fn pending_count(&self) -> usize {
        self.core.pending.pending_count()
    }

    fn stats(&self) -> PendingStatsSnapshot {
        self.core.pending.stats()
    }
}

#[async_trait]
impl PeerEventHandler for Amop {
    async fn on_connect(&self, peer: PeerId, topics: Vec<String>) {
        self.router.on_connect(peer, topics).await;
    }

    async fn on_disconnect(&self, peer: &PeerId) {
        self.router.on_disconnect(peer);
    }

    async fn on_message(&self, peer: PeerId, message: Message) {
        self.router.dispatch(peer, message).await;
    }

    async fn on_frame(&self, peer: PeerId, frame: &[u8]) {
        match Message::decode(frame) {
            Ok(message) => self.router.dispatch(peer, message).await,
            Err(e) => warn!(
                peer = %peer,
                error = %e,
                error_code = codes::MESSAGE_DECODE_ERROR,
                "Dropping undecodable frame"
            ),
        }
    }
}
