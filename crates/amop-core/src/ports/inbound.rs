//! # Inbound Ports
//!
//! - [`AmopApi`]: what application code calls
//! - [`PeerEventHandler`]: what the transport calls

use std::sync::Arc;
use std::time::Duration;

use amop_crypto::{Secp256k1KeyPair, Secp256k1PublicKey};
use async_trait::async_trait;

use crate::domain::{
    AmopError, Message, PeerId, PendingStatsSnapshot, Response, ResponseCallback, SharedCallback,
};

/// Primary AMOP API.
///
/// Topic arguments are plain names. Private topics get their reserved
/// prefix internally.
#[async_trait]
pub trait AmopApi: Send + Sync {
    /// Register `callback` for `topic`, replacing any previous one.
    async fn subscribe(&self, topic: &str, callback: SharedCallback) -> Result<(), AmopError>;

    /// Subscribe to a private topic, holding `key` to answer challenges.
    async fn subscribe_private_topic(
        &self,
        topic: &str,
        key: Arc<Secp256k1KeyPair>,
        callback: SharedCallback,
    ) -> Result<(), AmopError>;

    /// Drop the subscription for `topic`, public or private.
    /// Returns false if nothing was subscribed.
    async fn unsubscribe(&self, topic: &str) -> bool;

    /// Handler for deliveries on topics without their own callback.
    fn set_default_callback(&self, callback: Option<SharedCallback>);

    /// Send a request and wait for the response or the timeout.
    ///
    /// `timeout` defaults to the configured `default_timeout_ms`.
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        timeout: Option<Duration>,
    ) -> Result<Response, AmopError>;

    /// Send a request; `callback` receives the response or the timeout.
    async fn publish_with_callback(
        &self,
        topic: &str,
        payload: Vec<u8>,
        timeout: Option<Duration>,
        callback: ResponseCallback,
    ) -> Result<(), AmopError>;

    /// Send a request on a private topic published with
    /// [`publish_private_topic`](Self::publish_private_topic).
    async fn publish_private(
        &self,
        topic: &str,
        payload: Vec<u8>,
        timeout: Option<Duration>,
    ) -> Result<Response, AmopError>;

    /// Fire-and-forget to every connected peer. Returns peers reached.
    async fn broadcast(&self, topic: &str, payload: Vec<u8>) -> Result<usize, AmopError>;

    /// Fire-and-forget to the given peers. Returns peers reached.
    async fn multicast(
        &self,
        peers: &[PeerId],
        topic: &str,
        payload: Vec<u8>,
    ) -> Result<usize, AmopError>;

    /// Authorize `keys` for `topic` and verify connected peers against them.
    /// Returns the number of verification attempts started.
    async fn publish_private_topic(
        &self,
        topic: &str,
        keys: Vec<Secp256k1PublicKey>,
    ) -> Result<usize, AmopError>;

    /// Subscribed wire topics.
    fn subscribed_topics(&self) -> Vec<String>;

    /// Topics `peer` announced.
    fn peer_topics(&self, peer: &PeerId) -> Vec<String>;

    /// Calls waiting for a response.
    fn pending_count(&self) -> usize;

    fn stats(&self) -> PendingStatsSnapshot;
}

/// Events raised by the transport.
///
/// Never fails: bad input is logged and dropped.
#[async_trait]
pub trait PeerEventHandler: Send + Sync {
    /// A peer connected and announced `topics`.
    async fn on_connect(&self, peer: PeerId, topics: Vec<String>);

    async fn on_disconnect(&self, peer: &PeerId);

    /// A decoded message arrived from `peer`.
    async fn on_message(&self, peer: PeerId, message: Message);

    /// A raw frame arrived from `peer`.
    async fn on_frame(&self, peer: PeerId, frame: &[u8]);
}
