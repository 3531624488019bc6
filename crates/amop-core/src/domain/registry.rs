//! # Topic Registry
//!
//! Process-wide topic bookkeeping:
//!
//! - local subscriptions (wire topic → callback), one callback per topic
//! - what each connected peer says it subscribes to (advisory only)
//! - authorized public keys for private topics we publish into
//! - private keys for private topics we subscribe to
//!
//! Key material is indexed by plain topic name. Subscriptions are indexed
//! by wire name, so a private subscription sits under its
//! `#!$TopicNeedVerify_` form.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use amop_crypto::{Secp256k1KeyPair, Secp256k1PublicKey};
use parking_lot::RwLock;

use super::entities::{PeerId, SharedCallback};

#[derive(Default)]
pub struct TopicRegistry {
    subscriptions: RwLock<HashMap<String, SharedCallback>>,
    default_callback: RwLock<Option<SharedCallback>>,
    peer_topics: RwLock<HashMap<PeerId, HashSet<String>>>,
    public_keys: RwLock<HashMap<String, Vec<Secp256k1PublicKey>>>,
    private_keys: RwLock<HashMap<String, Arc<Secp256k1KeyPair>>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- Local subscriptions ----

    /// Last subscribe wins. Returns true if a previous callback was replaced.
    pub fn subscribe(&self, topic: &str, callback: SharedCallback) -> bool {
        self.subscriptions
            .write()
            .insert(topic.to_string(), callback)
            .is_some()
    }

    pub fn unsubscribe(&self, topic: &str) -> bool {
        self.subscriptions.write().remove(topic).is_some()
    }

    pub fn set_default_callback(&self, callback: Option<SharedCallback>) {
        *self.default_callback.write() = callback;
    }

    /// Specific callback for `topic`, else the default callback.
    pub fn callback_for(&self, topic: &str) -> Option<SharedCallback> {
        if let Some(cb) = self.subscriptions.read().get(topic) {
            return Some(Arc::clone(cb));
        }
        self.default_callback.read().clone()
    }

    /// Callback registered for exactly `topic`, ignoring the default.
    pub fn subscription(&self, topic: &str) -> Option<SharedCallback> {
        self.subscriptions.read().get(topic).cloned()
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.read().contains_key(topic)
    }

    /// Subscribed wire topics, sorted.
    pub fn local_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.subscriptions.read().keys().cloned().collect();
        topics.sort();
        topics
    }

    // ---- Peer topic views ----

    /// Replace what `peer` is known to subscribe to.
    pub fn set_peer_topics(&self, peer: PeerId, topics: impl IntoIterator<Item = String>) {
        self.peer_topics
            .write()
            .insert(peer, topics.into_iter().collect());
    }

    pub fn remove_peer(&self, peer: &PeerId) -> bool {
        self.peer_topics.write().remove(peer).is_some()
    }

    pub fn peer_topics(&self, peer: &PeerId) -> Vec<String> {
        let mut topics: Vec<String> = self
            .peer_topics
            .read()
            .get(peer)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        topics.sort();
        topics
    }

    /// Peers whose announced topics include `topic`.
    pub fn peers_with_topic(&self, topic: &str) -> Vec<PeerId> {
        let mut peers: Vec<PeerId> = self
            .peer_topics
            .read()
            .iter()
            .filter(|(_, topics)| topics.contains(topic))
            .map(|(peer, _)| peer.clone())
            .collect();
        peers.sort();
        peers
    }

    // ---- Private topic keys ----

    /// Add authorized keys for `topic`, skipping duplicates.
    /// Returns how many keys the topic now has.
    pub fn add_public_keys(&self, topic: &str, keys: &[Secp256k1PublicKey]) -> usize {
        let mut map = self.public_keys.write();
        let entry = map.entry(topic.to_string()).or_default();
        for key in keys {
            if !entry.contains(key) {
                entry.push(*key);
            }
        }
        entry.len()
    }

    pub fn public_keys(&self, topic: &str) -> Vec<Secp256k1PublicKey> {
        self.public_keys
            .read()
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }

    pub fn has_public_keys(&self, topic: &str) -> bool {
        self.public_keys
            .read()
            .get(topic)
            .is_some_and(|keys| !keys.is_empty())
    }

    /// Private topics we hold authorized keys for, sorted.
    pub fn published_private_topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.public_keys.read().keys().cloned().collect();
        topics.sort();
        topics
    }

    pub fn remove_public_keys(&self, topic: &str) -> bool {
        self.public_keys.write().remove(topic).is_some()
    }

    pub fn set_private_key(&self, topic: &str, key: Arc<Secp256k1KeyPair>) {
        self.private_keys.write().insert(topic.to_string(), key);
    }

    pub fn private_key(&self, topic: &str) -> Option<Arc<Secp256k1KeyPair>> {
        self.private_keys.read().get(topic).cloned()
    }

    pub fn remove_private_key(&self, topic: &str) -> bool {
        self.private_keys.write().remove(topic).is_some()
    }

    /// Drop all subscriptions and key material. Peer views are kept;
    /// they describe the remote side.
    pub fn clear(&self) {
        self.subscriptions.write().clear();
        *self.default_callback.write() = None;
        self.public_keys.write().clear();
        self.private_keys.write().clear();
    }
}
