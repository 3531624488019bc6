//! # Message Router
//!
//! Dispatches inbound messages by type:
//!
//! | Type | Path |
//! |------|------|
//! | `AmopResponse` | resolve the pending call |
//! | `RequestTopicCert` | handshake, responder side |
//! | `AmopRequest` / `AmopMulticastRequest` on a verify channel | handshake, challenge reply |
//! | `AmopRequest` / `AmopMulticastRequest` otherwise | subscriber delivery |
//! | `AmopClientTopics` | refresh the sender's topic view |
//! | `UpdateTopicStatus` | dropped |
//!
//! Nothing here returns an error to the transport. Bad input is logged and
//! dropped.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{AmopCore, HandshakeEngine};
use crate::domain::topic::{is_private_topic, is_verify_channel, simple_topic};
use crate::domain::{
    codes, ClientTopics, Delivery, JsonPayload, Message, MessageType, PeerId, Response,
};

#[derive(Clone)]
pub struct MessageRouter {
    core: Arc<AmopCore>,
    handshake: HandshakeEngine,
}

impl MessageRouter {
    pub fn new(core: Arc<AmopCore>) -> Self {
        let handshake = HandshakeEngine::new(Arc::clone(&core));
        Self { core, handshake }
    }

    pub fn handshake(&self) -> &HandshakeEngine {
        &self.handshake
    }

    pub async fn dispatch(&self, peer: PeerId, message: Message) {
        match message.msg_type {
            MessageType::AmopResponse => self.on_response(&peer, message),
            MessageType::RequestTopicCert => self.handshake.on_cert_request(peer, message).await,
            MessageType::AmopRequest | MessageType::AmopMulticastRequest => {
                if is_verify_channel(&message.topic) {
                    self.handshake.on_challenge(peer, message).await;
                } else {
                    self.on_topic_message(peer, message).await;
                }
            }
            MessageType::AmopClientTopics => self.on_client_topics(peer, &message),
            MessageType::UpdateTopicStatus => {
                warn!(seq = %message.seq, peer = %peer, "Unexpected topic status message, dropping");
            }
        }
    }

    /// Record the peer's view and, when routing, tell it our topics.
    pub async fn on_connect(&self, peer: PeerId, topics: Vec<String>) {
        debug!(peer = %peer, topics = topics.len(), "Peer connected");
        self.core.registry.set_peer_topics(peer.clone(), topics);
        if self.core.is_running() {
            self.core.announce_to(&peer).await;
        }
    }

    pub fn on_disconnect(&self, peer: &PeerId) {
        if self.core.registry.remove_peer(peer) {
            debug!(peer = %peer, "Peer disconnected");
        }
    }

    fn on_response(&self, peer: &PeerId, message: Message) {
        if message.result == codes::REJECTED_OVER_BANDWIDTH_LIMIT {
            warn!(
                seq = %message.seq,
                peer = %peer,
                error_code = message.result,
                "AMOP traffic rejected over bandwidth limit"
            );
        }

        let response = if message.result == codes::SUCCESS {
            Response::success(message.payload)
        } else {
            Response {
                error_code: message.result,
                error_message: format!("Node returned error {}", message.result),
                content: message.payload,
            }
        };
        // Unknown sequence ids are late or duplicate responses
        self.core.pending.resolve(&message.seq, response);
    }

    async fn on_topic_message(&self, peer: PeerId, message: Message) {
        let private = is_private_topic(&message.topic);
        let multicast = message.msg_type == MessageType::AmopMulticastRequest;

        // Private traffic needs an explicit subscription, never the default
        let callback = if private {
            self.core.registry.subscription(&message.topic)
        } else {
            self.core.registry.callback_for(&message.topic)
        };
        let Some(callback) = callback else {
            warn!(seq = %message.seq, topic = %message.topic, peer = %peer, "Topic not subscribed, dropping");
            return;
        };

        let delivery = Delivery {
            peer: peer.clone(),
            seq: message.seq.clone(),
            topic: simple_topic(&message.topic).to_string(),
            content: message.payload.clone(),
            multicast,
            private,
        };
        let reply = callback.receive(&delivery);

        if multicast {
            debug!(seq = %message.seq, topic = %message.topic, "Delivered multicast");
            return;
        }

        let response = message.response(reply);
        match self.core.transport.send_to_peer(&peer, response).await {
            Ok(()) => debug!(seq = %message.seq, topic = %message.topic, peer = %peer, "Delivered request"),
            Err(e) => warn!(seq = %message.seq, peer = %peer, error = %e, "Failed to send response"),
        }
    }

    fn on_client_topics(&self, peer: PeerId, message: &Message) {
        match ClientTopics::from_bytes(&message.payload) {
            Ok(body) => {
                debug!(peer = %peer, topics = body.topics.len(), "Peer topics updated");
                self.core.registry.set_peer_topics(peer, body.topics);
            }
            Err(e) => warn!(peer = %peer, error = %e, "Malformed topic announcement"),
        }
    }
}
