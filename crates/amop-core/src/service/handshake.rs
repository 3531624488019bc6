//! # Private Topic Handshake
//!
//! Four steps per verification attempt:
//!
//! ```text
//! node ──REQUEST_TOPIC_CERT {topic,nodeId}──→ publisher      (1) ack at once
//! publisher ──AMOP_REQUEST(channel, nonce)──→ subscriber     (2)
//! subscriber ──AMOP_RESPONSE(sign(hash(nonce)))──→ publisher (3)
//! publisher ──UPDATE_TOPIC_STATUS {checkResult}──→ node      (4)
//! ```
//!
//! The nonce never leaves the pending call's closure except in the
//! challenge itself. A signature from any authorized key passes, so one
//! leaked key compromises the whole topic.
//!
//! Timeouts and error responses in step 3 are reported as rejected.

use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{AmopCore, Target};
use crate::domain::topic::{need_verify_topic, simple_topic, verify_channel_topic};
use crate::domain::{
    codes, JsonPayload, Message, MessageType, PeerId, Response, ResponseCallback,
    TopicCertRequest, TopicStatusUpdate,
};
use crate::ports::CryptoSuite;
use amop_crypto::Secp256k1PublicKey;

/// Drives both sides of private topic verification.
#[derive(Clone)]
pub struct HandshakeEngine {
    core: Arc<AmopCore>,
}

impl HandshakeEngine {
    pub fn new(core: Arc<AmopCore>) -> Self {
        Self { core }
    }

    /// Step 1: acknowledge the node's request, then verify in the background.
    pub async fn on_cert_request(&self, peer: PeerId, message: Message) {
        if message.payload.is_empty() {
            debug!(seq = %message.seq, peer = %peer, "Ignoring empty topic cert message");
            return;
        }

        if let Err(e) = self
            .core
            .transport
            .send_to_peer(&peer, message.ack())
            .await
        {
            warn!(seq = %message.seq, peer = %peer, error = %e, "Failed to ack topic cert request");
        }

        let request = match TopicCertRequest::from_bytes(&message.payload) {
            Ok(request) => request,
            Err(e) => {
                warn!(seq = %message.seq, peer = %peer, error = %e, "Malformed topic cert request");
                return;
            }
        };

        let engine = self.clone();
        self.core.runtime.spawn(async move {
            engine
                .start_verification(&request.topic, request.node_id, peer)
                .await;
        });
    }

    /// Peer to carry a challenge for `topic`: a random one among those
    /// that announced the private topic, else `fallback`.
    fn challenge_route(&self, topic: &str, fallback: &PeerId) -> PeerId {
        self.core
            .registry
            .peers_with_topic(&need_verify_topic(topic))
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_else(|| fallback.clone())
    }

    /// Steps 2 and 4: challenge `node_id` for `topic` and report the
    /// outcome to `peer`.
    pub async fn start_verification(&self, topic: &str, node_id: String, peer: PeerId) {
        let topic = simple_topic(topic).to_string();
        let keys = self.core.registry.public_keys(&topic);
        if keys.is_empty() {
            warn!(topic = %topic, node_id = %node_id, "No authorized keys for topic, rejecting");
            let update = TopicStatusUpdate::new(topic, node_id, false);
            send_status(&self.core, &peer, update).await;
            return;
        }

        let nonce = Uuid::new_v4().simple().to_string();
        let challenge = Message::request(verify_channel_topic(&topic), nonce.clone().into_bytes());
        let route = self.challenge_route(&topic, &peer);
        debug!(
            seq = %challenge.seq,
            topic = %topic,
            node_id = %node_id,
            peer = %route,
            "Issuing topic challenge"
        );

        let core = Arc::clone(&self.core);
        let status_peer = peer;
        let callback: ResponseCallback = Box::new(move |response: Response| {
            if response.error_code == codes::SHUTDOWN {
                debug!(topic = %topic, node_id = %node_id, "Verification abandoned on shutdown");
                return;
            }
            let verified = response.is_success()
                && check_signature(core.crypto.as_ref(), &keys, nonce.as_bytes(), &response.content);
            if verified {
                info!(topic = %topic, node_id = %node_id, "Topic verification passed");
            } else {
                warn!(
                    topic = %topic,
                    node_id = %node_id,
                    error_code = response.error_code,
                    "Topic verification failed"
                );
            }

            let update = TopicStatusUpdate::new(topic, node_id, verified);
            let status_core = Arc::clone(&core);
            core.runtime.spawn(async move {
                send_status(&status_core, &status_peer, update).await;
            });
        });

        self.core
            .send_request(
                challenge,
                Target::Prefer(route),
                self.core.config.verify_timeout(),
                callback,
            )
            .await;
    }

    /// Step 3: sign a challenge for a private topic we hold a key for.
    ///
    /// Without a key the challenge is dropped; the challenger sees a timeout.
    pub async fn on_challenge(&self, peer: PeerId, message: Message) {
        let topic = simple_topic(&message.topic);
        let Some(key) = self.core.registry.private_key(topic) else {
            warn!(seq = %message.seq, topic = %topic, peer = %peer, "No private key for challenge, dropping");
            return;
        };

        let digest = self.core.crypto.hash(&message.payload);
        let signature = match self.core.crypto.sign(&key, &digest) {
            Ok(signature) => signature,
            Err(e) => {
                error!(seq = %message.seq, topic = %topic, error = %e, "Failed to sign challenge");
                return;
            }
        };

        let reply = message.response(signature);
        match self.core.transport.send_to_peer(&peer, reply).await {
            Ok(()) => debug!(seq = %message.seq, topic = %topic, peer = %peer, "Answered topic challenge"),
            Err(e) => error!(seq = %message.seq, topic = %topic, error = %e, "Failed to answer challenge"),
        }
    }
}

/// True if any of `keys` signed `hash(nonce)`.
pub fn check_signature(
    crypto: &dyn CryptoSuite,
    keys: &[Secp256k1PublicKey],
    nonce: &[u8],
    signature: &[u8],
) -> bool {
    let digest = crypto.hash(nonce);
    keys.iter().any(|key| crypto.verify(key, &digest, signature))
}

async fn send_status(core: &AmopCore, peer: &PeerId, update: TopicStatusUpdate) {
    let body = match update.to_bytes() {
        Ok(body) => body,
        Err(e) => {
            error!(topic = %update.topic, error = %e, "Failed to serialize topic status");
            return;
        }
    };
    let message = Message::new(MessageType::UpdateTopicStatus, "", body);

    let sent = match core.transport.send_to_peer(peer, message.clone()).await {
        Ok(()) => Ok(peer.clone()),
        Err(_) => core.transport.send_to_random_peer(message).await,
    };
    match sent {
        Ok(via) => debug!(
            topic = %update.topic,
            node_id = %update.node_id,
            check_result = update.check_result,
            peer = %via,
            "Sent topic status"
        ),
        Err(e) => error!(topic = %update.topic, error = %e, "Failed to send topic status"),
    }
}
