//! Simulated routing node for end-to-end tests.
//!
//! Every client connects to one node, `node0`. The node routes requests
//! to a client that announced the topic, routes responses back by sequence
//! id, fans out multicasts and records topic status updates. All traffic
//! crosses the wire codec.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use amop_core::topic::{is_verify_channel, need_verify_topic, simple_topic};
use amop_core::{
    codes, Amop, AmopConfig, ClientTopics, EcdsaSuite, JsonPayload, Message, MessageType,
    PeerEventHandler, PeerId, PeerTransport, SequenceId, TopicCertRequest, TopicStatusUpdate,
    TransportError,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::Notify;

pub const NODE: &str = "node0";
pub const WAIT: Duration = Duration::from_secs(3);

pub fn init_test_logging() {
    let config = amop_telemetry::TelemetryConfig {
        log_level: "amop_core=debug".to_string(),
        console_output: true,
        json_logs: false,
        ..Default::default()
    };
    // Several tests share one process; only the first install wins
    let _ = amop_telemetry::init_logging(&config);
}

#[derive(Default)]
struct Routing {
    clients: HashMap<String, Amop>,
    topics: HashMap<String, Vec<String>>,
    origins: HashMap<SequenceId, String>,
}

pub struct SimNode {
    routing: RwLock<Routing>,
    statuses: Mutex<Vec<TopicStatusUpdate>>,
    cert_acks: AtomicUsize,
    responses_from: Mutex<HashMap<String, usize>>,
    held: Mutex<Vec<(String, Vec<u8>)>>,
    hold_responses: AtomicBool,
    reject_over_limit: AtomicBool,
    tamper_challenges: AtomicBool,
    notify: Notify,
    runtime: Handle,
}

impl SimNode {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            routing: RwLock::new(Routing::default()),
            statuses: Mutex::new(Vec::new()),
            cert_acks: AtomicUsize::new(0),
            responses_from: Mutex::new(HashMap::new()),
            held: Mutex::new(Vec::new()),
            hold_responses: AtomicBool::new(false),
            reject_over_limit: AtomicBool::new(false),
            tamper_challenges: AtomicBool::new(false),
            notify: Notify::new(),
            runtime: Handle::current(),
        })
    }

    /// Create, connect and start a client.
    pub async fn client(self: &Arc<Self>, name: &str, config: AmopConfig) -> Amop {
        let link = Arc::new(NodeLink {
            node: Arc::clone(self),
            client: name.to_string(),
        });
        let amop = Amop::new(config, link, Arc::new(EcdsaSuite::keccak()));
        self.routing
            .write()
            .clients
            .insert(name.to_string(), amop.clone());

        let announced: Vec<String> = self
            .routing
            .read()
            .topics
            .values()
            .flatten()
            .cloned()
            .collect();
        amop.start().await;
        amop.on_connect(PeerId::from(NODE), announced).await;
        amop
    }

    pub fn set_hold_responses(&self, hold: bool) {
        self.hold_responses.store(hold, Ordering::SeqCst);
    }

    pub fn set_reject_over_limit(&self, reject: bool) {
        self.reject_over_limit.store(reject, Ordering::SeqCst);
    }

    /// Flip one byte of every challenge signature passing through.
    pub fn set_tamper_challenges(&self, tamper: bool) {
        self.tamper_challenges.store(tamper, Ordering::SeqCst);
    }

    pub fn held_count(&self) -> usize {
        self.held.lock().len()
    }

    /// Deliver held responses, newest first.
    pub fn release_held_reversed(&self) {
        let mut held = std::mem::take(&mut *self.held.lock());
        held.reverse();
        for (client, frame) in held {
            self.deliver(&client, frame);
        }
    }

    pub fn statuses(&self) -> Vec<TopicStatusUpdate> {
        self.statuses.lock().clone()
    }

    pub fn cert_acks(&self) -> usize {
        self.cert_acks.load(Ordering::SeqCst)
    }

    pub fn responses_from(&self, client: &str) -> usize {
        self.responses_from
            .lock()
            .get(client)
            .copied()
            .unwrap_or_default()
    }

    pub fn topics_of(&self, client: &str) -> Vec<String> {
        self.routing
            .read()
            .topics
            .get(client)
            .cloned()
            .unwrap_or_default()
    }

    /// Wait until `count` status updates have arrived.
    pub async fn wait_for_statuses(&self, count: usize) -> Vec<TopicStatusUpdate> {
        self.wait_until(|| self.statuses.lock().len() >= count)
            .await
            .expect("Status updates should arrive within timeout");
        self.statuses()
    }

    pub async fn wait_until<F>(&self, condition: F) -> Option<()>
    where
        F: Fn() -> bool,
    {
        tokio::time::timeout(WAIT, async {
            loop {
                let notified = self.notify.notified();
                if condition() {
                    return;
                }
                notified.await;
            }
        })
        .await
        .ok()
    }

    /// Node asks `client` to verify `node_id` for `topic`.
    pub fn request_topic_cert(&self, client: &str, topic: &str, node_id: &str) {
        let body = TopicCertRequest {
            topic: need_verify_topic(topic),
            node_id: node_id.to_string(),
        }
        .to_bytes()
        .expect("Cert request should serialize");
        self.inject(client, Message::new(MessageType::RequestTopicCert, "", body));
    }

    /// Hand `message` to `client` as if routed from elsewhere.
    pub fn inject(&self, client: &str, message: Message) {
        let frame = message.encode().expect("Message should encode");
        self.deliver(client, frame);
    }

    fn deliver(&self, client: &str, frame: Vec<u8>) {
        let Some(amop) = self.routing.read().clients.get(client).cloned() else {
            return;
        };
        self.runtime.spawn(async move {
            amop.on_frame(PeerId::from(NODE), &frame).await;
        });
    }

    fn receive(&self, from: &str, message: Message) {
        let frame = message.encode().expect("Outbound message should encode");
        let mut message = Message::decode(&frame).expect("Outbound frame should decode");

        match message.msg_type {
            MessageType::AmopClientTopics => {
                let body = ClientTopics::from_bytes(&message.payload)
                    .expect("Topic announcement should parse");
                self.routing
                    .write()
                    .topics
                    .insert(from.to_string(), body.topics);
            }
            MessageType::AmopRequest | MessageType::AmopMulticastRequest => {
                if self.reject_over_limit.load(Ordering::SeqCst)
                    && !is_verify_channel(&message.topic)
                {
                    let mut reply = message.response(Vec::new());
                    reply.topic.clear();
                    reply.result = codes::REJECTED_OVER_BANDWIDTH_LIMIT;
                    self.inject(from, reply);
                    return;
                }

                let key = if is_verify_channel(&message.topic) {
                    need_verify_topic(simple_topic(&message.topic))
                } else {
                    message.topic.clone()
                };
                let targets = self.subscribers(&key, from);

                if message.msg_type == MessageType::AmopMulticastRequest {
                    for target in targets {
                        self.inject(&target, message.clone());
                    }
                } else if let Some(target) = targets.first() {
                    self.routing
                        .write()
                        .origins
                        .insert(message.seq.clone(), from.to_string());
                    self.inject(target, message);
                }
            }
            MessageType::AmopResponse => {
                *self
                    .responses_from
                    .lock()
                    .entry(from.to_string())
                    .or_default() += 1;

                let origin = self.routing.write().origins.remove(&message.seq);
                if let Some(origin) = origin {
                    if is_verify_channel(&message.topic)
                        && self.tamper_challenges.load(Ordering::SeqCst)
                    {
                        if let Some(byte) = message.payload.get_mut(0) {
                            *byte ^= 0x01;
                        }
                    }
                    if self.hold_responses.load(Ordering::SeqCst) {
                        let frame = message.encode().expect("Response should encode");
                        self.held.lock().push((origin, frame));
                    } else {
                        self.inject(&origin, message);
                    }
                }
            }
            MessageType::RequestTopicCert => {
                self.cert_acks.fetch_add(1, Ordering::SeqCst);
            }
            MessageType::UpdateTopicStatus => {
                let update = TopicStatusUpdate::from_bytes(&message.payload)
                    .expect("Topic status should parse");
                self.statuses.lock().push(update);
            }
        }
        self.notify.notify_waiters();
    }

    fn subscribers(&self, topic: &str, except: &str) -> Vec<String> {
        let mut clients: Vec<String> = self
            .routing
            .read()
            .topics
            .iter()
            .filter(|(client, topics)| client.as_str() != except && topics.iter().any(|t| t == topic))
            .map(|(client, _)| client.clone())
            .collect();
        clients.sort();
        clients
    }
}

/// A client's view of its connection to the node.
struct NodeLink {
    node: Arc<SimNode>,
    client: String,
}

#[async_trait]
impl PeerTransport for NodeLink {
    async fn send_to_peer(&self, peer: &PeerId, message: Message) -> Result<(), TransportError> {
        if peer.as_str() != NODE {
            return Err(TransportError::PeerNotConnected(peer.clone()));
        }
        self.node.receive(&self.client, message);
        Ok(())
    }

    async fn send_to_random_peer(&self, message: Message) -> Result<PeerId, TransportError> {
        self.node.receive(&self.client, message);
        Ok(PeerId::from(NODE))
    }

    async fn broadcast(&self, message: Message) -> Result<usize, TransportError> {
        self.node.receive(&self.client, message);
        Ok(1)
    }

    fn connected_peers(&self) -> Vec<PeerId> {
        vec![PeerId::from(NODE)]
    }
}
