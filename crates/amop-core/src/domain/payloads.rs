//! JSON bodies of the control messages.

use serde::{Deserialize, Serialize};

/// `CLIENT_TOPICS` announcement.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientTopics {
    pub topics: Vec<String>,
}

/// `REQUEST_TOPIC_CERT` body: a node asks us to verify `node_id` for `topic`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicCertRequest {
    pub topic: String,
    pub node_id: String,
}

/// `UPDATE_TOPIC_STATUS` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicStatusUpdate {
    pub topic: String,
    pub node_id: String,
    pub check_result: i32,
}

impl TopicStatusUpdate {
    pub const VERIFIED: i32 = 0;
    pub const REJECTED: i32 = 1;

    pub fn new(topic: impl Into<String>, node_id: impl Into<String>, verified: bool) -> Self {
        Self {
            topic: topic.into(),
            node_id: node_id.into(),
            check_result: if verified {
                Self::VERIFIED
            } else {
                Self::REJECTED
            },
        }
    }

    pub fn is_verified(&self) -> bool {
        self.check_result == Self::VERIFIED
    }
}

/// Shared (de)serialization for the control bodies.
pub trait JsonPayload: Serialize + for<'de> Deserialize<'de> {
    fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

impl JsonPayload for ClientTopics {}
impl JsonPayload for TopicCertRequest {}
impl JsonPayload for TopicStatusUpdate {}
