//! # Wire Envelope
//!
//! Every AMOP exchange travels in one envelope:
//!
//! ```text
//! 0-3     length   (u32, big-endian, whole frame including this field)
//! 4-5     type     (u16, big-endian, see MessageType)
//! 6-37    sequence (32 ASCII bytes)
//! 38-41   result   (i32, big-endian, 0 = success)
//! 42..    body
//! ```
//!
//! For topic-carrying types the body nests the topic in front of the
//! application payload:
//!
//! ```text
//! 0       topic_len (u8, topic bytes + 1)
//! 1..n    topic     (UTF-8)
//! n..     payload
//! ```

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use super::topic::MAX_TOPIC_LEN;

/// Length of the fixed envelope header.
pub const HEADER_LEN: usize = 4 + 2 + SEQUENCE_LEN + 4;

/// Length of an encoded sequence id.
pub const SEQUENCE_LEN: usize = 32;

/// Errors raised while decoding or encoding an envelope.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Frame shorter than the bytes it must contain.
    #[error("Frame truncated: need {needed} bytes, got {actual}")]
    Truncated { needed: usize, actual: usize },

    /// Declared length disagrees with the frame.
    #[error("Length mismatch: header says {declared}, frame has {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    /// Type tag is not an AMOP message type.
    #[error("Unknown message type: 0x{0:04x}")]
    UnknownMessageType(u16),

    /// Sequence bytes are not 32 printable ASCII characters.
    #[error("Invalid sequence id")]
    InvalidSequence,

    /// Nested topic could not be read.
    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    /// Topic does not fit the one-byte length prefix.
    #[error("Topic too long: {0} bytes (max {MAX_TOPIC_LEN})")]
    TopicTooLong(usize),
}

/// AMOP message types and their wire tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Topic request expecting a response.
    AmopRequest,
    /// Response correlated by sequence id.
    AmopResponse,
    /// Local subscription announcement sent on connect.
    AmopClientTopics,
    /// Fire-and-forget topic delivery.
    AmopMulticastRequest,
    /// Node asks a publisher to verify a private topic.
    RequestTopicCert,
    /// Publisher reports the verification outcome.
    UpdateTopicStatus,
}

impl MessageType {
    /// Wire tag.
    pub const fn tag(self) -> u16 {
        match self {
            Self::AmopRequest => 0x30,
            Self::AmopResponse => 0x31,
            Self::AmopClientTopics => 0x32,
            Self::AmopMulticastRequest => 0x35,
            Self::RequestTopicCert => 0x37,
            Self::UpdateTopicStatus => 0x38,
        }
    }

    /// Whether the body nests a topic ahead of the payload.
    pub const fn carries_topic(self) -> bool {
        matches!(
            self,
            Self::AmopRequest | Self::AmopResponse | Self::AmopMulticastRequest
        )
    }
}

impl TryFrom<u16> for MessageType {
    type Error = CodecError;

    fn try_from(tag: u16) -> Result<Self, Self::Error> {
        match tag {
            0x30 => Ok(Self::AmopRequest),
            0x31 => Ok(Self::AmopResponse),
            0x32 => Ok(Self::AmopClientTopics),
            0x35 => Ok(Self::AmopMulticastRequest),
            0x37 => Ok(Self::RequestTopicCert),
            0x38 => Ok(Self::UpdateTopicStatus),
            other => Err(CodecError::UnknownMessageType(other)),
        }
    }
}

/// Request/response correlation id.
///
/// A random UUID v4 rendered as 32 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceId(String);

impl SequenceId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Accept an id produced by a peer.
    pub fn parse(s: &str) -> Result<Self, CodecError> {
        if s.len() != SEQUENCE_LEN || !s.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(CodecError::InvalidSequence);
        }
        Ok(Self(s.to_string()))
    }

    /// Borrow as str.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SequenceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decoded envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub msg_type: MessageType,
    pub seq: SequenceId,
    pub result: i32,
    /// Empty for types that do not carry a topic.
    pub topic: String,
    pub payload: Vec<u8>,
}

impl Message {
    /// New message with a fresh sequence id and `result = 0`.
    pub fn new(msg_type: MessageType, topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            msg_type,
            seq: SequenceId::new(),
            result: 0,
            topic: topic.into(),
            payload,
        }
    }

    /// `AMOP_REQUEST` on `topic`.
    pub fn request(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self::new(MessageType::AmopRequest, topic, payload)
    }

    /// `AMOP_MULTICAST_REQUEST` on `topic`.
    pub fn multicast(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self::new(MessageType::AmopMulticastRequest, topic, payload)
    }

    /// `AMOP_RESPONSE` answering `self`: same sequence and topic.
    pub fn response(&self, payload: Vec<u8>) -> Self {
        Self {
            msg_type: MessageType::AmopResponse,
            seq: self.seq.clone(),
            result: 0,
            topic: self.topic.clone(),
            payload,
        }
    }

    /// Empty-body acknowledgement echoing type and sequence.
    pub fn ack(&self) -> Self {
        Self {
            msg_type: self.msg_type,
            seq: self.seq.clone(),
            result: 0,
            topic: String::new(),
            payload: Vec::new(),
        }
    }

    /// Serialize to a frame.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let body_len = if self.msg_type.carries_topic() {
            if self.topic.len() > MAX_TOPIC_LEN {
                return Err(CodecError::TopicTooLong(self.topic.len()));
            }
            1 + self.topic.len() + self.payload.len()
        } else {
            self.payload.len()
        };
        let total = HEADER_LEN + body_len;

        let mut frame = Vec::with_capacity(total);
        frame.extend_from_slice(&(total as u32).to_be_bytes());
        frame.extend_from_slice(&self.msg_type.tag().to_be_bytes());
        frame.extend_from_slice(self.seq.as_str().as_bytes());
        frame.extend_from_slice(&self.result.to_be_bytes());
        if self.msg_type.carries_topic() {
            frame.push((self.topic.len() + 1) as u8);
            frame.extend_from_slice(self.topic.as_bytes());
        }
        frame.extend_from_slice(&self.payload);
        Ok(frame)
    }

    /// Parse a frame.
    pub fn decode(frame: &[u8]) -> Result<Self, CodecError> {
        if frame.len() < HEADER_LEN {
            return Err(CodecError::Truncated {
                needed: HEADER_LEN,
                actual: frame.len(),
            });
        }

        let declared = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        if declared != frame.len() {
            return Err(CodecError::LengthMismatch {
                declared,
                actual: frame.len(),
            });
        }

        let msg_type = MessageType::try_from(u16::from_be_bytes([frame[4], frame[5]]))?;
        let seq_bytes = &frame[6..6 + SEQUENCE_LEN];
        let seq = std::str::from_utf8(seq_bytes)
            .map_err(|_| CodecError::InvalidSequence)
            .and_then(SequenceId::parse)?;
        let result = i32::from_be_bytes([frame[38], frame[39], frame[40], frame[41]]);
        let body = &frame[HEADER_LEN..];

        let (topic, payload) = if msg_type.carries_topic() {
            decode_topic_body(body)?
        } else {
            (String::new(), body.to_vec())
        };

        Ok(Self {
            msg_type,
            seq,
            result,
            topic,
            payload,
        })
    }
}

/// Split a topic-carrying body. An empty body (node-side error replies)
/// yields an empty topic and payload.
fn decode_topic_body(body: &[u8]) -> Result<(String, Vec<u8>), CodecError> {
    let Some((&len_byte, rest)) = body.split_first() else {
        return Ok((String::new(), Vec::new()));
    };

    let topic_len = (len_byte as usize)
        .checked_sub(1)
        .ok_or_else(|| CodecError::InvalidTopic("zero length prefix".into()))?;
    if rest.len() < topic_len {
        return Err(CodecError::Truncated {
            needed: HEADER_LEN + 1 + topic_len,
            actual: HEADER_LEN + body.len(),
        });
    }

    let topic = std::str::from_utf8(&rest[..topic_len])
        .map_err(|e| CodecError::InvalidTopic(e.to_string()))?
        .to_string();
    Ok((topic, rest[topic_len..].to_vec()))
}
