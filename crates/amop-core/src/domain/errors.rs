//! Facade errors.
//!
//! Only caller mistakes surface as `AmopError`. Runtime failures (no peer,
//! timeout, node rejection) arrive as a [`Response`](super::Response) with a
//! non-zero error code instead.

use thiserror::Error;

use super::topic::MAX_TOPIC_LEN;

/// Invalid arguments passed to the AMOP facade.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmopError {
    /// Topic name is empty.
    #[error("Topic name must not be empty")]
    EmptyTopic,

    /// Topic name exceeds the wire limit.
    #[error("Topic too long: {0} bytes (max {MAX_TOPIC_LEN})")]
    TopicTooLong(usize),

    /// Topic uses a reserved private-topic prefix.
    #[error("Topic uses a reserved prefix: {0}")]
    ReservedPrefix(String),

    /// `publish_private_topic` called without any public key.
    #[error("No public keys supplied for private topic {0}")]
    EmptyKeySet(String),

    /// `publish_private` on a topic with no registered public keys.
    #[error("Private topic not published: {0}")]
    PrivateTopicNotPublished(String),

    /// Operation requires a started instance.
    #[error("AMOP is not running")]
    NotRunning,
}
