//! # Topic Naming
//!
//! Private topics live under two reserved namespaces:
//!
//! ```text
//! #!$TopicNeedVerify_<name>                           steady-state topic
//! #!$VerifyChannel_#!$TopicNeedVerify_<name>_<hex32>  handshake channel
//! ```
//!
//! The channel suffix is fresh per verification attempt so concurrent
//! attempts for one topic never share a routing key.

use uuid::Uuid;

use super::errors::AmopError;

/// Largest topic that fits the one-byte length prefix.
pub const MAX_TOPIC_LEN: usize = 254;

/// Prefix of steady-state private topic names.
pub const TOPIC_NEED_VERIFY_PREFIX: &str = "#!$TopicNeedVerify_";

/// Prefix of handshake channel topics.
pub const VERIFY_CHANNEL_PREFIX: &str = "#!$VerifyChannel_";

const CHANNEL_SUFFIX_LEN: usize = 32;

/// Reject names the wire format cannot carry or that collide with
/// reserved namespaces.
pub fn validate_topic(topic: &str) -> Result<(), AmopError> {
    if topic.is_empty() {
        return Err(AmopError::EmptyTopic);
    }
    if topic.starts_with(TOPIC_NEED_VERIFY_PREFIX) || topic.starts_with(VERIFY_CHANNEL_PREFIX) {
        return Err(AmopError::ReservedPrefix(topic.to_string()));
    }
    if topic.len() > MAX_TOPIC_LEN {
        return Err(AmopError::TopicTooLong(topic.len()));
    }
    Ok(())
}

/// Like [`validate_topic`], but also leaves room for the longest name
/// derived from a private topic (its handshake channel).
pub fn validate_private_topic(topic: &str) -> Result<(), AmopError> {
    validate_topic(topic)?;
    let derived = VERIFY_CHANNEL_PREFIX.len()
        + TOPIC_NEED_VERIFY_PREFIX.len()
        + topic.len()
        + 1
        + CHANNEL_SUFFIX_LEN;
    if derived > MAX_TOPIC_LEN {
        return Err(AmopError::TopicTooLong(topic.len()));
    }
    Ok(())
}

/// Steady-state wire name of a private topic.
pub fn need_verify_topic(name: &str) -> String {
    format!("{TOPIC_NEED_VERIFY_PREFIX}{name}")
}

/// Fresh handshake channel for a private topic.
pub fn verify_channel_topic(name: &str) -> String {
    format!(
        "{VERIFY_CHANNEL_PREFIX}{TOPIC_NEED_VERIFY_PREFIX}{name}_{}",
        Uuid::new_v4().simple()
    )
}

pub fn is_verify_channel(topic: &str) -> bool {
    topic.starts_with(VERIFY_CHANNEL_PREFIX)
}

pub fn is_private_topic(topic: &str) -> bool {
    topic.starts_with(TOPIC_NEED_VERIFY_PREFIX)
}

/// Plain name behind a private or channel topic. Public names pass through.
pub fn simple_topic(topic: &str) -> &str {
    if let Some(rest) = topic.strip_prefix(VERIFY_CHANNEL_PREFIX) {
        let rest = rest.strip_prefix(TOPIC_NEED_VERIFY_PREFIX).unwrap_or(rest);
        return strip_channel_suffix(rest);
    }
    topic
        .strip_prefix(TOPIC_NEED_VERIFY_PREFIX)
        .unwrap_or(topic)
}

fn strip_channel_suffix(name: &str) -> &str {
    match name.rsplit_once('_') {
        Some((base, suffix))
            if suffix.len() == CHANNEL_SUFFIX_LEN
                && suffix.bytes().all(|b| b.is_ascii_hexdigit()) =>
        {
            base
        }
        _ => name,
    }
}
