//! # AMOP End-to-End Tests
//!
//! Publisher and subscriber instances talk through a simulated routing
//! node (`common::SimNode`) that forwards encoded frames.
//!
//! ## Test Strategy
//!
//! 1. Request/response on a public topic
//! 2. Timeouts and node-side rejections
//! 3. Multicast and unsubscribe semantics
//! 4. Private topic handshake: success, tampering, wrong key, no subscriber
//! 5. Concurrent requests answered out of order

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use amop_core::topic::need_verify_topic;
use amop_core::{codes, AmopApi, AmopConfig, Delivery, SharedCallback};
use amop_crypto::Secp256k1KeyPair;
use common::{init_test_logging, SimNode, NODE, WAIT};
use parking_lot::Mutex;

fn fast_verify() -> AmopConfig {
    AmopConfig {
        verify_timeout_ms: 300,
        ..AmopConfig::default()
    }
}

/// Callback that records every delivery and echoes the content back.
fn recording_echo() -> (SharedCallback, Arc<Mutex<Vec<Delivery>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: SharedCallback = Arc::new(move |d: &Delivery| {
        sink.lock().push(d.clone());
        d.content.clone()
    });
    (callback, seen)
}

fn test_key(byte: u8) -> Arc<Secp256k1KeyPair> {
    let secret = hex::decode(format!("{byte:02x}").repeat(32)).expect("Valid hex");
    Arc::new(Secp256k1KeyPair::from_bytes(&secret).expect("Valid secp256k1 scalar"))
}

// =============================================================================
// PUBLIC TOPICS
// =============================================================================

/// Test that a publish reaches the subscriber and its reply comes back.
#[tokio::test]
async fn test_publish_round_trip() {
    init_test_logging();

    // Arrange
    let node = SimNode::new();
    let subscriber = node.client("subscriber", AmopConfig::default()).await;
    let publisher = node.client("publisher", AmopConfig::default()).await;
    let (callback, seen) = recording_echo();
    subscriber.subscribe("prices", callback).await.expect("Should subscribe");

    // Act
    let response = publisher
        .publish("prices", b"42".to_vec(), Some(Duration::from_secs(5)))
        .await
        .expect("Should publish");

    // Assert
    assert_eq!(response.error_code, codes::SUCCESS);
    assert_eq!(response.content, b"42");
    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].topic, "prices");
    assert_eq!(seen[0].content, b"42");
    assert!(!seen[0].multicast);
    assert_eq!(publisher.pending_count(), 0);
}

/// Test that an unanswered publish fails with TIMEOUT close to its deadline.
#[tokio::test]
async fn test_publish_without_subscriber_times_out() {
    init_test_logging();

    // Arrange
    let node = SimNode::new();
    let publisher = node.client("publisher", AmopConfig::default()).await;
    let timeout = Duration::from_millis(200);

    // Act
    let started = Instant::now();
    let response = publisher
        .publish("nobody-listens", b"ping".to_vec(), Some(timeout))
        .await
        .expect("Should publish");
    let elapsed = started.elapsed();

    // Assert
    assert_eq!(response.error_code, codes::TIMEOUT);
    assert!(elapsed >= timeout - Duration::from_millis(10));
    assert!(elapsed < timeout + Duration::from_secs(1), "took {elapsed:?}");
    let stats = publisher.stats();
    assert_eq!(stats.timed_out, 1);
    assert_eq!(publisher.pending_count(), 0);
}

/// Test that a node-side bandwidth rejection surfaces as an error response.
#[tokio::test]
async fn test_node_rejection_resolves_request() {
    init_test_logging();

    // Arrange
    let node = SimNode::new();
    let publisher = node.client("publisher", AmopConfig::default()).await;
    node.set_reject_over_limit(true);

    // Act
    let response = publisher
        .publish("prices", b"42".to_vec(), Some(Duration::from_secs(5)))
        .await
        .expect("Should publish");

    // Assert
    assert_eq!(response.error_code, codes::REJECTED_OVER_BANDWIDTH_LIMIT);
    assert!(!response.is_success());
}

/// Test that multicast deliveries are never answered.
#[tokio::test]
async fn test_broadcast_delivers_without_response() {
    init_test_logging();

    // Arrange
    let node = SimNode::new();
    let first = node.client("first", AmopConfig::default()).await;
    let second = node.client("second", AmopConfig::default()).await;
    let publisher = node.client("publisher", AmopConfig::default()).await;
    let (callback_a, seen_a) = recording_echo();
    let (callback_b, seen_b) = recording_echo();
    first.subscribe("news", callback_a).await.expect("Should subscribe");
    second.subscribe("news", callback_b).await.expect("Should subscribe");

    // Act
    let reached = publisher
        .broadcast("news", b"headline".to_vec())
        .await
        .expect("Should broadcast");
    let delivered = tokio::time::timeout(WAIT, async {
        loop {
            if seen_a.lock().len() == 1 && seen_b.lock().len() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    // Assert
    assert!(delivered.is_ok(), "Both subscribers should receive the broadcast");
    assert_eq!(reached, 1);
    assert!(seen_a.lock()[0].multicast);
    assert_eq!(seen_b.lock()[0].content, b"headline");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(node.responses_from("first"), 0);
    assert_eq!(node.responses_from("second"), 0);
}

/// Test that unsubscribing withdraws the topic and stops deliveries.
#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    init_test_logging();

    // Arrange
    let node = SimNode::new();
    let subscriber = node.client("subscriber", AmopConfig::default()).await;
    let publisher = node.client("publisher", AmopConfig::default()).await;
    let (callback, seen) = recording_echo();
    subscriber.subscribe("prices", callback).await.expect("Should subscribe");
    assert_eq!(node.topics_of("subscriber"), vec!["prices".to_string()]);

    // Act
    assert!(subscriber.unsubscribe("prices").await);
    let response = publisher
        .publish("prices", b"42".to_vec(), Some(Duration::from_millis(200)))
        .await
        .expect("Should publish");
    node.inject("subscriber", amop_core::Message::request("prices", b"late".to_vec()));
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Assert
    assert!(node.topics_of("subscriber").is_empty());
    assert_eq!(response.error_code, codes::TIMEOUT);
    assert!(seen.lock().is_empty());
    assert_eq!(node.responses_from("subscriber"), 0);
}

/// Test that concurrent requests match responses by sequence id, not order.
#[tokio::test]
async fn test_out_of_order_responses_match_requests() {
    init_test_logging();

    // Arrange
    let node = SimNode::new();
    let subscriber = node.client("subscriber", AmopConfig::default()).await;
    let publisher = node.client("publisher", AmopConfig::default()).await;
    let (callback, _seen) = recording_echo();
    subscriber.subscribe("quotes", callback).await.expect("Should subscribe");
    node.set_hold_responses(true);

    // Act
    let first = publisher.publish("quotes", b"first".to_vec(), Some(WAIT));
    let second = publisher.publish("quotes", b"second".to_vec(), Some(WAIT));
    let release = async {
        tokio::time::timeout(WAIT, async {
            while node.held_count() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("Both responses should be held");
        node.release_held_reversed();
    };
    let (first, second, ()) = tokio::join!(first, second, release);

    // Assert
    let first = first.expect("Should publish");
    let second = second.expect("Should publish");
    assert!(first.is_success() && second.is_success());
    assert_eq!(first.content, b"first");
    assert_eq!(second.content, b"second");
    assert_eq!(publisher.stats().completed, 2);
}

// =============================================================================
// PRIVATE TOPICS
// =============================================================================

/// Test that an authorized subscriber passes verification and then
/// receives private publishes.
#[tokio::test]
async fn test_private_topic_handshake_success() {
    init_test_logging();

    // Arrange
    let node = SimNode::new();
    let key = test_key(0x01);
    let subscriber = node.client("subscriber", fast_verify()).await;
    let publisher = node.client("publisher", fast_verify()).await;
    let (callback, seen) = recording_echo();
    subscriber
        .subscribe_private_topic("secret", Arc::clone(&key), callback)
        .await
        .expect("Should subscribe");

    // Act
    let attempts = publisher
        .publish_private_topic("secret", vec![key.public_key()])
        .await
        .expect("Should publish private topic");
    let statuses = node.wait_for_statuses(1).await;
    let response = publisher
        .publish_private("secret", b"classified".to_vec(), Some(WAIT))
        .await
        .expect("Should publish");

    // Assert
    assert_eq!(attempts, 1);
    assert_eq!(statuses[0].topic, "secret");
    assert_eq!(statuses[0].node_id, NODE);
    assert!(statuses[0].is_verified());
    assert!(response.is_success());
    assert_eq!(response.content, b"classified");
    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].private);
    assert_eq!(seen[0].topic, "secret");
    assert!(node.topics_of("subscriber").contains(&need_verify_topic("secret")));
}

/// Test that a node-initiated cert request is acked and verified.
#[tokio::test]
async fn test_node_cert_request_is_acked_and_verified() {
    init_test_logging();

    // Arrange
    let node = SimNode::new();
    let key = test_key(0x02);
    let subscriber = node.client("subscriber", fast_verify()).await;
    let publisher = node.client("publisher", fast_verify()).await;
    let (callback, _seen) = recording_echo();
    subscriber
        .subscribe_private_topic("secret", Arc::clone(&key), callback)
        .await
        .expect("Should subscribe");
    publisher
        .publish_private_topic("secret", vec![key.public_key()])
        .await
        .expect("Should publish private topic");
    node.wait_for_statuses(1).await;

    // Act
    node.request_topic_cert("publisher", "secret", "node-x");
    let statuses = node.wait_for_statuses(2).await;

    // Assert
    assert_eq!(node.cert_acks(), 1);
    let update = statuses
        .iter()
        .find(|s| s.node_id == "node-x")
        .expect("Status for node-x should be reported");
    assert_eq!(update.topic, "secret");
    assert!(update.is_verified());
}

/// Test that a signature altered in transit is rejected.
#[tokio::test]
async fn test_tampered_signature_rejected() {
    init_test_logging();

    // Arrange
    let node = SimNode::new();
    let key = test_key(0x03);
    let subscriber = node.client("subscriber", fast_verify()).await;
    let publisher = node.client("publisher", fast_verify()).await;
    let (callback, _seen) = recording_echo();
    subscriber
        .subscribe_private_topic("secret", Arc::clone(&key), callback)
        .await
        .expect("Should subscribe");
    node.set_tamper_challenges(true);

    // Act
    publisher
        .publish_private_topic("secret", vec![key.public_key()])
        .await
        .expect("Should publish private topic");
    let statuses = node.wait_for_statuses(1).await;

    // Assert
    assert_eq!(statuses[0].check_result, 1);
    assert!(!statuses[0].is_verified());
}

/// Test that a subscriber holding an unauthorized key is rejected.
#[tokio::test]
async fn test_unauthorized_key_rejected() {
    init_test_logging();

    // Arrange
    let node = SimNode::new();
    let authorized = test_key(0x04);
    let intruder = test_key(0x05);
    let subscriber = node.client("subscriber", fast_verify()).await;
    let publisher = node.client("publisher", fast_verify()).await;
    let (callback, seen) = recording_echo();
    subscriber
        .subscribe_private_topic("secret", intruder, callback)
        .await
        .expect("Should subscribe");

    // Act
    publisher
        .publish_private_topic("secret", vec![authorized.public_key()])
        .await
        .expect("Should publish private topic");
    let statuses = node.wait_for_statuses(1).await;

    // Assert
    assert_eq!(statuses[0].topic, "secret");
    assert!(!statuses[0].is_verified());
    assert!(seen.lock().is_empty());
}

/// Test that verification with no subscriber holding a key fails closed
/// after the verify timeout.
#[tokio::test]
async fn test_private_topic_without_subscriber_rejected() {
    init_test_logging();

    // Arrange
    let node = SimNode::new();
    let key = test_key(0x06);
    let publisher = node.client("publisher", fast_verify()).await;

    // Act
    let started = Instant::now();
    publisher
        .publish_private_topic("secret", vec![key.public_key()])
        .await
        .expect("Should publish private topic");
    let statuses = node.wait_for_statuses(1).await;

    // Assert
    assert!(started.elapsed() >= Duration::from_millis(290));
    assert_eq!(statuses[0].topic, "secret");
    assert_eq!(statuses[0].check_result, 1);
    assert_eq!(publisher.stats().timed_out, 1);
}

/// Test that shutdown fails outstanding requests with SHUTDOWN.
#[tokio::test]
async fn test_shutdown_cancels_outstanding_requests() {
    init_test_logging();

    // Arrange
    let node = SimNode::new();
    let publisher = node.client("publisher", AmopConfig::default()).await;
    let code = Arc::new(AtomicUsize::new(usize::MAX));
    let sink = Arc::clone(&code);
    publisher
        .publish_with_callback(
            "nobody-listens",
            b"ping".to_vec(),
            Some(Duration::from_secs(30)),
            Box::new(move |resp| sink.store(resp.error_code as usize, Ordering::SeqCst)),
        )
        .await
        .expect("Should publish");

    // Act
    let cancelled = publisher.shutdown();

    // Assert
    assert_eq!(cancelled, 1);
    assert_eq!(code.load(Ordering::SeqCst), codes::SHUTDOWN as usize);
    assert!(!publisher.is_running());
    assert!(publisher.subscribed_topics().is_empty());
}
