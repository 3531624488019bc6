//! # Pending-Call Table
//!
//! Correlates outbound requests with their responses by sequence id.
//!
//! Each entry owns a one-shot callback and a timer task. Both the response
//! path ([`PendingCallTable::resolve`]) and the timer claim the entry with
//! `DashMap::remove`; whichever removes it first invokes the callback, the
//! other finds nothing and does nothing. A callback therefore runs exactly
//! once, and never while a map shard is locked.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::message::SequenceId;
use super::response::{codes, Response, ResponseCallback};

/// An outstanding call.
struct PendingCall {
    /// Never contended; the lock only lets a `Send` closure sit in a
    /// shared map.
    callback: Mutex<ResponseCallback>,
    created_at: Instant,
    /// Topic, for logging
    topic: String,
    timer: Option<JoinHandle<()>>,
}

impl PendingCall {
    fn finish(self, response: Response) {
        if let Some(timer) = self.timer {
            timer.abort();
        }
        (self.callback.into_inner())(response);
    }
}

/// Lifetime counters.
#[derive(Debug, Default)]
pub struct PendingStats {
    pub registered: AtomicU64,
    pub completed: AtomicU64,
    pub timed_out: AtomicU64,
    pub cancelled: AtomicU64,
}

/// Point-in-time copy of [`PendingStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingStatsSnapshot {
    pub registered: u64,
    pub completed: u64,
    pub timed_out: u64,
    pub cancelled: u64,
}

impl PendingStats {
    pub fn snapshot(&self) -> PendingStatsSnapshot {
        PendingStatsSnapshot {
            registered: self.registered.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

/// Concurrent sequence id → callback table with per-entry deadlines.
pub struct PendingCallTable {
    pending: Arc<DashMap<SequenceId, PendingCall>>,
    stats: Arc<PendingStats>,
    runtime: Handle,
}

impl PendingCallTable {
    /// Timers are spawned on `runtime`, so registration works from any
    /// thread, inside or outside the runtime.
    pub fn new(runtime: Handle) -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            stats: Arc::new(PendingStats::default()),
            runtime,
        }
    }

    /// Store `callback` under `seq` and arm its deadline.
    ///
    /// If `timeout` elapses before [`resolve`](Self::resolve), the callback
    /// receives a [`codes::TIMEOUT`] response.
    pub fn register(
        &self,
        seq: SequenceId,
        topic: &str,
        timeout: Duration,
        callback: ResponseCallback,
    ) {
        let call = PendingCall {
            callback: Mutex::new(callback),
            created_at: Instant::now(),
            topic: topic.to_string(),
            timer: None,
        };

        if let Some(stale) = self.pending.insert(seq.clone(), call) {
            warn!(seq = %seq, topic = %stale.topic, "Sequence id reused while pending");
            self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
            stale.finish(Response::error(
                codes::MESSAGE_SEND_EXCEPTION,
                "Sequence id reused",
            ));
        }
        self.stats.registered.fetch_add(1, Ordering::Relaxed);

        let timer = self.runtime.spawn({
            let pending = Arc::clone(&self.pending);
            let stats = Arc::clone(&self.stats);
            let seq = seq.clone();
            async move {
                tokio::time::sleep(timeout).await;
                if let Some((_, call)) = pending.remove(&seq) {
                    stats.timed_out.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        seq = %seq,
                        topic = %call.topic,
                        timeout_ms = timeout.as_millis() as u64,
                        "Pending call timed out"
                    );
                    // Running inside the timer task itself, so no abort
                    (call.callback.into_inner())(Response::timeout());
                }
            }
        });

        // The entry may already be gone if a response raced the spawn
        match self.pending.get_mut(&seq) {
            Some(mut entry) => entry.timer = Some(timer),
            None => timer.abort(),
        }

        debug!(
            seq = %seq,
            topic = topic,
            timeout_ms = timeout.as_millis() as u64,
            "Registered pending call"
        );
    }

    /// Deliver `response` to the call registered under `seq`.
    ///
    /// Returns false when no such call is pending (already resolved, timed
    /// out, or never registered).
    pub fn resolve(&self, seq: &SequenceId, response: Response) -> bool {
        let Some((_, call)) = self.pending.remove(seq) else {
            debug!(seq = %seq, "No pending call for response");
            return false;
        };

        self.stats.completed.fetch_add(1, Ordering::Relaxed);
        debug!(
            seq = %seq,
            topic = %call.topic,
            error_code = response.error_code,
            elapsed_ms = call.created_at.elapsed().as_millis() as u64,
            "Resolved pending call"
        );
        call.finish(response);
        true
    }

    /// Fail every outstanding call with [`codes::SHUTDOWN`].
    ///
    /// Returns the number of calls cancelled.
    pub fn cancel_all(&self) -> usize {
        let seqs: Vec<SequenceId> = self.pending.iter().map(|e| e.key().clone()).collect();
        let mut cancelled = 0;
        for seq in seqs {
            if let Some((_, call)) = self.pending.remove(&seq) {
                self.stats.cancelled.fetch_add(1, Ordering::Relaxed);
                call.finish(Response::shutdown());
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            debug!(cancelled, "Cancelled pending calls");
        }
        cancelled
    }

    pub fn is_pending(&self, seq: &SequenceId) -> bool {
        self.pending.contains_key(seq)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> PendingStatsSnapshot {
        self.stats.snapshot()
    }
}
