use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use stamp_schema::HeadRecordJson;
use tokio::sync::broadcast;

use crate::error::SchedulerError;

/// Default depth of the short head-record queue late subscribers drain on
/// reconnect (spec.md §4.D Failure handling: "default N=5").
pub const DEFAULT_HEAD_QUEUE_DEPTH: usize = 5;

/// The broadcast-sink interface the scheduler consumes (spec.md §6):
/// `publish(channel, bytes)` / `subscribe(channel) -> stream of bytes`. A
/// step-12 publish failure is logged but non-fatal (spec.md §4.D) — it never
/// rolls back the tick that already committed.
#[async_trait]
pub trait BroadcastSink: Send + Sync {
    async fn publish(&self, channel: &str, bytes: Vec<u8>) -> Result<(), SchedulerError>;
}

/// The in-process reference sink: one `tokio::sync::broadcast` channel per
/// name, created lazily. Grounded on the cancellation-safe rotation
/// discipline of the teacher's `monitoring.rs` `Lifecycle`: a fresh
/// `subscribe()` call only ever observes sends made after it returns, so
/// concurrent waiters always join the live set without a hand-rolled swap.
pub struct InMemoryBroadcastSink {
    channels: Mutex<HashMap<String, broadcast::Sender<Vec<u8>>>>,
}

impl Default for InMemoryBroadcastSink {
    fn default() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
        }
    }
}

impl InMemoryBroadcastSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender_for(&self, channel: &str) -> broadcast::Sender<Vec<u8>> {
        let mut channels = self.channels.lock().unwrap();
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(64).0)
            .clone()
    }

    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<Vec<u8>> {
        self.sender_for(channel).subscribe()
    }
}

#[async_trait]
impl BroadcastSink for InMemoryBroadcastSink {
    async fn publish(&self, channel: &str, bytes: Vec<u8>) -> Result<(), SchedulerError> {
        // No receivers is not an error: it just means nobody is listening
        // right now, matching spec.md's "broadcast unavailable -> log,
        // continue" transient handling one level up in the scheduler.
        let _ = self.sender_for(channel).send(bytes);
        Ok(())
    }
}

/// The local waiter API of spec.md §5: "wait for next head, with timeout",
/// cancellation-safe without dropping notifications for other waiters. Also
/// retains the last [`DEFAULT_HEAD_QUEUE_DEPTH`] heads so a late subscriber
/// can drain what it missed instead of only ever seeing future heads.
pub struct HeadWaiter {
    tx: broadcast::Sender<HeadRecordJson>,
    recent: Mutex<VecDeque<HeadRecordJson>>,
    queue_depth: usize,
}

impl HeadWaiter {
    pub fn new(queue_depth: usize) -> Self {
        let (tx, _rx) = broadcast::channel(64);
        Self {
            tx,
            recent: Mutex::new(VecDeque::with_capacity(queue_depth)),
            queue_depth,
        }
    }

    /// Publishes a new head to all current waiters and retains it in the
    /// recent-heads queue.
    pub fn publish(&self, head: HeadRecordJson) {
        let mut recent = self.recent.lock().unwrap();
        if recent.len() == self.queue_depth {
            recent.pop_front();
        }
        recent.push_back(head.clone());
        drop(recent);
        // No active subscriber is not an error — the head is still queued
        // for whoever reconnects next.
        let _ = self.tx.send(head);
    }

    /// The heads published most recently, oldest first, for a late
    /// subscriber to drain on reconnect.
    pub fn recent_heads(&self) -> Vec<HeadRecordJson> {
        self.recent.lock().unwrap().iter().cloned().collect()
    }

    /// Waits for the next published head, or `None` on timeout. Every call
    /// subscribes fresh, so concurrent callers always join the live
    /// broadcast set rather than racing over a single shared receiver.
    pub async fn wait_for_next(&self, timeout: Duration) -> Option<HeadRecordJson> {
        let mut rx = self.tx.subscribe();
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Ok(head)) => Some(head),
            Ok(Err(broadcast::error::RecvError::Lagged(_))) => self.recent_heads().pop(),
            Ok(Err(broadcast::error::RecvError::Closed)) => None,
            Err(_elapsed) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stamp_schema::IntervalHeadJson;

    fn sample_head(index: u64) -> HeadRecordJson {
        HeadRecordJson {
            version: "1".into(),
            authority: "example.org".into(),
            interval: IntervalHeadJson {
                index,
                timestamp: "2026-07-30T00:00:00.000000Z".into(),
                ith: "".into(),
                version: "1".into(),
                typ: "it".into(),
            },
            mth: "".into(),
            inclusion: stamp_schema::InclusionJson {
                head: index,
                leaf: None,
                a: 0,
                nodes: vec![],
            },
            consistency: None,
        }
    }

    #[tokio::test]
    async fn waiters_that_subscribe_after_a_publish_wait_for_the_next_one() {
        let waiter = HeadWaiter::new(DEFAULT_HEAD_QUEUE_DEPTH);
        waiter.publish(sample_head(0));

        let handle = tokio::spawn(async move { waiter.wait_for_next(Duration::from_secs(1)).await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.abort();
    }

    #[test]
    fn recent_heads_are_bounded_by_queue_depth() {
        let waiter = HeadWaiter::new(2);
        waiter.publish(sample_head(0));
        waiter.publish(sample_head(1));
        waiter.publish(sample_head(2));
        let recent = waiter.recent_heads();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].interval.index, 1);
        assert_eq!(recent[1].interval.index, 2);
    }
}
