use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TrySendError};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

/// Result of offering an item to a mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Enqueued,
    /// Still at capacity when the timeout ran out; the item was dropped
    Full,
    /// The consumer is gone; the item was dropped
    Closed,
}

impl EnqueueOutcome {
    pub fn is_enqueued(&self) -> bool {
        matches!(self, EnqueueOutcome::Enqueued)
    }
}

/// Result of waiting on a mailbox
#[derive(Debug, PartialEq, Eq)]
pub enum Dequeue<T> {
    Item(T),
    /// Nothing arrived before the timeout
    Empty,
    /// Every sender is gone and the mailbox is drained
    Closed,
}

/// Counters shared by both ends of a mailbox
#[derive(Debug)]
struct MailboxStats {
    enqueued: AtomicU64,
    dropped_full: AtomicU64,
    dropped_closed: AtomicU64,
    dequeued: AtomicU64,
    high_water: AtomicUsize,
}

impl MailboxStats {
    fn new() -> Self {
        Self {
            enqueued: AtomicU64::new(0),
            dropped_full: AtomicU64::new(0),
            dropped_closed: AtomicU64::new(0),
            dequeued: AtomicU64::new(0),
            high_water: AtomicUsize::new(0),
        }
    }
}

/// Snapshot of mailbox statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MailboxStatsSnapshot {
    pub capacity: usize,
    pub occupancy: usize,
    pub enqueued: u64,
    pub dropped_full: u64,
    pub dropped_closed: u64,
    pub dequeued: u64,
    pub high_water: usize,
}

struct Shared {
    name: &'static str,
    capacity: usize,
    stats: MailboxStats,
}

/// Create a bounded multi-producer single-consumer mailbox.
///
/// Occupancy never exceeds `capacity`; producers that find it full wait at
/// most their own timeout and then drop the item.
///
/// # Panics
/// Panics if `capacity` is zero.
pub fn mailbox<T>(name: &'static str, capacity: usize) -> (MailboxSender<T>, MailboxReceiver<T>) {
    assert!(capacity > 0, "mailbox capacity must be greater than 0");

    let (tx, rx) = mpsc::channel(capacity);
    let shared = Arc::new(Shared {
        name,
        capacity,
        stats: MailboxStats::new(),
    });

    debug!("Created mailbox '{}' with capacity {}", name, capacity);

    (
        MailboxSender {
            tx,
            shared: Arc::clone(&shared),
        },
        MailboxReceiver { rx, shared },
    )
}

/// Producer handle; clone one per producer
pub struct MailboxSender<T> {
    tx: mpsc::Sender<T>,
    shared: Arc<Shared>,
}

impl<T> Clone for MailboxSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> MailboxSender<T> {
    /// Insert `item`, waiting up to `wait` for a free slot. A zero `wait`
    /// never blocks.
    pub async fn enqueue(&self, item: T, wait: Duration) -> EnqueueOutcome {
        let result = if wait.is_zero() {
            self.tx.try_send(item).map_err(|e| match e {
                TrySendError::Full(_) => EnqueueOutcome::Full,
                TrySendError::Closed(_) => EnqueueOutcome::Closed,
            })
        } else {
            self.tx.send_timeout(item, wait).await.map_err(|e| match e {
                SendTimeoutError::Timeout(_) => EnqueueOutcome::Full,
                SendTimeoutError::Closed(_) => EnqueueOutcome::Closed,
            })
        };

        match result {
            Ok(()) => {
                let stats = &self.shared.stats;
                stats.enqueued.fetch_add(1, Ordering::Relaxed);
                stats
                    .high_water
                    .fetch_max(self.occupancy(), Ordering::Relaxed);
                trace!(
                    "Mailbox '{}' accepted item ({}/{})",
                    self.shared.name,
                    self.occupancy(),
                    self.shared.capacity
                );
                EnqueueOutcome::Enqueued
            }
            Err(EnqueueOutcome::Closed) => {
                self.shared
                    .stats
                    .dropped_closed
                    .fetch_add(1, Ordering::Relaxed);
                warn!("Mailbox '{}' is closed, item dropped", self.shared.name);
                EnqueueOutcome::Closed
            }
            Err(outcome) => {
                self.shared.stats.dropped_full.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Mailbox '{}' full after {:?} ({}/{}), item dropped",
                    self.shared.name,
                    wait,
                    self.occupancy(),
                    self.shared.capacity
                );
                outcome
            }
        }
    }

    /// Items currently waiting in the mailbox
    pub fn occupancy(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    pub fn stats(&self) -> MailboxStatsSnapshot {
        snapshot(&self.shared, self.occupancy())
    }
}

/// Consumer handle; exactly one per mailbox
pub struct MailboxReceiver<T> {
    rx: mpsc::Receiver<T>,
    shared: Arc<Shared>,
}

impl<T> MailboxReceiver<T> {
    /// Wait up to `wait` for the next item
    pub async fn dequeue(&mut self, wait: Duration) -> Dequeue<T> {
        match timeout(wait, self.rx.recv()).await {
            Ok(Some(item)) => {
                self.shared.stats.dequeued.fetch_add(1, Ordering::Relaxed);
                Dequeue::Item(item)
            }
            Ok(None) => Dequeue::Closed,
            Err(_) => Dequeue::Empty,
        }
    }

    /// Take the next item if one is already waiting
    pub fn try_dequeue(&mut self) -> Option<T> {
        let item = self.rx.try_recv().ok()?;
        self.shared.stats.dequeued.fetch_add(1, Ordering::Relaxed);
        Some(item)
    }

    pub fn occupancy(&self) -> usize {
        self.rx.len()
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    pub fn stats(&self) -> MailboxStatsSnapshot {
        snapshot(&self.shared, self.occupancy())
    }
}

fn snapshot(shared: &Shared, occupancy: usize) -> MailboxStatsSnapshot {
    let stats = &shared.stats;
    MailboxStatsSnapshot {
        capacity: shared.capacity,
        occupancy,
        enqueued: stats.enqueued.load(Ordering::Relaxed),
        dropped_full: stats.dropped_full.load(Ordering::Relaxed),
        dropped_closed: stats.dropped_closed.load(Ordering::Relaxed),
        dequeued: stats.dequeued.load(Ordering::Relaxed),
        high_water: stats.high_water.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    const SHORT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn test_fifo_within_capacity() {
        let (tx, mut rx) = mailbox::<u32>("test", 16);

        for i in 0..16 {
            assert_eq!(tx.enqueue(i, SHORT).await, EnqueueOutcome::Enqueued);
        }
        assert_eq!(tx.occupancy(), 16);

        for i in 0..16 {
            assert_eq!(rx.dequeue(SHORT).await, Dequeue::Item(i));
        }
        assert_eq!(rx.occupancy(), 0);
    }

    #[tokio::test]
    async fn test_full_enqueue_times_out_without_changing_occupancy() {
        let (tx, _rx) = mailbox::<u32>("test", 16);
        for i in 0..16 {
            assert!(tx.enqueue(i, SHORT).await.is_enqueued());
        }

        let started = Instant::now();
        let outcome = tx.enqueue(16, SHORT).await;
        let elapsed = started.elapsed();

        assert_eq!(outcome, EnqueueOutcome::Full);
        assert!(elapsed >= Duration::from_millis(45), "returned after {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(1), "returned after {:?}", elapsed);
        assert_eq!(tx.occupancy(), 16);

        let stats = tx.stats();
        assert_eq!(stats.enqueued, 16);
        assert_eq!(stats.dropped_full, 1);
        assert_eq!(stats.high_water, 16);
    }

    #[tokio::test]
    async fn test_zero_timeout_does_not_block() {
        let (tx, _rx) = mailbox::<u32>("test", 1);
        assert!(tx.enqueue(1, Duration::ZERO).await.is_enqueued());
        assert_eq!(tx.enqueue(2, Duration::ZERO).await, EnqueueOutcome::Full);
        assert_eq!(tx.occupancy(), 1);
    }

    #[tokio::test]
    async fn test_blocked_producer_proceeds_when_space_frees() {
        let (tx, mut rx) = mailbox::<u32>("test", 1);
        assert!(tx.enqueue(1, SHORT).await.is_enqueued());

        let producer = {
            let tx = tx.clone();
            tokio::spawn(async move { tx.enqueue(2, Duration::from_secs(2)).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(rx.dequeue(SHORT).await, Dequeue::Item(1));

        assert_eq!(producer.await.unwrap(), EnqueueOutcome::Enqueued);
        assert_eq!(rx.dequeue(SHORT).await, Dequeue::Item(2));
    }

    #[tokio::test]
    async fn test_dequeue_empty_and_closed() {
        let (tx, mut rx) = mailbox::<u32>("test", 4);
        assert_eq!(rx.dequeue(Duration::from_millis(10)).await, Dequeue::Empty);

        assert!(tx.enqueue(7, SHORT).await.is_enqueued());
        drop(tx);

        assert_eq!(rx.dequeue(SHORT).await, Dequeue::Item(7));
        assert_eq!(rx.dequeue(SHORT).await, Dequeue::Closed);
    }

    #[tokio::test]
    async fn test_enqueue_after_receiver_dropped() {
        let (tx, rx) = mailbox::<u32>("test", 4);
        drop(rx);

        assert!(tx.is_closed());
        assert_eq!(tx.enqueue(1, SHORT).await, EnqueueOutcome::Closed);
        assert_eq!(tx.stats().dropped_closed, 1);
    }

    #[tokio::test]
    async fn test_fifo_per_producer_with_concurrent_producers() {
        let (tx, mut rx) = mailbox::<(u8, u32)>("test", 4);

        let producers: Vec<_> = (0..3u8)
            .map(|producer| {
                let tx = tx.clone();
                tokio::spawn(async move {
                    for seq in 0..50u32 {
                        let outcome = tx.enqueue((producer, seq), Duration::from_secs(5)).await;
                        assert!(outcome.is_enqueued());
                    }
                })
            })
            .collect();
        drop(tx);

        let mut next = [0u32; 3];
        let mut received = 0;
        loop {
            match rx.dequeue(Duration::from_secs(5)).await {
                Dequeue::Item((producer, seq)) => {
                    assert!(rx.occupancy() <= 4);
                    assert_eq!(seq, next[producer as usize]);
                    next[producer as usize] += 1;
                    received += 1;
                }
                Dequeue::Closed => break,
                Dequeue::Empty => panic!("producers stalled"),
            }
        }

        for producer in producers {
            producer.await.unwrap();
        }
        assert_eq!(received, 150);
        assert_eq!(next, [50, 50, 50]);
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity_rejected() {
        let _ = mailbox::<u32>("test", 0);
    }
}
