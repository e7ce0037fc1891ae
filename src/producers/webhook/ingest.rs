use super::payload::parse_alert;
use crate::error::InputError;
use crate::mailbox::{EnqueueOutcome, MailboxSender};
use crate::pipeline::{FetchRequest, RequestOrigin};
use crate::resolution::{DeviceId, ResolutionTable, TargetRef};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// What became of one inbound notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Enqueued(TargetRef),
    Rejected(InputError),
    UnknownDevice(DeviceId),
    /// Resolved, but the fetch queue stayed full or was closed
    Dropped(TargetRef),
}

#[derive(Debug, Default)]
pub struct IngestStats {
    received: AtomicU64,
    rejected: AtomicU64,
    unknown: AtomicU64,
    enqueued: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStatsSnapshot {
    pub received: u64,
    pub rejected: u64,
    pub unknown: u64,
    pub enqueued: u64,
    pub dropped: u64,
}

impl IngestStats {
    fn record(&self, outcome: &IngestOutcome) {
        self.received.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            IngestOutcome::Enqueued(_) => &self.enqueued,
            IngestOutcome::Rejected(_) => &self.rejected,
            IngestOutcome::UnknownDevice(_) => &self.unknown,
            IngestOutcome::Dropped(_) => &self.dropped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> IngestStatsSnapshot {
        IngestStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            unknown: self.unknown.load(Ordering::Relaxed),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Turns alarm notifications into fetch requests
pub struct WebhookIngest {
    table: Arc<ResolutionTable>,
    fetches: MailboxSender<FetchRequest>,
    enqueue_timeout: Duration,
    stats: IngestStats,
}

impl WebhookIngest {
    pub fn new(
        table: Arc<ResolutionTable>,
        fetches: MailboxSender<FetchRequest>,
        enqueue_timeout: Duration,
    ) -> Self {
        Self {
            table,
            fetches,
            enqueue_timeout,
            stats: IngestStats::default(),
        }
    }

    /// Parse, resolve and enqueue. Never fails; every problem is logged
    /// and reported in the outcome.
    pub async fn ingest(&self, body: &[u8]) -> IngestOutcome {
        let outcome = self.process(body).await;
        self.stats.record(&outcome);
        outcome
    }

    async fn process(&self, body: &[u8]) -> IngestOutcome {
        let notice = match parse_alert(body) {
            Ok(notice) => notice,
            Err(e) => {
                warn!("Rejected webhook payload ({} bytes): {}", body.len(), e);
                return IngestOutcome::Rejected(e);
            }
        };

        let target = match self.table.resolve(&notice.device) {
            Ok(target) => target,
            Err(e) => {
                warn!("{}, notification discarded", e);
                return IngestOutcome::UnknownDevice(notice.device);
            }
        };

        let request = FetchRequest::new(target.clone(), None, RequestOrigin::Webhook);
        debug!("Queueing fetch {} for {}", request.id, target);

        match self.fetches.enqueue(request, self.enqueue_timeout).await {
            EnqueueOutcome::Enqueued => IngestOutcome::Enqueued(target),
            EnqueueOutcome::Full | EnqueueOutcome::Closed => {
                warn!("Fetch queue unavailable, dropping alarm for {}", target);
                IngestOutcome::Dropped(target)
            }
        }
    }

    pub fn stats(&self) -> IngestStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn fetch_queue(&self) -> &MailboxSender<FetchRequest> {
        &self.fetches
    }
}
