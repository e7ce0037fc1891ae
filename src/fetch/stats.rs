use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fetch worker counters
#[derive(Debug, Default)]
pub struct FetchStats {
    requests: AtomicU64,
    fetch_failures: AtomicU64,
    store_failures: AtomicU64,
    published: AtomicU64,
    publish_drops: AtomicU64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FetchStatsSnapshot {
    pub requests: u64,
    pub fetch_failures: u64,
    pub store_failures: u64,
    pub published: u64,
    pub publish_drops: u64,
}

impl FetchStats {
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.fetch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_drop(&self) {
        self.publish_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> FetchStatsSnapshot {
        FetchStatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            fetch_failures: self.fetch_failures.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            publish_drops: self.publish_drops.load(Ordering::Relaxed),
        }
    }
}
