use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Render worker counters
#[derive(Debug, Default)]
pub struct RenderStats {
    applied: AtomicU64,
    suppressed: AtomicU64,
    failed: AtomicU64,
    lock_timeouts: AtomicU64,
    last_render: Mutex<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderStatsSnapshot {
    pub applied: u64,
    pub suppressed: u64,
    pub failed: u64,
    pub lock_timeouts: u64,
    pub last_render: Option<DateTime<Utc>>,
}

impl RenderStats {
    pub fn record_applied(&self) {
        self.applied.fetch_add(1, Ordering::Relaxed);
        *self.last_render.lock() = Some(Utc::now());
    }

    pub fn record_suppressed(&self) {
        self.suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lock_timeout(&self) {
        self.lock_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RenderStatsSnapshot {
        RenderStatsSnapshot {
            applied: self.applied.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            lock_timeouts: self.lock_timeouts.load(Ordering::Relaxed),
            last_render: *self.last_render.lock(),
        }
    }
}
