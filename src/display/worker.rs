use super::resource::DisplayResource;
use super::stats::RenderStats;
use crate::error::RenderError;
use crate::mailbox::{Dequeue, MailboxReceiver};
use crate::pipeline::{RenderItem, TargetSnapshot};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    Idle,
    Locking,
    Applying,
}

/// How one render item ended
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Applied,
    /// Sensor update that would not change what is on screen
    Suppressed,
    Failed(RenderError),
}

/// Single consumer of the render queue and the only writer to the display
pub struct RenderWorker {
    items: MailboxReceiver<RenderItem>,
    display: DisplayResource,
    poll_interval: Duration,
    /// Detection flag currently drawn for each radar slot
    shown: HashMap<usize, bool>,
    stats: Arc<RenderStats>,
    state: Arc<Mutex<RenderState>>,
}

impl RenderWorker {
    pub fn new(
        items: MailboxReceiver<RenderItem>,
        display: DisplayResource,
        poll_interval: Duration,
    ) -> Self {
        Self {
            items,
            display,
            poll_interval,
            shown: HashMap::new(),
            stats: Arc::new(RenderStats::default()),
            state: Arc::new(Mutex::new(RenderState::Idle)),
        }
    }

    pub fn stats(&self) -> Arc<RenderStats> {
        Arc::clone(&self.stats)
    }

    pub fn state_handle(&self) -> Arc<Mutex<RenderState>> {
        Arc::clone(&self.state)
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        info!("Render worker started");

        loop {
            if cancel.is_cancelled() {
                info!("Render worker stopping");
                break;
            }

            match self.items.dequeue(self.poll_interval).await {
                Dequeue::Item(item) => {
                    self.handle(item).await;
                }
                Dequeue::Empty => {}
                Dequeue::Closed => {
                    info!("Render queue closed, render worker exiting");
                    break;
                }
            }
        }
    }

    pub async fn handle(&mut self, item: RenderItem) -> RenderOutcome {
        let kind = item.kind();

        if let RenderItem::SensorUpdate { target, moved } = &item {
            if !moved && self.is_shown(target) {
                debug!("Slot {} unchanged, skipping redraw", target.slot);
                self.stats.record_suppressed();
                return RenderOutcome::Suppressed;
            }
        }

        if let RenderItem::ImageReady(image) = &item {
            if let Err(e) = ensure_readable(&image.path).await {
                error!("Failed to apply {}: {}", kind, e);
                self.stats.record_failed();
                return RenderOutcome::Failed(e);
            }
        }

        self.set_state(RenderState::Locking);
        let state = Arc::clone(&self.state);
        let result = self
            .display
            .apply(|surface| {
                *state.lock() = RenderState::Applying;
                match &item {
                    RenderItem::ImageReady(image) => surface.show_image(image),
                    RenderItem::SensorUpdate { target, .. } => surface.update_target(target),
                    RenderItem::ToggleView => {
                        let next = surface.view().toggled();
                        surface.set_view(next)
                    }
                }
            })
            .await;
        self.set_state(RenderState::Idle);

        match result {
            Ok(()) => {
                if let RenderItem::SensorUpdate { target, .. } = &item {
                    self.shown.insert(target.slot, target.detected);
                }
                debug!("Applied {}", kind);
                self.stats.record_applied();
                RenderOutcome::Applied
            }
            Err(e @ RenderError::LockTimeout { .. }) => {
                warn!("Dropping {}: {}", kind, e);
                self.stats.record_lock_timeout();
                RenderOutcome::Failed(e)
            }
            Err(e) => {
                error!("Failed to apply {}: {}", kind, e);
                self.stats.record_failed();
                RenderOutcome::Failed(e)
            }
        }
    }

    fn is_shown(&self, target: &TargetSnapshot) -> bool {
        self.shown.get(&target.slot).copied().unwrap_or(false) == target.detected
    }

    fn set_state(&self, state: RenderState) {
        *self.state.lock() = state;
    }
}

/// Image files are checked before the display lock is taken so the locked
/// section never touches the filesystem
async fn ensure_readable(path: &Path) -> Result<(), RenderError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        _ => Err(RenderError::MissingImage {
            path: path.to_path_buf(),
        }),
    }
}
