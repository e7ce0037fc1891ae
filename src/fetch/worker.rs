use super::client::Fetcher;
use super::stats::FetchStats;
use super::store::ArtifactStore;
use crate::config::{FetchConfig, QueueConfig};
use crate::mailbox::{Dequeue, EnqueueOutcome, MailboxReceiver, MailboxSender};
use crate::pipeline::{FetchRequest, ImageArtifact, RenderItem};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Where the fetch worker is in its per-request cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Fetching,
    Storing,
    Publishing,
}

/// How one fetch request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Published(PathBuf),
    FetchFailed,
    StoreFailed,
    /// Stored, but the render queue stayed full or was closed
    PublishDropped(PathBuf),
}

/// Single consumer of the fetch queue
pub struct FetchWorker {
    requests: MailboxReceiver<FetchRequest>,
    renders: MailboxSender<RenderItem>,
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn ArtifactStore>,
    config: FetchConfig,
    publish_timeout: Duration,
    poll_interval: Duration,
    stats: Arc<FetchStats>,
    state: Arc<Mutex<FetchState>>,
}

impl FetchWorker {
    pub fn new(
        requests: MailboxReceiver<FetchRequest>,
        renders: MailboxSender<RenderItem>,
        fetcher: Arc<dyn Fetcher>,
        store: Arc<dyn ArtifactStore>,
        fetch_config: &FetchConfig,
        queue_config: &QueueConfig,
    ) -> Self {
        Self {
            requests,
            renders,
            fetcher,
            store,
            config: fetch_config.clone(),
            publish_timeout: fetch_config.publish_timeout(),
            poll_interval: queue_config.poll_interval(),
            stats: Arc::new(FetchStats::default()),
            state: Arc::new(Mutex::new(FetchState::Idle)),
        }
    }

    pub fn stats(&self) -> Arc<FetchStats> {
        Arc::clone(&self.stats)
    }

    /// Shared view of the worker's current state
    pub fn state_handle(&self) -> Arc<Mutex<FetchState>> {
        Arc::clone(&self.state)
    }

    /// Drain the fetch queue until cancelled or every producer is gone
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("Fetch worker started");

        loop {
            if cancel.is_cancelled() {
                info!("Fetch worker stopping");
                break;
            }

            match self.requests.dequeue(self.poll_interval).await {
                Dequeue::Item(request) => {
                    self.handle(request).await;
                }
                Dequeue::Empty => {}
                Dequeue::Closed => {
                    info!("Fetch queue closed, fetch worker exiting");
                    break;
                }
            }
        }

        self.set_state(FetchState::Idle);
    }

    /// Run one request through fetch, store and publish
    pub async fn handle(&self, request: FetchRequest) -> FetchOutcome {
        self.stats.record_request();
        let url = self.config.snapshot_url_for(&request.target.camera);

        debug!(
            "Fetch request {} from {} for {}",
            request.id, request.origin, request.target
        );

        self.set_state(FetchState::Fetching);
        let payload = match self.fetcher.fetch(&url).await {
            Ok(payload) => payload,
            Err(e) => {
                error!("Fetch for {} failed: {}", request.target, e);
                self.stats.record_fetch_failure();
                self.set_state(FetchState::Idle);
                return FetchOutcome::FetchFailed;
            }
        };

        self.set_state(FetchState::Storing);
        let path = match self.store.store(&request.target, &payload).await {
            Ok(path) => path,
            Err(e) => {
                error!("Storing snapshot for {} failed: {}", request.target, e);
                self.stats.record_store_failure();
                self.set_state(FetchState::Idle);
                return FetchOutcome::StoreFailed;
            }
        };
        drop(payload);

        self.set_state(FetchState::Publishing);
        let item = RenderItem::ImageReady(ImageArtifact {
            path: path.clone(),
            target: request.target.clone(),
            scale: request.requested_scale,
        });
        let outcome = match self.renders.enqueue(item, self.publish_timeout).await {
            EnqueueOutcome::Enqueued => {
                debug!("Published {} for {}", path.display(), request.target);
                self.stats.record_published();
                FetchOutcome::Published(path)
            }
            EnqueueOutcome::Full | EnqueueOutcome::Closed => {
                warn!(
                    "Render queue unavailable, dropping snapshot for {}",
                    request.target
                );
                self.stats.record_publish_drop();
                FetchOutcome::PublishDropped(path)
            }
        };

        self.set_state(FetchState::Idle);
        outcome
    }

    fn set_state(&self, state: FetchState) {
        *self.state.lock() = state;
    }
}
