use super::*;
use crate::config::AlarmviewConfig;
use crate::error::StoreError;
use crate::mailbox::{mailbox, Dequeue, MailboxReceiver, MailboxSender};
use crate::pipeline::{FetchRequest, RenderItem, RequestOrigin};
use crate::resolution::TargetRef;
use crate::test_support::{ScriptedFetcher, JPEG};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SHORT: Duration = Duration::from_millis(50);

fn front_door() -> TargetRef {
    TargetRef::new("6096c66202197e0387001879", "front door")
}

fn garage() -> TargetRef {
    TargetRef::new("65b2e8d400858f03e4014f3a", "garage")
}

struct FailingStore;

#[async_trait]
impl ArtifactStore for FailingStore {
    async fn store(&self, target: &TargetRef, _payload: &[u8]) -> Result<PathBuf, StoreError> {
        Err(StoreError::Empty {
            camera: target.camera.clone(),
        })
    }
}

struct Harness {
    worker: FetchWorker,
    fetcher: Arc<ScriptedFetcher>,
    requests: MailboxSender<FetchRequest>,
    renders: MailboxReceiver<RenderItem>,
    render_tx: MailboxSender<RenderItem>,
    _dir: tempfile::TempDir,
}

fn harness(render_capacity: usize, store: Option<Arc<dyn ArtifactStore>>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let config = AlarmviewConfig::default();
    let (requests, request_rx) = mailbox("fetch", 16);
    let (render_tx, renders) = mailbox("render", render_capacity);
    let fetcher = Arc::new(ScriptedFetcher::new());
    let store = store
        .unwrap_or_else(|| Arc::new(FileArtifactStore::new(dir.path(), 1024)) as Arc<dyn ArtifactStore>);

    let worker = FetchWorker::new(
        request_rx,
        render_tx.clone(),
        fetcher.clone(),
        store,
        &config.fetch,
        &config.queues,
    );

    Harness {
        worker,
        fetcher,
        requests,
        renders,
        render_tx,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_successful_fetch_publishes_image() {
    let mut h = harness(16, None);
    let request = FetchRequest::new(front_door(), Some(80), RequestOrigin::Button(2));

    let outcome = h.worker.handle(request).await;
    let path = match outcome {
        FetchOutcome::Published(path) => path,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert_eq!(std::fs::read(&path).unwrap(), JPEG);

    match h.renders.dequeue(SHORT).await {
        Dequeue::Item(RenderItem::ImageReady(image)) => {
            assert_eq!(image.path, path);
            assert_eq!(image.target, front_door());
            assert_eq!(image.scale, Some(80));
        }
        other => panic!("unexpected render item {:?}", other),
    }

    assert_eq!(
        h.fetcher.urls(),
        vec!["https://10.100.1.1/proxy/protect/integration/v1/cameras/6096c66202197e0387001879/snapshot"]
    );
    assert_eq!(*h.worker.state_handle().lock(), FetchState::Idle);
}

#[tokio::test]
async fn test_network_error_publishes_nothing_and_next_request_is_served() {
    let mut h = harness(16, None);
    h.fetcher.fail_next("garage");

    let failed = h
        .worker
        .handle(FetchRequest::new(garage(), None, RequestOrigin::Webhook))
        .await;
    assert_eq!(failed, FetchOutcome::FetchFailed);
    assert_eq!(*h.worker.state_handle().lock(), FetchState::Idle);
    assert_eq!(h.renders.dequeue(SHORT).await, Dequeue::Empty);

    let served = h
        .worker
        .handle(FetchRequest::new(front_door(), None, RequestOrigin::Webhook))
        .await;
    assert!(matches!(served, FetchOutcome::Published(_)));
    assert!(matches!(
        h.renders.dequeue(SHORT).await,
        Dequeue::Item(RenderItem::ImageReady(_))
    ));

    let stats = h.worker.stats().snapshot();
    assert_eq!(stats.requests, 2);
    assert_eq!(stats.fetch_failures, 1);
    assert_eq!(stats.published, 1);
}

#[tokio::test]
async fn test_store_failure_publishes_nothing() {
    let mut h = harness(16, Some(Arc::new(FailingStore)));

    let outcome = h
        .worker
        .handle(FetchRequest::new(front_door(), None, RequestOrigin::Webhook))
        .await;

    assert_eq!(outcome, FetchOutcome::StoreFailed);
    assert_eq!(h.renders.dequeue(SHORT).await, Dequeue::Empty);
    assert_eq!(h.worker.stats().snapshot().store_failures, 1);
}

#[tokio::test]
async fn test_full_render_queue_drops_publication() {
    let h = harness(1, None);
    let filler = h.render_tx.clone();
    assert!(filler.enqueue(RenderItem::ToggleView, SHORT).await.is_enqueued());

    let outcome = h
        .worker
        .handle(FetchRequest::new(garage(), Some(192), RequestOrigin::Button(1)))
        .await;

    assert!(matches!(outcome, FetchOutcome::PublishDropped(_)));
    assert_eq!(filler.occupancy(), 1);
    assert_eq!(h.worker.stats().snapshot().publish_drops, 1);
}

#[tokio::test]
async fn test_run_drains_queue_until_producers_are_gone() {
    let Harness {
        worker,
        fetcher,
        requests,
        mut renders,
        render_tx,
        _dir,
    } = harness(16, None);
    drop(render_tx);
    let stats = worker.stats();

    for target in [front_door(), garage()] {
        let request = FetchRequest::new(target, None, RequestOrigin::Webhook);
        assert!(requests.enqueue(request, SHORT).await.is_enqueued());
    }
    drop(requests);

    let handle = tokio::spawn(worker.run(CancellationToken::new()));
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker should exit once the queue closes")
        .unwrap();

    assert_eq!(fetcher.urls().len(), 2);
    assert_eq!(stats.snapshot().published, 2);

    let mut cameras = Vec::new();
    while let Some(RenderItem::ImageReady(image)) = renders.try_dequeue() {
        cameras.push(image.target.name);
    }
    assert_eq!(cameras, vec!["front door", "garage"]);
}

#[tokio::test]
async fn test_run_stops_on_cancel() {
    let h = harness(16, None);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(h.worker.run(cancel.clone()));

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker should stop after cancellation")
        .unwrap();
    drop(h.requests);
}

#[tokio::test]
async fn test_snapshot_url_follows_configured_template() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AlarmviewConfig::default();
    config.fetch.snapshot_url = "http://nvr.local/cams/{camera}.jpg?w=320".to_string();
    let (_requests, request_rx) = mailbox("fetch", 1);
    let (render_tx, _renders) = mailbox("render", 1);
    let fetcher = Arc::new(ScriptedFetcher::new());

    let worker = FetchWorker::new(
        request_rx,
        render_tx,
        fetcher.clone(),
        Arc::new(FileArtifactStore::new(dir.path(), 1024)),
        &config.fetch,
        &config.queues,
    );
    worker
        .handle(FetchRequest::new(garage(), None, RequestOrigin::Webhook))
        .await;

    assert_eq!(
        fetcher.urls(),
        vec!["http://nvr.local/cams/65b2e8d400858f03e4014f3a.jpg?w=320"]
    );
}
