use super::types::{ComponentState, ShutdownReason};
use crate::config::AlarmviewConfig;
use crate::display::{DisplayResource, PanelSurface, RenderStats, RenderSurface};
use crate::error::Result;
use crate::fetch::{ArtifactStore, FetchStats, Fetcher, FileArtifactStore, HttpFetcher};
use crate::mailbox::{mailbox, MailboxReceiver, MailboxSender};
use crate::pipeline::{FetchRequest, RenderItem};
use crate::producers::{
    ButtonProducer, KeyboardInputHandler, RadarSensor, SimulatedRadar, WebhookIngest,
};
use crate::resolution::ResolutionTable;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Shared handles of the running pipeline. Producers get clones of the
/// senders; nothing here is global.
#[derive(Clone)]
pub struct PipelineContext {
    pub fetch_queue: MailboxSender<FetchRequest>,
    pub render_queue: MailboxSender<RenderItem>,
    pub display: DisplayResource,
    pub resolution: Arc<ResolutionTable>,
}

/// Consumer ends, handed to the workers exactly once
pub(super) struct WorkerQueues {
    pub(super) fetch: MailboxReceiver<FetchRequest>,
    pub(super) render: MailboxReceiver<RenderItem>,
}

/// External collaborators the pipeline drives
pub struct Collaborators {
    pub fetcher: Arc<dyn Fetcher>,
    pub store: Arc<dyn ArtifactStore>,
    pub surface: Box<dyn RenderSurface>,
    pub radar: Option<Box<dyn RadarSensor>>,
}

impl Collaborators {
    /// HTTP fetcher, on-disk store, in-memory panel and simulated radar
    pub fn from_config(config: &AlarmviewConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config.fetch)?;
        let store = FileArtifactStore::new(&config.fetch.storage_dir, config.fetch.max_artifact_bytes);
        let surface = PanelSurface::new(
            config.sensor.max_targets,
            config.display.default_scale,
            config.display.initial_view,
        );
        let radar: Option<Box<dyn RadarSensor>> = if config.sensor.enabled {
            Some(Box::new(SimulatedRadar::new()))
        } else {
            None
        };

        Ok(Self {
            fetcher: Arc::new(fetcher),
            store: Arc::new(store),
            surface: Box::new(surface),
            radar,
        })
    }
}

/// Main application coordinator that wires producers, queues and workers
pub struct AlarmviewOrchestrator {
    pub(super) config: AlarmviewConfig,
    pub(super) context: PipelineContext,
    pub(super) queues: Option<WorkerQueues>,

    // Collaborators, moved into their tasks on start
    pub(super) fetcher: Arc<dyn Fetcher>,
    pub(super) store: Arc<dyn ArtifactStore>,
    pub(super) radar: Option<Box<dyn RadarSensor>>,

    // Producers
    pub(super) ingest: Arc<WebhookIngest>,
    pub(super) buttons: Arc<ButtonProducer>,
    pub(super) keyboard_handler: Option<KeyboardInputHandler>,
    pub(super) keyboard_enabled: bool,

    // Worker telemetry, available once started
    pub(super) fetch_stats: Option<Arc<FetchStats>>,
    pub(super) render_stats: Option<Arc<RenderStats>>,
    pub(super) webhook_addr: Option<SocketAddr>,

    // Lifecycle management
    pub(super) tasks: Vec<(&'static str, JoinHandle<()>)>,
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
    pub(super) user_shutdown: CancellationToken,
}

impl AlarmviewOrchestrator {
    /// Create an orchestrator with the default collaborators
    pub async fn new(config: AlarmviewConfig) -> Result<Self> {
        let collaborators = Collaborators::from_config(&config)?;
        Self::with_collaborators(config, collaborators)
    }

    pub fn with_collaborators(config: AlarmviewConfig, collaborators: Collaborators) -> Result<Self> {
        let resolution = Arc::new(ResolutionTable::from_entries(&config.devices)?);
        let (fetch_queue, fetch_rx) = mailbox("fetch", config.queues.fetch_capacity);
        let (render_queue, render_rx) = mailbox("render", config.queues.render_capacity);
        let display = DisplayResource::from_boxed(collaborators.surface, config.display.lock_timeout());

        info!(
            "Pipeline: {} devices, fetch queue {}, render queue {}",
            resolution.len(),
            config.queues.fetch_capacity,
            config.queues.render_capacity
        );

        let ingest = Arc::new(WebhookIngest::new(
            Arc::clone(&resolution),
            fetch_queue.clone(),
            config.webhook.enqueue_timeout(),
        ));
        let buttons = Arc::new(ButtonProducer::new(
            &config.buttons,
            fetch_queue.clone(),
            render_queue.clone(),
        )?);
        let user_shutdown = CancellationToken::new();
        let keyboard_handler = Some(KeyboardInputHandler::new(
            Arc::clone(&buttons),
            user_shutdown.clone(),
        ));
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        Ok(Self {
            config,
            context: PipelineContext {
                fetch_queue,
                render_queue,
                display,
                resolution,
            },
            queues: Some(WorkerQueues {
                fetch: fetch_rx,
                render: render_rx,
            }),
            fetcher: collaborators.fetcher,
            store: collaborators.store,
            radar: collaborators.radar,
            ingest,
            buttons,
            keyboard_handler,
            keyboard_enabled: false, // Enable via set_keyboard_enabled()
            fetch_stats: None,
            render_stats: None,
            webhook_addr: None,
            tasks: Vec::new(),
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
            user_shutdown,
        })
    }

    /// Enable or disable the keyboard input handler
    pub fn set_keyboard_enabled(&mut self, enabled: bool) {
        self.keyboard_enabled = enabled;
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    pub fn buttons(&self) -> Arc<ButtonProducer> {
        Arc::clone(&self.buttons)
    }

    pub fn ingest(&self) -> Arc<WebhookIngest> {
        Arc::clone(&self.ingest)
    }

    /// Address the webhook listener actually bound to
    pub fn webhook_addr(&self) -> Option<SocketAddr> {
        self.webhook_addr
    }

    pub fn fetch_stats(&self) -> Option<Arc<FetchStats>> {
        self.fetch_stats.clone()
    }

    pub fn render_stats(&self) -> Option<Arc<RenderStats>> {
        self.render_stats.clone()
    }

    /// Cancelling this token asks the running system to shut down
    pub fn shutdown_token(&self) -> CancellationToken {
        self.user_shutdown.clone()
    }
}
