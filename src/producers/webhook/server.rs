use super::handlers::{health_handler, notify_handler, root_handler};
use super::ingest::WebhookIngest;
use crate::config::WebhookConfig;
use crate::display::RenderStats;
use crate::error::{Result, WebhookError};
use crate::fetch::FetchStats;
use crate::mailbox::MailboxSender;
use crate::pipeline::RenderItem;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Pipeline handles reported by `/health`
#[derive(Clone, Default)]
pub struct HealthProbe {
    pub render_queue: Option<MailboxSender<RenderItem>>,
    pub fetch_stats: Option<Arc<FetchStats>>,
    pub render_stats: Option<Arc<RenderStats>>,
}

/// Shared state for the Axum server
#[derive(Clone)]
pub struct ServerState {
    pub(crate) ingest: Arc<WebhookIngest>,
    pub(crate) probe: HealthProbe,
}

/// HTTP listener for NVR alarm webhooks
pub struct WebhookServer {
    config: WebhookConfig,
    state: ServerState,
}

impl WebhookServer {
    pub fn new(config: WebhookConfig, ingest: Arc<WebhookIngest>, probe: HealthProbe) -> Self {
        Self {
            config,
            state: ServerState { ingest, probe },
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/", get(root_handler))
            .route("/notify", post(notify_handler))
            .route("/health", get(health_handler))
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.config.ip, self.config.port)
    }

    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.address();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| WebhookError::BindFailed {
                address: addr.clone(),
                source: e,
            })?;

        info!("Webhook listener bound to {}", addr);
        Ok(listener)
    }

    /// Serve on an already bound listener until `cancel` fires
    pub async fn serve(&self, listener: TcpListener, cancel: CancellationToken) -> Result<()> {
        let app = self.router();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await
            .map_err(|e| WebhookError::ServeFailed {
                details: format!("Server error: {}", e),
            })?;

        info!("Webhook listener stopped");
        Ok(())
    }

    pub async fn start(&self, cancel: CancellationToken) -> Result<()> {
        let listener = self.bind().await?;
        self.serve(listener, cancel).await
    }
}
