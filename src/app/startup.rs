use super::{AlarmviewOrchestrator, ComponentState};
use crate::display::{RenderWorker, PANEL_HEIGHT, PANEL_WIDTH};
use crate::error::{AlarmviewError, Result};
use crate::fetch::FetchWorker;
use crate::producers::{HealthProbe, SensorProducer, WebhookServer};
use std::sync::Arc;
use tracing::{error, info};

impl AlarmviewOrchestrator {
    /// Register every component before anything starts
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing alarmview components");

        let mut states = self.component_states.lock().await;
        states.insert("render".to_string(), ComponentState::Stopped);
        states.insert("fetch".to_string(), ComponentState::Stopped);
        states.insert("webhook".to_string(), ComponentState::Stopped);

        if self.radar.is_some() {
            states.insert("sensor".to_string(), ComponentState::Stopped);
        }

        // Only register keyboard component if enabled
        if self.keyboard_enabled {
            states.insert("keyboard".to_string(), ComponentState::Stopped);
        }

        drop(states);

        info!("All components initialized successfully");
        Ok(())
    }

    /// Start consumers first, then the producers that feed them
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting alarmview");

        let queues = self
            .queues
            .take()
            .ok_or_else(|| AlarmviewError::system("Pipeline already started"))?;

        // Render worker
        self.set_component_state("render", ComponentState::Starting)
            .await;
        let render_worker = RenderWorker::new(
            queues.render,
            self.context.display.clone(),
            self.config.queues.poll_interval(),
        );
        self.render_stats = Some(render_worker.stats());
        let handle = tokio::spawn(render_worker.run(self.cancellation_token.clone()));
        self.tasks.push(("render", handle));
        self.set_component_state("render", ComponentState::Running)
            .await;
        info!(
            "Render worker started on a {}x{} panel",
            PANEL_WIDTH, PANEL_HEIGHT
        );

        // Fetch worker
        self.set_component_state("fetch", ComponentState::Starting)
            .await;
        let fetch_worker = FetchWorker::new(
            queues.fetch,
            self.context.render_queue.clone(),
            Arc::clone(&self.fetcher),
            Arc::clone(&self.store),
            &self.config.fetch,
            &self.config.queues,
        );
        self.fetch_stats = Some(fetch_worker.stats());
        let handle = tokio::spawn(fetch_worker.run(self.cancellation_token.clone()));
        self.tasks.push(("fetch", handle));
        self.set_component_state("fetch", ComponentState::Running)
            .await;
        info!("Fetch worker started");

        // Sensor producer
        if let Some(radar) = self.radar.take() {
            self.set_component_state("sensor", ComponentState::Starting)
                .await;
            let producer = SensorProducer::new(
                radar,
                self.context.render_queue.clone(),
                &self.config.sensor,
            );
            let handle = tokio::spawn(producer.run(self.cancellation_token.clone()));
            self.tasks.push(("sensor", handle));
            self.set_component_state("sensor", ComponentState::Running)
                .await;
            info!("Sensor producer started");
        }

        // Webhook listener; bind here so a busy port fails startup
        self.set_component_state("webhook", ComponentState::Starting)
            .await;
        let server = WebhookServer::new(
            self.config.webhook.clone(),
            Arc::clone(&self.ingest),
            HealthProbe {
                render_queue: Some(self.context.render_queue.clone()),
                fetch_stats: self.fetch_stats.clone(),
                render_stats: self.render_stats.clone(),
            },
        );
        let listener = match server.bind().await {
            Ok(listener) => listener,
            Err(e) => {
                self.set_component_state("webhook", ComponentState::Failed)
                    .await;
                error!("Failed to start webhook listener: {}", e);
                return Err(e);
            }
        };
        self.webhook_addr = listener.local_addr().ok();
        let cancel = self.cancellation_token.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = server.serve(listener, cancel).await {
                error!("Webhook server error: {}", e);
            }
        });
        self.tasks.push(("webhook", handle));
        self.set_component_state("webhook", ComponentState::Running)
            .await;
        info!(
            "Webhook listener started on {}",
            self.webhook_addr
                .map(|addr| addr.to_string())
                .unwrap_or_else(|| "unknown address".to_string())
        );

        // Keyboard buttons (only if enabled)
        if self.keyboard_enabled {
            if let Some(keyboard_handler) = &self.keyboard_handler {
                self.set_component_state("keyboard", ComponentState::Starting)
                    .await;

                keyboard_handler.start().await.map_err(|e| {
                    error!("Failed to start keyboard handler: {}", e);
                    e
                })?;

                self.set_component_state("keyboard", ComponentState::Running)
                    .await;
                info!("Keyboard input handler started");
            }
        }

        info!("alarmview started successfully");
        Ok(())
    }
}
