use super::{AlarmviewOrchestrator, ShutdownReason};
use crate::error::{AlarmviewError, Result};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

type SharedSender = Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>;

impl AlarmviewOrchestrator {
    /// Run until a signal or a user request, then shut down gracefully
    pub async fn run(&mut self) -> Result<i32> {
        info!("alarmview is running");

        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| AlarmviewError::system("Shutdown sender already taken"))?;

        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| AlarmviewError::system("Shutdown receiver already taken"))?;

        let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));
        self.setup_signal_handlers(&shutdown_sender);
        self.watch_user_shutdown(&shutdown_sender);

        let shutdown_reason = shutdown_receiver
            .await
            .map_err(|_| AlarmviewError::system("Shutdown channel closed unexpectedly"))?;

        info!("Shutdown initiated: {:?}", shutdown_reason);

        let exit_code = self.shutdown().await?;

        info!("alarmview shutdown complete");
        Ok(exit_code)
    }

    /// Set up signal handlers for graceful shutdown
    fn setup_signal_handlers(&self, shutdown_sender: &SharedSender) {
        // Handle SIGTERM (systemd stop) - Unix only
        #[cfg(unix)]
        {
            let shutdown_sender_sigterm = Arc::clone(shutdown_sender);
            tokio::spawn(async move {
                let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        error!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };
                if sigterm.recv().await.is_some() {
                    info!("Received SIGTERM signal");
                    send_reason(
                        &shutdown_sender_sigterm,
                        ShutdownReason::Signal("SIGTERM".to_string()),
                    )
                    .await;
                }
            });
        }

        // Handle SIGINT (Ctrl+C) - Cross-platform
        let shutdown_sender_sigint = Arc::clone(shutdown_sender);
        tokio::spawn(async move {
            if let Ok(()) = signal::ctrl_c().await {
                info!("Received SIGINT signal (Ctrl+C)");
                send_reason(
                    &shutdown_sender_sigint,
                    ShutdownReason::Signal("SIGINT".to_string()),
                )
                .await;
            }
        });
    }

    /// Turn a cancelled user shutdown token (keyboard `q`) into a shutdown
    fn watch_user_shutdown(&self, shutdown_sender: &SharedSender) {
        let shutdown_sender = Arc::clone(shutdown_sender);
        let user_shutdown: CancellationToken = self.user_shutdown.clone();
        let stopped = self.cancellation_token.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = user_shutdown.cancelled() => {
                    send_reason(&shutdown_sender, ShutdownReason::UserRequest).await;
                }
                _ = stopped.cancelled() => {}
            }
        });
    }
}

async fn send_reason(sender: &SharedSender, reason: ShutdownReason) {
    if let Some(sender) = sender.lock().await.take() {
        let _ = sender.send(reason);
    }
}
