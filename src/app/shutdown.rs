use super::{AlarmviewOrchestrator, ComponentState};
use crate::error::Result;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// How long each task gets to finish its current item
const STOP_TIMEOUT: Duration = Duration::from_secs(10);

impl AlarmviewOrchestrator {
    /// Cancel every task, then wait for them newest first. Returns the
    /// process exit code: 0 when everything stopped cleanly.
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Shutting down alarmview");
        self.cancellation_token.cancel();

        let mut clean = true;

        if self.keyboard_enabled {
            if let Some(keyboard) = &self.keyboard_handler {
                let state = match keyboard.stop().await {
                    Ok(()) => ComponentState::Stopped,
                    Err(e) => {
                        error!("Keyboard did not stop: {}", e);
                        clean = false;
                        ComponentState::Failed
                    }
                };
                self.set_component_state("keyboard", state).await;
            }
        }

        // Producers were started after the workers they feed
        let tasks: Vec<_> = self.tasks.drain(..).rev().collect();
        for (component, handle) in tasks {
            self.set_component_state(component, ComponentState::Stopping)
                .await;
            let state = join_task(component, handle).await;
            clean &= state == ComponentState::Stopped;
            self.set_component_state(component, state).await;
        }

        let exit_code = if clean { 0 } else { 1 };
        info!(exit_code, "Shutdown finished");
        Ok(exit_code)
    }
}

async fn join_task(component: &str, handle: JoinHandle<()>) -> ComponentState {
    match timeout(STOP_TIMEOUT, handle).await {
        Ok(Ok(())) => {
            info!("{} stopped", component);
            ComponentState::Stopped
        }
        Ok(Err(e)) => {
            error!("{} task failed: {}", component, e);
            ComponentState::Failed
        }
        Err(_) => {
            warn!("{} did not stop within {:?}", component, STOP_TIMEOUT);
            ComponentState::Failed
        }
    }
}
