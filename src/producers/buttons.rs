use crate::config::{ButtonActionKind, ButtonBinding, ButtonConfig};
use crate::error::{AlarmviewError, Result};
use crate::mailbox::{EnqueueOutcome, MailboxSender};
use crate::pipeline::{FetchRequest, RenderItem, RequestOrigin};
use crate::resolution::TargetRef;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tracing::{debug, info, warn};

/// What a bound button does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    Fetch {
        target: TargetRef,
        scale: Option<u32>,
        /// The first press only arms the button
        prime_first: bool,
    },
    ToggleView,
}

impl ButtonAction {
    fn from_binding(binding: &ButtonBinding) -> Result<Self> {
        match binding.action {
            ButtonActionKind::ToggleView => Ok(ButtonAction::ToggleView),
            ButtonActionKind::Fetch => {
                let camera = binding.camera.clone().ok_or_else(|| {
                    AlarmviewError::component(
                        "buttons".to_string(),
                        format!("button {} fetch binding has no camera", binding.index),
                    )
                })?;
                let name = binding.name.clone().unwrap_or_else(|| camera.clone());
                Ok(ButtonAction::Fetch {
                    target: TargetRef::new(camera, name),
                    scale: binding.scale,
                    prime_first: binding.prime_first,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonOutcome {
    Enqueued,
    /// First press of a button that needs arming; nothing was sent
    Primed,
    Dropped,
    Unbound,
}

/// Local buttons. A press goes straight to a queue, no resolution lookup.
pub struct ButtonProducer {
    bindings: BTreeMap<usize, ButtonAction>,
    primed: Mutex<HashSet<usize>>,
    fetches: MailboxSender<FetchRequest>,
    renders: MailboxSender<RenderItem>,
    enqueue_timeout: Duration,
}

impl ButtonProducer {
    pub fn new(
        config: &ButtonConfig,
        fetches: MailboxSender<FetchRequest>,
        renders: MailboxSender<RenderItem>,
    ) -> Result<Self> {
        let mut bindings = BTreeMap::new();
        for binding in &config.bindings {
            bindings.insert(binding.index, ButtonAction::from_binding(binding)?);
        }

        info!("Button producer ready with {} bindings", bindings.len());

        Ok(Self {
            bindings,
            primed: Mutex::new(HashSet::new()),
            fetches,
            renders,
            enqueue_timeout: config.enqueue_timeout(),
        })
    }

    pub fn action(&self, index: usize) -> Option<&ButtonAction> {
        self.bindings.get(&index)
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.bindings.keys().copied()
    }

    pub async fn press(&self, index: usize) -> ButtonOutcome {
        let Some(action) = self.bindings.get(&index) else {
            debug!("Button {} has no binding", index);
            return ButtonOutcome::Unbound;
        };

        info!("Button {} pressed", index);

        let outcome = match action {
            ButtonAction::ToggleView => {
                self.renders
                    .enqueue(RenderItem::ToggleView, self.enqueue_timeout)
                    .await
            }
            ButtonAction::Fetch {
                target,
                scale,
                prime_first,
            } => {
                if *prime_first && self.primed.lock().insert(index) {
                    debug!("Button {} armed", index);
                    return ButtonOutcome::Primed;
                }

                let request = FetchRequest::new(target.clone(), *scale, RequestOrigin::Button(index));
                self.fetches.enqueue(request, self.enqueue_timeout).await
            }
        };

        match outcome {
            EnqueueOutcome::Enqueued => ButtonOutcome::Enqueued,
            EnqueueOutcome::Full | EnqueueOutcome::Closed => {
                warn!("Button {} press dropped", index);
                ButtonOutcome::Dropped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlarmviewConfig;
    use crate::mailbox::{mailbox, MailboxReceiver};

    fn producer(
        capacity: usize,
    ) -> (
        ButtonProducer,
        MailboxReceiver<FetchRequest>,
        MailboxReceiver<RenderItem>,
    ) {
        let config = AlarmviewConfig::default();
        let (fetch_tx, fetch_rx) = mailbox("fetch", capacity);
        let (render_tx, render_rx) = mailbox("render", capacity);
        let buttons = ButtonProducer::new(&config.buttons, fetch_tx, render_tx).unwrap();
        (buttons, fetch_rx, render_rx)
    }

    #[tokio::test]
    async fn test_front_door_button_fetches_at_scale_80() {
        let (buttons, mut fetches, _renders) = producer(16);

        assert_eq!(buttons.press(2).await, ButtonOutcome::Enqueued);

        let request = fetches.try_dequeue().unwrap();
        assert_eq!(request.target.camera, "6096c66202197e0387001879");
        assert_eq!(request.requested_scale, Some(80));
        assert_eq!(request.origin, RequestOrigin::Button(2));
    }

    #[tokio::test]
    async fn test_garage_button_primes_on_first_press() {
        let (buttons, mut fetches, _renders) = producer(16);

        assert_eq!(buttons.press(1).await, ButtonOutcome::Primed);
        assert!(fetches.try_dequeue().is_none());

        assert_eq!(buttons.press(1).await, ButtonOutcome::Enqueued);
        assert_eq!(buttons.press(1).await, ButtonOutcome::Enqueued);

        let request = fetches.try_dequeue().unwrap();
        assert_eq!(request.target.name, "garage");
        assert_eq!(request.requested_scale, Some(192));
        assert!(fetches.try_dequeue().is_some());
        assert!(fetches.try_dequeue().is_none());
    }

    #[tokio::test]
    async fn test_toggle_button_goes_to_render_queue() {
        let (buttons, mut fetches, mut renders) = producer(16);

        assert_eq!(buttons.press(0).await, ButtonOutcome::Enqueued);
        assert_eq!(renders.try_dequeue(), Some(RenderItem::ToggleView));
        assert!(fetches.try_dequeue().is_none());
    }

    #[tokio::test]
    async fn test_unbound_and_dropped_presses() {
        let (buttons, _fetches, _renders) = producer(1);

        assert_eq!(buttons.press(7).await, ButtonOutcome::Unbound);
        assert_eq!(buttons.press(2).await, ButtonOutcome::Enqueued);
        assert_eq!(buttons.press(2).await, ButtonOutcome::Dropped);
        assert_eq!(buttons.indices().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_fetch_binding_without_camera_is_rejected() {
        let mut config = AlarmviewConfig::default().buttons;
        config.bindings[1].camera = None;
        let (fetch_tx, _fetch_rx) = mailbox("fetch", 1);
        let (render_tx, _render_rx) = mailbox("render", 1);

        assert!(ButtonProducer::new(&config, fetch_tx, render_tx).is_err());
    }
}
