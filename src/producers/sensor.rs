use crate::config::SensorConfig;
use crate::error::SensorError;
use crate::mailbox::{EnqueueOutcome, MailboxSender};
use crate::pipeline::{Position, RenderItem, TargetSnapshot};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One target as reported by the radar
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RadarTarget {
    pub position: Position,
    pub distance_mm: f32,
    pub angle_deg: f32,
    pub speed_mm_s: f32,
    pub detected: bool,
    pub description: String,
}

impl RadarTarget {
    /// A detected target at `(x_mm, y_mm)`, sensor at the origin facing +y
    pub fn at(x_mm: f32, y_mm: f32, speed_mm_s: f32) -> Self {
        let position = Position::new(x_mm, y_mm);
        Self {
            position,
            distance_mm: position.distance_to(&Position::default()),
            angle_deg: x_mm.atan2(y_mm).to_degrees(),
            speed_mm_s,
            detected: true,
            description: describe_position(x_mm, y_mm),
        }
    }

    pub fn absent() -> Self {
        Self::default()
    }

    fn snapshot(&self, slot: usize) -> TargetSnapshot {
        TargetSnapshot {
            slot,
            position: self.position,
            distance_mm: self.distance_mm,
            angle_deg: self.angle_deg,
            speed_mm_s: self.speed_mm_s,
            detected: self.detected,
            description: self.description.clone(),
        }
    }
}

/// Coarse human description of where a target stands
pub fn describe_position(x_mm: f32, y_mm: f32) -> String {
    let side = if x_mm < -300.0 {
        "left"
    } else if x_mm > 300.0 {
        "right"
    } else {
        "center"
    };
    let range = if y_mm < 1000.0 {
        "near"
    } else if y_mm < 3000.0 {
        "mid-range"
    } else {
        "far"
    };
    format!("Target is {} {}", range, side)
}

/// Source of radar frames
#[async_trait]
pub trait RadarSensor: Send {
    /// `Ok(None)` when no new frame is available
    async fn read_targets(&mut self) -> Result<Option<Vec<RadarTarget>>, SensorError>;
}

/// Whether a slot changed enough to be redrawn: a detected target moved at
/// least `threshold_mm`, or the target appeared or disappeared
pub fn has_target_moved(current: &RadarTarget, prior: &RadarTarget, threshold_mm: f32) -> bool {
    if current.detected && prior.detected {
        current.position.distance_to(&prior.position) >= threshold_mm
    } else {
        current.detected != prior.detected
    }
}

/// Polls the radar and pushes moved targets onto the render queue
pub struct SensorProducer {
    radar: Box<dyn RadarSensor>,
    renders: MailboxSender<RenderItem>,
    prior: Vec<RadarTarget>,
    threshold_mm: f32,
    poll_period: Duration,
    enqueue_timeout: Duration,
}

impl SensorProducer {
    pub fn new(
        radar: Box<dyn RadarSensor>,
        renders: MailboxSender<RenderItem>,
        config: &SensorConfig,
    ) -> Self {
        Self {
            radar,
            renders,
            prior: vec![RadarTarget::absent(); config.max_targets],
            threshold_mm: config.movement_threshold_mm,
            poll_period: config.poll_period(),
            enqueue_timeout: config.enqueue_timeout(),
        }
    }

    /// Read one frame and enqueue an update per moved slot. Returns how many
    /// updates were enqueued.
    pub async fn poll_once(&mut self) -> usize {
        let mut current = match self.radar.read_targets().await {
            Ok(Some(targets)) => targets,
            Ok(None) => return 0,
            Err(e) => {
                warn!("Radar read failed, skipping poll: {}", e);
                return 0;
            }
        };

        if current.len() > self.prior.len() {
            debug!(
                "Radar reported {} targets, keeping the first {}",
                current.len(),
                self.prior.len()
            );
        }
        current.resize(self.prior.len(), RadarTarget::absent());

        let mut enqueued = 0;
        for (slot, now) in current.into_iter().enumerate() {
            if !has_target_moved(&now, &self.prior[slot], self.threshold_mm) {
                self.prior[slot] = now;
                continue;
            }

            debug!(
                "[{}] X:{:.0} Y:{:.0} D:{:.0} A:{:.1} S:{:.0}",
                slot,
                now.position.x_mm,
                now.position.y_mm,
                now.distance_mm,
                now.angle_deg,
                now.speed_mm_s
            );

            let item = RenderItem::SensorUpdate {
                target: now.snapshot(slot),
                moved: true,
            };
            match self.renders.enqueue(item, self.enqueue_timeout).await {
                EnqueueOutcome::Enqueued => {
                    self.prior[slot] = now;
                    enqueued += 1;
                }
                // Keep the old reading so the next poll reports this change again
                EnqueueOutcome::Full | EnqueueOutcome::Closed => {
                    warn!("Render queue unavailable, dropping update for slot {}", slot);
                }
            }
        }

        enqueued
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            "Sensor producer polling every {:?} for {} targets",
            self.poll_period,
            self.prior.len()
        );

        let mut ticker = interval(self.poll_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Sensor producer stopping");
                    break;
                }
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }
        }
    }
}

/// Radar stand-in: one target walking back and forth across the field of
/// view, a second one standing still for part of each cycle
#[derive(Debug, Default)]
pub struct SimulatedRadar {
    tick: u64,
}

impl SimulatedRadar {
    const STEPS: u64 = 60;
    const STEP_MM: f32 = 40.0;

    pub fn new() -> Self {
        Self::default()
    }

    fn frame(&self) -> Vec<RadarTarget> {
        let phase = self.tick % (2 * Self::STEPS);
        let step = if phase < Self::STEPS {
            phase
        } else {
            2 * Self::STEPS - phase
        };
        let x = -1200.0 + step as f32 * Self::STEP_MM;
        let walker = RadarTarget::at(x, 1500.0, Self::STEP_MM * 4.0);

        let visitor = if (30..90).contains(&phase) {
            RadarTarget::at(600.0, 2500.0, 0.0)
        } else {
            RadarTarget::absent()
        };

        vec![walker, visitor, RadarTarget::absent()]
    }
}

#[async_trait]
impl RadarSensor for SimulatedRadar {
    async fn read_targets(&mut self) -> Result<Option<Vec<RadarTarget>>, SensorError> {
        let frame = self.frame();
        self.tick += 1;
        Ok(Some(frame))
    }
}
