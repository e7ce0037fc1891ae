pub mod app;
pub mod config;
pub mod display;
pub mod error;
pub mod fetch;
pub mod mailbox;
pub mod pipeline;
pub mod producers;
pub mod resolution;

#[cfg(test)]
pub(crate) mod test_support;

pub use app::{AlarmviewOrchestrator, Collaborators, ComponentState, PipelineContext, ShutdownReason};
pub use config::AlarmviewConfig;
pub use display::{DisplayResource, PanelSurface, RenderSurface, RenderWorker};
pub use error::{AlarmviewError, Result};
pub use fetch::{ArtifactStore, FetchWorker, Fetcher, FileArtifactStore, HttpFetcher};
pub use mailbox::{mailbox, Dequeue, EnqueueOutcome, MailboxReceiver, MailboxSender};
pub use pipeline::{FetchRequest, ImageArtifact, RenderItem, RequestOrigin, TargetSnapshot};
pub use producers::{ButtonProducer, RadarSensor, SensorProducer, SimulatedRadar, WebhookServer};
pub use resolution::{DeviceId, ResolutionTable, TargetRef};
