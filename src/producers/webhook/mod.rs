mod handlers;
mod ingest;
mod payload;
mod server;

pub use handlers::GREETING;
pub use ingest::{IngestOutcome, IngestStatsSnapshot, WebhookIngest};
pub use payload::{parse_alert, AlarmNotice};
pub use server::{HealthProbe, ServerState, WebhookServer};
