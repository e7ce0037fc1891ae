mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;


pub use orchestrator::{AlarmviewOrchestrator, Collaborators, PipelineContext};
pub use types::{ComponentState, ShutdownReason};
