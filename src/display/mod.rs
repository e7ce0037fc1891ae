mod resource;
mod stats;
mod surface;
mod worker;

pub use resource::DisplayResource;
pub use stats::{RenderStats, RenderStatsSnapshot};
pub use surface::{PanelSurface, RenderSurface, ShownImage, TargetPanel, PANEL_HEIGHT, PANEL_WIDTH};
pub use worker::{RenderOutcome, RenderState, RenderWorker};
