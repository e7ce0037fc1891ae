use crate::config::DisplayView;
use crate::error::RenderError;
use crate::pipeline::{ImageArtifact, TargetSnapshot};
use std::path::PathBuf;
use tracing::debug;

pub const PANEL_WIDTH: u32 = 320;
pub const PANEL_HEIGHT: u32 = 240;

/// The drawing side of the shared display.
///
/// Calls are synchronous so they can only run while the display lock is held.
/// Implementations validate the whole update before changing anything and
/// must not block: `show_image` gets a path the render worker has already
/// checked to be a non-empty file.
pub trait RenderSurface: Send {
    fn show_image(&mut self, image: &ImageArtifact) -> Result<(), RenderError>;

    fn update_target(&mut self, target: &TargetSnapshot) -> Result<(), RenderError>;

    fn set_view(&mut self, view: DisplayView) -> Result<(), RenderError>;

    fn view(&self) -> DisplayView;
}

/// Image currently on screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownImage {
    pub path: PathBuf,
    pub camera: String,
    pub scale: u32,
}

/// Text of one radar slot in the list view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPanel {
    pub title: String,
    pub position: String,
    pub metrics: String,
    pub description: String,
}

impl TargetPanel {
    pub fn empty(slot: usize) -> Self {
        Self {
            title: format!("T{}: NO TARGET", slot),
            position: "X: ---  Y: ---".to_string(),
            metrics: "D: --- A: --- S: ---".to_string(),
            description: "No target detected".to_string(),
        }
    }

    pub fn from_snapshot(target: &TargetSnapshot) -> Self {
        if !target.detected {
            return Self::empty(target.slot);
        }

        Self {
            title: format!("T{}: DETECTED", target.slot),
            position: format!(
                "X: {:.0} mm  Y: {:.0} mm",
                target.position.x_mm, target.position.y_mm
            ),
            metrics: format!(
                "D: {:.0}mm A: {:.1}° S: {:.0}mm/s",
                target.distance_mm, target.angle_deg, target.speed_mm_s
            ),
            description: target.description.clone(),
        }
    }
}

/// In-memory model of the 320x240 panel
#[derive(Debug, Clone)]
pub struct PanelSurface {
    default_scale: u32,
    view: DisplayView,
    image: Option<ShownImage>,
    panels: Vec<TargetPanel>,
    redraws: u64,
}

impl PanelSurface {
    pub fn new(slots: usize, default_scale: u32, view: DisplayView) -> Self {
        Self {
            default_scale,
            view,
            image: None,
            panels: (0..slots).map(TargetPanel::empty).collect(),
            redraws: 0,
        }
    }

    pub fn image(&self) -> Option<&ShownImage> {
        self.image.as_ref()
    }

    pub fn panel(&self, slot: usize) -> Option<&TargetPanel> {
        self.panels.get(slot)
    }

    pub fn redraws(&self) -> u64 {
        self.redraws
    }
}

impl RenderSurface for PanelSurface {
    fn show_image(&mut self, image: &ImageArtifact) -> Result<(), RenderError> {
        let scale = image.scale.unwrap_or(self.default_scale);
        if scale == 0 {
            return Err(RenderError::InvalidScale { scale });
        }

        debug!(
            "Showing {} for {} at scale {}",
            image.path.display(),
            image.target,
            scale
        );
        self.image = Some(ShownImage {
            path: image.path.clone(),
            camera: image.target.camera.clone(),
            scale,
        });
        self.view = DisplayView::Image;
        self.redraws += 1;
        Ok(())
    }

    fn update_target(&mut self, target: &TargetSnapshot) -> Result<(), RenderError> {
        if target.slot >= self.panels.len() {
            return Err(RenderError::SlotOutOfRange {
                slot: target.slot,
                max: self.panels.len(),
            });
        }

        self.panels[target.slot] = TargetPanel::from_snapshot(target);
        self.redraws += 1;
        Ok(())
    }

    fn set_view(&mut self, view: DisplayView) -> Result<(), RenderError> {
        if self.view != view {
            debug!("Display view {:?} -> {:?}", self.view, view);
            self.view = view;
            self.redraws += 1;
        }
        Ok(())
    }

    fn view(&self) -> DisplayView {
        self.view
    }
}
