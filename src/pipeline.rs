//! Items carried by the fetch and render queues.

use crate::resolution::TargetRef;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Where a fetch request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestOrigin {
    Webhook,
    Button(usize),
}

impl fmt::Display for RequestOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestOrigin::Webhook => f.write_str("webhook"),
            RequestOrigin::Button(index) => write!(f, "button {}", index),
        }
    }
}

/// Instruction to retrieve a snapshot for a resolved camera
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub id: Uuid,
    pub target: TargetRef,
    pub requested_scale: Option<u32>,
    pub origin: RequestOrigin,
}

impl FetchRequest {
    pub fn new(target: TargetRef, requested_scale: Option<u32>, origin: RequestOrigin) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            requested_scale,
            origin,
        }
    }
}

/// A stored image ready to be shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageArtifact {
    pub path: PathBuf,
    pub target: TargetRef,
    pub scale: Option<u32>,
}

/// Position of a radar target in millimetres, sensor at the origin
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x_mm: f32,
    pub y_mm: f32,
}

impl Position {
    pub fn new(x_mm: f32, y_mm: f32) -> Self {
        Self { x_mm, y_mm }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = self.x_mm - other.x_mm;
        let dy = self.y_mm - other.y_mm;
        (dx * dx + dy * dy).sqrt()
    }
}

/// State of one radar slot as it should appear on screen
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TargetSnapshot {
    pub slot: usize,
    pub position: Position,
    pub distance_mm: f32,
    pub angle_deg: f32,
    pub speed_mm_s: f32,
    pub detected: bool,
    pub description: String,
}

/// Instruction to update the shared display
#[derive(Debug, Clone, PartialEq)]
pub enum RenderItem {
    ImageReady(ImageArtifact),
    SensorUpdate { target: TargetSnapshot, moved: bool },
    ToggleView,
}

impl RenderItem {
    pub fn kind(&self) -> &'static str {
        match self {
            RenderItem::ImageReady(_) => "image_ready",
            RenderItem::SensorUpdate { .. } => "sensor_update",
            RenderItem::ToggleView => "toggle_view",
        }
    }
}
