//! Fakes shared by the unit tests.

use crate::config::DisplayView;
use crate::display::RenderSurface;
use crate::error::{FetchError, RenderError, SensorError};
use crate::fetch::Fetcher;
use crate::pipeline::{ImageArtifact, TargetSnapshot};
use crate::producers::{RadarSensor, RadarTarget};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9];

/// Fetcher that plays back queued results, then succeeds with a tiny JPEG
#[derive(Default)]
pub struct ScriptedFetcher {
    script: Mutex<VecDeque<Result<Bytes, FetchError>>>,
    urls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, url: &str) {
        self.script.lock().push_back(Err(FetchError::Transport {
            url: url.to_string(),
            details: "connection refused".to_string(),
        }));
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        self.urls.lock().push(url.to_string());
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| Ok(Bytes::from_static(JPEG)))
    }
}

/// Surface that records every call and tracks how many callers are inside it
#[derive(Clone, Default)]
pub struct RecordingSurface {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub inside: Arc<AtomicUsize>,
    pub max_inside: Arc<AtomicUsize>,
    pub hold_for: Option<Duration>,
    view: Arc<Mutex<DisplayView>>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holding_for(hold_for: Duration) -> Self {
        Self {
            hold_for: Some(hold_for),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn enter(&self, call: String) {
        let now_inside = self.inside.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_inside.fetch_max(now_inside, Ordering::SeqCst);
        if let Some(hold_for) = self.hold_for {
            std::thread::sleep(hold_for);
        }
        self.calls.lock().push(call);
        self.inside.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RenderSurface for RecordingSurface {
    fn show_image(&mut self, image: &ImageArtifact) -> Result<(), RenderError> {
        self.enter(format!("image {}", image.path.display()));
        *self.view.lock() = DisplayView::Image;
        Ok(())
    }

    fn update_target(&mut self, target: &TargetSnapshot) -> Result<(), RenderError> {
        self.enter(format!("target {} detected={}", target.slot, target.detected));
        Ok(())
    }

    fn set_view(&mut self, view: DisplayView) -> Result<(), RenderError> {
        self.enter(format!("view {:?}", view));
        *self.view.lock() = view;
        Ok(())
    }

    fn view(&self) -> DisplayView {
        *self.view.lock()
    }
}

/// Radar that returns queued frames, then reports no new data
#[derive(Default)]
pub struct ScriptedRadar {
    frames: VecDeque<Result<Option<Vec<RadarTarget>>, SensorError>>,
}

impl ScriptedRadar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, targets: Vec<RadarTarget>) {
        self.frames.push_back(Ok(Some(targets)));
    }

    pub fn push_error(&mut self) {
        self.frames.push_back(Err(SensorError::Read {
            details: "checksum mismatch".to_string(),
        }));
    }
}

#[async_trait]
impl RadarSensor for ScriptedRadar {
    async fn read_targets(&mut self) -> Result<Option<Vec<RadarTarget>>, SensorError> {
        self.frames.pop_front().unwrap_or(Ok(None))
    }
}
