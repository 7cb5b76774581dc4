//! Integration test utilities for flipbook
//!
//! This module provides common utilities for integration testing including:
//! - A wired-up controller over in-process environment objects
//! - Event capture
//! - Temporary output directories

use anyhow::Result;
use flipbook::player::{PlaybackController, PlayerEvent};
use flipbook::{Config, OverlayRecorder, PixelSurface, SyntheticConfig, SyntheticVideo};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Canvas size used by the fixtures
pub const CANVAS: (u32, u32) = (64, 64);

/// Test fixture for integration tests
pub struct TestRig {
    pub video: Arc<Mutex<SyntheticVideo>>,
    pub surface: Arc<Mutex<PixelSurface>>,
    pub status: Arc<Mutex<OverlayRecorder>>,
    pub events: Arc<Mutex<Vec<PlayerEvent>>>,
    pub controller: PlaybackController,
    pub temp_dir: TempDir,
}

impl TestRig {
    /// Build a controller over a clocked synthetic source.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(source: SyntheticConfig, config: Config) -> Result<Self> {
        let (video, _clock) = SyntheticVideo::launch(source);
        let surface = Arc::new(Mutex::new(PixelSurface::new(CANVAS.0, CANVAS.1)));
        let status = Arc::new(Mutex::new(OverlayRecorder::new()));

        let mut controller = PlaybackController::new(video.clone(), surface.clone(), status.clone(), config);

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        controller.add_event_handler(Box::new(move |event: &PlayerEvent| sink.lock().push(event.clone())));

        Ok(Self {
            video,
            surface,
            status,
            events,
            controller,
            temp_dir: TempDir::new()?,
        })
    }

    /// Output directory removed with the rig
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Events seen so far
    pub fn events(&self) -> Vec<PlayerEvent> {
        self.events.lock().clone()
    }

    pub fn count_events(&self, event: &PlayerEvent) -> usize {
        self.events.lock().iter().filter(|e| *e == event).count()
    }

    /// Overlay texts shown so far, oldest first
    pub fn texts(&self) -> Vec<String> {
        self.status.lock().texts().into_iter().map(str::to_string).collect()
    }
}

/// Widescreen source: 2 seconds of 16:9 at 10 fps
pub fn widescreen() -> SyntheticConfig {
    SyntheticConfig {
        width: 32,
        height: 18,
        fps: 10.0,
        duration: 2.0,
        ..Default::default()
    }
}

/// Let background tasks run for `duration` of (paused) time
pub async fn settle(duration: Duration) {
    tokio::time::sleep(duration).await;
}
