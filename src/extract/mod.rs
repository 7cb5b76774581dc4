//! Seek-and-capture frame extraction
//!
//! Steps the source one frame at a time through explicit seeks, draws each
//! settled frame over the whole surface and keeps an encoded snapshot. The
//! resulting sequence can then be played back at a fixed rate without the
//! source (see [`cached`]).

pub mod cached;

pub use cached::CachedPlayback;

use crate::media::{wait_for_event, wait_for_metadata, MediaEvent, SharedMedia};
use crate::overlay::Overlay;
use crate::renderer::{EncodedImage, SharedSurface};
use crate::utils::error::{FlipbookError, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Rate used when neither the caller nor the source provides one
pub const DEFAULT_EXTRACT_FPS: f64 = 30.0;

/// Where an extraction currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionState {
    AwaitingMetadata,
    Seeking(usize),
    Capturing(usize),
    Complete,
}

/// Frames captured out of frames planned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionProgress {
    pub completed: usize,
    pub total: usize,
}

impl ExtractionProgress {
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed * 100) / self.total).min(100) as u8
    }

    pub fn status_text(&self) -> String {
        format!("Extracting frames… {}/{}", self.completed, self.total)
    }
}

/// One captured still
#[derive(Debug, Clone)]
pub struct ExtractedFrame {
    /// Position in the sequence
    pub index: usize,

    /// Source time the still was captured at, `index / fps`
    pub media_time: f64,

    /// Encoded surface snapshot
    pub image: EncodedImage,
}

/// Ordered stills captured at a fixed rate
#[derive(Debug, Clone)]
pub struct ExtractedFrameSequence {
    frames_per_second: f64,
    frames: Vec<ExtractedFrame>,
}

#[derive(Serialize)]
struct Manifest<'a> {
    frames_per_second: f64,
    frame_count: usize,
    frames: Vec<ManifestEntry<'a>>,
}

#[derive(Serialize)]
struct ManifestEntry<'a> {
    index: usize,
    media_time: f64,
    file: &'a str,
}

impl ExtractedFrameSequence {
    fn with_capacity(frames_per_second: f64, capacity: usize) -> Self {
        Self {
            frames_per_second,
            frames: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, frame: ExtractedFrame) {
        debug_assert_eq!(frame.index, self.frames.len());
        self.frames.push(frame);
    }

    pub fn frames_per_second(&self) -> f64 {
        self.frames_per_second
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ExtractedFrame> {
        self.frames.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtractedFrame> {
        self.frames.iter()
    }

    /// Source time represented by frame `index`
    pub fn frame_time(&self, index: usize) -> f64 {
        index as f64 / self.frames_per_second
    }

    /// Interval between frames during playback
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frames_per_second)
    }

    /// Playback length of the sequence
    pub fn duration(&self) -> Duration {
        self.frame_interval() * self.frames.len() as u32
    }

    /// Write every still as `frame_NNNNN.<ext>` plus a `manifest.json`.
    /// Returns the manifest path.
    pub fn write_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;

        let names: Vec<String> = self
            .frames
            .iter()
            .map(|f| format!("frame_{:05}.{}", f.index, f.image.format.extension()))
            .collect();

        for (frame, name) in self.frames.iter().zip(&names) {
            std::fs::write(dir.join(name), &frame.image.bytes)?;
        }

        let manifest = Manifest {
            frames_per_second: self.frames_per_second,
            frame_count: self.frames.len(),
            frames: self
                .frames
                .iter()
                .zip(&names)
                .map(|(frame, name)| ManifestEntry {
                    index: frame.index,
                    media_time: frame.media_time,
                    file: name,
                })
                .collect(),
        };

        let path = dir.join("manifest.json");
        std::fs::write(&path, serde_json::to_string_pretty(&manifest)?)?;
        info!("Wrote {} frames to {}", self.frames.len(), dir.display());
        Ok(path)
    }
}

/// Callback invoked after every captured frame
pub type ExtractionCallback = Box<dyn FnMut(ExtractionProgress) + Send>;

/// Best-effort frame extractor
pub struct FrameExtractor {
    fallback_fps: f64,
    state: ExtractionState,
    on_progress: Option<ExtractionCallback>,
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_EXTRACT_FPS)
    }
}

impl FrameExtractor {
    pub fn new(fallback_fps: f64) -> Self {
        Self {
            fallback_fps,
            state: ExtractionState::AwaitingMetadata,
            on_progress: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ExtractionCallback) -> Self {
        self.on_progress = Some(callback);
        self
    }

    pub fn state(&self) -> ExtractionState {
        self.state
    }

    /// Capture `floor(duration * fps)` frames, one seek per frame.
    ///
    /// `target_fps` wins over the source's own rate, which wins over the
    /// fallback. The future stays pending if metadata or a seek never
    /// completes; use [`extract_with_timeout`](Self::extract_with_timeout)
    /// to bound it.
    pub async fn extract(
        &mut self,
        media: &SharedMedia,
        surface: &SharedSurface,
        overlay: &Overlay,
        target_fps: Option<f64>,
    ) -> Result<ExtractedFrameSequence> {
        self.state = ExtractionState::AwaitingMetadata;
        wait_for_metadata(media).await?;

        let (duration, fps, mut events) = {
            let mut source = media.lock();
            if let Err(e) = source.pause() {
                debug!("Ignoring pause failure before extraction: {}", e);
            }
            let fps = target_fps
                .or_else(|| source.frame_rate())
                .unwrap_or(self.fallback_fps);
            (source.duration(), fps, source.subscribe())
        };

        if !(fps.is_finite() && fps > 0.0) {
            return Err(FlipbookError::InvalidInput(format!("extraction rate {}", fps)));
        }
        if !(duration.is_finite() && duration >= 0.0) {
            return Err(FlipbookError::InvalidInput(format!("cannot extract from duration {}", duration)));
        }

        let total = (duration * fps).floor() as usize;
        info!("Extracting {} frames at {} fps from {:.3}s of video", total, fps, duration);

        let mut sequence = ExtractedFrameSequence::with_capacity(fps, total);

        for index in 0..total {
            let media_time = index as f64 / fps;

            self.state = ExtractionState::Seeking(index);
            media.lock().set_current_time(media_time)?;
            wait_for_event(&mut events, |e| matches!(e, MediaEvent::Seeked)).await?;

            self.state = ExtractionState::Capturing(index);
            let image = capture_full(media, surface)?;
            sequence.push(ExtractedFrame { index, media_time, image });

            let progress = ExtractionProgress { completed: index + 1, total };
            overlay.set_text(&progress.status_text());
            overlay.set_progress(progress.percent());
            if let Some(callback) = self.on_progress.as_mut() {
                callback(progress);
            }

            tokio::task::yield_now().await;
        }

        self.state = ExtractionState::Complete;
        info!("Extraction complete: {} frames", sequence.len());
        Ok(sequence)
    }

    /// [`extract`](Self::extract) bounded by `limit`
    pub async fn extract_with_timeout(
        &mut self,
        media: &SharedMedia,
        surface: &SharedSurface,
        overlay: &Overlay,
        target_fps: Option<f64>,
        limit: Duration,
    ) -> Result<ExtractedFrameSequence> {
        match tokio::time::timeout(limit, self.extract(media, surface, overlay, target_fps)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Extraction stalled in {:?} after {:?}", self.state, limit);
                Err(FlipbookError::Stalled(format!("extraction stuck in {:?}", self.state)))
            }
        }
    }
}

/// Draw the source's current frame over the whole surface and snapshot it
fn capture_full(media: &SharedMedia, surface: &SharedSurface) -> Result<EncodedImage> {
    let frame = media.lock().current_frame();
    let mut surface = surface.lock();

    match frame {
        Some(frame) => {
            let bounds = surface.bounds();
            surface.draw_frame(&frame, bounds)?;
        }
        None => debug!("No frame after seek, capturing surface as is"),
    }

    surface.snapshot()
}
