//! Procedural in-process video source
//!
//! `SyntheticVideo` behaves like a browser video element fed by a slow
//! progressive download: metadata arrives after a delay, the buffered range
//! grows at a fixed rate, seeks complete on the next clock tick and frames
//! are announced while playing. Frames are a test pattern whose top-left
//! pixel encodes the frame index, which makes captured output checkable.

use super::{MediaElement, MediaEvent, ReadyState, TimeRange, VideoFrame};
use crate::utils::error::{FlipbookError, Result};
use log::{debug, trace};
use parking_lot::Mutex;
use std::cell::Cell;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const EVENT_CAPACITY: usize = 256;

/// Largest accepted frame side, in pixels
pub const MAX_SYNTHETIC_DIMENSION: u32 = 8192;

/// Behaviour knobs for [`SyntheticVideo`]
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Natural frame width
    pub width: u32,

    /// Natural frame height
    pub height: u32,

    /// Source frame rate
    pub fps: f64,

    /// Duration in seconds
    pub duration: f64,

    /// Time from load until metadata is available
    pub metadata_delay: Duration,

    /// Media seconds buffered per wall-clock second; infinite buffers instantly
    pub buffer_rate: f64,

    /// Refuse every `play()` call, like a blocked autoplay
    pub reject_play: bool,

    /// Make `pause()` report failure after pausing
    pub fail_pause: bool,

    /// Announce decoded frames (frame-driven rendering available)
    pub frame_callback: bool,

    /// Whether `frame_rate()` reports `fps`
    pub report_frame_rate: bool,

    /// Number of initial `buffered()` calls that fail
    pub transient_buffered_failures: u32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            fps: 30.0,
            duration: 10.0,
            metadata_delay: Duration::ZERO,
            buffer_rate: f64::INFINITY,
            reject_play: false,
            fail_pause: false,
            frame_callback: true,
            report_frame_rate: true,
            transient_buffered_failures: 0,
        }
    }
}

impl SyntheticConfig {
    /// Reject settings the clock or the pattern renderer cannot honour
    pub fn validate(&self) -> Result<()> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(FlipbookError::InvalidInput(format!("source frame rate {}", self.fps)));
        }
        if !(self.duration.is_finite() && self.duration >= 0.0) {
            return Err(FlipbookError::InvalidInput(format!("source duration {}", self.duration)));
        }
        let sides = 1..=MAX_SYNTHETIC_DIMENSION;
        if !sides.contains(&self.width) || !sides.contains(&self.height) {
            return Err(FlipbookError::InvalidInput(format!(
                "source size {}x{}, each side must be 1..={}",
                self.width, self.height, MAX_SYNTHETIC_DIMENSION
            )));
        }
        if self.buffer_rate.is_nan() || self.buffer_rate < 0.0 {
            return Err(FlipbookError::InvalidInput(format!("buffer rate {}", self.buffer_rate)));
        }
        Ok(())
    }
}

/// Deterministic stand-in for a browser video element
pub struct SyntheticVideo {
    config: SyntheticConfig,
    ready_state: ReadyState,
    paused: bool,
    current_time: f64,
    pending_seek: Option<f64>,
    loaded_for: Duration,
    buffered_end: f64,
    last_frame_index: Option<u64>,
    announced_can_play: bool,
    announced_through: bool,
    buffered_failures_left: Cell<u32>,
    seek_log: Vec<f64>,
    events: broadcast::Sender<MediaEvent>,
}

impl SyntheticVideo {
    pub fn new(config: SyntheticConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let failures = config.transient_buffered_failures;

        Self {
            config,
            ready_state: ReadyState::HaveNothing,
            paused: true,
            current_time: 0.0,
            pending_seek: None,
            loaded_for: Duration::ZERO,
            buffered_end: 0.0,
            last_frame_index: None,
            announced_can_play: false,
            announced_through: false,
            buffered_failures_left: Cell::new(failures),
            seek_log: Vec::new(),
            events,
        }
    }

    /// Create the video and start its clock on the current tokio runtime.
    ///
    /// The clock stops on its own once the last strong reference is dropped.
    pub fn launch(config: SyntheticConfig) -> (Arc<Mutex<SyntheticVideo>>, JoinHandle<()>) {
        let video = Arc::new(Mutex::new(SyntheticVideo::new(config)));
        let driver = Self::spawn_driver(&video);
        (video, driver)
    }

    /// Spawn the task that advances the video clock once per source frame
    pub fn spawn_driver(video: &Arc<Mutex<SyntheticVideo>>) -> JoinHandle<()> {
        let weak = Arc::downgrade(video);
        let period = video.lock().tick_period();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;

            loop {
                interval.tick().await;
                let Some(video) = weak.upgrade() else {
                    trace!("Synthetic video dropped, clock stopping");
                    break;
                };
                video.lock().tick(period);
            }
        })
    }

    /// Interval between clock ticks: one source frame
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.config.fps)
    }

    /// Advance loading, seeking and playback by `dt`
    pub fn tick(&mut self, dt: Duration) {
        self.loaded_for += dt;

        if self.ready_state == ReadyState::HaveNothing {
            if self.loaded_for < self.config.metadata_delay {
                return;
            }
            self.ready_state = ReadyState::HaveMetadata;
            debug!(
                "Synthetic metadata: {}x{} @ {} fps, {:.2}s",
                self.config.width, self.config.height, self.config.fps, self.config.duration
            );
            self.emit(MediaEvent::MetadataLoaded);
        }

        self.advance_buffer();

        if let Some(target) = self.pending_seek.take() {
            self.current_time = target;
            self.last_frame_index = None;
            self.emit(MediaEvent::Seeked);
        }

        if !self.paused {
            self.advance_playback(dt);
        }
    }

    fn advance_buffer(&mut self) {
        let duration = self.config.duration;
        let since_metadata = self.loaded_for.saturating_sub(self.config.metadata_delay);

        self.buffered_end = if self.config.buffer_rate.is_infinite() {
            duration
        } else {
            (self.config.buffer_rate * since_metadata.as_secs_f64()).min(duration)
        };

        if self.buffered_end > 0.0 && self.ready_state < ReadyState::HaveCurrentData {
            self.ready_state = ReadyState::HaveCurrentData;
        }

        if !self.announced_can_play && self.buffered_end >= duration.min(1.0) {
            self.announced_can_play = true;
            self.ready_state = self.ready_state.max(ReadyState::HaveFutureData);
            self.emit(MediaEvent::CanPlay);
        }

        if !self.announced_through && self.buffered_end >= duration {
            self.announced_through = true;
            self.ready_state = ReadyState::HaveEnoughData;
            self.emit(MediaEvent::CanPlayThrough);
        }
    }

    fn advance_playback(&mut self, dt: Duration) {
        let duration = self.config.duration;
        let mut next = (self.current_time + dt.as_secs_f64()).min(duration);
        if duration - next < 1e-9 {
            next = duration;
        }

        // Stall at the edge of the download
        if next > self.buffered_end && self.buffered_end < duration {
            trace!("Synthetic playback stalled at {:.3}s", self.current_time);
            return;
        }
        self.current_time = next;

        let index = self.frame_index(self.current_time);
        if self.config.frame_callback && self.last_frame_index != Some(index) {
            self.last_frame_index = Some(index);
            self.emit(MediaEvent::FramePresented { media_time: index as f64 / self.config.fps });
        }

        if self.current_time >= duration {
            self.paused = true;
            self.emit(MediaEvent::Ended);
        }
    }

    /// Seek targets in request order
    pub fn seeks(&self) -> &[f64] {
        &self.seek_log
    }

    /// Number of whole frames in the source
    pub fn frame_count(&self) -> u64 {
        (self.config.duration * self.config.fps).floor() as u64
    }

    fn frame_index(&self, seconds: f64) -> u64 {
        let index = (seconds * self.config.fps + 1e-9).floor() as u64;
        index.min(self.frame_count().saturating_sub(1))
    }

    /// Frame index stored in the top-left pixel of a test-pattern frame
    pub fn decode_frame_index(pixel: [u8; 4]) -> u64 {
        u64::from(pixel[0]) | u64::from(pixel[1]) << 8 | u64::from(pixel[2]) << 16
    }

    fn render_pattern(&self, index: u64) -> Vec<u8> {
        let (width, height) = (self.config.width, self.config.height);
        let mut data = vec![0u8; width as usize * height as usize * 4];
        let bar_x = ((index * 4) % u64::from(width.max(1))) as u32;
        let background = [(index * 37 % 256) as u8, (index * 91 % 256) as u8, 128, 255];

        for y in 0..height {
            for x in 0..width {
                let offset = (y as usize * width as usize + x as usize) * 4;
                let px = if x == 0 && y == 0 {
                    [index as u8, (index >> 8) as u8, (index >> 16) as u8, 255]
                } else if x >= bar_x && x < bar_x + 2 {
                    [255, 255, 255, 255]
                } else {
                    background
                };
                data[offset..offset + 4].copy_from_slice(&px);
            }
        }

        data
    }

    fn emit(&self, event: MediaEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }
}

impl MediaElement for SyntheticVideo {
    fn play(&mut self) -> Result<()> {
        if self.config.reject_play {
            return Err(FlipbookError::PlaybackRejected(
                "play() not allowed without user interaction".to_string(),
            ));
        }
        if self.current_time >= self.config.duration {
            self.current_time = 0.0;
        }
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.paused = true;
        if self.config.fail_pause {
            return Err(FlipbookError::PauseFailed("pause() threw".to_string()));
        }
        Ok(())
    }

    fn load(&mut self) -> Result<()> {
        debug!("Synthetic video reloading");
        self.ready_state = ReadyState::HaveNothing;
        self.paused = true;
        self.current_time = 0.0;
        self.pending_seek = None;
        self.loaded_for = Duration::ZERO;
        self.buffered_end = 0.0;
        self.last_frame_index = None;
        self.announced_can_play = false;
        self.announced_through = false;
        Ok(())
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    fn duration(&self) -> f64 {
        if self.has_metadata() { self.config.duration } else { f64::NAN }
    }

    fn current_time(&self) -> f64 {
        self.pending_seek.unwrap_or(self.current_time)
    }

    fn set_current_time(&mut self, seconds: f64) -> Result<()> {
        if !self.has_metadata() {
            return Err(FlipbookError::InvalidInput("seek before metadata".to_string()));
        }
        if !seconds.is_finite() {
            return Err(FlipbookError::InvalidInput(format!("seek to {}", seconds)));
        }
        let target = seconds.clamp(0.0, self.config.duration);
        self.seek_log.push(target);
        self.pending_seek = Some(target);
        Ok(())
    }

    fn video_size(&self) -> (u32, u32) {
        if self.has_metadata() { (self.config.width, self.config.height) } else { (0, 0) }
    }

    fn buffered(&self) -> Result<Vec<TimeRange>> {
        let left = self.buffered_failures_left.get();
        if left > 0 {
            self.buffered_failures_left.set(left - 1);
            return Err(FlipbookError::TransientQuery("buffered ranges unavailable".to_string()));
        }

        if !self.has_metadata() || self.buffered_end <= 0.0 {
            return Ok(Vec::new());
        }
        Ok(vec![TimeRange::new(0.0, self.buffered_end)])
    }

    fn frame_rate(&self) -> Option<f64> {
        (self.config.report_frame_rate && self.has_metadata()).then_some(self.config.fps)
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        if !self.has_metadata() {
            return None;
        }
        let index = self.frame_index(self.current_time);

        Some(VideoFrame {
            width: self.config.width,
            height: self.config.height,
            media_time: index as f64 / self.config.fps,
            data: Arc::new(self.render_pattern(index)),
        })
    }

    fn supports_frame_callback(&self) -> bool {
        self.config.frame_callback
    }

    fn subscribe(&self) -> broadcast::Receiver<MediaEvent> {
        self.events.subscribe()
    }
}
