//! Media source module for flipbook
//!
//! The playback core never decodes video itself. It drives a seekable,
//! time-addressable video element owned by the embedding environment
//! through the [`MediaElement`] trait, and listens for its asynchronous
//! notifications on a broadcast channel.

mod synthetic;

pub use synthetic::{SyntheticConfig, SyntheticVideo};

use crate::utils::error::{FlipbookError, Result};
use log::warn;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

/// Media element shared between the controller, render loop, poller and extractor
pub type SharedMedia = Arc<Mutex<dyn MediaElement>>;

/// Dimensions substituted when the source has not reported its own yet
pub const DEFAULT_VIDEO_SIZE: (u32, u32) = (640, 360);

/// Media element interface consumed by the playback core
pub trait MediaElement: Send {
    /// Start or resume playback. An `Err` means the request was rejected
    /// (usually by an autoplay policy); the element stays paused.
    fn play(&mut self) -> Result<()>;

    /// Pause playback. Some platforms throw here; callers swallow it.
    fn pause(&mut self) -> Result<()>;

    /// Restart resource loading from scratch
    fn load(&mut self) -> Result<()>;

    /// Whether the element is currently paused
    fn is_paused(&self) -> bool;

    /// How much of the media is available
    fn ready_state(&self) -> ReadyState;

    /// Duration in seconds; NaN before metadata, infinite for live streams
    fn duration(&self) -> f64;

    /// Current playback position in seconds
    fn current_time(&self) -> f64;

    /// Request a seek. Completion is signalled by [`MediaEvent::Seeked`].
    fn set_current_time(&mut self, seconds: f64) -> Result<()>;

    /// Natural video size; `(0, 0)` before metadata
    fn video_size(&self) -> (u32, u32);

    /// Buffered ranges, ascending and non-overlapping. May fail transiently.
    fn buffered(&self) -> Result<Vec<TimeRange>>;

    /// Source frame rate, when the element can report it
    fn frame_rate(&self) -> Option<f64>;

    /// The most recently decoded frame at the current position
    fn current_frame(&self) -> Option<VideoFrame>;

    /// Whether per-decoded-frame notifications are available
    fn supports_frame_callback(&self) -> bool;

    /// Subscribe to element notifications
    fn subscribe(&self) -> broadcast::Receiver<MediaEvent>;

    /// Whether duration and dimensions are known
    fn has_metadata(&self) -> bool {
        self.ready_state() >= ReadyState::HaveMetadata
    }
}

/// Readiness of the media element, ordered from least to most data
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    HaveFutureData,
    HaveEnoughData,
}

/// Notifications emitted by a media element
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Duration and dimensions are now known
    MetadataLoaded,

    /// Enough data to start playing
    CanPlay,

    /// Enough data to play to the end without stalling
    CanPlayThrough,

    /// A seek requested through `set_current_time` completed
    Seeked,

    /// A new frame was decoded and presented
    FramePresented { media_time: f64 },

    /// Playback reached the end of the media
    Ended,
}

/// Contiguous interval of the media timeline, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0.0
    }

    pub fn contains(&self, seconds: f64) -> bool {
        self.start <= seconds && seconds <= self.end
    }
}

/// A decoded video frame in RGBA8
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Frame width
    pub width: u32,

    /// Frame height
    pub height: u32,

    /// Presentation time in seconds
    pub media_time: f64,

    /// Tightly packed RGBA8 pixels, `width * height * 4` bytes
    pub data: Arc<Vec<u8>>,
}

impl VideoFrame {
    /// RGBA value of the pixel at `(x, y)`
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y * self.width + x) * 4) as usize;
        let px = self.data.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Wait until an event satisfying `matches` arrives.
///
/// Subscribe *before* triggering the action whose completion is awaited,
/// otherwise the event can be missed. There is no timeout: a source that
/// never answers leaves the future pending.
pub async fn wait_for_event<P>(
    events: &mut broadcast::Receiver<MediaEvent>,
    mut matches: P,
) -> Result<MediaEvent>
where
    P: FnMut(&MediaEvent) -> bool,
{
    loop {
        match events.recv().await {
            Ok(event) if matches(&event) => return Ok(event),
            Ok(_) => continue,
            Err(RecvError::Lagged(skipped)) => {
                warn!("Media event receiver lagged, {} events skipped", skipped);
            }
            Err(RecvError::Closed) => {
                return Err(FlipbookError::Stalled("media event channel closed".to_string()));
            }
        }
    }
}

/// Wait for metadata, returning immediately when it is already known
pub async fn wait_for_metadata(media: &SharedMedia) -> Result<()> {
    let mut events = {
        let media = media.lock();
        if media.has_metadata() {
            return Ok(());
        }
        media.subscribe()
    };

    wait_for_event(&mut events, |e| matches!(e, MediaEvent::MetadataLoaded)).await?;
    Ok(())
}
