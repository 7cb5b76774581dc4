//! flipbook - video-to-surface playback core
//!
//! Draws a seekable video source into a fixed-size pixel surface, either
//! continuously while the source plays or from stills captured up front by
//! seeking frame by frame. A loading overlay tracks buffering progress
//! while the source downloads.
//!
//! The environment objects (video element, drawing surface, status
//! display) are traits; in-process implementations are provided for the
//! CLI and for tests.

pub mod buffering;
pub mod extract;
pub mod media;
pub mod overlay;
pub mod player;
pub mod renderer;
pub mod utils;

pub use buffering::{BufferMeasure, BufferProgressEstimator, BufferingState};
pub use extract::{CachedPlayback, ExtractedFrameSequence, FrameExtractor};
pub use media::{MediaElement, MediaEvent, SharedMedia, SyntheticConfig, SyntheticVideo};
pub use overlay::{Overlay, OverlayRecorder, SharedStatus, StatusSink};
pub use player::{PlaybackController, PlaybackMode, PlaybackState, PlayerEvent, StartOutcome};
pub use renderer::{fit, FrameRect, FrameRenderLoop, PixelSurface, RenderStrategy, RenderSurface, SharedSurface};
pub use utils::{Config, FlipbookError, Result};
