//! Renderer module for flipbook
//!
//! This module owns everything that touches the destination surface: the
//! contain-fit placement, the per-frame render loop and an in-memory RGBA
//! surface implementation.

use crate::media::VideoFrame;
use crate::utils::error::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// Export submodules
pub mod fit;
pub mod frame;
pub mod pixel_surface;

// Re-export main types
pub use fit::{fit, FrameRect};
pub use frame::{FrameRenderLoop, LoopHandle, LoopState};
pub use pixel_surface::PixelSurface;

/// Surface shared between the controller and the render loop
pub type SharedSurface = Arc<Mutex<dyn RenderSurface>>;

/// Fixed-size 2D drawing surface owned by the embedding environment
pub trait RenderSurface: Send {
    /// Surface width in pixels; fixed for a session
    fn width(&self) -> u32;

    /// Surface height in pixels; fixed for a session
    fn height(&self) -> u32;

    /// Fill a rectangle with a solid colour
    fn fill_rect(&mut self, rect: FrameRect, color: Color) -> Result<()>;

    /// Draw a decoded video frame scaled into `rect`
    fn draw_frame(&mut self, frame: &VideoFrame, rect: FrameRect) -> Result<()>;

    /// Draw a previously captured still scaled into `rect`
    fn draw_still(&mut self, still: &EncodedImage, rect: FrameRect) -> Result<()>;

    /// Encode the current surface content as a still image
    fn snapshot(&self) -> Result<EncodedImage>;

    /// The whole surface as a rectangle
    fn bounds(&self) -> FrameRect {
        FrameRect::full(self.width(), self.height())
    }
}

/// RGBA colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Encoded still image produced by a surface snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    /// Image width
    pub width: u32,

    /// Image height
    pub height: u32,

    /// Container format of `bytes`
    pub format: StillFormat,

    /// Encoded bytes
    pub bytes: Vec<u8>,
}

/// Still image container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StillFormat {
    Png,
}

impl StillFormat {
    pub fn extension(self) -> &'static str {
        match self {
            StillFormat::Png => "png",
        }
    }
}

/// How the render loop is scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RenderStrategy {
    /// Frame-driven when the source supports it, refresh-driven otherwise
    Auto,

    /// One draw per decoded source frame
    FrameDriven,

    /// One draw per display refresh
    RefreshDriven,
}

impl RenderStrategy {
    /// Pick a concrete strategy given the source's capabilities
    pub fn resolve(self, frame_callback_supported: bool) -> RenderStrategy {
        match self {
            RenderStrategy::Auto if frame_callback_supported => RenderStrategy::FrameDriven,
            RenderStrategy::Auto => RenderStrategy::RefreshDriven,
            RenderStrategy::FrameDriven if !frame_callback_supported => {
                log::warn!("Frame callbacks unsupported, falling back to refresh-driven rendering");
                RenderStrategy::RefreshDriven
            }
            other => other,
        }
    }
}
