//! Contain-fit placement of a source frame inside the destination surface

use crate::media::DEFAULT_VIDEO_SIZE;

/// Destination rectangle in surface pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameRect {
    pub width: u32,
    pub height: u32,
    pub x_offset: u32,
    pub y_offset: u32,
}

impl FrameRect {
    /// Rectangle covering a whole `width` x `height` surface
    pub fn full(width: u32, height: u32) -> Self {
        Self { width, height, x_offset: 0, y_offset: 0 }
    }

    pub fn right(&self) -> u32 {
        self.x_offset + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y_offset + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Fit a `source_w` x `source_h` frame inside `dest_w` x `dest_h`, preserving
/// aspect ratio and centring along the slack axis.
///
/// Sizes and offsets are floored to whole pixels, so the result never
/// exceeds the destination. A zero-sized destination yields an empty rect;
/// a zero-sized source is treated as the default 640x360.
pub fn fit(source_w: u32, source_h: u32, dest_w: u32, dest_h: u32) -> FrameRect {
    if dest_w == 0 || dest_h == 0 {
        return FrameRect::default();
    }
    let (source_w, source_h) = if source_w == 0 || source_h == 0 {
        DEFAULT_VIDEO_SIZE
    } else {
        (source_w, source_h)
    };

    let source_aspect = f64::from(source_w) / f64::from(source_h);
    let dest_aspect = f64::from(dest_w) / f64::from(dest_h);

    if source_aspect > dest_aspect {
        let height = ((f64::from(dest_w) / source_aspect).floor() as u32).min(dest_h);
        FrameRect {
            width: dest_w,
            height,
            x_offset: 0,
            y_offset: (dest_h - height) / 2,
        }
    } else {
        let width = ((f64::from(dest_h) * source_aspect).floor() as u32).min(dest_w);
        FrameRect {
            width,
            height: dest_h,
            x_offset: (dest_w - width) / 2,
            y_offset: 0,
        }
    }
}
