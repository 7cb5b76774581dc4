//! In-memory RGBA8 render surface
//!
//! Stands in for a canvas 2D context: nearest-neighbour scaling on draw,
//! PNG encoding on snapshot.

use super::{Color, EncodedImage, FrameRect, RenderSurface, StillFormat};
use crate::media::VideoFrame;
use crate::utils::error::{FlipbookError, IntoFlipbookError, Result};
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// Fixed-size RGBA8 pixel buffer
pub struct PixelSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    draw_count: u64,
    last_rect: Option<FrameRect>,
}

impl PixelSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width as usize) * (height as usize) * 4],
            draw_count: 0,
            last_rect: None,
        }
    }

    /// RGBA value at `(x, y)`
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = self.offset(x, y);
        let px = &self.pixels[offset..offset + 4];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Number of frame and still draws so far
    pub fn draw_count(&self) -> u64 {
        self.draw_count
    }

    /// Destination of the most recent draw
    pub fn last_rect(&self) -> Option<FrameRect> {
        self.last_rect
    }

    /// Write the current content as a PNG file
    pub fn save_png(&self, path: &Path) -> Result<()> {
        let still = self.snapshot()?;
        std::fs::write(path, still.bytes)?;
        Ok(())
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        ((y as usize) * (self.width as usize) + x as usize) * 4
    }

    fn check_rect(&self, rect: FrameRect) -> Result<()> {
        if rect.right() > self.width || rect.bottom() > self.height {
            return Err(FlipbookError::Surface(format!(
                "{:?} outside {}x{} surface",
                rect, self.width, self.height
            )));
        }
        Ok(())
    }

    /// Nearest-neighbour scale of a `src_w` x `src_h` RGBA buffer into `rect`
    fn blit(&mut self, src: &[u8], src_w: u32, src_h: u32, rect: FrameRect) -> Result<()> {
        self.check_rect(rect)?;
        if src.len() != (src_w as usize) * (src_h as usize) * 4 {
            return Err(FlipbookError::Surface(format!(
                "source buffer of {} bytes is not {}x{} RGBA",
                src.len(),
                src_w,
                src_h
            )));
        }

        if !rect.is_empty() && src_w > 0 && src_h > 0 {
            for dy in 0..rect.height {
                let sy = (u64::from(dy) * u64::from(src_h) / u64::from(rect.height)) as u32;
                for dx in 0..rect.width {
                    let sx = (u64::from(dx) * u64::from(src_w) / u64::from(rect.width)) as u32;
                    let from = ((sy as usize) * (src_w as usize) + sx as usize) * 4;
                    let to = self.offset(rect.x_offset + dx, rect.y_offset + dy);
                    self.pixels[to..to + 4].copy_from_slice(&src[from..from + 4]);
                }
            }
        }

        self.draw_count += 1;
        self.last_rect = Some(rect);
        Ok(())
    }
}

impl RenderSurface for PixelSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn fill_rect(&mut self, rect: FrameRect, color: Color) -> Result<()> {
        self.check_rect(rect)?;
        let px = color.to_array();
        for y in rect.y_offset..rect.bottom() {
            for x in rect.x_offset..rect.right() {
                let offset = self.offset(x, y);
                self.pixels[offset..offset + 4].copy_from_slice(&px);
            }
        }
        Ok(())
    }

    fn draw_frame(&mut self, frame: &VideoFrame, rect: FrameRect) -> Result<()> {
        self.blit(&frame.data, frame.width, frame.height, rect)
    }

    fn draw_still(&mut self, still: &EncodedImage, rect: FrameRect) -> Result<()> {
        let decoded = image::load_from_memory_with_format(&still.bytes, ImageFormat::Png)?.to_rgba8();
        let (w, h) = decoded.dimensions();
        self.blit(decoded.as_raw(), w, h, rect)
    }

    fn snapshot(&self) -> Result<EncodedImage> {
        let image = RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .ok_or_else(|| crate::internal_error!("surface buffer of {} bytes", self.pixels.len()))?;

        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .encode_err("Encoding surface snapshot")?;

        Ok(EncodedImage {
            width: self.width,
            height: self.height,
            format: StillFormat::Png,
            bytes,
        })
    }
}
