//! Fixed-rate playback of an extracted frame sequence

use super::ExtractedFrameSequence;
use crate::renderer::{fit, EncodedImage, FrameRenderLoop, LoopHandle, SharedSurface};
use crate::utils::error::Result;
use log::{debug, info};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;

/// Plays captured stills back through a [`FrameRenderLoop`], one still
/// per `1 / fps` seconds, each contain-fitted into the surface
#[derive(Debug, Clone)]
pub struct CachedPlayback {
    sequence: Arc<ExtractedFrameSequence>,
    looping: bool,
}

impl CachedPlayback {
    pub fn new(sequence: Arc<ExtractedFrameSequence>) -> Self {
        Self { sequence, looping: false }
    }

    /// Restart from the first still after the last one
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn sequence(&self) -> &Arc<ExtractedFrameSequence> {
        &self.sequence
    }

    /// Replace whatever `render_loop` is drawing with this sequence
    pub fn start(&self, render_loop: &mut FrameRenderLoop) -> LoopHandle {
        let sequence = self.sequence.clone();
        let surface = render_loop.surface().clone();
        let looping = self.looping;

        let handle = render_loop.launch(move |handle| run_cached(handle, sequence, surface, looping));
        info!(
            "Render loop #{} playing {} cached frames at {} fps",
            handle.id(),
            self.sequence.len(),
            self.sequence.frames_per_second()
        );
        handle
    }
}

async fn run_cached(
    handle: LoopHandle,
    sequence: Arc<ExtractedFrameSequence>,
    surface: SharedSurface,
    looping: bool,
) {
    if sequence.is_empty() {
        handle.cancel();
        return;
    }

    let mut ticks = tokio::time::interval(sequence.frame_interval());
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut index = 0;

    loop {
        tokio::select! {
            biased;
            _ = handle.cancelled() => break,
            _ = ticks.tick() => {}
        }

        if index >= sequence.len() {
            if !looping {
                // Last still stays on screen
                handle.cancel();
                break;
            }
            index = 0;
        }

        let Some(frame) = sequence.get(index) else {
            break;
        };
        if !handle.draw_if_running(|| draw_still_fitted(&surface, &frame.image)) {
            break;
        }
        index += 1;
    }

    debug!(
        "Cached playback #{} exited after {} frames",
        handle.id(),
        handle.frames_drawn()
    );
}

fn draw_still_fitted(surface: &SharedSurface, still: &EncodedImage) -> Result<bool> {
    let mut surface = surface.lock();
    let rect = fit(still.width, still.height, surface.width(), surface.height());
    if rect.is_empty() {
        return Ok(false);
    }
    surface.draw_still(still, rect)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractedFrame;
    use crate::renderer::{Color, FrameRect, PixelSurface, RenderSurface};
    use parking_lot::Mutex;
    use std::time::Duration;

    /// Five 16x8 stills, still `i` filled with red `i * 10`
    fn sequence() -> Arc<ExtractedFrameSequence> {
        let mut sequence = ExtractedFrameSequence::with_capacity(10.0, 5);
        for index in 0..5 {
            let mut still = PixelSurface::new(16, 8);
            let bounds = still.bounds();
            still.fill_rect(bounds, Color::rgb(index as u8 * 10, 0, 0)).unwrap();
            sequence.push(ExtractedFrame {
                index,
                media_time: index as f64 / 10.0,
                image: still.snapshot().unwrap(),
            });
        }
        Arc::new(sequence)
    }

    fn render_loop() -> (Arc<Mutex<PixelSurface>>, FrameRenderLoop) {
        let surface = Arc::new(Mutex::new(PixelSurface::new(32, 32)));
        let render_loop = FrameRenderLoop::new(surface.clone(), Duration::from_millis(16));
        (surface, render_loop)
    }

    #[tokio::test(start_paused = true)]
    async fn test_plays_once_and_holds_last_still() {
        let (surface, mut render_loop) = render_loop();
        let handle = CachedPlayback::new(sequence()).start(&mut render_loop);

        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(handle.frames_drawn(), 5);
        assert!(!handle.is_running());
        assert!(!render_loop.is_running());

        let surface = surface.lock();
        assert_eq!(surface.last_rect(), Some(FrameRect { width: 32, height: 16, x_offset: 0, y_offset: 8 }));
        assert_eq!(surface.pixel(16, 16), Some([40, 0, 0, 255]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_draws_at_sequence_rate() {
        let (_surface, mut render_loop) = render_loop();
        let handle = CachedPlayback::new(sequence()).start(&mut render_loop);

        // Ticks at 0, 100 and 200ms
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(handle.frames_drawn(), 3);
        assert!(handle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_looping_wraps_around() {
        let (surface, mut render_loop) = render_loop();
        let handle = CachedPlayback::new(sequence()).looping(true).start(&mut render_loop);

        // Frames 0..=4 then 0, 1 again
        tokio::time::sleep(Duration::from_millis(650)).await;
        assert_eq!(handle.frames_drawn(), 7);
        assert!(handle.is_running());
        assert_eq!(surface.lock().pixel(16, 16), Some([10, 0, 0, 255]));

        render_loop.cancel();
        let drawn = handle.frames_drawn();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(handle.frames_drawn(), drawn);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_sequence_finishes_immediately() {
        let (surface, mut render_loop) = render_loop();
        let empty = Arc::new(ExtractedFrameSequence::with_capacity(10.0, 0));
        let handle = CachedPlayback::new(empty).start(&mut render_loop);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!handle.is_running());
        assert_eq!(surface.lock().draw_count(), 0);
    }
}
