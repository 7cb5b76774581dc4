//! Fixed-cadence buffering poll
//!
//! The estimator never schedules itself; this task re-queries the media on
//! an interval and pushes the reading to the overlay.

use super::{status_text, BufferProgressEstimator, BufferingState};
use crate::media::SharedMedia;
use crate::overlay::Overlay;
use log::{debug, trace, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Result of one successful poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub state: BufferingState,

    /// This poll hid a visible overlay
    pub dismissed_overlay: bool,
}

/// Query the media once and update the overlay.
///
/// A failed or untrusted query leaves the overlay untouched and returns
/// `None`; the next poll retries.
pub fn poll_once(
    media: &SharedMedia,
    estimator: &Mutex<BufferProgressEstimator>,
    overlay: &Overlay,
) -> Option<ProgressUpdate> {
    let reading = {
        let media = media.lock();
        media.buffered().map(|ranges| (media.duration(), ranges))
    };

    let (duration, ranges) = match reading {
        Ok(reading) => reading,
        Err(e) if e.is_transient() => {
            debug!("Buffer poll skipped: {}", e);
            return None;
        }
        Err(e) => {
            warn!("Buffer poll failed: {}", e);
            return None;
        }
    };

    let state = estimator.lock().measure(duration, &ranges)?;
    trace!("Buffered {}%", state.percent);

    overlay.set_progress(state.percent);
    overlay.set_text(&status_text(state));
    let dismissed_overlay = state.is_ready_threshold && overlay.hide();

    Some(ProgressUpdate { state, dismissed_overlay })
}

/// Callback invoked after every successful poll
pub type ProgressCallback = Box<dyn FnMut(ProgressUpdate) + Send>;

/// Background task polling buffering progress every `interval`
pub struct ProgressPoller {
    task: JoinHandle<()>,
}

impl ProgressPoller {
    /// Start polling; the first poll happens one `interval` from now
    pub fn spawn(
        media: SharedMedia,
        estimator: Arc<Mutex<BufferProgressEstimator>>,
        overlay: Overlay,
        interval: Duration,
        mut on_update: Option<ProgressCallback>,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(Instant::now() + interval, interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticks.tick().await;
                if let Some(update) = poll_once(&media, &estimator, &overlay) {
                    if let Some(callback) = on_update.as_mut() {
                        callback(update);
                    }
                }
            }
        });

        Self { task }
    }

    /// Stop polling
    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ProgressPoller {
    fn drop(&mut self) {
        self.task.abort();
    }
}
