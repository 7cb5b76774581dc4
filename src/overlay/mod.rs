//! Loading overlay and status display
//!
//! The environment supplies a text/visibility/progress sink; [`Overlay`]
//! wraps it with the visibility flag the controller and the progress
//! poller both need.

mod recorder;

pub use recorder::{OverlayChange, OverlayRecorder};

use log::debug;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shown while the source is loading
pub const TEXT_PREPARING: &str = "Preparing video…";
/// Shown when the source can start playing
pub const TEXT_BUFFERED: &str = "Buffered — ready to play";
/// Shown when playback needs a user gesture
pub const TEXT_MANUAL_START: &str = "Tap ▶ Start to begin";

/// Status sink owned by the embedding environment
pub trait StatusSink: Send {
    /// Replace the status text
    fn set_text(&mut self, text: &str);

    /// Show or hide the loading overlay
    fn set_visible(&mut self, visible: bool);

    /// Set the progress bar fill, 0..=100
    fn set_progress(&mut self, percent: u8);
}

/// Status sink shared between the controller and the poller
pub type SharedStatus = Arc<Mutex<dyn StatusSink>>;

/// Loading overlay with its visibility state
#[derive(Clone)]
pub struct Overlay {
    sink: SharedStatus,
    visible: Arc<AtomicBool>,
}

impl Overlay {
    pub fn new(sink: SharedStatus) -> Self {
        Self {
            sink,
            visible: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn show(&self) {
        self.sink.lock().set_visible(true);
        self.visible.store(true, Ordering::SeqCst);
    }

    /// Hide the overlay; true if it was visible
    pub fn hide(&self) -> bool {
        let was_visible = self.visible.swap(false, Ordering::SeqCst);
        if was_visible {
            debug!("Overlay dismissed");
        }
        self.sink.lock().set_visible(false);
        was_visible
    }

    /// Flip visibility; returns the new state
    pub fn toggle(&self) -> bool {
        if self.is_visible() {
            self.hide();
            false
        } else {
            self.show();
            true
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    pub fn set_text(&self, text: &str) {
        self.sink.lock().set_text(text);
    }

    pub fn set_progress(&self, percent: u8) {
        self.sink.lock().set_progress(percent.min(100));
    }
}
