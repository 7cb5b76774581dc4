//! Playback controller module for flipbook
//!
//! This module owns the "is playing" flag and wires the other pieces
//! together: the buffering poller and overlay while loading, the live
//! render loop, and extraction followed by cached playback.

mod controller;
mod events;
mod state;

pub use controller::PlaybackController;
pub use events::{EventDispatcher, PlayerEventHandler};
pub use state::PlayerStatus;

use serde::{Deserialize, Serialize};

/// How frames reach the surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    /// Draw the playing source continuously
    #[default]
    Live,

    /// Capture every frame by seeking first, then play the stills back
    Extract,
}

/// Controller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Not playing; waiting for a start
    Idle,

    /// Waiting for the source's metadata
    Preparing,

    /// Render loop or cached playback running
    Playing,

    /// Frame extraction in progress
    Extracting,

    /// Playback ran to the end of the source or of the cached stills
    Ended,

    /// Paused by the user or by the page becoming hidden
    Paused,
}

/// Result of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Live playback running
    Started,

    /// Extraction finished and cached playback running
    Extracted { frames: usize },

    /// The source refused to play; a manual start is required
    Rejected,

    /// Autoplay disabled; waiting for a manual start
    Deferred,
}

impl StartOutcome {
    pub fn is_playing(&self) -> bool {
        matches!(self, StartOutcome::Started | StartOutcome::Extracted { .. })
    }
}

/// Player event for external event handling
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Playback started
    PlaybackStarted,

    /// Playback paused
    PlaybackPaused,

    /// The source refused to play
    PlaybackRejected { reason: String },

    /// Buffering progress
    BufferingProgress { percent: u8 },

    /// Loading overlay hidden because buffering is complete
    OverlayDismissed,

    /// One more frame extracted
    ExtractionProgress { completed: usize, total: usize },

    /// Extraction finished
    ExtractionComplete { frames: usize },

    /// Source reloaded from scratch
    Reloaded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_mode_names() {
        assert_eq!(serde_json::to_string(&PlaybackMode::Extract).unwrap(), "\"extract\"");
        assert_eq!(PlaybackMode::default(), PlaybackMode::Live);
    }

    #[test]
    fn test_start_outcome_is_playing() {
        assert!(StartOutcome::Started.is_playing());
        assert!(StartOutcome::Extracted { frames: 3 }.is_playing());
        assert!(!StartOutcome::Rejected.is_playing());
        assert!(!StartOutcome::Deferred.is_playing());
    }
}
