//! Point-in-time player status
//!
//! A serializable snapshot of the controller, used for the CLI summary and
//! by tests that want to assert on several fields at once.

use super::{PlaybackMode, PlaybackState};
use crate::utils::format_media_time;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStatus {
    pub state: PlaybackState,
    pub mode: PlaybackMode,
    pub playing: bool,

    /// Last trusted buffering percentage
    pub buffered_percent: u8,

    pub overlay_visible: bool,

    /// Source position in seconds
    pub position: f64,

    /// Source duration in seconds; NaN before metadata
    #[serde(serialize_with = "finite_or_null")]
    pub duration: f64,

    /// Frames drawn by the most recent render loop, cancelled or not
    pub frames_drawn: u64,

    /// Stills in the extracted sequence, if any
    pub frames_extracted: Option<usize>,
}

fn finite_or_null<S: serde::Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        serializer.serialize_none()
    }
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} ({:?}) {} / {}, buffered {}%, {} frames drawn",
            self.state,
            self.mode,
            format_media_time(self.position),
            format_media_time(self.duration),
            self.buffered_percent,
            self.frames_drawn
        )?;
        if let Some(frames) = self.frames_extracted {
            write!(f, ", {} extracted", frames)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> PlayerStatus {
        PlayerStatus {
            state: PlaybackState::Playing,
            mode: PlaybackMode::Live,
            playing: true,
            buffered_percent: 100,
            overlay_visible: false,
            position: 1.5,
            duration: f64::NAN,
            frames_drawn: 45,
            frames_extracted: None,
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(
            status().to_string(),
            "Playing (Live) 00:01.500 / --:--, buffered 100%, 45 frames drawn"
        );
    }

    #[test]
    fn test_unknown_duration_serializes_as_null() {
        let json = serde_json::to_value(status()).unwrap();
        assert!(json["duration"].is_null());
        assert_eq!(json["state"], "playing");
        assert_eq!(json["mode"], "live");
    }
}
