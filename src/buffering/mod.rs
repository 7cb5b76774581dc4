//! Buffering progress estimation
//!
//! Reduces a media duration and its buffered ranges to a whole percentage
//! and a "ready" flag used to dismiss the loading overlay. Readings that
//! cannot be trusted (unknown duration, nothing buffered yet) fall back to
//! the last known percentage instead of failing.

mod poller;

pub use poller::{poll_once, ProgressPoller, ProgressUpdate};

use crate::media::TimeRange;
use crate::utils::config::BufferingConfig;
use serde::{Deserialize, Serialize};

/// Percentage at which buffering counts as complete. Sits below 100 to
/// tolerate estimation jitter near the end of the stream.
pub const DEFAULT_READY_THRESHOLD: u8 = 98;

/// Gap tolerated between ranges treated as contiguous, in seconds
const CONTIGUITY_EPSILON: f64 = 1e-3;

/// How buffered ranges are reduced to a single read point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BufferMeasure {
    /// End of the last range: the furthest point read so far
    #[default]
    LastRangeEnd,

    /// End of the run of ranges starting at time zero
    ContiguousFromStart,

    /// Total length of all ranges
    Sum,
}

impl BufferMeasure {
    /// Buffered read point in seconds for `ranges`
    pub fn read_point(self, ranges: &[TimeRange]) -> f64 {
        match self {
            BufferMeasure::LastRangeEnd => ranges.last().map_or(0.0, |r| r.end),
            BufferMeasure::ContiguousFromStart => {
                let mut end = 0.0_f64;
                for range in ranges {
                    if range.start > end + CONTIGUITY_EPSILON {
                        break;
                    }
                    end = end.max(range.end);
                }
                end
            }
            BufferMeasure::Sum => ranges.iter().map(TimeRange::len).sum(),
        }
    }
}

/// Derived buffering reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferingState {
    /// Whole percentage, 0..=100
    pub percent: u8,

    /// Buffering is far enough along to dismiss the loading indicator
    pub is_ready_threshold: bool,
}

/// Overlay text for a buffering reading
pub fn status_text(state: BufferingState) -> String {
    if state.percent < 100 {
        format!("Loading frames… {}%", state.percent)
    } else {
        "Loaded — ready to play".to_string()
    }
}

/// Buffering percentage estimator with a last-known fallback
#[derive(Debug, Clone)]
pub struct BufferProgressEstimator {
    measure: BufferMeasure,
    ready_threshold: u8,
    last_known: u8,
}

impl Default for BufferProgressEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferProgressEstimator {
    pub fn new() -> Self {
        Self {
            measure: BufferMeasure::default(),
            ready_threshold: DEFAULT_READY_THRESHOLD,
            last_known: 0,
        }
    }

    pub fn from_config(config: &BufferingConfig) -> Self {
        Self::new()
            .with_measure(config.measure)
            .with_ready_threshold(config.ready_threshold)
    }

    pub fn with_measure(mut self, measure: BufferMeasure) -> Self {
        self.measure = measure;
        self
    }

    pub fn with_ready_threshold(mut self, threshold: u8) -> Self {
        self.ready_threshold = threshold.min(100);
        self
    }

    /// Percentage from the last trusted reading
    pub fn last_known(&self) -> u8 {
        self.last_known
    }

    /// Forget the last reading, e.g. after a reload
    pub fn reset(&mut self) {
        self.last_known = 0;
    }

    /// Measure buffering; `None` when the inputs cannot be trusted
    pub fn measure(&mut self, duration: f64, ranges: &[TimeRange]) -> Option<BufferingState> {
        if !duration.is_finite() || duration <= 0.0 || ranges.is_empty() {
            return None;
        }

        let end = self.measure.read_point(ranges);
        if !end.is_finite() {
            return None;
        }

        let percent = (end / duration * 100.0).floor().clamp(0.0, 100.0) as u8;
        self.last_known = percent;

        Some(BufferingState {
            percent,
            is_ready_threshold: percent >= self.ready_threshold,
        })
    }

    /// Like [`measure`](Self::measure), but never fails: untrusted input
    /// yields the last known percentage with the ready flag cleared
    pub fn estimate(&mut self, duration: f64, ranges: &[TimeRange]) -> BufferingState {
        self.measure(duration, ranges).unwrap_or(BufferingState {
            percent: self.last_known,
            is_ready_threshold: false,
        })
    }
}
