//! Utility module for flipbook
//!
//! This module provides common utilities used throughout the crate:
//! - Error handling with custom error types
//! - Configuration management
//! - Common helper functions

pub mod config;
pub mod error;

// Re-export commonly used items
pub use config::{BufferingConfig, Config, ExtractConfig, GeneralConfig, RenderConfig};
pub use error::{FlipbookError, Result};

/// Format a media time in seconds for status text
///
/// Returns "MM:SS.mmm", or "--:--" for non-finite or negative input.
pub fn format_media_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "--:--".to_string();
    }

    let total_ms = (seconds * 1000.0).round() as u64;
    let minutes = total_ms / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    format!("{:02}:{:02}.{:03}", minutes, secs, millis)
}
