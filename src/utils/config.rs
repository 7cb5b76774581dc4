//! Configuration management for flipbook
//!
//! This module handles loading and managing application configuration
//! from the user config file and environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::buffering::BufferMeasure;
use crate::player::PlaybackMode;
use crate::renderer::{Color, RenderStrategy};
use crate::utils::error::{FlipbookError, IntoFlipbookError, Result};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Render surface and loop settings
    pub render: RenderConfig,

    /// Buffering progress settings
    pub buffering: BufferingConfig,

    /// Frame extraction settings
    pub extract: ExtractConfig,

    /// General application settings
    pub general: GeneralConfig,
}

/// Render configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Surface width in pixels
    pub width: u32,

    /// Surface height in pixels
    pub height: u32,

    /// Display refresh rate used by the refresh-driven loop
    pub refresh_rate: f64,

    /// Loop scheduling strategy
    pub strategy: RenderStrategy,

    /// Colour the surface is blanked with before the first frame
    pub background: Color,
}

/// Buffering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferingConfig {
    /// Poll interval in milliseconds
    pub poll_interval_ms: u64,

    /// Percentage at which the loading overlay is dismissed
    pub ready_threshold: u8,

    /// How buffered ranges are reduced to a single read point
    pub measure: BufferMeasure,
}

/// Frame extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Rate used when the source cannot report its own
    pub fallback_fps: f64,

    /// Forced extraction rate, overriding the source's
    pub target_fps: Option<f64>,

    /// Loop cached playback once the last frame is shown
    pub loop_playback: bool,

    /// Optional watchdog for stalled extraction, in seconds
    pub timeout_secs: Option<u64>,
}

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Live rendering or extract-then-play
    pub mode: PlaybackMode,

    /// Try to start playback on initialise
    pub auto_play: bool,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            refresh_rate: 60.0,
            strategy: RenderStrategy::Auto,
            background: Color::BLACK,
        }
    }
}

impl Default for BufferingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 300,
            ready_threshold: 98,
            measure: BufferMeasure::LastRangeEnd,
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            fallback_fps: 30.0,
            target_fps: None,
            loop_playback: false,
            timeout_secs: None,
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            mode: PlaybackMode::Live,
            auto_play: true,
            log_level: "info".to_string(),
        }
    }
}

impl BufferingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl RenderConfig {
    /// Interval between display refresh ticks
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.refresh_rate)
    }
}

impl Config {
    /// Load configuration from various sources
    ///
    /// Later sources override earlier ones:
    /// 1. Default values
    /// 2. User config file (~/.config/flipbook/config.toml on Linux)
    /// 3. Environment variables (FLIPBOOK_* prefix)
    pub fn load() -> Result<Self> {
        let mut config = match Self::user_config_path() {
            Some(path) if path.exists() => Self::load_from_file(&path)?,
            _ => Self::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Load a configuration file; missing keys keep their defaults
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .config_err("Failed to read config file")?;

        toml::from_str(&contents).config_err("Failed to parse config file")
    }

    /// Apply `FLIPBOOK_*` environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        // Example: FLIPBOOK_RENDER_WIDTH=1280
        if let Ok(width) = std::env::var("FLIPBOOK_RENDER_WIDTH") {
            self.render.width = width.parse()
                .map_err(|_| FlipbookError::Config("Invalid FLIPBOOK_RENDER_WIDTH".to_string()))?;
        }

        if let Ok(height) = std::env::var("FLIPBOOK_RENDER_HEIGHT") {
            self.render.height = height.parse()
                .map_err(|_| FlipbookError::Config("Invalid FLIPBOOK_RENDER_HEIGHT".to_string()))?;
        }

        if let Ok(interval) = std::env::var("FLIPBOOK_POLL_INTERVAL_MS") {
            self.buffering.poll_interval_ms = interval.parse()
                .map_err(|_| FlipbookError::Config("Invalid FLIPBOOK_POLL_INTERVAL_MS".to_string()))?;
        }

        if let Ok(fps) = std::env::var("FLIPBOOK_FALLBACK_FPS") {
            self.extract.fallback_fps = fps.parse()
                .map_err(|_| FlipbookError::Config("Invalid FLIPBOOK_FALLBACK_FPS".to_string()))?;
        }

        if let Ok(log_level) = std::env::var("FLIPBOOK_LOG_LEVEL") {
            self.general.log_level = log_level;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.render.width == 0 || self.render.height == 0 {
            return Err(FlipbookError::Config("Surface dimensions must be non-zero".to_string()));
        }

        if !(self.render.refresh_rate.is_finite() && self.render.refresh_rate > 0.0) {
            return Err(FlipbookError::Config("Refresh rate must be positive".to_string()));
        }

        if self.buffering.poll_interval_ms == 0 {
            return Err(FlipbookError::Config("Poll interval must be non-zero".to_string()));
        }

        if self.buffering.ready_threshold > 100 {
            return Err(FlipbookError::Config("Ready threshold must be at most 100".to_string()));
        }

        let fps_ok = |fps: f64| fps.is_finite() && fps > 0.0;
        if !fps_ok(self.extract.fallback_fps) || !self.extract.target_fps.map_or(true, fps_ok) {
            return Err(FlipbookError::Config("Extraction rate must be positive".to_string()));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.general.log_level.as_str()) {
            return Err(FlipbookError::Config(format!(
                "Invalid log level '{}', must be one of: {:?}",
                self.general.log_level,
                valid_log_levels
            )));
        }

        Ok(())
    }

    /// Get user config file path
    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("flipbook").join("config.toml"))
    }
}
