//! Error types for flipbook
//!
//! Every boundary call into the playback environment can fail. These
//! variants enumerate how, so callers can decide between "ignore this tick",
//! "stay stopped" and "report".

use thiserror::Error;

/// Main error type for flipbook
#[derive(Error, Debug)]
pub enum FlipbookError {
    /// A buffered-range or duration query failed or returned garbage.
    /// Ignored for the current poll and retried on the next one.
    #[error("Transient query failure: {0}")]
    TransientQuery(String),

    /// `play()` was refused, typically by an autoplay policy
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),

    /// `pause()` threw
    #[error("Pause failed: {0}")]
    PauseFailed(String),

    /// Metadata or a seek never completed within the caller's limit
    #[error("Stalled: {0}")]
    Stalled(String),

    /// Drawing into the render surface failed
    #[error("Surface error: {0}")]
    Surface(String),

    /// Still-image encoding failed
    #[error("Encode error: {0}")]
    Encode(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("File error: {0}")]
    FileIO(#[from] std::io::Error),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error for unexpected situations
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<image::ImageError> for FlipbookError {
    fn from(err: image::ImageError) -> Self {
        FlipbookError::Encode(format!("image error: {}", err))
    }
}

impl From<serde_json::Error> for FlipbookError {
    fn from(err: serde_json::Error) -> Self {
        FlipbookError::Encode(format!("manifest error: {}", err))
    }
}

impl FlipbookError {
    /// True for failures that the caller should ride out rather than report
    pub fn is_transient(&self) -> bool {
        matches!(self, FlipbookError::TransientQuery(_) | FlipbookError::PauseFailed(_))
    }
}

/// Convenience type alias for Results in flipbook
pub type Result<T> = std::result::Result<T, FlipbookError>;

/// Extension trait for converting other errors to FlipbookError
pub trait IntoFlipbookError<T> {
    /// Convert this error into a FlipbookError with the given context
    fn surface_err(self, context: &str) -> Result<T>;
    fn encode_err(self, context: &str) -> Result<T>;
    fn config_err(self, context: &str) -> Result<T>;
}

impl<T, E: std::fmt::Display> IntoFlipbookError<T> for std::result::Result<T, E> {
    fn surface_err(self, context: &str) -> Result<T> {
        self.map_err(|e| FlipbookError::Surface(format!("{}: {}", context, e)))
    }

    fn encode_err(self, context: &str) -> Result<T> {
        self.map_err(|e| FlipbookError::Encode(format!("{}: {}", context, e)))
    }

    fn config_err(self, context: &str) -> Result<T> {
        self.map_err(|e| FlipbookError::Config(format!("{}: {}", context, e)))
    }
}

/// Helper macro for creating internal errors with file and line information
#[macro_export]
macro_rules! internal_error {
    ($msg:expr) => {
        $crate::utils::error::FlipbookError::Internal(
            format!("{} at {}:{}", $msg, file!(), line!())
        )
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::utils::error::FlipbookError::Internal(
            format!("{} at {}:{}", format!($fmt, $($arg)*), file!(), line!())
        )
    };
}
