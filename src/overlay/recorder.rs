//! Status sink that keeps what it was told

use super::StatusSink;
use log::info;

/// One recorded change to the overlay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayChange {
    Text(String),
    Visible(bool),
    Progress(u8),
}

/// In-process [`StatusSink`]: current state plus a change history.
/// Text changes are logged, so it doubles as the CLI's status display.
#[derive(Debug, Default)]
pub struct OverlayRecorder {
    text: String,
    visible: bool,
    progress: u8,
    history: Vec<OverlayChange>,
}

impl OverlayRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn history(&self) -> &[OverlayChange] {
        &self.history
    }

    /// Every text shown so far, oldest first
    pub fn texts(&self) -> Vec<&str> {
        self.history
            .iter()
            .filter_map(|change| match change {
                OverlayChange::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl StatusSink for OverlayRecorder {
    fn set_text(&mut self, text: &str) {
        if self.text != text {
            info!("[status] {}", text);
            self.text = text.to_string();
            self.history.push(OverlayChange::Text(self.text.clone()));
        }
    }

    fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            self.visible = visible;
            self.history.push(OverlayChange::Visible(visible));
        }
    }

    fn set_progress(&mut self, percent: u8) {
        if self.progress != percent {
            self.progress = percent;
            self.history.push(OverlayChange::Progress(percent));
        }
    }
}
