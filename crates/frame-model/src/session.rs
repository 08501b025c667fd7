//! Read-only view of session state.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::format::ImageFormat;
use crate::frame::VideoMetadata;

/// Coarse phase of a session, as shown to a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// No video selected yet.
    Empty,
    /// A video was selected and its metadata is being decoded.
    Loading,
    /// Idle with a video (which may have failed to load).
    Ready,
    /// A capture is in flight.
    Capturing,
}

/// A copy of the session state at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    /// Locator of the current video source, e.g. `media-source:3`.
    pub source: Option<String>,
    pub selected_format: ImageFormat,
    pub loaded: bool,
    pub capturing: bool,
    pub captured: bool,
    pub error_message: Option<String>,
    pub metadata: Option<VideoMetadata>,
    /// Where the most recent snapshot was saved.
    pub last_output: Option<PathBuf>,
}

impl SessionSnapshot {
    /// State of a session that has not seen any input.
    pub fn initial(format: ImageFormat) -> Self {
        Self {
            phase: SessionPhase::Empty,
            source: None,
            selected_format: format,
            loaded: false,
            capturing: false,
            captured: false,
            error_message: None,
            metadata: None,
            last_output: None,
        }
    }

    /// Neither loading nor capturing: nothing is pending.
    pub fn is_settled(&self) -> bool {
        self.phase != SessionPhase::Loading && !self.capturing
    }
}
