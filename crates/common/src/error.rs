//! Error types shared across snapper crates.

use std::path::PathBuf;

/// Top-level error type for snapper operations.
#[derive(Debug, thiserror::Error)]
pub enum SnapperError {
    /// The video surface failed to decode or load.
    #[error("Load error: {message}")]
    Load { message: String },

    /// The raster buffer could not provide a drawing context.
    #[error("Drawing context unavailable: {message}")]
    Context { message: String },

    /// The encoder produced no output.
    #[error("Encode error: {message}")]
    Encode { message: String },

    /// A failure that fits no other category, caught at a boundary.
    #[error("Unknown error: {message}")]
    Unknown { message: String },

    /// A failure while regenerating the view.
    #[error("Render error: {message}")]
    Render { message: String },

    /// Play, pause or seek was refused by the media backend.
    #[error("Playback error: {message}")]
    Playback { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using SnapperError.
pub type SnapperResult<T> = Result<T, SnapperError>;

impl SnapperError {
    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load {
            message: msg.into(),
        }
    }

    pub fn context(msg: impl Into<String>) -> Self {
        Self::Context {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback {
            message: msg.into(),
        }
    }

    /// The bare message without the category prefix, for user-facing text.
    pub fn detail(&self) -> String {
        match self {
            Self::Load { message }
            | Self::Context { message }
            | Self::Encode { message }
            | Self::Unknown { message }
            | Self::Render { message }
            | Self::Playback { message } => message.clone(),
            other => other.to_string(),
        }
    }
}
