//! Application configuration.
//!
//! The config file is optional and read-only: snapper never writes it. Every
//! field has a default, and command-line flags override whatever is loaded.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::SnapperResult;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory snapshots are saved into.
    pub output_dir: PathBuf,

    /// Capture defaults.
    pub capture: CaptureDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default capture parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureDefaults {
    /// Initially selected output format, as a mime type or short name.
    /// Validated by the caller; an unknown value falls back to PNG.
    pub format: String,

    /// JPEG quality in `1..=100`.
    pub jpeg_quality: u8,

    /// Largest raster buffer (in pixels) a drawing context is handed out for.
    pub max_raster_pixels: u64,

    /// How long the media backend may take to preroll a newly opened video.
    pub load_timeout_secs: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "snapper=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path. Logs go to stderr when unset.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            capture: CaptureDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CaptureDefaults {
    fn default() -> Self {
        Self {
            format: "image/png".to_string(),
            jpeg_quality: 92,
            max_raster_pixels: 16_384 * 16_384,
            load_timeout_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &Path) -> Self {
        if !config_path.exists() {
            return Self::default();
        }
        match Self::read(config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                Self::default()
            }
        }
    }

    /// Read and parse a config file.
    pub fn read(config_path: &Path) -> SnapperResult<Self> {
        let content = std::fs::read_to_string(config_path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config.sanitized())
    }

    /// Clamp numeric settings into their valid ranges.
    fn sanitized(mut self) -> Self {
        self.capture.jpeg_quality = self.capture.jpeg_quality.clamp(1, 100);
        self.capture.load_timeout_secs = self.capture.load_timeout_secs.max(1);
        self
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("snapper").join("config.json")
}
