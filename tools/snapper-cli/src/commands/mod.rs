pub mod formats;
pub mod interactive;
pub mod probe;
pub mod snap;

use std::path::PathBuf;
use std::sync::Arc;

use snapper_capture_engine::encode::EncoderSettings;
use snapper_capture_engine::{GstSurfaceLoader, PipelineSettings, SessionSettings};
use snapper_common::config::AppConfig;
use snapper_frame_model::format::ImageFormat;

/// The format a session starts with: the flag if given, else the config
/// value, else PNG.
pub fn resolve_format(flag: Option<&str>, config: &AppConfig) -> anyhow::Result<ImageFormat> {
    if let Some(flag) = flag {
        return Ok(flag.parse::<ImageFormat>()?);
    }
    match config.capture.format.parse::<ImageFormat>() {
        Ok(format) => Ok(format),
        Err(e) => {
            tracing::warn!(configured = %config.capture.format, error = %e, "Falling back to PNG");
            Ok(ImageFormat::Png)
        }
    }
}

/// Parse a playhead position in seconds. Infinities and NaN are refused.
pub fn parse_seconds(value: &str) -> Result<f64, String> {
    match value.trim().parse::<f64>() {
        Ok(secs) if secs.is_finite() => Ok(secs),
        Ok(_) => Err(format!("`{value}` is not a finite number of seconds")),
        Err(e) => Err(format!("`{value}` is not a number of seconds: {e}")),
    }
}

pub fn session_settings(config: &AppConfig, format: ImageFormat) -> SessionSettings {
    SessionSettings {
        format,
        pipeline: PipelineSettings {
            max_raster_pixels: config.capture.max_raster_pixels,
            encoder: EncoderSettings {
                jpeg_quality: config.capture.jpeg_quality,
            },
        },
    }
}

pub fn loader(config: &AppConfig) -> Arc<GstSurfaceLoader> {
    Arc::new(GstSurfaceLoader::new(config.capture.load_timeout_secs))
}

pub fn output_dir(flag: Option<PathBuf>, config: &AppConfig) -> PathBuf {
    flag.unwrap_or_else(|| config.output_dir.clone())
}
