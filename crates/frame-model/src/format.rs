//! Still-image output formats.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A supported snapshot format.
///
/// This is the only way a format reaches the capture pipeline, so an
/// unrecognized mime type is rejected at parse time rather than at encode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageFormat {
    #[default]
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/webp")]
    Webp,
}

/// Error returned when a string names no supported format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported image format `{0}` (expected one of: image/png, image/jpeg, image/webp)")]
pub struct UnknownFormat(pub String);

impl ImageFormat {
    /// All supported formats, in menu order.
    pub const ALL: [ImageFormat; 3] = [ImageFormat::Png, ImageFormat::Jpeg, ImageFormat::Webp];

    /// Mime type, e.g. `image/webp`.
    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Webp => "image/webp",
        }
    }

    /// File extension without the dot. This is the mime subtype.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Webp => "webp",
        }
    }

    /// Short upper-case label for menus (`PNG`, `JPEG`, `WEBP`).
    pub fn label(self) -> &'static str {
        match self {
            ImageFormat::Png => "PNG",
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Webp => "WEBP",
        }
    }

    /// Whether encoded output keeps an alpha channel.
    pub fn supports_alpha(self) -> bool {
        !matches!(self, ImageFormat::Jpeg)
    }

    /// Name the download sink receives for a snapshot in this format.
    pub fn snapshot_filename(self) -> String {
        format!("snapshot.{}", self.extension())
    }

    /// Look a format up by exact mime type.
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.mime_type() == mime)
    }
}

impl FromStr for ImageFormat {
    type Err = UnknownFormat;

    /// Accepts mime types and short names, case-insensitively:
    /// `image/png`, `png`, `image/jpeg`, `jpeg`, `jpg`, `image/webp`, `webp`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let name = normalized
            .strip_prefix("image/")
            .unwrap_or(normalized.as_str());
        match name {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "webp" => Ok(ImageFormat::Webp),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}
