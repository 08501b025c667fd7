//! Outcome of a single capture request.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::format::ImageFormat;

/// Why a capture produced no image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The raster buffer could not provide a drawing context.
    NoRenderContext,
    /// The encode step yielded no data.
    EncodeFailure,
    /// Anything else, e.g. the surface had no frame or the encode task died.
    Unknown,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::NoRenderContext => "no_render_context",
            FailureKind::EncodeFailure => "encode_failure",
            FailureKind::Unknown => "unknown",
        })
    }
}

/// A failed capture: its kind plus a human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFailure {
    pub kind: FailureKind,
    pub detail: String,
}

impl CaptureFailure {
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for CaptureFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl std::error::Error for CaptureFailure {}

/// Encoded image bytes ready to hand to a sink.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("bytes", &self.bytes.len())
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Result of one capture attempt. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureResult {
    Success(EncodedImage),
    Failure(CaptureFailure),
}

impl CaptureResult {
    pub fn is_success(&self) -> bool {
        matches!(self, CaptureResult::Success(_))
    }

    pub fn failure(kind: FailureKind, detail: impl Into<String>) -> Self {
        CaptureResult::Failure(CaptureFailure::new(kind, detail))
    }
}

impl From<CaptureFailure> for CaptureResult {
    fn from(failure: CaptureFailure) -> Self {
        CaptureResult::Failure(failure)
    }
}

impl From<Result<EncodedImage, CaptureFailure>> for CaptureResult {
    fn from(result: Result<EncodedImage, CaptureFailure>) -> Self {
        match result {
            Ok(image) => CaptureResult::Success(image),
            Err(failure) => CaptureResult::Failure(failure),
        }
    }
}
