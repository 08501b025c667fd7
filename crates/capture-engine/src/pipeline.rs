//! The capture pipeline: current frame in, encoded still out.
//!
//! A capture runs in two halves. [`CapturePipeline::begin`] sizes the raster
//! buffer to the surface's intrinsic dimensions and draws the current frame
//! into it; this is quick and happens on the caller's thread.
//! [`PendingEncode::finish`] runs the encoder on the blocking pool. Splitting
//! the two lets a session keep a capture "in flight" while the encode runs.
//!
//! Failures never escape as errors: both halves produce
//! [`CaptureResult::Failure`] values. There are no retries.

use image::RgbaImage;
use snapper_frame_model::capture::{CaptureFailure, CaptureResult, EncodedImage, FailureKind};
use snapper_frame_model::format::ImageFormat;

use crate::encode::{encode_image, EncoderSettings};
use crate::raster::RasterBuffer;
use crate::surface::VideoSurface;

/// Pipeline tuning.
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    /// Largest raster buffer, in pixels, a drawing context is handed out for.
    pub max_raster_pixels: u64,
    pub encoder: EncoderSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_raster_pixels: 16_384 * 16_384,
            encoder: EncoderSettings::default(),
        }
    }
}

/// Snapshots the current frame of a surface. Owns one raster buffer that is
/// resized on every capture.
#[derive(Debug)]
pub struct CapturePipeline {
    buffer: RasterBuffer,
    settings: PipelineSettings,
}

impl CapturePipeline {
    pub fn new(settings: PipelineSettings) -> Self {
        Self {
            buffer: RasterBuffer::new(settings.max_raster_pixels),
            settings,
        }
    }

    /// Size and draw: steps one and two of a capture.
    pub fn begin(
        &mut self,
        surface: &dyn VideoSurface,
        format: ImageFormat,
    ) -> Result<PendingEncode, CaptureFailure> {
        let (width, height) = surface.intrinsic_size();
        self.buffer.resize(width, height);

        let mut ctx = self.buffer.context().ok_or_else(|| {
            CaptureFailure::new(
                FailureKind::NoRenderContext,
                format!("Could not get a drawing context for a {width}x{height} frame"),
            )
        })?;

        let frame = surface
            .current_frame()
            .map_err(|e| CaptureFailure::new(FailureKind::Unknown, e.detail()))?;
        ctx.draw_frame(&frame, 0, 0, width, height)
            .map_err(|e| CaptureFailure::new(FailureKind::Unknown, e.detail()))?;

        let image = self.buffer.to_image().ok_or_else(|| {
            CaptureFailure::new(
                FailureKind::NoRenderContext,
                "Raster buffer lost its contents after drawing",
            )
        })?;

        tracing::debug!(
            width,
            height,
            format = %format,
            frame_width = frame.width,
            frame_height = frame.height,
            "Frame rasterized"
        );

        Ok(PendingEncode {
            image,
            format,
            settings: self.settings.encoder,
        })
    }

    /// Run a whole capture: begin, then encode on the blocking pool.
    pub async fn capture(&mut self, surface: &dyn VideoSurface, format: ImageFormat) -> CaptureResult {
        match self.begin(surface, format) {
            Ok(pending) => pending.finish().await,
            Err(failure) => failure.into(),
        }
    }

    /// Dimensions the raster buffer was last sized to.
    pub fn buffer_size(&self) -> (u32, u32) {
        (self.buffer.width(), self.buffer.height())
    }
}

impl Default for CapturePipeline {
    fn default() -> Self {
        Self::new(PipelineSettings::default())
    }
}

/// A rasterized frame waiting to be encoded.
#[derive(Debug)]
pub struct PendingEncode {
    image: RgbaImage,
    format: ImageFormat,
    settings: EncoderSettings,
}

impl PendingEncode {
    /// Encode on the current thread.
    pub fn finish_blocking(self) -> CaptureResult {
        let (width, height) = self.image.dimensions();
        match encode_image(&self.image, self.format, self.settings) {
            Ok(bytes) => CaptureResult::Success(EncodedImage {
                bytes,
                format: self.format,
                width,
                height,
            }),
            Err(e) => CaptureResult::failure(FailureKind::EncodeFailure, e.detail()),
        }
    }

    /// Encode on tokio's blocking pool.
    pub async fn finish(self) -> CaptureResult {
        match tokio::task::spawn_blocking(move || self.finish_blocking()).await {
            Ok(result) => result,
            Err(e) => CaptureResult::failure(
                FailureKind::Unknown,
                format!("Encode task did not complete: {e}"),
            ),
        }
    }
}
