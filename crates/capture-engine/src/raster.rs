//! Offscreen raster buffer that frames are drawn into before encoding.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use snapper_common::error::{SnapperError, SnapperResult};
use snapper_frame_model::frame::VideoFrame;

/// An RGBA8 pixel grid owned by the capture pipeline and reused across
/// captures. Its contents are only meaningful right after a draw.
#[derive(Debug)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    max_pixels: u64,
}

impl RasterBuffer {
    /// An empty buffer that refuses contexts larger than `max_pixels`.
    pub fn new(max_pixels: u64) -> Self {
        Self {
            width: 0,
            height: 0,
            pixels: Vec::new(),
            max_pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Set new dimensions. Like resizing a canvas, this discards the
    /// previous contents; storage is (re)allocated when a context is taken.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
    }

    /// Acquire a drawing context for the current dimensions.
    ///
    /// Returns `None` for a zero-area buffer, for one above the pixel
    /// ceiling, or when the backing storage cannot be allocated.
    pub fn context(&mut self) -> Option<DrawContext<'_>> {
        let area = u64::from(self.width) * u64::from(self.height);
        if area == 0 || area > self.max_pixels {
            tracing::debug!(
                width = self.width,
                height = self.height,
                max_pixels = self.max_pixels,
                "Refusing drawing context"
            );
            return None;
        }
        let len = usize::try_from(area.checked_mul(4)?).ok()?;
        if self.pixels.len() != len {
            self.pixels.clear();
            if let Err(e) = self.pixels.try_reserve_exact(len) {
                tracing::warn!(bytes = len, error = %e, "Raster allocation failed");
                return None;
            }
            self.pixels.resize(len, 0);
        }
        Some(DrawContext { buffer: self })
    }

    /// Copy the current contents out as an image. `None` until a context has
    /// been taken for the current dimensions.
    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels.clone())
            .filter(|_| !self.pixels.is_empty())
    }
}

/// A 2D drawing context borrowed from a [`RasterBuffer`].
pub struct DrawContext<'a> {
    buffer: &'a mut RasterBuffer,
}

impl DrawContext<'_> {
    /// Fill the whole buffer with one colour.
    pub fn clear(&mut self, rgba: [u8; 4]) {
        for px in self.buffer.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Draw `frame` into the rectangle at (`dx`, `dy`) of size `dw` × `dh`.
    ///
    /// The frame is scaled to the destination size when the two differ; parts
    /// of the rectangle outside the buffer are clipped.
    pub fn draw_frame(
        &mut self,
        frame: &VideoFrame,
        dx: i64,
        dy: i64,
        dw: u32,
        dh: u32,
    ) -> SnapperResult<()> {
        if dw == 0 || dh == 0 {
            return Ok(());
        }
        let source = frame.to_rgba_image().ok_or_else(|| {
            SnapperError::unknown(format!(
                "frame data does not match its {}x{} {:?} geometry",
                frame.width, frame.height, frame.layout
            ))
        })?;
        if source.width() == 0 || source.height() == 0 {
            return Err(SnapperError::unknown("frame has no pixels"));
        }

        let scaled = if source.dimensions() == (dw, dh) {
            source
        } else {
            imageops::resize(&source, dw, dh, FilterType::Triangle)
        };

        let (width, height) = (self.buffer.width, self.buffer.height);
        let pixels = std::mem::take(&mut self.buffer.pixels);
        let mut target = RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| SnapperError::context("raster storage does not match its size"))?;
        imageops::replace(&mut target, &scaled, dx, dy);
        self.buffer.pixels = target.into_raw();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use snapper_frame_model::frame::PixelLayout;

    #[test]
    fn test_zero_area_has_no_context() {
        let mut buffer = RasterBuffer::new(1 << 20);
        assert!(buffer.context().is_none());
        buffer.resize(640, 0);
        assert!(buffer.context().is_none());
    }

    #[test]
    fn test_pixel_ceiling_refuses_context() {
        let mut buffer = RasterBuffer::new(100);
        buffer.resize(10, 11);
        assert!(buffer.context().is_none());
        buffer.resize(10, 10);
        assert!(buffer.context().is_some());
    }

    #[test]
    fn test_draw_covers_full_buffer() {
        let mut buffer = RasterBuffer::new(1 << 20);
        buffer.resize(4, 3);
        let frame = VideoFrame::solid(4, 3, [200, 100, 50, 255]);
        {
            let mut ctx = buffer.context().unwrap();
            ctx.clear([0, 0, 0, 0]);
            ctx.draw_frame(&frame, 0, 0, 4, 3).unwrap();
        }
        let img = buffer.to_image().unwrap();
        assert!(img.pixels().all(|p| p.0 == [200, 100, 50, 255]));
    }

    #[test]
    fn test_draw_scales_to_destination() {
        let mut buffer = RasterBuffer::new(1 << 20);
        buffer.resize(8, 8);
        let frame = VideoFrame::packed(2, 2, PixelLayout::Rgb8, vec![9; 12]);
        buffer
            .context()
            .unwrap()
            .draw_frame(&frame, 0, 0, 8, 8)
            .unwrap();
        let img = buffer.to_image().unwrap();
        assert_eq!(img.dimensions(), (8, 8));
        assert_eq!(img.get_pixel(7, 7).0, [9, 9, 9, 255]);
    }

    #[test]
    fn test_draw_clips_offset_rectangle() {
        let mut buffer = RasterBuffer::new(1 << 20);
        buffer.resize(4, 4);
        let frame = VideoFrame::solid(4, 4, [1, 1, 1, 255]);
        buffer
            .context()
            .unwrap()
            .draw_frame(&frame, 2, 2, 4, 4)
            .unwrap();
        let img = buffer.to_image().unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(img.get_pixel(3, 3).0, [1, 1, 1, 255]);
    }

    #[test]
    fn test_malformed_frame_is_rejected() {
        let mut buffer = RasterBuffer::new(1 << 20);
        buffer.resize(4, 4);
        let frame = VideoFrame::packed(4, 4, PixelLayout::Rgba8, vec![0; 3]);
        let err = buffer
            .context()
            .unwrap()
            .draw_frame(&frame, 0, 0, 4, 4)
            .unwrap_err();
        assert!(err.to_string().contains("geometry"));
    }

    proptest! {
        #[test]
        fn prop_context_storage_matches_dimensions(w in 1u32..64, h in 1u32..64) {
            let mut buffer = RasterBuffer::new(1 << 20);
            buffer.resize(w, h);
            prop_assert!(buffer.context().is_some());
            let img = buffer.to_image().unwrap();
            prop_assert_eq!(img.dimensions(), (w, h));
        }
    }
}
