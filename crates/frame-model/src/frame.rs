//! Decoded video frames and stream metadata.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Byte layout of one pixel in a decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelLayout {
    Rgba8,
    Rgb8,
    Bgra8,
    /// BGR with an unused padding byte.
    Bgrx8,
}

impl PixelLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelLayout::Rgb8 => 3,
            PixelLayout::Rgba8 | PixelLayout::Bgra8 | PixelLayout::Bgrx8 => 4,
        }
    }

    fn to_rgba(self, px: &[u8]) -> [u8; 4] {
        match self {
            PixelLayout::Rgba8 => [px[0], px[1], px[2], px[3]],
            PixelLayout::Rgb8 => [px[0], px[1], px[2], 255],
            PixelLayout::Bgra8 => [px[2], px[1], px[0], px[3]],
            PixelLayout::Bgrx8 => [px[2], px[1], px[0], 255],
        }
    }
}

/// A single decoded frame as handed over by a playback surface.
///
/// Rows may be padded: `stride` is the distance in bytes between the start
/// of consecutive rows and is at least `width * bytes_per_pixel`.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub layout: PixelLayout,
    pub data: Vec<u8>,
}

impl VideoFrame {
    /// Build a frame with tightly packed rows.
    pub fn packed(width: u32, height: u32, layout: PixelLayout, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            stride: width as usize * layout.bytes_per_pixel(),
            layout,
            data,
        }
    }

    /// A frame filled with one RGBA colour. Handy for tests and placeholders.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self::packed(width, height, PixelLayout::Rgba8, data)
    }

    /// Whether the data buffer is large enough for the declared geometry.
    pub fn is_well_formed(&self) -> bool {
        let row_bytes = self.width as usize * self.layout.bytes_per_pixel();
        if self.stride < row_bytes {
            return false;
        }
        if self.height == 0 {
            return true;
        }
        let needed = self.stride * (self.height as usize - 1) + row_bytes;
        self.data.len() >= needed
    }

    /// Normalize to a packed RGBA8 image. Returns `None` for a malformed frame.
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        if !self.is_well_formed() {
            return None;
        }
        if self.width == 0 || self.height == 0 {
            return Some(RgbaImage::new(self.width, self.height));
        }
        let bpp = self.layout.bytes_per_pixel();
        let row_bytes = self.width as usize * bpp;

        if self.layout == PixelLayout::Rgba8 && self.stride == row_bytes {
            let len = row_bytes * self.height as usize;
            return RgbaImage::from_raw(self.width, self.height, self.data[..len].to_vec());
        }

        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for row in self.data.chunks(self.stride).take(self.height as usize) {
            for px in row[..row_bytes].chunks_exact(bpp) {
                out.extend_from_slice(&self.layout.to_rgba(px));
            }
        }
        RgbaImage::from_raw(self.width, self.height, out)
    }
}

/// What the playback surface knows once metadata has been decoded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Intrinsic (decoded) width in pixels.
    pub width: u32,
    /// Intrinsic (decoded) height in pixels.
    pub height: u32,
    /// Stream duration, when the container reports one.
    pub duration_secs: Option<f64>,
}

impl VideoMetadata {
    /// Whether the stream has a drawable picture.
    pub fn has_picture(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}
