//! Still-image encoders.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};
use snapper_common::error::{SnapperError, SnapperResult};
use snapper_frame_model::format::ImageFormat;

/// Encoder knobs that do not depend on the requested format.
#[derive(Debug, Clone, Copy)]
pub struct EncoderSettings {
    /// JPEG quality in `1..=100`.
    pub jpeg_quality: u8,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self { jpeg_quality: 92 }
    }
}

/// Encode an RGBA image into `format`.
///
/// JPEG has no alpha channel, so the image is flattened to RGB first. WebP
/// is written lossless. An encoder that succeeds but writes nothing is
/// reported as an encode error.
pub fn encode_image(
    image: &RgbaImage,
    format: ImageFormat,
    settings: EncoderSettings,
) -> SnapperResult<Vec<u8>> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(SnapperError::encode("cannot encode an empty image"));
    }

    let mut bytes = Vec::new();
    let result = match format {
        ImageFormat::Png => PngEncoder::new(&mut bytes).write_image(
            image.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut bytes, settings.jpeg_quality.clamp(1, 100))
                .write_image(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
        }
        ImageFormat::Webp => WebPEncoder::new_lossless(&mut bytes).write_image(
            image.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        ),
    };

    result.map_err(|e| SnapperError::encode(format!("{} encoder failed: {e}", format.label())))?;

    if bytes.is_empty() {
        return Err(SnapperError::encode(format!(
            "{} encoder produced no data",
            format.label()
        )));
    }

    tracing::debug!(
        format = %format,
        width,
        height,
        bytes = bytes.len(),
        "Encoded snapshot"
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 7) as u8, (y * 11) as u8, 128, 255])
        })
    }

    #[test]
    fn test_png_signature() {
        let bytes = encode_image(&gradient(16, 9), ImageFormat::Png, EncoderSettings::default())
            .unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_jpeg_signature() {
        let bytes = encode_image(&gradient(16, 9), ImageFormat::Jpeg, EncoderSettings::default())
            .unwrap();
        assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_webp_container() {
        let bytes = encode_image(&gradient(16, 9), ImageFormat::Webp, EncoderSettings::default())
            .unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");
    }

    #[test]
    fn test_decoded_dimensions_match() {
        for format in ImageFormat::ALL {
            let bytes = encode_image(&gradient(33, 17), format, EncoderSettings::default())
                .unwrap();
            let decoded = image::load_from_memory(&bytes).unwrap();
            assert_eq!((decoded.width(), decoded.height()), (33, 17), "{format}");
        }
    }

    #[test]
    fn test_lower_quality_jpeg_is_smaller() {
        let img = gradient(64, 64);
        let high = encode_image(&img, ImageFormat::Jpeg, EncoderSettings { jpeg_quality: 100 })
            .unwrap();
        let low = encode_image(&img, ImageFormat::Jpeg, EncoderSettings { jpeg_quality: 10 })
            .unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_empty_image_is_encode_error() {
        let err = encode_image(&RgbaImage::new(0, 0), ImageFormat::Png, EncoderSettings::default())
            .unwrap_err();
        assert!(matches!(err, SnapperError::Encode { .. }));
    }
}
