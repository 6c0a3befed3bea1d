//! Image decoding and luminance conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the
//! 3-channel raster every pipeline stage consumes. Alpha is discarded.

use image::{GrayImage, Luma, RgbImage};

use crate::types::PipelineError;

/// Decode raw image bytes into an RGB raster.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty or the
/// decoded image has no pixels.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let rgb = image::load_from_memory(bytes)?.to_rgb8();
    if rgb.width() == 0 || rgb.height() == 0 {
        return Err(PipelineError::EmptyInput);
    }
    Ok(rgb)
}

/// Convert an RGB raster to single-channel luminance.
///
/// Uses the Rec.601 weights `0.299 R + 0.587 G + 0.114 B`, rounded to
/// the nearest integer. `image::imageops::grayscale` uses Rec.709, which
/// darkens saturated reds noticeably and shifts the Otsu level.
#[must_use = "returns the luminance image"]
pub fn to_luma(image: &RgbImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b] = image.get_pixel(x, y).0;
        Luma([rec601(r, g, b)])
    })
}

/// Fixed-point Rec.601 luma, rounded half up.
fn rec601(r: u8, g: u8, b: u8) -> u8 {
    let weighted = 299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b);
    // Weights sum to 1000, so the quotient is at most 255.
    u8::try_from((weighted + 500) / 1000).unwrap_or(u8::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Helper: encode an RGBA image as a PNG byte buffer.
    fn encode_png(img: &image::RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn empty_input_returns_error() {
        let result = decode_rgb(&[]);
        assert!(matches!(result, Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode_rgb(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn valid_png_decodes_to_rgb() {
        let img = image::RgbaImage::from_fn(3, 2, |x, _| image::Rgba([x as u8 * 10, 20, 30, 128]));
        let rgb = decode_rgb(&encode_png(&img)).unwrap();
        assert_eq!(rgb.dimensions(), (3, 2));
        assert_eq!(rgb.get_pixel(2, 1).0, [20, 20, 30]);
    }

    #[test]
    fn luma_orders_channels_by_weight() {
        let img = RgbImage::from_fn(3, 1, |x, _| match x {
            0 => image::Rgb([255, 0, 0]),
            1 => image::Rgb([0, 255, 0]),
            _ => image::Rgb([0, 0, 255]),
        });
        let gray = to_luma(&img);
        let r = gray.get_pixel(0, 0).0[0];
        let g = gray.get_pixel(1, 0).0[0];
        let b = gray.get_pixel(2, 0).0[0];
        assert!(g > r && r > b, "expected green > red > blue, got R={r} G={g} B={b}");
    }

    #[test]
    fn luma_uses_rec601_weights() {
        let img = RgbImage::from_fn(5, 1, |x, _| match x {
            0 => image::Rgb([255, 0, 0]),
            1 => image::Rgb([0, 255, 0]),
            2 => image::Rgb([0, 0, 255]),
            3 => image::Rgb([255, 255, 255]),
            _ => image::Rgb([100, 150, 200]),
        });
        let gray = to_luma(&img);
        let values: Vec<u8> = gray.pixels().map(|p| p.0[0]).collect();
        // 0.299 * 100 + 0.587 * 150 + 0.114 * 200 = 140.75
        assert_eq!(values, vec![76, 150, 29, 255, 141]);
    }
}
