//! Binary dilation and erosion with a 3x3 elliptical structuring element.
//!
//! The 3x3 ellipse is the cross
//!
//! ```text
//! 0 1 0
//! 1 1 1
//! 0 1 0
//! ```
//!
//! and `n` repeated passes with it equal one pass with an L1 (diamond)
//! neighbourhood of radius `n`, which is what
//! [`imageproc::morphology`] computes via its distance transform.
//!
//! Pixels outside the image never count as foreground for dilation nor
//! as background for erosion, so a region touching the border keeps its
//! border pixels.
//!
//! In the contour pipeline dilation runs on the mask *before* tracing to
//! close small gaps, and erosion runs on the filled raster *after*
//! tracing to undo the growth. Swapping the two changes the output.

use image::{GrayImage, RgbImage};
use imageproc::distance_transform::Norm;

/// Largest radius applied in one operator call.
const MAX_RADIUS_PER_PASS: u32 = 254;

/// Grow foreground (non-zero) regions by `iterations` cross-shaped steps.
///
/// `iterations == 0` returns an unchanged copy.
#[must_use = "returns the dilated image"]
pub fn dilate(image: &GrayImage, iterations: u32) -> GrayImage {
    repeat(image, iterations, imageproc::morphology::dilate)
}

/// Shrink foreground (non-zero) regions by `iterations` cross-shaped steps.
///
/// `iterations == 0` returns an unchanged copy.
#[must_use = "returns the eroded image"]
pub fn erode(image: &GrayImage, iterations: u32) -> GrayImage {
    repeat(image, iterations, imageproc::morphology::erode)
}

/// Erode each channel of a color raster independently.
///
/// Channels are treated as binary (any non-zero value is foreground).
/// Used on the filled contour canvas, where every foreground pixel has
/// the same fill color.
#[must_use = "returns the eroded image"]
pub fn erode_rgb(image: &RgbImage, iterations: u32) -> RgbImage {
    if iterations == 0 {
        return image.clone();
    }
    let channels: Vec<GrayImage> = (0..3)
        .map(|ch| {
            let plane = GrayImage::from_fn(image.width(), image.height(), |x, y| {
                image::Luma([image.get_pixel(x, y).0[ch]])
            });
            erode(&plane, iterations)
        })
        .collect();
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        image::Rgb([
            channels[0].get_pixel(x, y).0[0],
            channels[1].get_pixel(x, y).0[0],
            channels[2].get_pixel(x, y).0[0],
        ])
    })
}

/// Apply an L1-radius operator for `iterations` steps in total.
///
/// The distance transform saturates at 255, so a single call only stays
/// exact for radii below that; larger counts are split into chunks.
fn repeat(image: &GrayImage, iterations: u32, op: fn(&GrayImage, Norm, u8) -> GrayImage) -> GrayImage {
    if iterations == 0 {
        return image.clone();
    }
    let mut out = binarize(image);
    let mut remaining = iterations;
    while remaining > 0 {
        let step = u8::try_from(remaining.min(MAX_RADIUS_PER_PASS)).unwrap_or(u8::MAX - 1);
        out = op(&out, Norm::L1, step);
        remaining -= u32::from(step);
    }
    out
}

/// Map every non-zero value to 255 so operator output stays binary.
fn binarize(image: &GrayImage) -> GrayImage {
    let mut out = image.clone();
    for v in out.iter_mut() {
        if *v != 0 {
            *v = 255;
        }
    }
    out
}
