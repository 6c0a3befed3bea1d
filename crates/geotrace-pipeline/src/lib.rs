//! geotrace-pipeline: Pure color-to-contour pipeline (sans-IO).
//!
//! Extracts region outlines from a raster image in two steps:
//!
//! 1. [`quantize`] finds the image's dominant colors.
//! 2. [`build_contour_raster`] keeps the pixels nearest to the colors the
//!    user selected, cleans the mask, traces the outer boundary of every
//!    region and returns the regions drawn solid.
//!
//! [`trace_raw_contours`] is an independent path that traces an Otsu
//! binarization of the image. The transform functions map traced
//! contours from pixel space into a reference space (for example map
//! coordinates) from point correspondences.
//!
//! This crate has **no I/O dependencies**: it operates on in-memory
//! rasters and returns structured data. File handling lives in
//! `geotrace-cli`.
//!
//! ```
//! use geotrace_pipeline::{Color, ContourConfig, QuantizeConfig, RgbImage};
//!
//! # fn main() -> Result<(), geotrace_pipeline::PipelineError> {
//! let image = RgbImage::from_fn(4, 4, |x, _| {
//!     if x < 2 { image::Rgb([255, 0, 0]) } else { image::Rgb([0, 0, 255]) }
//! });
//! let quantized = geotrace_pipeline::quantize(
//!     &image,
//!     &QuantizeConfig { clusters: 2, ..QuantizeConfig::default() },
//! )?;
//! let raster = geotrace_pipeline::build_contour_raster(
//!     &image,
//!     &quantized.palette,
//!     &[Color::new(255, 0, 0)],
//!     &ContourConfig::default(),
//! )?;
//! assert_eq!(raster.get_pixel(0, 0).0, [0, 255, 0]);
//! # Ok(())
//! # }
//! ```

pub mod contour;
pub mod contrast;
pub mod decode;
pub mod diagnostics;
pub mod mask;
pub mod morphology;
pub mod quantize;
pub mod raster;
pub mod threshold;
pub mod transform;
pub mod types;

pub use contour::ContourApproximation;
pub use quantize::{Quantized, quantize};
pub use raster::{ContourRasterStages, build_contour_raster, build_contour_raster_staged};
pub use transform::{HomographyMethod, RansacConfig, Transform};
pub use types::{
    Color, Contour, ContourConfig, Dimensions, EraseRect, GrayImage, Palette, PipelineError,
    Point, PointPair, QuantizeConfig, RgbImage,
};

/// Trace the outlines of an image's bright regions without any palette.
///
/// The image is reduced to luminance, binarized at its Otsu level
/// (pixels strictly above the level are foreground) and the external
/// boundary of every foreground region is traced with simple vertex
/// reduction. No area filter is applied.
#[must_use = "returns the traced contours"]
pub fn trace_raw_contours(image: &RgbImage) -> Vec<Contour> {
    let gray = decode::to_luma(image);
    let (binary, _) = threshold::otsu_binarize(&gray);
    contour::trace_external(&binary, ContourApproximation::Simple)
}

/// Map contours through a homography fitted to `pairs`.
///
/// Four pairs give an exact fit, more pairs a least-squares fit.
///
/// # Errors
///
/// See [`transform::estimate_homography`].
pub fn transform_contours_projective(
    contours: &[Contour],
    pairs: &[PointPair],
) -> Result<Vec<Contour>, PipelineError> {
    let h = transform::estimate_homography(pairs, HomographyMethod::LeastSquares)?;
    Ok(Transform::Projective(h).apply_contours(contours))
}

/// Map contours through the affine transform fixed by the first three
/// pairs. Further pairs are ignored.
///
/// # Errors
///
/// See [`transform::estimate_affine`].
pub fn transform_contours_affine(
    contours: &[Contour],
    pairs: &[PointPair],
) -> Result<Vec<Contour>, PipelineError> {
    let m = transform::estimate_affine(pairs)?;
    Ok(Transform::Affine(m).apply_contours(contours))
}
