//! The selective contour-raster path, run as one call.
//!
//! contrast -> classify + select + erase -> dilate -> trace -> area
//! filter -> fill -> erode
//!
//! The morphology order is fixed: dilation acts on the mask before
//! tracing, erosion on the filled raster after it. The stage sequence
//! itself lives in
//! [`build_contour_raster_with_diagnostics`]; the functions here run it
//! without a clock.

use image::{GrayImage, RgbImage};

use crate::diagnostics::{NoClock, build_contour_raster_with_diagnostics};
use crate::types::{Color, Contour, ContourConfig, Palette, PipelineError};

/// Every intermediate of one contour-raster run.
#[derive(Debug, Clone)]
pub struct ContourRasterStages {
    /// Contrast-adjusted input.
    pub adjusted: RgbImage,
    /// Selection mask after erasures.
    pub mask: GrayImage,
    /// Mask after dilation.
    pub dilated: GrayImage,
    /// External contours that passed the area filter.
    pub contours: Vec<Contour>,
    /// Contours drawn solid on a black canvas.
    pub filled: RgbImage,
    /// Filled canvas after erosion. This is the final output.
    pub eroded: RgbImage,
}

/// Run the full contour-raster path and keep every intermediate.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameter`] if the contrast parameters
/// are not finite.
pub fn build_contour_raster_staged(
    image: &RgbImage,
    palette: &Palette,
    selected: &[Color],
    config: &ContourConfig,
) -> Result<ContourRasterStages, PipelineError> {
    let (stages, _) = build_contour_raster_with_diagnostics(image, palette, selected, config, &NoClock)?;
    Ok(stages)
}

/// Run the full contour-raster path and return the final raster.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameter`] if the contrast parameters
/// are not finite.
pub fn build_contour_raster(
    image: &RgbImage,
    palette: &Palette,
    selected: &[Color],
    config: &ContourConfig,
) -> Result<RgbImage, PipelineError> {
    Ok(build_contour_raster_staged(image, palette, selected, config)?.eroded)
}
