//! Linear contrast adjustment.
//!
//! Every channel value `v` becomes `clamp(round(alpha * v + beta), 0, 255)`.
//! This runs before both quantization and mask building, so the palette
//! is computed from (and later matched against) the same adjusted colors.

use image::RgbImage;

use crate::types::PipelineError;

/// Apply a per-channel affine intensity remap.
///
/// `alpha = 1.0, beta = 0.0` is the identity. The input is not modified.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameter`] if `alpha` or `beta` is
/// not finite.
pub fn adjust_contrast(image: &RgbImage, alpha: f64, beta: f64) -> Result<RgbImage, PipelineError> {
    if !alpha.is_finite() || !beta.is_finite() {
        return Err(PipelineError::InvalidParameter(format!(
            "contrast alpha and beta must be finite (got alpha={alpha}, beta={beta})"
        )));
    }

    let lut = lookup_table(alpha, beta);
    let mut out = image.clone();
    for value in out.iter_mut() {
        *value = lut[usize::from(*value)];
    }
    Ok(out)
}

/// Precompute the remapped value for every possible input sample.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lookup_table(alpha: f64, beta: f64) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (v, slot) in (0u8..=255).zip(lut.iter_mut()) {
        let mapped = alpha.mul_add(f64::from(v), beta).round().clamp(0.0, 255.0);
        *slot = mapped as u8;
    }
    lut
}
