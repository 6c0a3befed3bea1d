//! Color quantization with seeded mini-batch k-means.
//!
//! The palette offered to the user is the set of cluster centers of all
//! (contrast-adjusted) pixel colors. Clustering follows the usual
//! mini-batch scheme:
//!
//! 1. k-means++ seeding over an initialisation sample.
//! 2. Repeated steps: draw a batch with replacement, assign each sample to
//!    its nearest center, move each touched center toward the batch mean
//!    with a per-center learning rate of `1 / count`.
//! 3. Stop when the smoothed batch inertia has not improved for
//!    `max_no_improvement` steps, when the optional center-shift tolerance
//!    is reached, or when the step budget runs out.
//!
//! Every random draw comes from one `StdRng` seeded with `config.seed`,
//! so identical pixels in identical order give an identical palette.
//! Reordering pixels changes which batches are drawn and may change the
//! result; that is an accepted property of mini-batch clustering.

use image::RgbImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::contrast::adjust_contrast;
use crate::mask::nearest_index;
use crate::types::{Color, Palette, PipelineError, QuantizeConfig};

type Sample = [f64; 3];

/// Output of [`quantize`].
#[derive(Debug, Clone)]
pub struct Quantized {
    /// The contrast-adjusted image the palette was computed from.
    pub adjusted: RgbImage,
    /// Representative colors, at most `config.clusters` of them.
    pub palette: Palette,
    /// Number of mini-batch steps run before stopping.
    pub steps: usize,
}

/// Contrast-adjust an image and compute its dominant colors.
///
/// The palette may hold fewer than `config.clusters` colors: centers that
/// end up owning no pixel (for example when the image has fewer distinct
/// colors than requested) are dropped, keeping the order of the rest.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] for an image with no pixels.
/// Returns [`PipelineError::InvalidParameter`] if `clusters` is zero or
/// exceeds the pixel count, if `batch_size` is zero, or if the contrast
/// parameters are not finite.
pub fn quantize(image: &RgbImage, config: &QuantizeConfig) -> Result<Quantized, PipelineError> {
    let adjusted = adjust_contrast(image, config.contrast_alpha, config.contrast_beta)?;
    let (palette, steps) = cluster_colors(&adjusted, config)?;
    Ok(Quantized {
        adjusted,
        palette,
        steps,
    })
}

/// Cluster the pixel colors of an already-adjusted image.
///
/// Returns the palette and the number of mini-batch steps that ran.
///
/// # Errors
///
/// Same parameter checks as [`quantize`].
pub fn cluster_colors(
    image: &RgbImage,
    config: &QuantizeConfig,
) -> Result<(Palette, usize), PipelineError> {
    let samples: Vec<Sample> = image
        .pixels()
        .map(|p| [f64::from(p.0[0]), f64::from(p.0[1]), f64::from(p.0[2])])
        .collect();
    validate(samples.len(), config)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut centers = kmeans_plus_plus(&samples, config, &mut rng);
    let steps = run_mini_batches(&samples, &mut centers, config, &mut rng);

    let rounded: Vec<Color> = centers.iter().map(|c| to_color(*c)).collect();
    Ok((drop_unowned(image, rounded), steps))
}

fn validate(n_samples: usize, config: &QuantizeConfig) -> Result<(), PipelineError> {
    if n_samples == 0 {
        return Err(PipelineError::EmptyInput);
    }
    if config.clusters == 0 {
        return Err(PipelineError::InvalidParameter(
            "cluster count must be at least 1".to_string(),
        ));
    }
    if config.clusters > n_samples {
        return Err(PipelineError::InvalidParameter(format!(
            "cluster count {} exceeds pixel count {n_samples}",
            config.clusters
        )));
    }
    if config.batch_size == 0 {
        return Err(PipelineError::InvalidParameter(
            "batch size must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// k-means++ seeding over a sample of at most `max(3 * batch, 3 * k)` points.
fn kmeans_plus_plus(samples: &[Sample], config: &QuantizeConfig, rng: &mut StdRng) -> Vec<Sample> {
    let n = samples.len();
    let init_size = config
        .batch_size
        .saturating_mul(3)
        .max(config.clusters.saturating_mul(3))
        .min(n);
    let candidates: Vec<Sample> = if init_size >= n {
        samples.to_vec()
    } else {
        rand::seq::index::sample(rng, n, init_size)
            .into_iter()
            .map(|i| samples[i])
            .collect()
    };

    let mut centers = Vec::with_capacity(config.clusters);
    centers.push(candidates[rng.gen_range(0..candidates.len())]);
    let mut closest: Vec<f64> = candidates
        .iter()
        .map(|c| distance_squared(*c, centers[0]))
        .collect();

    while centers.len() < config.clusters {
        let total: f64 = closest.iter().sum();
        let pick = if total > 0.0 {
            let target = rng.gen_range(0.0..total);
            let mut cumulative = 0.0;
            let mut chosen = candidates.len() - 1;
            for (i, d) in closest.iter().enumerate() {
                cumulative += d;
                if cumulative > target {
                    chosen = i;
                    break;
                }
            }
            chosen
        } else {
            // Every candidate already coincides with a center.
            rng.gen_range(0..candidates.len())
        };

        let center = candidates[pick];
        for (d, c) in closest.iter_mut().zip(&candidates) {
            *d = d.min(distance_squared(*c, center));
        }
        centers.push(center);
    }
    centers
}

/// Run mini-batch updates in place. Returns the number of steps taken.
#[allow(clippy::cast_precision_loss)]
fn run_mini_batches(
    samples: &[Sample],
    centers: &mut [Sample],
    config: &QuantizeConfig,
    rng: &mut StdRng,
) -> usize {
    let n = samples.len();
    let k = centers.len();
    let batch = config.batch_size.min(n);
    let max_steps = config.max_iter.saturating_mul(n.div_ceil(batch));
    // Smoothing weight for the inertia average, as a fraction of the data
    // seen per step.
    let ewa_alpha = (2.0 * batch as f64 / (n as f64 + 1.0)).min(1.0);

    let mut counts = vec![0.0_f64; k];
    let mut ewa_inertia: Option<f64> = None;
    let mut best_inertia = f64::INFINITY;
    let mut no_improvement = 0;
    let mut steps = 0;

    while steps < max_steps {
        steps += 1;

        let mut sums = vec![[0.0_f64; 3]; k];
        let mut members = vec![0_usize; k];
        let mut inertia = 0.0;
        for _ in 0..batch {
            let x = samples[rng.gen_range(0..n)];
            let (c, d) = nearest_center(centers, x);
            inertia += d;
            members[c] += 1;
            for ch in 0..3 {
                sums[c][ch] += x[ch];
            }
        }

        let mut shift = 0.0;
        for c in 0..k {
            if members[c] == 0 {
                continue;
            }
            let m = members[c] as f64;
            let old = centers[c];
            counts[c] += m;
            for ch in 0..3 {
                centers[c][ch] = old[ch] + m.mul_add(-old[ch], sums[c][ch]) / counts[c];
            }
            shift += distance_squared(old, centers[c]);
        }

        if config.tolerance > 0.0 && shift <= config.tolerance {
            break;
        }

        let batch_inertia = inertia / batch as f64;
        let smoothed = ewa_inertia.map_or(batch_inertia, |prev| {
            prev.mul_add(1.0 - ewa_alpha, batch_inertia * ewa_alpha)
        });
        ewa_inertia = Some(smoothed);

        if smoothed < best_inertia {
            best_inertia = smoothed;
            no_improvement = 0;
        } else {
            no_improvement += 1;
            if no_improvement >= config.max_no_improvement {
                break;
            }
        }
    }
    steps
}

/// Index of and squared distance to the nearest center; ties go to the
/// lowest index.
fn nearest_center(centers: &[Sample], x: Sample) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (i, c) in centers.iter().enumerate() {
        let d = distance_squared(*c, x);
        if d < best.1 {
            best = (i, d);
        }
    }
    best
}

fn distance_squared(a: Sample, b: Sample) -> f64 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    dr.mul_add(dr, dg.mul_add(dg, db * db))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_color(center: Sample) -> Color {
    let channel = |v: f64| v.round().clamp(0.0, 255.0) as u8;
    Color::new(channel(center[0]), channel(center[1]), channel(center[2]))
}

/// Keep only colors that are the nearest palette entry of at least one
/// pixel. Duplicates collapse onto their first occurrence.
fn drop_unowned(image: &RgbImage, colors: Vec<Color>) -> Palette {
    let mut owned = vec![false; colors.len()];
    for pixel in image.pixels() {
        if let Some(i) = nearest_index(Color::from(*pixel), &colors) {
            owned[i] = true;
        }
    }
    Palette::new(
        colors
            .into_iter()
            .zip(owned)
            .filter_map(|(c, keep)| keep.then_some(c))
            .collect(),
    )
}
