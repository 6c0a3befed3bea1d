//! Pipeline diagnostics: timing, counts, and other metrics for each stage.
//!
//! The pipeline crate never reads a wall clock itself. Callers that want
//! timings pass a [`Clock`]; the CLI supplies one backed by
//! `std::time::Instant`.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::contour::{fill_contours, filter_by_area, trace_external};
use crate::contrast::adjust_contrast;
use crate::mask::{build_mask, kept_pixels};
use crate::morphology::{dilate, erode_rgb};
use crate::quantize::{Quantized, cluster_colors};
use crate::raster::ContourRasterStages;
use crate::types::{Color, Contour, ContourConfig, Dimensions, Palette, PipelineError, QuantizeConfig};

/// Source of monotonic timestamps.
pub trait Clock {
    /// Opaque timestamp type.
    type Instant;

    /// Current timestamp.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Clock that reports zero for every interval, for runs whose timings
/// are discarded.
pub(crate) struct NoClock;

impl Clock for NoClock {
    type Instant = ();

    fn now(&self) {}

    fn elapsed(&self, _since: &()) -> Duration {
        Duration::ZERO
    }
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics for one palette computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantizeDiagnostics {
    /// Contrast adjustment.
    pub contrast: StageDiagnostics,
    /// Mini-batch clustering.
    pub quantize: StageDiagnostics,
    /// Total duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Source image size.
    pub dimensions: Dimensions,
}

/// Diagnostics for one contour-raster run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContourDiagnostics {
    /// Contrast adjustment.
    pub contrast: StageDiagnostics,
    /// Classification, selection and erasure.
    pub mask: StageDiagnostics,
    /// Mask dilation.
    pub dilate: StageDiagnostics,
    /// External contour tracing.
    pub trace: StageDiagnostics,
    /// Area filtering.
    pub filter: StageDiagnostics,
    /// Solid fill of surviving contours.
    pub fill: StageDiagnostics,
    /// Erosion of the filled raster.
    pub erode: StageDiagnostics,
    /// Total duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Source image size.
    pub dimensions: Dimensions,
}

/// Diagnostics for a single pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics (counts, sizes, etc.).
    pub metrics: StageMetrics,
}

/// Stage-specific metrics that vary by pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Contrast adjustment metrics.
    Contrast {
        /// Scale factor.
        alpha: f64,
        /// Bias.
        beta: f64,
    },
    /// Clustering metrics.
    Quantize {
        /// Requested palette size.
        requested_clusters: usize,
        /// Colors left after dropping unowned centers.
        palette_size: usize,
        /// Mini-batch steps run.
        steps: usize,
    },
    /// Mask construction metrics.
    Mask {
        /// Number of selected colors.
        selected_colors: usize,
        /// Number of erase rectangles.
        erase_rects: usize,
        /// Kept pixels after erasure.
        kept_pixels: u64,
        /// Total pixel count.
        total_pixels: u64,
    },
    /// Dilation metrics.
    Dilate {
        /// Passes applied.
        iterations: u32,
        /// Kept pixels after dilation.
        kept_pixels: u64,
    },
    /// Contour tracing metrics.
    Trace {
        /// Number of contours found.
        contour_count: usize,
        /// Total number of vertices across all contours.
        total_point_count: usize,
        /// Fewest vertices in any single contour.
        min_contour_points: usize,
        /// Most vertices in any single contour.
        max_contour_points: usize,
    },
    /// Area filter metrics.
    Filter {
        /// Area threshold in square pixels.
        min_area: f64,
        /// Contours before filtering.
        contours_before: usize,
        /// Contours after filtering.
        contours_after: usize,
    },
    /// Fill metrics.
    Fill {
        /// Non-black pixels in the filled canvas.
        filled_pixels: u64,
    },
    /// Erosion metrics.
    Erode {
        /// Passes applied.
        iterations: u32,
        /// Non-black pixels after erosion.
        filled_pixels: u64,
    },
}

/// Contrast-adjust and cluster, timing each stage.
///
/// # Errors
///
/// Same as [`crate::quantize`].
pub fn quantize_with_diagnostics<C: Clock>(
    image: &RgbImage,
    config: &QuantizeConfig,
    clock: &C,
) -> Result<(Quantized, QuantizeDiagnostics), PipelineError> {
    let start = clock.now();

    let t = clock.now();
    let adjusted = adjust_contrast(image, config.contrast_alpha, config.contrast_beta)?;
    let contrast = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Contrast {
            alpha: config.contrast_alpha,
            beta: config.contrast_beta,
        },
    };

    let t = clock.now();
    let (palette, steps) = cluster_colors(&adjusted, config)?;
    let quantize = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Quantize {
            requested_clusters: config.clusters,
            palette_size: palette.len(),
            steps,
        },
    };

    let diagnostics = QuantizeDiagnostics {
        contrast,
        quantize,
        total_duration: clock.elapsed(&start),
        dimensions: Dimensions::of(image),
    };
    Ok((
        Quantized {
            adjusted,
            palette,
            steps,
        },
        diagnostics,
    ))
}

/// Run the contour-raster path, timing each stage.
///
/// This is the single definition of the stage order;
/// [`build_contour_raster_staged`](crate::build_contour_raster_staged)
/// runs it with a clock that records nothing.
///
/// # Errors
///
/// Same as [`crate::build_contour_raster`].
pub fn build_contour_raster_with_diagnostics<C: Clock>(
    image: &RgbImage,
    palette: &Palette,
    selected: &[Color],
    config: &ContourConfig,
    clock: &C,
) -> Result<(ContourRasterStages, ContourDiagnostics), PipelineError> {
    let start = clock.now();

    let t = clock.now();
    let adjusted = adjust_contrast(image, config.contrast_alpha, config.contrast_beta)?;
    let contrast = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Contrast {
            alpha: config.contrast_alpha,
            beta: config.contrast_beta,
        },
    };

    let t = clock.now();
    let mask = build_mask(&adjusted, palette, selected, &config.erase);
    let mask_diag = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Mask {
            selected_colors: selected.len(),
            erase_rects: config.erase.len(),
            kept_pixels: kept_pixels(&mask),
            total_pixels: Dimensions::of(&mask).pixel_count(),
        },
    };

    let t = clock.now();
    let dilated = dilate(&mask, config.dilate_iterations);
    let dilate_diag = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Dilate {
            iterations: config.dilate_iterations,
            kept_pixels: kept_pixels(&dilated),
        },
    };

    let t = clock.now();
    let traced = trace_external(&dilated, config.approximation);
    let trace = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: trace_metrics(&traced),
    };

    let t = clock.now();
    let contours_before = traced.len();
    let contours = filter_by_area(traced, config.min_area);
    let filter = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Filter {
            min_area: config.min_area,
            contours_before,
            contours_after: contours.len(),
        },
    };

    let t = clock.now();
    let filled = fill_contours(&contours, adjusted.width(), adjusted.height(), config.fill_color);
    let fill = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Fill {
            filled_pixels: lit_pixels(&filled),
        },
    };

    let t = clock.now();
    let eroded = erode_rgb(&filled, config.erode_iterations);
    let erode = StageDiagnostics {
        duration: clock.elapsed(&t),
        metrics: StageMetrics::Erode {
            iterations: config.erode_iterations,
            filled_pixels: lit_pixels(&eroded),
        },
    };

    let diagnostics = ContourDiagnostics {
        contrast,
        mask: mask_diag,
        dilate: dilate_diag,
        trace,
        filter,
        fill,
        erode,
        total_duration: clock.elapsed(&start),
        dimensions: Dimensions::of(image),
    };
    Ok((
        ContourRasterStages {
            adjusted,
            mask,
            dilated,
            contours,
            filled,
            eroded,
        },
        diagnostics,
    ))
}

impl QuantizeDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let palette_size = match self.quantize.metrics {
            StageMetrics::Quantize { palette_size, .. } => palette_size,
            _ => 0,
        };
        render_report(
            "Palette Diagnostics Report",
            self.dimensions,
            self.total_duration,
            &[("Contrast", &self.contrast), ("Quantize", &self.quantize)],
            &format!("Palette colors: {palette_size}"),
        )
    }
}

impl ContourDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let contours = match self.filter.metrics {
            StageMetrics::Filter { contours_after, .. } => contours_after,
            _ => 0,
        };
        render_report(
            "Contour Diagnostics Report",
            self.dimensions,
            self.total_duration,
            &[
                ("Contrast", &self.contrast),
                ("Mask", &self.mask),
                ("Dilate", &self.dilate),
                ("Trace", &self.trace),
                ("Filter", &self.filter),
                ("Fill", &self.fill),
                ("Erode", &self.erode),
            ],
            &format!("Contours: {contours}"),
        )
    }
}

fn render_report(
    title: &str,
    dimensions: Dimensions,
    total: Duration,
    stages: &[(&str, &StageDiagnostics)],
    footer: &str,
) -> String {
    let mut lines = Vec::new();

    lines.push(format!("{title}\n{}", "=".repeat(60)));
    lines.push(format!(
        "Image: {}x{} ({} pixels)",
        dimensions.width,
        dimensions.height,
        dimensions.pixel_count(),
    ));
    lines.push(format!("Total duration: {:.3}ms", duration_ms(total)));
    lines.push(String::new());

    lines.push(format!(
        "{:<24} {:>10} {:>10}  {}",
        "Stage", "Duration", "% Total", "Details"
    ));
    lines.push("-".repeat(80));

    let total_ms = duration_ms(total);
    for (name, diag) in stages {
        let ms = duration_ms(diag.duration);
        let pct = if total_ms > 0.0 {
            ms / total_ms * 100.0
        } else {
            0.0
        };
        let details = format_metrics(&diag.metrics);
        lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
    }

    lines.push(String::new());
    lines.push(footer.to_owned());
    lines.join("\n")
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Contrast { alpha, beta } => format!("alpha={alpha:.2} beta={beta:.1}"),
        StageMetrics::Quantize {
            requested_clusters,
            palette_size,
            steps,
        } => format!("k={requested_clusters} -> {palette_size} colors in {steps} steps"),
        StageMetrics::Mask {
            selected_colors,
            erase_rects,
            kept_pixels,
            total_pixels,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = if *total_pixels > 0 {
                *kept_pixels as f64 / *total_pixels as f64 * 100.0
            } else {
                0.0
            };
            format!(
                "{selected_colors} selected, {erase_rects} erased, kept={kept_pixels} ({density:.1}%)",
            )
        }
        StageMetrics::Dilate {
            iterations,
            kept_pixels,
        } => format!("n={iterations} kept={kept_pixels}"),
        StageMetrics::Trace {
            contour_count,
            total_point_count,
            min_contour_points,
            max_contour_points,
        } => format!(
            "{contour_count} contours, {total_point_count} pts (min={min_contour_points} max={max_contour_points})",
        ),
        StageMetrics::Filter {
            min_area,
            contours_before,
            contours_after,
        } => format!("min_area={min_area:.1} {contours_before}->{contours_after}"),
        StageMetrics::Fill { filled_pixels } => format!("filled={filled_pixels}"),
        StageMetrics::Erode {
            iterations,
            filled_pixels,
        } => format!("n={iterations} filled={filled_pixels}"),
    }
}

fn trace_metrics(contours: &[Contour]) -> StageMetrics {
    StageMetrics::Trace {
        contour_count: contours.len(),
        total_point_count: contours.iter().map(Contour::len).sum(),
        min_contour_points: contours.iter().map(Contour::len).min().unwrap_or(0),
        max_contour_points: contours.iter().map(Contour::len).max().unwrap_or(0),
    }
}

/// Count pixels that are not pure black.
fn lit_pixels(image: &RgbImage) -> u64 {
    image.pixels().map(|p| u64::from(p.0 != [0, 0, 0])).sum()
}
