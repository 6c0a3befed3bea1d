//! Shared types for the geotrace pipeline.

use serde::{Deserialize, Serialize};

use crate::contour::ContourApproximation;

/// Re-export `GrayImage` so downstream crates can hold masks without
/// depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage` so downstream crates can reference the decoded
/// raster and the filled contour canvas without depending on `image`
/// directly.
pub use image::RgbImage;

/// An 8-bit RGB color vector.
///
/// Serialized as a plain `[r, g, b]` array, which is how palettes and
/// selections travel between the request layer and the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub [u8; 3]);

impl Color {
    /// Create a color from its three channel values.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    /// Squared Euclidean distance to another color in RGB space.
    ///
    /// Used for nearest-palette classification, where the square root
    /// does not change the arg-min.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(&a, &b)| {
                let d = i32::from(a) - i32::from(b);
                d.unsigned_abs() * d.unsigned_abs()
            })
            .sum()
    }
}

impl From<image::Rgb<u8>> for Color {
    fn from(pixel: image::Rgb<u8>) -> Self {
        Self(pixel.0)
    }
}

impl From<Color> for image::Rgb<u8> {
    fn from(color: Color) -> Self {
        Self(color.0)
    }
}

/// Ordered set of representative colors produced by quantization.
///
/// Palette order is significant: nearest-color ties resolve to the
/// lowest index.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette(Vec<Color>);

impl Palette {
    /// Create a palette from a vector of colors.
    #[must_use]
    pub const fn new(colors: Vec<Color>) -> Self {
        Self(colors)
    }

    /// Returns `true` if the palette has no colors.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of colors in the palette.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all colors.
    #[must_use]
    pub fn colors(&self) -> &[Color] {
        &self.0
    }

    /// Consumes the palette and returns the underlying colors.
    #[must_use]
    pub fn into_colors(self) -> Vec<Color> {
        self.0
    }
}

impl From<Vec<Color>> for Palette {
    fn from(colors: Vec<Color>) -> Self {
        Self(colors)
    }
}

/// A 2D point, in image pixels before a transform and in the
/// reference space after one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge, before transform).
    pub x: f64,
    /// Vertical position (pixels from top edge, before transform).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// One closed external boundary, as an ordered vertex sequence.
///
/// The closing edge from the last vertex back to the first is implied;
/// the first vertex is not repeated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Contour(Vec<Point>);

impl Contour {
    /// Create a new contour from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the contour has no vertices.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of vertices.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all vertices.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the contour and returns the underlying vertices.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an image buffer.
    #[must_use]
    pub fn of<P: image::Pixel>(image: &image::ImageBuffer<P, Vec<P::Subpixel>>) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }

    /// Total pixel count.
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Axis-aligned rectangle whose pixels are removed from the mask.
///
/// Coordinates are image pixels with the origin at the top-left. The
/// rectangle may extend past the image or have non-positive extents;
/// both are tolerated (see [`EraseRect::clip`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EraseRect {
    /// Left edge.
    pub x: i64,
    /// Top edge.
    pub y: i64,
    /// Width in pixels. Zero or negative is a no-op.
    pub width: i64,
    /// Height in pixels. Zero or negative is a no-op.
    pub height: i64,
}

impl EraseRect {
    /// Create a new rectangle.
    #[must_use]
    pub const fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Intersect the rectangle with a `width` x `height` image.
    ///
    /// Returns the half-open pixel range `(x0, y0, x1, y1)`, or `None`
    /// if the intersection is empty.
    #[must_use]
    pub fn clip(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        if self.width <= 0 || self.height <= 0 {
            return None;
        }
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.x.saturating_add(self.width).min(i64::from(width));
        let y1 = self.y.saturating_add(self.height).min(i64::from(height));
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((
            u32::try_from(x0).ok()?,
            u32::try_from(y0).ok()?,
            u32::try_from(x1).ok()?,
            u32::try_from(y1).ok()?,
        ))
    }
}

/// A correspondence between an image point and a reference point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointPair {
    /// Point in image pixel coordinates.
    pub source: Point,
    /// The same location in the reference coordinate space.
    pub destination: Point,
}

impl PointPair {
    /// Create a new correspondence.
    #[must_use]
    pub const fn new(source: Point, destination: Point) -> Self {
        Self {
            source,
            destination,
        }
    }
}

/// Parameters for [`crate::quantize`].
///
/// The defaults reproduce the mini-batch k-means settings the palette
/// picker has always used: batch size 500, seed 0, early stopping after
/// 10 steps without inertia improvement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizeConfig {
    /// Contrast scale applied before clustering.
    pub contrast_alpha: f64,
    /// Contrast bias applied before clustering.
    pub contrast_beta: f64,
    /// Requested palette size (K).
    pub clusters: usize,
    /// Pixels sampled per mini-batch step.
    pub batch_size: usize,
    /// Upper bound on passes over the data, in units of `pixels / batch_size` steps.
    pub max_iter: usize,
    /// Consecutive steps without smoothed-inertia improvement before stopping.
    pub max_no_improvement: usize,
    /// Stop when the summed squared center shift of a step is at most this.
    /// Zero disables the check.
    pub tolerance: f64,
    /// Seed for initialisation and batch sampling.
    pub seed: u64,
}

impl QuantizeConfig {
    /// Default contrast scale (identity).
    pub const DEFAULT_CONTRAST_ALPHA: f64 = 1.0;
    /// Default contrast bias (identity).
    pub const DEFAULT_CONTRAST_BETA: f64 = 0.0;
    /// Default palette size.
    pub const DEFAULT_CLUSTERS: usize = 8;
    /// Default mini-batch size.
    pub const DEFAULT_BATCH_SIZE: usize = 500;
    /// Default pass budget.
    pub const DEFAULT_MAX_ITER: usize = 100;
    /// Default early-stopping patience.
    pub const DEFAULT_MAX_NO_IMPROVEMENT: usize = 10;
    /// Default center-shift tolerance (disabled).
    pub const DEFAULT_TOLERANCE: f64 = 0.0;
    /// Default RNG seed.
    pub const DEFAULT_SEED: u64 = 0;
}

impl Default for QuantizeConfig {
    fn default() -> Self {
        Self {
            contrast_alpha: Self::DEFAULT_CONTRAST_ALPHA,
            contrast_beta: Self::DEFAULT_CONTRAST_BETA,
            clusters: Self::DEFAULT_CLUSTERS,
            batch_size: Self::DEFAULT_BATCH_SIZE,
            max_iter: Self::DEFAULT_MAX_ITER,
            max_no_improvement: Self::DEFAULT_MAX_NO_IMPROVEMENT,
            tolerance: Self::DEFAULT_TOLERANCE,
            seed: Self::DEFAULT_SEED,
        }
    }
}

/// Parameters for [`crate::build_contour_raster`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourConfig {
    /// Contrast scale applied before classification.
    pub contrast_alpha: f64,
    /// Contrast bias applied before classification.
    pub contrast_beta: f64,
    /// Dilation passes on the mask before tracing.
    pub dilate_iterations: u32,
    /// Erosion passes on the filled raster after tracing.
    pub erode_iterations: u32,
    /// Contours enclosing less than this area (square pixels) are dropped.
    /// Zero or negative keeps every contour.
    pub min_area: f64,
    /// Rectangles cleared from the mask before dilation.
    pub erase: Vec<EraseRect>,
    /// Vertex reduction applied to traced boundaries.
    pub approximation: ContourApproximation,
    /// Color used to fill surviving contours.
    pub fill_color: Color,
}

impl ContourConfig {
    /// Default contrast scale (identity).
    pub const DEFAULT_CONTRAST_ALPHA: f64 = 1.0;
    /// Default contrast bias (identity).
    pub const DEFAULT_CONTRAST_BETA: f64 = 0.0;
    /// Default dilation passes.
    pub const DEFAULT_DILATE_ITERATIONS: u32 = 0;
    /// Default erosion passes.
    pub const DEFAULT_ERODE_ITERATIONS: u32 = 0;
    /// Default minimum area (no filtering).
    pub const DEFAULT_MIN_AREA: f64 = 0.0;
    /// Default fill color (green).
    pub const DEFAULT_FILL_COLOR: Color = Color::new(0, 255, 0);
}

impl Default for ContourConfig {
    fn default() -> Self {
        Self {
            contrast_alpha: Self::DEFAULT_CONTRAST_ALPHA,
            contrast_beta: Self::DEFAULT_CONTRAST_BETA,
            dilate_iterations: Self::DEFAULT_DILATE_ITERATIONS,
            erode_iterations: Self::DEFAULT_ERODE_ITERATIONS,
            min_area: Self::DEFAULT_MIN_AREA,
            erase: Vec::new(),
            approximation: ContourApproximation::default(),
            fill_color: Self::DEFAULT_FILL_COLOR,
        }
    }
}

/// Errors that can occur during pipeline processing.
///
/// Uses custom `Serialize`/`Deserialize` because `image::ImageError`
/// does not implement serde traits. The `ImageDecode` variant is
/// serialized as its `Display` string.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes or pixel grid were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// A numeric argument is out of its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Too few point pairs for the requested transform.
    #[error("insufficient correspondences: need {needed}, got {got}")]
    InsufficientCorrespondences {
        /// Minimum number of pairs for the transform.
        needed: usize,
        /// Number of pairs supplied.
        got: usize,
    },

    /// The correspondence points do not determine a unique transform.
    #[error("degenerate configuration: {0}")]
    DegenerateTransform(String),
}

/// Serde-compatible proxy for `PipelineError`.
///
/// `image::ImageError` does not implement serde, so the `ImageDecode`
/// variant stores its `Display` string instead.
#[derive(Serialize, Deserialize)]
enum PipelineErrorProxy {
    ImageDecode(String),
    EmptyInput,
    InvalidParameter(String),
    InsufficientCorrespondences { needed: usize, got: usize },
    DegenerateTransform(String),
}

impl Serialize for PipelineError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let proxy = match self {
            Self::ImageDecode(e) => PipelineErrorProxy::ImageDecode(e.to_string()),
            Self::EmptyInput => PipelineErrorProxy::EmptyInput,
            Self::InvalidParameter(s) => PipelineErrorProxy::InvalidParameter(s.clone()),
            Self::InsufficientCorrespondences { needed, got } => {
                PipelineErrorProxy::InsufficientCorrespondences {
                    needed: *needed,
                    got: *got,
                }
            }
            Self::DegenerateTransform(s) => PipelineErrorProxy::DegenerateTransform(s.clone()),
        };
        proxy.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PipelineError {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let proxy = PipelineErrorProxy::deserialize(deserializer)?;
        Ok(match proxy {
            // The typed image error cannot be rebuilt; keep its message.
            PipelineErrorProxy::ImageDecode(msg) => {
                Self::InvalidParameter(format!("image decode error: {msg}"))
            }
            PipelineErrorProxy::EmptyInput => Self::EmptyInput,
            PipelineErrorProxy::InvalidParameter(s) => Self::InvalidParameter(s),
            PipelineErrorProxy::InsufficientCorrespondences { needed, got } => {
                Self::InsufficientCorrespondences { needed, got }
            }
            PipelineErrorProxy::DegenerateTransform(s) => Self::DegenerateTransform(s),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Color tests ---

    #[test]
    fn color_distance_squared() {
        let a = Color::new(0, 0, 0);
        let b = Color::new(3, 4, 12);
        assert_eq!(a.distance_squared(b), 169);
        assert_eq!(b.distance_squared(a), 169);
    }

    #[test]
    fn color_distance_to_self_is_zero() {
        let c = Color::new(17, 200, 255);
        assert_eq!(c.distance_squared(c), 0);
    }

    #[test]
    fn color_max_distance_does_not_overflow() {
        let a = Color::new(0, 0, 0);
        let b = Color::new(255, 255, 255);
        assert_eq!(a.distance_squared(b), 3 * 255 * 255);
    }

    #[test]
    fn color_serializes_as_array() {
        let json = serde_json::to_string(&Color::new(1, 2, 3)).unwrap();
        assert_eq!(json, "[1,2,3]");
    }

    #[test]
    fn palette_deserializes_from_nested_arrays() {
        let palette: Palette = serde_json::from_str("[[0,0,0],[255,128,1]]").unwrap();
        assert_eq!(palette.len(), 2);
        assert_eq!(palette.colors()[1], Color::new(255, 128, 1));
    }

    // --- Point / Contour tests ---

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(b) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn contour_empty() {
        let c = Contour::new(vec![]);
        assert!(c.is_empty());
        assert_eq!(c.len(), 0);
    }

    #[test]
    fn contour_into_points_returns_owned_vec() {
        let points = vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
        let c = Contour::new(points.clone());
        assert_eq!(c.points(), points.as_slice());
        assert_eq!(c.into_points(), points);
    }

    // --- EraseRect tests ---

    #[test]
    fn erase_rect_inside_is_unchanged() {
        let r = EraseRect::new(1, 2, 3, 4);
        assert_eq!(r.clip(10, 10), Some((1, 2, 4, 6)));
    }

    #[test]
    fn erase_rect_clipped_to_bounds() {
        let r = EraseRect::new(-5, 8, 10, 10);
        assert_eq!(r.clip(10, 10), Some((0, 8, 5, 10)));
    }

    #[test]
    fn erase_rect_outside_is_none() {
        assert_eq!(EraseRect::new(20, 0, 5, 5).clip(10, 10), None);
        assert_eq!(EraseRect::new(-10, 0, 5, 5).clip(10, 10), None);
    }

    #[test]
    fn erase_rect_non_positive_extent_is_none() {
        assert_eq!(EraseRect::new(1, 1, 0, 5).clip(10, 10), None);
        assert_eq!(EraseRect::new(1, 1, 5, -3).clip(10, 10), None);
    }

    #[test]
    fn erase_rect_huge_extent_saturates() {
        let r = EraseRect::new(i64::MAX - 1, 0, i64::MAX, 1);
        assert_eq!(r.clip(10, 10), None);
        let r = EraseRect::new(2, 2, i64::MAX, i64::MAX);
        assert_eq!(r.clip(10, 10), Some((2, 2, 10, 10)));
    }

    // --- Config tests ---

    #[test]
    fn quantize_config_defaults() {
        let config = QuantizeConfig::default();
        assert!((config.contrast_alpha - 1.0).abs() < f64::EPSILON);
        assert!(config.contrast_beta.abs() < f64::EPSILON);
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.seed, 0);
    }

    #[test]
    fn contour_config_defaults() {
        let config = ContourConfig::default();
        assert_eq!(config.dilate_iterations, 0);
        assert_eq!(config.erode_iterations, 0);
        assert!(config.erase.is_empty());
        assert_eq!(config.fill_color, Color::new(0, 255, 0));
        assert_eq!(config.approximation, ContourApproximation::Simple);
    }

    #[test]
    fn contour_config_partial_json_uses_defaults() {
        let config: ContourConfig =
            serde_json::from_str(r#"{"dilate_iterations": 2, "erase": [{"x": 1, "y": 1, "width": 2, "height": 2}]}"#)
                .unwrap();
        assert_eq!(config.dilate_iterations, 2);
        assert_eq!(config.erase, vec![EraseRect::new(1, 1, 2, 2)]);
        assert_eq!(config.erode_iterations, 0);
    }

    #[test]
    fn quantize_config_serde_round_trip() {
        let config = QuantizeConfig {
            contrast_alpha: 1.5,
            contrast_beta: -10.0,
            clusters: 4,
            seed: 42,
            ..QuantizeConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: QuantizeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    // --- PipelineError tests ---

    #[test]
    fn error_display() {
        assert_eq!(PipelineError::EmptyInput.to_string(), "input image data is empty");
        assert_eq!(
            PipelineError::InsufficientCorrespondences { needed: 4, got: 2 }.to_string(),
            "insufficient correspondences: need 4, got 2",
        );
        assert_eq!(
            PipelineError::DegenerateTransform("collinear".to_string()).to_string(),
            "degenerate configuration: collinear",
        );
    }

    #[test]
    fn pipeline_error_serde_round_trip() {
        let err = PipelineError::InsufficientCorrespondences { needed: 3, got: 1 };
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: PipelineError = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            deserialized,
            PipelineError::InsufficientCorrespondences { needed: 3, got: 1 }
        ));

        let err = PipelineError::DegenerateTransform("bad".to_string());
        let json = serde_json::to_string(&err).unwrap();
        let deserialized: PipelineError = serde_json::from_str(&json).unwrap();
        assert!(matches!(deserialized, PipelineError::DegenerateTransform(ref s) if s == "bad"));
    }
}
