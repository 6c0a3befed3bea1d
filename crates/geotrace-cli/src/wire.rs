//! JSON shapes read from and written to files and stdout.
//!
//! Contours travel as arrays of `[x, y]` pairs and correspondences as
//! `[{"x", "y"}, {"x", "y"}]` source/destination pairs, the shapes the
//! web front end has always exchanged. Traced contours are written with
//! integer pixel coordinates; transformed ones keep their fractions. Palettes are arrays of
//! `[r, g, b]` and erase rectangles are `{"x", "y", "width", "height"}`
//! objects, which the pipeline types already (de)serialize as.

use geotrace_pipeline::{Color, Contour, Point, PointPair};
use serde::{Deserialize, Serialize};

/// One `{"x": .., "y": ..}` point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WirePoint {
    pub x: f64,
    pub y: f64,
}

/// A contour as a list of `[x, y]` vertices.
pub type WireContour = Vec<[f64; 2]>;

/// A traced contour as a list of integer `[x, y]` pixel coordinates.
pub type PixelContour = Vec<[i64; 2]>;

/// A `[source, destination]` correspondence.
pub type WirePair = [WirePoint; 2];

/// Output of `geotrace palette`.
#[derive(Debug, Serialize)]
pub struct ColoursResponse {
    pub colours: Vec<Color>,
}

/// Output of `geotrace contours`.
#[derive(Debug, Serialize)]
pub struct ContoursResponse {
    pub contours: Vec<PixelContour>,
}

/// Output of `geotrace transform`.
#[derive(Debug, Serialize)]
pub struct TransformResponse {
    pub trans_contours: Vec<WireContour>,
    /// Rows of the fitted matrix (2 for affine, 3 for projective).
    pub matrix: Vec<[f64; 3]>,
    /// Distance between each mapped source and its destination.
    pub reprojection_errors: Vec<f64>,
}

/// Accepts either a bare contour list or a `{"contours": [...]}` object,
/// so `geotrace contours` output can be piped straight back in.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ContoursInput {
    Bare(Vec<WireContour>),
    Wrapped { contours: Vec<WireContour> },
}

impl ContoursInput {
    pub fn into_contours(self) -> Vec<Contour> {
        let (Self::Bare(wire) | Self::Wrapped { contours: wire }) = self;
        wire.into_iter()
            .map(|c| Contour::new(c.into_iter().map(|[x, y]| Point::new(x, y)).collect()))
            .collect()
    }
}

pub fn contours_to_wire(contours: &[Contour]) -> Vec<WireContour> {
    contours
        .iter()
        .map(|c| c.points().iter().map(|p| [p.x, p.y]).collect())
        .collect()
}

/// Traced contours sit on pixel centers, so their coordinates are whole
/// numbers and are written without a fractional part.
#[allow(clippy::cast_possible_truncation)]
pub fn contours_to_pixels(contours: &[Contour]) -> Vec<PixelContour> {
    contours
        .iter()
        .map(|c| {
            c.points()
                .iter()
                .map(|p| [p.x.round() as i64, p.y.round() as i64])
                .collect()
        })
        .collect()
}

pub fn pairs_from_wire(pairs: &[WirePair]) -> Vec<PointPair> {
    pairs
        .iter()
        .map(|[s, d]| PointPair::new(Point::new(s.x, s.y), Point::new(d.x, d.y)))
        .collect()
}
