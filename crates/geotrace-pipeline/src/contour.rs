//! External contour tracing, area filtering, and filled rasterization.
//!
//! Tracing uses Suzuki-Abe border following via
//! [`imageproc::contours::find_contours`] over 8-connected foreground
//! regions. Only outermost borders are kept: hole borders and any
//! regions nested inside holes are dropped, so each connected region
//! yields exactly one contour.
//!
//! # Vertex reduction
//!
//! Raw borders list every boundary pixel. With
//! [`ContourApproximation::Simple`] a vertex is dropped when the step
//! into it and the step out of it point the same way, so each straight
//! horizontal, vertical or diagonal run collapses to its two endpoints.

use geo::Area;
use image::{GrayImage, Rgb, RgbImage};
use imageproc::contours::BorderType;
use serde::{Deserialize, Serialize};

use crate::types::{Color, Contour, Point};

/// How traced boundaries are reduced to vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContourApproximation {
    /// Keep every boundary pixel.
    Full,
    /// Keep only the endpoints of straight runs.
    #[default]
    Simple,
}

/// Trace the outer boundary of every 8-connected foreground region.
///
/// Foreground is any non-zero pixel. Everything outside the image counts
/// as background, so regions touching the border (including a mask that
/// is foreground everywhere) are traced like any other. An empty mask
/// yields no contours.
#[must_use = "returns the traced contours"]
pub fn trace_external(mask: &GrayImage, approximation: ContourApproximation) -> Vec<Contour> {
    imageproc::contours::find_contours::<i32>(&with_background_frame(mask))
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter(|c| !c.points.is_empty())
        .map(|c| {
            // Undo the one-pixel frame.
            let pixels: Vec<(i32, i32)> = c.points.iter().map(|p| (p.x - 1, p.y - 1)).collect();
            let pixels = match approximation {
                ContourApproximation::Full => pixels,
                ContourApproximation::Simple => simplify_runs(&pixels),
            };
            Contour::new(
                pixels
                    .into_iter()
                    .map(|(x, y)| Point::new(f64::from(x), f64::from(y)))
                    .collect(),
            )
        })
        .collect()
}

/// Copy `mask` into the middle of a canvas one pixel larger on every side.
///
/// Border following starts from a background pixel next to each region;
/// without the frame a region spanning the image from edge to edge has
/// no such start and is reported as a hole or not at all.
fn with_background_frame(mask: &GrayImage) -> GrayImage {
    let mut framed = GrayImage::new(mask.width() + 2, mask.height() + 2);
    image::imageops::replace(&mut framed, mask, 1, 1);
    framed
}

/// Drop vertices in the middle of straight runs, treating the border as
/// cyclic.
fn simplify_runs(pixels: &[(i32, i32)]) -> Vec<(i32, i32)> {
    let n = pixels.len();
    if n < 3 {
        return pixels.to_vec();
    }
    let step = |from: (i32, i32), to: (i32, i32)| ((to.0 - from.0).signum(), (to.1 - from.1).signum());

    let kept: Vec<(i32, i32)> = (0..n)
        .filter(|&i| {
            let prev = pixels[(i + n - 1) % n];
            let next = pixels[(i + 1) % n];
            step(prev, pixels[i]) != step(pixels[i], next)
        })
        .map(|i| pixels[i])
        .collect();

    // A border whose every step points the same way cannot close; keep
    // the raw pixels rather than returning nothing.
    if kept.is_empty() { pixels.to_vec() } else { kept }
}

/// Enclosed area of a contour's vertex polygon (shoelace formula).
///
/// Contours with fewer than three vertices enclose nothing.
#[must_use]
pub fn contour_area(contour: &Contour) -> f64 {
    if contour.len() < 3 {
        return 0.0;
    }
    let ring: Vec<geo::Coord<f64>> = contour
        .points()
        .iter()
        .map(|p| geo::Coord { x: p.x, y: p.y })
        .collect();
    geo::Polygon::new(geo::LineString::from(ring), vec![]).unsigned_area()
}

/// Keep contours whose area is at least `min_area`.
///
/// `min_area <= 0` keeps everything. Order is preserved.
#[must_use = "returns the surviving contours"]
pub fn filter_by_area(contours: Vec<Contour>, min_area: f64) -> Vec<Contour> {
    if min_area <= 0.0 {
        return contours;
    }
    contours
        .into_iter()
        .filter(|c| contour_area(c) >= min_area)
        .collect()
}

/// Draw contours as solid filled regions on a black canvas.
///
/// Interior and boundary pixels both receive `color`. Single-vertex and
/// two-vertex contours are drawn as a pixel and a line segment.
#[must_use = "returns the filled raster"]
#[allow(clippy::cast_possible_truncation)]
pub fn fill_contours(contours: &[Contour], width: u32, height: u32, color: Color) -> RgbImage {
    let mut canvas = RgbImage::new(width, height);
    let fill: Rgb<u8> = color.into();

    for contour in contours {
        let mut poly: Vec<imageproc::point::Point<i32>> = contour
            .points()
            .iter()
            .map(|p| imageproc::point::Point::new(p.x.round() as i32, p.y.round() as i32))
            .collect();
        // The polygon drawer requires an open ring.
        while poly.len() > 1 && poly.first() == poly.last() {
            poly.pop();
        }

        match poly.as_slice() {
            [] => {}
            [p] => {
                if let (Ok(x), Ok(y)) = (u32::try_from(p.x), u32::try_from(p.y))
                    && x < width
                    && y < height
                {
                    canvas.put_pixel(x, y, fill);
                }
            }
            [a, b] => {
                imageproc::drawing::draw_line_segment_mut(
                    &mut canvas,
                    (a.x as f32, a.y as f32),
                    (b.x as f32, b.y as f32),
                    fill,
                );
            }
            _ => imageproc::drawing::draw_polygon_mut(&mut canvas, &poly, fill),
        }
    }
    canvas
}
