//! GeoJSON export serializer.
//!
//! Writes contours as a `FeatureCollection`. Contours with three or more
//! vertices become `Polygon` features whose single ring is closed by
//! repeating the first vertex; two-vertex contours become `LineString`s
//! and single vertices `Point`s. Empty contours are skipped. Each
//! feature carries its contour's position in the input as an `index`
//! property.
//!
//! Coordinates are written as `[x, y]` exactly as given, so callers
//! transform contours into the target reference space first.

use geotrace_pipeline::{Contour, Point};
use serde_json::{Value, json};

/// Errors from format serializers.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// A vertex coordinate is NaN or infinite and has no GeoJSON form.
    #[error("contour {contour} vertex {vertex} has a non-finite coordinate")]
    NonFiniteCoordinate {
        /// Index of the contour in the input.
        contour: usize,
        /// Index of the vertex within the contour.
        vertex: usize,
    },

    /// JSON serialization failed.
    #[error("failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize contours as a GeoJSON `FeatureCollection` string.
///
/// # Errors
///
/// Returns [`ExportError::NonFiniteCoordinate`] if any vertex is NaN or
/// infinite (for example after a projective transform sent it to
/// infinity).
pub fn to_geojson(contours: &[Contour]) -> Result<String, ExportError> {
    let mut features = Vec::with_capacity(contours.len());
    for (index, contour) in contours.iter().enumerate() {
        if let Some(vertex) = contour
            .points()
            .iter()
            .position(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(ExportError::NonFiniteCoordinate {
                contour: index,
                vertex,
            });
        }
        if let Some(geometry) = geometry(contour) {
            features.push(json!({
                "type": "Feature",
                "properties": { "index": index },
                "geometry": geometry,
            }));
        }
    }

    let collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });
    Ok(serde_json::to_string_pretty(&collection)?)
}

fn position(p: &Point) -> Value {
    json!([p.x, p.y])
}

fn geometry(contour: &Contour) -> Option<Value> {
    match contour.points() {
        [] => None,
        [p] => Some(json!({ "type": "Point", "coordinates": position(p) })),
        [a, b] => Some(json!({
            "type": "LineString",
            "coordinates": [position(a), position(b)],
        })),
        points => {
            let mut ring: Vec<Value> = points.iter().map(position).collect();
            if points.first() != points.last() {
                ring.push(position(&points[0]));
            }
            Some(json!({ "type": "Polygon", "coordinates": [ring] }))
        }
    }
}
