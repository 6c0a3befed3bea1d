//! geotrace-export: Pure format serializers (sans-IO)
//!
//! Converts contours into output formats: SVG overlays in image pixel
//! space and GeoJSON for transformed (reference-space) contours.

pub mod geojson;
pub mod svg;

pub use geojson::{ExportError, to_geojson};
pub use svg::{SvgMetadata, build_path_data, to_svg};
