//! SVG export serializer.
//!
//! Converts contours into an SVG string with one closed `<path>` element
//! per contour, using the [`svg`] crate for document construction, XML
//! escaping, and path data formatting. The `viewBox` is the source image
//! size, so the document overlays the image pixel for pixel.
//!
//! Optional [`SvgMetadata`] embeds `<title>` and `<desc>` elements, plus
//! the contour configuration as JSON inside `<metadata>`.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Element, Path, Title};
use svg::node::{Node, Text, Value};

use geotrace_pipeline::{Contour, Dimensions};

/// Metadata to embed in the SVG document.
///
/// All fields are optional. Text values are XML-escaped automatically by
/// the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the source image filename (without extension).
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized configuration, emitted inside `<metadata>` wrapped in a
    /// namespaced `<geotrace:config>` element.
    pub config_json: Option<&'a str>,
}

/// Build a closed SVG path `d` attribute string from a contour.
///
/// Uses `M` for the first vertex, `L` for the rest and closes the path.
/// Returns an empty string for an empty contour.
///
/// # Examples
///
/// ```
/// use geotrace_pipeline::{Contour, Point};
/// use geotrace_export::build_path_data;
///
/// let contour = Contour::new(vec![
///     Point::new(10.0, 20.0),
///     Point::new(30.0, 40.0),
///     Point::new(10.0, 40.0),
/// ]);
/// let d = build_path_data(&contour);
/// assert!(d.starts_with("M10,20 L30,40 L10,40"));
/// ```
#[must_use]
pub fn build_path_data(contour: &Contour) -> String {
    let Some((first, rest)) = contour.points().split_first() else {
        return String::new();
    };

    let mut data = Data::new().move_to((first.x, first.y));
    for p in rest {
        data = data.line_to((p.x, p.y));
    }
    String::from(Value::from(data.close()))
}

/// Serialize contours into an SVG document.
///
/// The document is `dimensions.width` by `dimensions.height` user units.
/// Empty contours are skipped; every other contour becomes one unfilled,
/// stroked, closed path.
#[must_use]
pub fn to_svg(contours: &[Contour], dimensions: Dimensions, metadata: &SvgMetadata<'_>) -> String {
    let w = dimensions.width;
    let h = dimensions.height;
    let mut doc = Document::new()
        .set("width", w)
        .set("height", h)
        .set("viewBox", (0, 0, w, h));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut config_el = Element::new("geotrace:config");
        config_el.assign("xmlns:geotrace", "urn:geotrace:config:1");
        config_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(config_el);
        doc = doc.add(metadata_el);
    }

    for contour in contours {
        let d = build_path_data(contour);
        if d.is_empty() {
            continue;
        }

        let path = Path::new()
            .set("d", d)
            .set("fill", "none")
            .set("stroke", "red")
            .set("stroke-width", 1);
        doc = doc.add(path);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
