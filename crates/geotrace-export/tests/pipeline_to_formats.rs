//! Integration test: encode a synthetic image, run it through the
//! pipeline, and export the traced and transformed contours.

#![allow(clippy::unwrap_used)]

use std::io::Cursor;

use geotrace_pipeline::{Color, ContourConfig, Dimensions, Palette, Point, PointPair, RgbImage};

const FIELD: Color = Color::new(40, 160, 40);
const ROAD: Color = Color::new(200, 200, 200);

fn field_png() -> Vec<u8> {
    let img = RgbImage::from_fn(32, 24, |x, y| {
        let field = (4..14).contains(&x) && (4..20).contains(&y);
        let pond = (20..28).contains(&x) && (6..12).contains(&y);
        if field || pond { FIELD.into() } else { ROAD.into() }
    });
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

#[test]
fn png_to_svg_and_geojson() {
    let image = geotrace_pipeline::decode::decode_rgb(&field_png()).unwrap();
    let stages = geotrace_pipeline::build_contour_raster_staged(
        &image,
        &Palette::new(vec![FIELD, ROAD]),
        &[FIELD],
        &ContourConfig::default(),
    )
    .unwrap();
    assert_eq!(stages.contours.len(), 2);

    let svg = geotrace_export::to_svg(
        &stages.contours,
        Dimensions::of(&image),
        &geotrace_export::SvgMetadata {
            title: Some("fields"),
            ..geotrace_export::SvgMetadata::default()
        },
    );
    assert!(svg.contains(r#"viewBox="0 0 32 24""#));
    assert_eq!(svg.matches("<path").count(), 2);

    let pairs = vec![
        PointPair::new(Point::new(0.0, 0.0), Point::new(5.0, 50.0)),
        PointPair::new(Point::new(32.0, 0.0), Point::new(6.0, 50.0)),
        PointPair::new(Point::new(0.0, 24.0), Point::new(5.0, 49.0)),
    ];
    let mapped = geotrace_pipeline::transform_contours_affine(&stages.contours, &pairs).unwrap();
    let geojson = geotrace_export::to_geojson(&mapped).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&geojson).unwrap();
    let features = doc["features"].as_array().unwrap();
    assert_eq!(features.len(), 2);
    for feature in features {
        assert_eq!(feature["geometry"]["type"], "Polygon");
        for coord in feature["geometry"]["coordinates"][0].as_array().unwrap() {
            let lon = coord[0].as_f64().unwrap();
            let lat = coord[1].as_f64().unwrap();
            assert!((5.0..=6.0).contains(&lon), "lon {lon}");
            assert!((49.0..=50.0).contains(&lat), "lat {lat}");
        }
    }
}
