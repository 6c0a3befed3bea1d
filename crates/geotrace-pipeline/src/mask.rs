//! Selection mask: classify pixels by palette color and erase rectangles.
//!
//! Every pixel is assigned to the palette color nearest to it (Euclidean
//! distance in RGB, lowest palette index on ties). The mask keeps the
//! pixels whose assigned color is one of the user's selected colors, and
//! then clears every erase rectangle.
//!
//! Mask pixels are 255 (kept) or 0 (discarded), and the mask always has
//! the dimensions of the source image.

use std::collections::HashMap;

use image::{GrayImage, Luma, RgbImage};

use crate::types::{Color, EraseRect, Palette};

/// Mask value for kept pixels.
pub const KEEP: u8 = 255;

/// Index of the palette color nearest to `color`.
///
/// Ties resolve to the lowest index. Returns `None` for an empty palette.
#[must_use]
pub fn nearest_index(color: Color, palette: &[Color]) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (i, candidate) in palette.iter().enumerate() {
        let d = color.distance_squared(*candidate);
        if best.is_none_or(|(_, best_d)| d < best_d) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

/// Replace every pixel with its nearest palette color.
///
/// With an empty palette the result is an all-black image.
#[must_use = "returns the classified image"]
pub fn centroid_image(image: &RgbImage, palette: &Palette) -> RgbImage {
    let colors = palette.colors();
    let mut cache: HashMap<Color, Color> = HashMap::new();
    let mut out = RgbImage::new(image.width(), image.height());
    for (src, dst) in image.pixels().zip(out.pixels_mut()) {
        let color = Color::from(*src);
        let nearest = *cache.entry(color).or_insert_with(|| {
            nearest_index(color, colors).map_or(Color::new(0, 0, 0), |i| colors[i])
        });
        *dst = nearest.into();
    }
    out
}

/// Mark pixels whose nearest palette color is in `selected`.
///
/// A selected color that is not in the palette selects nothing.
#[must_use = "returns the selection mask"]
pub fn selection_mask(image: &RgbImage, palette: &Palette, selected: &[Color]) -> GrayImage {
    let colors = palette.colors();
    let chosen: Vec<bool> = colors.iter().map(|c| selected.contains(c)).collect();
    let mut cache: HashMap<Color, bool> = HashMap::new();
    let mut mask = GrayImage::new(image.width(), image.height());
    for (src, dst) in image.pixels().zip(mask.pixels_mut()) {
        let color = Color::from(*src);
        let keep = *cache
            .entry(color)
            .or_insert_with(|| nearest_index(color, colors).is_some_and(|i| chosen[i]));
        if keep {
            *dst = Luma([KEEP]);
        }
    }
    mask
}

/// Clear every rectangle from a mask.
///
/// Rectangles are clipped to the mask bounds; rectangles that fall
/// entirely outside or have non-positive extents change nothing.
#[must_use = "returns the erased mask"]
pub fn apply_erasures(mask: &GrayImage, erase: &[EraseRect]) -> GrayImage {
    let mut out = mask.clone();
    for rect in erase {
        if let Some((x0, y0, x1, y1)) = rect.clip(out.width(), out.height()) {
            for y in y0..y1 {
                for x in x0..x1 {
                    out.put_pixel(x, y, Luma([0]));
                }
            }
        }
    }
    out
}

/// Build the selection mask and apply the erase rectangles.
#[must_use = "returns the selection mask"]
pub fn build_mask(
    image: &RgbImage,
    palette: &Palette,
    selected: &[Color],
    erase: &[EraseRect],
) -> GrayImage {
    apply_erasures(&selection_mask(image, palette, selected), erase)
}

/// Number of kept pixels in a mask.
#[must_use]
pub fn kept_pixels(mask: &GrayImage) -> u64 {
    mask.pixels().map(|p| u64::from(p.0[0] != 0)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::new(220, 20, 20);
    const BLUE: Color = Color::new(20, 20, 220);
    const GRAY: Color = Color::new(128, 128, 128);

    /// 6x4 image: left half reddish, right half bluish, with noise.
    fn split_image() -> RgbImage {
        RgbImage::from_fn(6, 4, |x, y| {
            let n = ((x + y) % 3) as u8 * 5;
            if x < 3 {
                image::Rgb([210 + n, 25, 15 + n])
            } else {
                image::Rgb([15, 25 + n, 210 + n])
            }
        })
    }

    fn palette() -> Palette {
        Palette::new(vec![RED, BLUE])
    }

    #[test]
    fn nearest_index_picks_closest() {
        assert_eq!(nearest_index(Color::new(200, 0, 0), &[BLUE, RED]), Some(1));
    }

    #[test]
    fn nearest_index_tie_goes_to_lowest_index() {
        let a = Color::new(0, 0, 0);
        let b = Color::new(10, 0, 0);
        assert_eq!(nearest_index(Color::new(5, 0, 0), &[a, b]), Some(0));
        assert_eq!(nearest_index(Color::new(5, 0, 0), &[b, a]), Some(0));
    }

    #[test]
    fn nearest_index_empty_palette() {
        assert_eq!(nearest_index(RED, &[]), None);
    }

    #[test]
    fn centroid_image_snaps_to_palette() {
        let out = centroid_image(&split_image(), &palette());
        for (x, _, p) in out.enumerate_pixels() {
            let expected = if x < 3 { RED } else { BLUE };
            assert_eq!(Color::from(*p), expected);
        }
    }

    #[test]
    fn selection_keeps_only_selected_colors() {
        let mask = selection_mask(&split_image(), &palette(), &[BLUE]);
        assert_eq!(mask.dimensions(), (6, 4));
        for (x, _, p) in mask.enumerate_pixels() {
            assert_eq!(p.0[0], if x < 3 { 0 } else { KEEP });
        }
    }

    #[test]
    fn selecting_everything_keeps_everything() {
        let mask = selection_mask(&split_image(), &palette(), &[RED, BLUE]);
        assert_eq!(kept_pixels(&mask), 24);
    }

    #[test]
    fn color_outside_palette_selects_nothing() {
        let mask = selection_mask(&split_image(), &palette(), &[GRAY]);
        assert_eq!(kept_pixels(&mask), 0);
    }

    #[test]
    fn empty_palette_gives_empty_mask() {
        let mask = build_mask(&split_image(), &Palette::default(), &[RED], &[]);
        assert_eq!(kept_pixels(&mask), 0);
    }

    #[test]
    fn erase_clears_rectangle() {
        let mask = build_mask(
            &split_image(),
            &palette(),
            &[RED, BLUE],
            &[EraseRect::new(1, 1, 2, 2)],
        );
        assert_eq!(kept_pixels(&mask), 20);
        for (x, y) in [(1, 1), (2, 1), (1, 2), (2, 2)] {
            assert_eq!(mask.get_pixel(x, y).0[0], 0);
        }
    }

    #[test]
    fn erase_only_turns_pixels_off() {
        let base = selection_mask(&split_image(), &palette(), &[BLUE]);
        let erased = apply_erasures(&base, &[EraseRect::new(2, 0, 3, 3)]);
        for (b, e) in base.pixels().zip(erased.pixels()) {
            assert!(e.0[0] <= b.0[0]);
        }
        assert!(kept_pixels(&erased) < kept_pixels(&base));
    }

    #[test]
    fn erase_outside_bounds_is_noop() {
        let base = selection_mask(&split_image(), &palette(), &[BLUE]);
        let erased = apply_erasures(
            &base,
            &[
                EraseRect::new(10, 10, 5, 5),
                EraseRect::new(-8, 0, 3, 4),
                EraseRect::new(0, 0, 0, 4),
                EraseRect::new(0, 0, 4, -1),
            ],
        );
        assert_eq!(base, erased);
    }

    #[test]
    fn erase_partially_outside_is_clipped() {
        let base = selection_mask(&split_image(), &palette(), &[RED, BLUE]);
        let erased = apply_erasures(&base, &[EraseRect::new(4, -2, 10, 4)]);
        // Columns 4..6, rows 0..2 cleared.
        assert_eq!(kept_pixels(&erased), 24 - 4);
    }
}
