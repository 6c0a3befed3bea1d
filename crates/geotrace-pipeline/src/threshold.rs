//! Global Otsu binarization for plain contour extraction.

use image::{GrayImage, Luma};

use crate::mask::KEEP;

/// Binarize a luminance image at its Otsu level.
///
/// Pixels strictly brighter than the level become 255, the rest 0.
/// Returns the binary image together with the chosen level.
#[must_use = "returns the binary image and its threshold"]
pub fn otsu_binarize(gray: &GrayImage) -> (GrayImage, u8) {
    let level = imageproc::contrast::otsu_level(gray);
    let mut binary = gray.clone();
    for p in binary.pixels_mut() {
        *p = if p.0[0] > level { Luma([KEEP]) } else { Luma([0]) };
    }
    (binary, level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separates_dark_and_bright_halves() {
        let gray = GrayImage::from_fn(8, 4, |x, _| if x < 4 { Luma([30]) } else { Luma([220]) });
        let (binary, level) = otsu_binarize(&gray);
        assert!((30..220).contains(&level), "level {level}");
        for (x, _, p) in binary.enumerate_pixels() {
            assert_eq!(p.0[0], if x < 4 { 0 } else { KEEP });
        }
    }

    #[test]
    fn output_is_binary() {
        let gray = GrayImage::from_fn(16, 16, |x, y| Luma([((x * 16 + y) % 256) as u8]));
        let (binary, _) = otsu_binarize(&gray);
        assert!(binary.pixels().all(|p| p.0[0] == 0 || p.0[0] == KEEP));
        assert_eq!(binary.dimensions(), gray.dimensions());
    }
}
