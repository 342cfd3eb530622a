//! Universal adversarial pattern overlay.
//!
//! Strong mode can mix an externally supplied perturbation tensor over
//! the whole image. The pattern arrives as raw bytes from the injected
//! [`PatternFetcher`] collaborator and is interpreted as little-endian
//! `f32` RGB triplets forming a square tile, wrapped across the image by
//! modulo. Malformed bytes or a failed fetch degrade the stage to a
//! no-op; the overlay must never abort the pipeline.

use image::RgbaImage;

use crate::error::{Error, Result};

/// Changes smaller than this are treated as a normalized-range pattern
/// and rescaled by 255 before mixing.
const NEGLIGIBLE_CHANGE: f32 = 0.01;

/// Byte source for the universal pattern.
///
/// The engine never performs network or disk access itself; whoever
/// constructs it supplies this capability. Implementations should bound
/// their own fetch time; a hung fetch would stall the request, and the
/// pipeline's contract is to degrade, not to wait forever.
pub trait PatternFetcher: Send + Sync {
    /// Fetch the raw pattern bytes behind `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchFailure`] (or an I/O error) when the bytes
    /// cannot be retrieved; the caller treats any failure as "no
    /// pattern".
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Mix a fetched pattern over the image in place.
///
/// The pattern is validated before any pixel is touched, so an error
/// leaves the image byte-identical to its input.
///
/// # Errors
///
/// Returns [`Error::UnsupportedPattern`] when the bytes are not a whole
/// number of `f32`s or do not form a square RGB tile.
pub fn apply_overlay(image: &mut RgbaImage, pattern_bytes: &[u8], weight: f32) -> Result<()> {
    let (side, pattern) = parse_pattern(pattern_bytes)?;
    let (width, height) = image.dimensions();

    for y in 0..height {
        for x in 0..width {
            let px = (x as usize) % side;
            let py = (y as usize) % side;
            let base = (py * side + px) * 3;

            let pixel = image.get_pixel_mut(x, y);
            for c in 0..3 {
                let value = pattern[base + c];
                let mut change = value * weight;
                if change.abs() < NEGLIGIBLE_CHANGE && value != 0.0 {
                    change *= 255.0;
                }
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    pixel[c] = (f32::from(pixel[c]) + change).clamp(0.0, 255.0).round() as u8;
                }
            }
        }
    }

    Ok(())
}

/// Decode pattern bytes into a square RGB tile of `f32` samples.
fn parse_pattern(bytes: &[u8]) -> Result<(usize, Vec<f32>)> {
    if bytes.len() % 4 != 0 {
        return Err(Error::UnsupportedPattern(format!(
            "{} bytes is not a whole number of f32 samples",
            bytes.len()
        )));
    }

    let count = bytes.len() / 4;
    if count == 0 || count % 3 != 0 {
        return Err(Error::UnsupportedPattern(format!(
            "{count} samples do not form RGB triplets"
        )));
    }

    let pixels = count / 3;
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let side = (pixels as f64).sqrt().round() as usize;
    if side * side != pixels {
        return Err(Error::UnsupportedPattern(format!(
            "{pixels} RGB samples do not form a square tile"
        )));
    }

    let pattern = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok((side, pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn encode(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn malformed_length_leaves_image_untouched() {
        let mut image = RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255]));
        let before = image.as_raw().clone();

        let result = apply_overlay(&mut image, &[0u8; 17], 0.12);

        assert!(matches!(result, Err(Error::UnsupportedPattern(_))));
        assert_eq!(image.as_raw(), &before, "degraded stage mutated pixels");
    }

    #[test]
    fn non_square_pattern_is_rejected() {
        // Two RGB pixels: valid triplets, but not a square tile.
        let bytes = encode(&[1.0; 6]);
        let mut image = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
        assert!(apply_overlay(&mut image, &bytes, 0.12).is_err());
    }

    #[test]
    fn single_pixel_pattern_tiles_everywhere() {
        // One RGB pixel with large values: change = 100 * 0.12 = 12.
        let bytes = encode(&[100.0, 100.0, 100.0]);
        let mut image = RgbaImage::from_pixel(4, 4, Rgba([50, 50, 50, 255]));

        apply_overlay(&mut image, &bytes, 0.12).unwrap();

        for pixel in image.pixels() {
            assert_eq!(pixel[0], 62);
            assert_eq!(pixel[1], 62);
            assert_eq!(pixel[2], 62);
            assert_eq!(pixel[3], 255, "alpha was modified");
        }
    }

    #[test]
    fn normalized_patterns_are_rescaled() {
        // value 0.05, weight 0.12: raw change 0.006 < 0.01, so it is
        // rescaled by 255 to 1.53.
        let bytes = encode(&[0.05, 0.05, 0.05]);
        let mut image = RgbaImage::from_pixel(2, 2, Rgba([100, 100, 100, 255]));

        apply_overlay(&mut image, &bytes, 0.12).unwrap();

        for pixel in image.pixels() {
            assert_eq!(pixel[0], 102, "rescale compensation missing");
        }
    }

    #[test]
    fn zero_pattern_is_identity() {
        let bytes = encode(&[0.0; 12]); // 2x2 tile of zeros
        let mut image = RgbaImage::from_pixel(4, 4, Rgba([77, 88, 99, 255]));
        let before = image.as_raw().clone();

        apply_overlay(&mut image, &bytes, 0.12).unwrap();

        assert_eq!(image.as_raw(), &before);
    }

    #[test]
    fn negative_values_darken() {
        let bytes = encode(&[-100.0, -100.0, -100.0]);
        let mut image = RgbaImage::from_pixel(2, 2, Rgba([50, 50, 50, 255]));

        apply_overlay(&mut image, &bytes, 0.12).unwrap();

        for pixel in image.pixels() {
            assert_eq!(pixel[0], 38);
        }
    }
}
