//! Style disruption: chrominance shifts, edge-targeted noise, and
//! multi-frequency texture noise.
//!
//! The three sub-stages are independently toggleable but share one
//! seeded RNG stream, so enabling a different combination of sub-stages
//! produces genuinely different output rather than a reordering of the
//! same draws.

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::color;
use crate::rng::SeedRng;

/// Maximum chrominance shift at full intensity, in LAB units.
const COLOR_SHIFT_MAX: f64 = 15.0;

/// Maximum edge noise amplitude at full intensity.
const EDGE_STRENGTH_MAX: f32 = 30.0;
/// Edge noise amplitude in sketch mode, tuned for line art.
const EDGE_STRENGTH_SKETCH: f32 = 50.0;
/// Normalized gradient magnitude below which a pixel is left clean.
const EDGE_THRESHOLD: f32 = 0.1;
/// Sketch-mode threshold, lowered to catch thin lines.
const EDGE_THRESHOLD_SKETCH: f32 = 0.05;

/// Maximum texture grating amplitude at full intensity.
const TEXTURE_STRENGTH_MAX: f32 = 8.0;
/// Spatial periods of the texture gratings, in pixels.
const TEXTURE_FREQUENCIES: [f32; 4] = [4.0, 8.0, 16.0, 32.0];
/// Per-frequency weights, decreasing with frequency.
const TEXTURE_WEIGHTS: [f32; 4] = [0.4, 0.3, 0.2, 0.1];

/// Which style-disruption sub-stages run, and in what flavor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleOptions {
    /// Perturb chrominance in LAB space, leaving luminance alone.
    pub color_shift: bool,
    /// Add noise where the Sobel gradient is strong.
    pub edge_disruption: bool,
    /// Add layered sinusoidal gratings plus per-channel noise.
    pub texture_confusion: bool,
    /// Line-art tuning: stronger edge noise, lower edge threshold.
    pub sketch_mode: bool,
}

impl StyleOptions {
    /// Whether any sub-stage would run.
    #[must_use]
    pub fn any_enabled(&self) -> bool {
        self.color_shift || self.edge_disruption || self.texture_confusion
    }
}

/// Apply the enabled sub-stages in place, in fixed order.
///
/// `intensity` is the same 0-100 knob the perturbation stage uses.
pub fn apply_style(image: &mut RgbaImage, options: &StyleOptions, intensity: f32, seed: &str) {
    let mut rng = SeedRng::new(seed);

    if options.color_shift {
        color_shift(image, intensity, &mut rng);
    }
    if options.edge_disruption {
        edge_disruption(image, intensity, options.sketch_mode, &mut rng);
    }
    if options.texture_confusion {
        texture_confusion(image, intensity, &mut rng);
    }
}

/// Shift the a/b channels of every pixel by bounded noise.
///
/// Luminance is deliberately untouched so perceived brightness is
/// stable even at maximum intensity.
fn color_shift(image: &mut RgbaImage, intensity: f32, rng: &mut SeedRng) {
    let strength = f64::from(intensity) / 100.0 * COLOR_SHIFT_MAX;

    for pixel in image.pixels_mut() {
        let (l, a, b) = color::rgb_to_lab(pixel[0], pixel[1], pixel[2]);
        let noise_a = (rng.next_f64() - 0.5) * 2.0 * strength;
        let noise_b = (rng.next_f64() - 0.5) * 2.0 * strength;
        let (r, g, bb) = color::lab_to_rgb(l, a + noise_a, b + noise_b);
        pixel[0] = r;
        pixel[1] = g;
        pixel[2] = bb;
    }
}

/// Add noise where shape-recognition features live.
///
/// The gradient is computed on an immutable snapshot so earlier writes
/// in the scan never feed back into later magnitudes. Pixels below the
/// threshold draw no RNG values and stay byte-identical; flat regions
/// must remain clean.
fn edge_disruption(image: &mut RgbaImage, intensity: f32, sketch_mode: bool, rng: &mut SeedRng) {
    let width = image.width() as usize;
    let height = image.height() as usize;
    if width < 3 || height < 3 {
        return;
    }

    let strength = intensity / 100.0
        * if sketch_mode {
            EDGE_STRENGTH_SKETCH
        } else {
            EDGE_STRENGTH_MAX
        };
    let threshold = if sketch_mode {
        EDGE_THRESHOLD_SKETCH
    } else {
        EDGE_THRESHOLD
    };

    const SOBEL_X: [f32; 9] = [-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0];
    const SOBEL_Y: [f32; 9] = [-1.0, -2.0, -1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 1.0];

    let snapshot = image.clone();
    let gray = |x: usize, y: usize| -> f32 {
        #[allow(clippy::cast_possible_truncation)]
        let p = snapshot.get_pixel(x as u32, y as u32);
        (f32::from(p[0]) + f32::from(p[1]) + f32::from(p[2])) / 3.0
    };

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut gx = 0.0_f32;
            let mut gy = 0.0_f32;
            for ky in 0..3 {
                for kx in 0..3 {
                    let sample = gray(x + kx - 1, y + ky - 1);
                    gx += sample * SOBEL_X[ky * 3 + kx];
                    gy += sample * SOBEL_Y[ky * 3 + kx];
                }
            }

            let magnitude = (gx * gx + gy * gy).sqrt();
            let normalized = (magnitude / 255.0).min(1.0);
            if normalized <= threshold {
                continue;
            }

            let multiplier = if sketch_mode {
                normalized.sqrt()
            } else {
                normalized
            };
            let scale = multiplier * strength;

            #[allow(clippy::cast_possible_truncation)]
            let pixel = image.get_pixel_mut(x as u32, y as u32);
            for c in 0..3 {
                #[allow(clippy::cast_possible_truncation)]
                let noise = ((rng.next_f64() - 0.5) * 2.0) as f32 * scale;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    pixel[c] = (f32::from(pixel[c]) + noise).clamp(0.0, 255.0).round() as u8;
                }
            }
        }
    }
}

/// Layered sinusoidal gratings plus small per-channel noise.
///
/// The grating phase is drawn fresh for every pixel and every frequency.
/// The draw order per pixel is fixed at four phase draws followed by
/// three channel offsets; reordering would change seeded output.
fn texture_confusion(image: &mut RgbaImage, intensity: f32, rng: &mut SeedRng) {
    let strength = intensity / 100.0 * TEXTURE_STRENGTH_MAX;
    let (width, height) = image.dimensions();

    for y in 0..height {
        for x in 0..width {
            let mut pattern = 0.0_f32;
            for (freq, weight) in TEXTURE_FREQUENCIES.iter().zip(TEXTURE_WEIGHTS.iter()) {
                #[allow(clippy::cast_possible_truncation)]
                let phase = (rng.next_f64() * 2.0 * std::f64::consts::PI) as f32;
                #[allow(clippy::cast_precision_loss)]
                let contribution =
                    (x as f32 / freq + phase).sin() * (y as f32 / freq + phase).cos();
                pattern += contribution * weight;
            }

            let perturbation = pattern * strength;
            let pixel = image.get_pixel_mut(x, y);
            for c in 0..3 {
                #[allow(clippy::cast_possible_truncation)]
                let offset = ((rng.next_f64() - 0.5) * 2.0) as f32;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    pixel[c] = (f32::from(pixel[c]) + perturbation + offset)
                        .clamp(0.0, 255.0)
                        .round() as u8;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn all_on() -> StyleOptions {
        StyleOptions {
            color_shift: true,
            edge_disruption: true,
            texture_confusion: true,
            sketch_mode: false,
        }
    }

    #[test]
    fn disabled_options_are_identity() {
        let mut image = RgbaImage::from_pixel(16, 16, Rgba([120, 80, 40, 255]));
        let before = image.as_raw().clone();
        apply_style(&mut image, &StyleOptions::default(), 70.0, "test-seed");
        assert_eq!(image.as_raw(), &before);
    }

    #[test]
    fn full_style_pass_is_reproducible() {
        let make = || {
            RgbaImage::from_fn(48, 48, |x, y| {
                #[allow(clippy::cast_possible_truncation)]
                Rgba([(x * 5 % 256) as u8, (y * 7 % 256) as u8, 90, 255])
            })
        };
        let mut a = make();
        let mut b = make();
        apply_style(&mut a, &all_on(), 70.0, "test-seed");
        apply_style(&mut b, &all_on(), 70.0, "test-seed");
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn sub_stage_selection_changes_output() {
        let make = || RgbaImage::from_pixel(32, 32, Rgba([200, 100, 50, 255]));
        let mut color_only = make();
        let mut texture_only = make();
        apply_style(
            &mut color_only,
            &StyleOptions {
                color_shift: true,
                ..StyleOptions::default()
            },
            70.0,
            "test-seed",
        );
        apply_style(
            &mut texture_only,
            &StyleOptions {
                texture_confusion: true,
                ..StyleOptions::default()
            },
            70.0,
            "test-seed",
        );
        assert_ne!(color_only.as_raw(), texture_only.as_raw());
    }

    #[test]
    fn color_shift_roughly_preserves_luminance() {
        // Low-chroma base color keeps the shifted values inside the sRGB
        // gamut, so clamping cannot leak into luminance.
        let mut image = RgbaImage::from_pixel(16, 16, Rgba([120, 110, 100, 255]));
        let (l_before, _, _) = color::rgb_to_lab(120, 110, 100);
        apply_style(
            &mut image,
            &StyleOptions {
                color_shift: true,
                ..StyleOptions::default()
            },
            100.0,
            "test-seed",
        );

        let mut max_drift = 0.0_f64;
        for pixel in image.pixels() {
            let (l, _, _) = color::rgb_to_lab(pixel[0], pixel[1], pixel[2]);
            max_drift = max_drift.max((l - l_before).abs());
        }
        assert!(
            max_drift < 2.0,
            "luminance drifted by {max_drift} LAB units"
        );
    }

    #[test]
    fn edge_disruption_leaves_flat_images_clean() {
        let mut image = RgbaImage::from_pixel(32, 32, Rgba([128, 128, 128, 255]));
        let before = image.as_raw().clone();
        apply_style(
            &mut image,
            &StyleOptions {
                edge_disruption: true,
                ..StyleOptions::default()
            },
            100.0,
            "test-seed",
        );
        assert_eq!(
            image.as_raw(),
            &before,
            "flat image has no edges, nothing should change"
        );
    }

    #[test]
    fn edge_disruption_targets_edges() {
        // Hard vertical edge down the middle.
        let mut image = RgbaImage::from_fn(32, 32, |x, _| {
            if x < 16 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let before = image.clone();
        apply_style(
            &mut image,
            &StyleOptions {
                edge_disruption: true,
                ..StyleOptions::default()
            },
            100.0,
            "test-seed",
        );

        // Corners are flat; the boundary column is not.
        assert_eq!(image.get_pixel(2, 16), before.get_pixel(2, 16));
        let boundary_changed = (1..31).any(|y| image.get_pixel(16, y) != before.get_pixel(16, y));
        assert!(boundary_changed, "edge column was not perturbed");
    }

    #[test]
    fn texture_confusion_changes_pixels() {
        let mut image = RgbaImage::from_pixel(32, 32, Rgba([100, 100, 100, 255]));
        let before = image.as_raw().clone();
        apply_style(
            &mut image,
            &StyleOptions {
                texture_confusion: true,
                ..StyleOptions::default()
            },
            70.0,
            "test-seed",
        );
        assert_ne!(image.as_raw(), &before);
    }

    #[test]
    fn alpha_channel_is_untouched() {
        let mut image = RgbaImage::from_pixel(32, 32, Rgba([60, 70, 80, 33]));
        apply_style(&mut image, &all_on(), 100.0, "test-seed");
        for pixel in image.pixels() {
            assert_eq!(pixel[3], 33, "alpha was modified");
        }
    }
}
