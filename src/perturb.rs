//! Multi-scale frequency-domain perturbation.
//!
//! The core disruption stage: for every participating 8x8 tile, a
//! checkerboard-signed offset is added to the mid-frequency DCT
//! coefficients and the tile is transformed back. Larger and smaller
//! effective block sizes are emulated without reimplementing the
//! transform: the image is bilinearly resampled so that an 8x8 tile at
//! the working resolution covers the desired span at the original
//! resolution, the same pass runs there, and only the difference it
//! introduced is resampled back and added on top.
//!
//! Tile participation, and nothing else here, is random; it draws from
//! one seeded generator threaded through the scales in their configured
//! order, so a fixed seed fixes the output exactly.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::dct::{self, BLOCK_AREA, BLOCK_SIZE};
use crate::rng::SeedRng;

/// Inclusive coefficient-frequency band (`u + v`) that receives the
/// checkerboard perturbation.
const MID_FREQ_RANGE: (usize, usize) = (3, 7);

/// Smallest working dimension a non-native scale may resample to.
const MIN_SCALED_DIM: f32 = 32.0;

/// Largest working dimension a non-native scale may resample to.
const MAX_SCALED_DIM: f32 = 4096.0;

/// Amplitude assumed for block scales missing from the amplitude table.
const FALLBACK_AMPLITUDE: f32 = 0.1;

/// Tuning for the perturbation pipeline.
///
/// `intensity` is the user-facing 0-100 knob; it is normalized against a
/// midpoint of 50, so the per-scale amplitudes apply unchanged at
/// intensity 50 and double at 100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerturbationConfig {
    /// Block scales to emulate, applied in this order.
    pub scales: Vec<u32>,
    /// Per-scale base amplitude table.
    pub amplitudes: Vec<(u32, f32)>,
    /// Probability that a tile at a given scale participates.
    pub density: f32,
    /// Requested perturbation intensity, 0-100.
    pub intensity: f32,
    /// Seed string; `None` selects the engine default.
    pub seed: Option<String>,
    /// Location of the optional universal pattern, resolved by the
    /// injected fetcher. Ignored outside strong mode.
    pub pattern_url: Option<String>,
    /// Mixing weight for the universal pattern.
    pub pattern_weight: f32,
}

impl Default for PerturbationConfig {
    fn default() -> Self {
        Self {
            scales: vec![16, 8, 4],
            amplitudes: vec![(16, 0.5), (8, 0.35), (4, 0.15)],
            density: 0.5,
            intensity: 50.0,
            seed: None,
            pattern_url: None,
            pattern_weight: 0.12,
        }
    }
}

impl PerturbationConfig {
    /// Base amplitude for a block scale, before intensity scaling.
    #[must_use]
    pub fn base_amplitude(&self, scale: u32) -> f32 {
        self.amplitudes
            .iter()
            .find(|(s, _)| *s == scale)
            .map_or(FALLBACK_AMPLITUDE, |(_, a)| *a)
    }
}

/// Run the multi-scale perturbation over `input` and return the result.
///
/// `multiplier` is the orchestrator's retry knob: the effective intensity
/// is `config.intensity * multiplier`. Alpha samples pass through
/// untouched at every scale.
#[must_use]
pub fn apply_multi_scale(
    input: &RgbaImage,
    config: &PerturbationConfig,
    seed: &str,
    multiplier: f32,
) -> RgbaImage {
    let intensity = config.intensity * multiplier / 50.0;
    let mut rng = SeedRng::new(seed);
    let mut working = input.clone();
    let (width, height) = working.dimensions();

    for &scale in &config.scales {
        let amplitude = config.base_amplitude(scale) * intensity;

        #[allow(clippy::cast_possible_truncation)]
        if scale as usize == BLOCK_SIZE {
            dct_pass(&mut working, amplitude, config.density, &mut rng);
            continue;
        }

        #[allow(clippy::cast_precision_loss)]
        let factor = BLOCK_SIZE as f32 / scale as f32;
        #[allow(clippy::cast_precision_loss)]
        let scaled_w_f = width as f32 * factor;
        #[allow(clippy::cast_precision_loss)]
        let scaled_h_f = height as f32 * factor;

        // Degenerate or runaway working resolutions skip the scale.
        if scaled_w_f > MAX_SCALED_DIM || scaled_h_f > MAX_SCALED_DIM {
            continue;
        }
        if scaled_w_f < MIN_SCALED_DIM || scaled_h_f < MIN_SCALED_DIM {
            continue;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (scaled_w, scaled_h) = (scaled_w_f.floor() as u32, scaled_h_f.floor() as u32);

        // The pass runs on a resample of the stage input, not the
        // accumulated result; only its difference is carried back.
        let mut scaled = imageops::resize(input, scaled_w, scaled_h, FilterType::Triangle);
        let pristine = scaled.clone();
        dct_pass(&mut scaled, amplitude, config.density, &mut rng);

        let mut diff = RgbaImage::new(scaled_w, scaled_h);
        for (d, (p, o)) in diff
            .pixels_mut()
            .zip(scaled.pixels().zip(pristine.pixels()))
        {
            for c in 0..3 {
                let delta = i16::from(p[c]) - i16::from(o[c]);
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    d[c] = (127 + delta).clamp(0, 255) as u8;
                }
            }
            d[3] = 255;
        }

        let diff_full = imageops::resize(&diff, width, height, FilterType::Triangle);
        for (w, d) in working.pixels_mut().zip(diff_full.pixels()) {
            for c in 0..3 {
                let value = i16::from(w[c]) + i16::from(d[c]) - 127;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    w[c] = value.clamp(0, 255) as u8;
                }
            }
        }
    }

    working
}

/// One full 8x8 tile pass at the image's native resolution.
///
/// Per tile, one RNG draw decides participation against `density`; the
/// draw happens whether or not the tile participates, keeping the stream
/// position independent of image content.
fn dct_pass(image: &mut RgbaImage, amplitude: f32, density: f32, rng: &mut SeedRng) {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let data: &mut [u8] = image;

    let pattern_scale = amplitude * 10.0;
    let mut block = [0.0_f32; BLOCK_AREA];

    for by in (0..height).step_by(BLOCK_SIZE) {
        for bx in (0..width).step_by(BLOCK_SIZE) {
            if rng.next_f64() > f64::from(density) {
                continue;
            }

            for channel in 0..3 {
                load_block(data, width, height, bx, by, channel, &mut block);
                dct::forward(&mut block);

                for v in 0..BLOCK_SIZE {
                    for u in 0..BLOCK_SIZE {
                        let freq = u + v;
                        if freq >= MID_FREQ_RANGE.0 && freq <= MID_FREQ_RANGE.1 {
                            let sign = if u % 2 == v % 2 { 1.0 } else { -1.0 };
                            block[v * BLOCK_SIZE + u] += sign * pattern_scale;
                        }
                    }
                }

                dct::inverse(&mut block);
                store_block(data, width, height, bx, by, channel, &block);
            }
        }
    }
}

/// Copy one channel of an 8x8 tile into a transform block.
///
/// Samples outside the image contribute zero; `store_block` never writes
/// them back, so the padding is invisible in the output.
pub(crate) fn load_block(
    data: &[u8],
    width: usize,
    height: usize,
    x0: usize,
    y0: usize,
    channel: usize,
    block: &mut [f32; BLOCK_AREA],
) {
    for y in 0..BLOCK_SIZE {
        for x in 0..BLOCK_SIZE {
            block[y * BLOCK_SIZE + x] = if x0 + x < width && y0 + y < height {
                f32::from(data[((y0 + y) * width + (x0 + x)) * 4 + channel])
            } else {
                0.0
            };
        }
    }
}

/// Write one channel of a transform block back, clamped to bytes.
pub(crate) fn store_block(
    data: &mut [u8],
    width: usize,
    height: usize,
    x0: usize,
    y0: usize,
    channel: usize,
    block: &[f32; BLOCK_AREA],
) {
    for y in 0..BLOCK_SIZE {
        for x in 0..BLOCK_SIZE {
            if x0 + x < width && y0 + y < height {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    data[((y0 + y) * width + (x0 + x)) * 4 + channel] =
                        block[y * BLOCK_SIZE + x].clamp(0.0, 255.0).round() as u8;
                }
            }
        }
    }
}
