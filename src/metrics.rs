//! Perceptual quality metrics between equally-sized pixel buffers.
//!
//! PSNR gates the retry loop in the orchestrator; SSIM is reported in the
//! final stats. Both operate on raw interleaved RGBA bytes.

use crate::error::{Error, Result};

/// SSIM stabilizing constant `(0.01 * 255)^2`.
const SSIM_C1: f64 = 6.5025;
/// SSIM stabilizing constant `(0.03 * 255)^2`.
const SSIM_C2: f64 = 58.5225;
/// SSIM window side length, in pixels.
const SSIM_WINDOW: usize = 8;

/// Peak Signal-to-Noise Ratio between two equal-length byte buffers.
///
/// The mean squared error runs across all samples, alpha included.
/// Returns `f64::INFINITY` for an exact match.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] when the buffers differ in length;
/// this indicates an internal invariant break, not bad user input.
pub fn psnr(original: &[u8], modified: &[u8]) -> Result<f64> {
    if original.len() != modified.len() {
        return Err(Error::DimensionMismatch {
            expected: original.len(),
            actual: modified.len(),
        });
    }
    if original.is_empty() {
        return Ok(f64::INFINITY);
    }

    let mut mse = 0.0_f64;
    for (&a, &b) in original.iter().zip(modified.iter()) {
        let diff = f64::from(a) - f64::from(b);
        mse += diff * diff;
    }
    #[allow(clippy::cast_precision_loss)]
    {
        mse /= original.len() as f64;
    }

    if mse == 0.0 {
        Ok(f64::INFINITY)
    } else {
        Ok(10.0 * (255.0 * 255.0 / mse).log10())
    }
}

/// Structural Similarity Index over non-overlapping 8x8 windows.
///
/// Works on BT.601 luminance (weights 0.299/0.587/0.114) of the RGBA
/// buffers. Returns 1.0 when the image is too small for a single window.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] when either buffer does not hold
/// `width * height` RGBA pixels.
pub fn ssim(original: &[u8], modified: &[u8], width: u32, height: u32) -> Result<f64> {
    let pixels = width as usize * height as usize;
    let expected = pixels * 4;
    for buffer in [original, modified] {
        if buffer.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: buffer.len(),
            });
        }
    }

    let gray1 = luminance(original, pixels);
    let gray2 = luminance(modified, pixels);

    let width = width as usize;
    let height = height as usize;

    let mut sum = 0.0_f64;
    let mut windows = 0_u32;

    let mut y = 0;
    while y + SSIM_WINDOW <= height {
        let mut x = 0;
        while x + SSIM_WINDOW <= width {
            sum += window_ssim(&gray1, &gray2, width, x, y);
            windows += 1;
            x += SSIM_WINDOW;
        }
        y += SSIM_WINDOW;
    }

    if windows == 0 {
        Ok(1.0)
    } else {
        Ok(sum / f64::from(windows))
    }
}

fn luminance(data: &[u8], pixels: usize) -> Vec<f64> {
    let mut gray = Vec::with_capacity(pixels);
    for i in 0..pixels {
        let idx = i * 4;
        gray.push(
            0.299 * f64::from(data[idx])
                + 0.587 * f64::from(data[idx + 1])
                + 0.114 * f64::from(data[idx + 2]),
        );
    }
    gray
}

fn window_ssim(gray1: &[f64], gray2: &[f64], width: usize, x: usize, y: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let n = (SSIM_WINDOW * SSIM_WINDOW) as f64;

    let mut mean1 = 0.0;
    let mut mean2 = 0.0;
    for wy in 0..SSIM_WINDOW {
        for wx in 0..SSIM_WINDOW {
            let idx = (y + wy) * width + (x + wx);
            mean1 += gray1[idx];
            mean2 += gray2[idx];
        }
    }
    mean1 /= n;
    mean2 /= n;

    let mut var1 = 0.0;
    let mut var2 = 0.0;
    let mut covar = 0.0;
    for wy in 0..SSIM_WINDOW {
        for wx in 0..SSIM_WINDOW {
            let idx = (y + wy) * width + (x + wx);
            let d1 = gray1[idx] - mean1;
            let d2 = gray2[idx] - mean2;
            var1 += d1 * d1;
            var2 += d2 * d2;
            covar += d1 * d2;
        }
    }
    // Sample variance, n - 1.
    var1 /= n - 1.0;
    var2 /= n - 1.0;
    covar /= n - 1.0;

    let numerator = (2.0 * mean1 * mean2 + SSIM_C1) * (2.0 * covar + SSIM_C2);
    let denominator = (mean1 * mean1 + mean2 * mean2 + SSIM_C1) * (var1 + var2 + SSIM_C2);
    numerator / denominator
}
