//! sRGB to CIE L*a*b* color conversion.
//!
//! The style-disruption stage perturbs chrominance in a perceptually
//! uniform space so brightness stays untouched. Conversion goes through
//! the standard chain: sRGB gamma expansion, linear RGB to CIE XYZ under
//! the D65 white point, then the XYZ to L*a*b* nonlinearity with its
//! cube-root branch above 0.008856.
//!
//! The round trip is visually lossless: after rounding back to bytes,
//! every channel lands within 1 of its input.

/// D65 reference white, X component.
const WHITE_X: f64 = 0.950_47;
/// D65 reference white, Z component.
const WHITE_Z: f64 = 1.088_83;

/// Threshold between the cube-root and linear branches of f(t).
const LAB_EPSILON: f64 = 0.008_856;
/// Inverse branch point, the conventional rounding of f(LAB_EPSILON).
const LAB_F_EPSILON: f64 = 0.206_893;
/// Slope of the linear branch.
const LAB_KAPPA: f64 = 7.787;

/// Convert an sRGB byte triplet to CIE L*a*b*.
#[must_use]
pub fn rgb_to_lab(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let rl = srgb_to_linear(f64::from(r) / 255.0);
    let gl = srgb_to_linear(f64::from(g) / 255.0);
    let bl = srgb_to_linear(f64::from(b) / 255.0);

    let x = (rl * 0.412_456_4 + gl * 0.357_576_1 + bl * 0.180_437_5) / WHITE_X;
    let y = rl * 0.212_672_9 + gl * 0.715_152_2 + bl * 0.072_175_0;
    let z = (rl * 0.019_333_9 + gl * 0.119_192_0 + bl * 0.950_304_1) / WHITE_Z;

    let fx = lab_f(x);
    let fy = lab_f(y);
    let fz = lab_f(z);

    (116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

/// Convert CIE L*a*b* back to an sRGB byte triplet, rounded and clamped.
#[must_use]
pub fn lab_to_rgb(l: f64, a: f64, b: f64) -> (u8, u8, u8) {
    let fy = (l + 16.0) / 116.0;
    let fx = a / 500.0 + fy;
    let fz = fy - b / 200.0;

    let x = WHITE_X * lab_f_inv(fx);
    let y = lab_f_inv(fy);
    let z = WHITE_Z * lab_f_inv(fz);

    let rl = x * 3.240_454_2 + y * -1.537_138_5 + z * -0.498_531_4;
    let gl = x * -0.969_266_0 + y * 1.876_010_8 + z * 0.041_556_0;
    let bl = x * 0.055_643_4 + y * -0.204_025_9 + z * 1.057_225_2;

    (
        quantize(linear_to_srgb(rl)),
        quantize(linear_to_srgb(gl)),
        quantize(linear_to_srgb(bl)),
    )
}

/// sRGB gamma expansion to linear light.
fn srgb_to_linear(c: f64) -> f64 {
    if c > 0.040_45 {
        ((c + 0.055) / 1.055).powf(2.4)
    } else {
        c / 12.92
    }
}

/// Linear light back to sRGB gamma.
fn linear_to_srgb(c: f64) -> f64 {
    if c > 0.003_130_8 {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    } else {
        12.92 * c
    }
}

/// The CIE f(t) nonlinearity.
fn lab_f(t: f64) -> f64 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        LAB_KAPPA * t + 16.0 / 116.0
    }
}

/// Inverse of [`lab_f`].
fn lab_f_inv(f: f64) -> f64 {
    if f > LAB_F_EPSILON {
        f * f * f
    } else {
        (f - 16.0 / 116.0) / LAB_KAPPA
    }
}

fn quantize(c: f64) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        (c * 255.0).round().clamp(0.0, 255.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_within_one_per_channel() {
        // A coarse but representative lattice of the byte cube, plus the
        // extremes where the gamma and f(t) branches switch over.
        let samples: Vec<u8> = (0u16..=255).step_by(17).map(|v| v as u8).collect();
        for &r in &samples {
            for &g in &samples {
                for &b in &samples {
                    let (l, a, bb) = rgb_to_lab(r, g, b);
                    let (r2, g2, b2) = lab_to_rgb(l, a, bb);
                    for (orig, back) in [(r, r2), (g, g2), (b, b2)] {
                        let diff = (i16::from(orig) - i16::from(back)).abs();
                        assert!(
                            diff <= 1,
                            "({r},{g},{b}) came back as ({r2},{g2},{b2}), diff {diff}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn white_maps_to_l_100() {
        let (l, a, b) = rgb_to_lab(255, 255, 255);
        assert!((l - 100.0).abs() < 0.1, "L of white is {l}");
        assert!(a.abs() < 0.1 && b.abs() < 0.1, "white chroma ({a}, {b})");
    }

    #[test]
    fn black_maps_to_l_0() {
        let (l, a, b) = rgb_to_lab(0, 0, 0);
        assert!(l.abs() < 0.1, "L of black is {l}");
        assert!(a.abs() < 0.1 && b.abs() < 0.1, "black chroma ({a}, {b})");
    }

    #[test]
    fn grays_carry_no_chroma() {
        for v in [32u8, 64, 128, 200] {
            let (_, a, b) = rgb_to_lab(v, v, v);
            assert!(
                a.abs() < 0.05 && b.abs() < 0.05,
                "gray {v} has chroma ({a}, {b})"
            );
        }
    }

    #[test]
    fn red_has_positive_a() {
        let (_, a, _) = rgb_to_lab(255, 0, 0);
        assert!(a > 50.0, "a* of pure red is {a}");
    }

    #[test]
    fn chroma_shift_preserves_luminance() {
        let (l, a, b) = rgb_to_lab(200, 100, 50);
        let (r2, g2, b2) = lab_to_rgb(l, a + 5.0, b - 5.0);
        let (l2, _, _) = rgb_to_lab(r2, g2, b2);
        assert!(
            (l - l2).abs() < 1.0,
            "luminance moved from {l} to {l2} under a chroma-only shift"
        );
    }
}
