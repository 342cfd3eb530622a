//! 8x8 discrete cosine transform and its inverse.
//!
//! The separable 2D DCT-II operates on one channel of one 8x8 tile at a
//! time: a row pass followed by a column pass, each a sum over eight
//! cosine-basis terms with the standard `1/sqrt(2)` scaling on the
//! zero-frequency coefficient. Every perturbation stage in the crate
//! relies on `inverse(forward(x))` reconstructing `x` exactly (to within
//! floating-point epsilon), so the round trip is the engine's primary
//! correctness property.

use std::f64::consts::PI;
use std::sync::LazyLock;

/// Side length of a transform tile, in samples.
pub const BLOCK_SIZE: usize = 8;

/// Number of samples in one transform tile.
pub const BLOCK_AREA: usize = BLOCK_SIZE * BLOCK_SIZE;

/// Per-frequency normalization: `1/sqrt(2)` for the DC term, 1 otherwise.
const ALPHA: [f32; BLOCK_SIZE] = [
    std::f32::consts::FRAC_1_SQRT_2,
    1.0,
    1.0,
    1.0,
    1.0,
    1.0,
    1.0,
    1.0,
];

/// Cosine basis `cos((2n+1) * k * pi / 16)`, indexed `[k][n]`.
///
/// Computed once per process and never mutated afterwards.
static COS_BASIS: LazyLock<[[f32; BLOCK_SIZE]; BLOCK_SIZE]> = LazyLock::new(|| {
    let mut table = [[0.0_f32; BLOCK_SIZE]; BLOCK_SIZE];
    for (k, row) in table.iter_mut().enumerate() {
        for (n, cell) in row.iter_mut().enumerate() {
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
            {
                *cell = (((2 * n + 1) * k) as f64 * PI / (2.0 * BLOCK_SIZE as f64)).cos() as f32;
            }
        }
    }
    table
});

/// Forward 2D DCT of one 8x8 block, in place.
pub fn forward(block: &mut [f32; BLOCK_AREA]) {
    let cos = &*COS_BASIS;
    let mut temp = [0.0_f32; BLOCK_AREA];

    // Row pass: spatial x -> frequency u.
    for y in 0..BLOCK_SIZE {
        for u in 0..BLOCK_SIZE {
            let mut sum = 0.0;
            for x in 0..BLOCK_SIZE {
                sum += block[y * BLOCK_SIZE + x] * cos[u][x];
            }
            temp[y * BLOCK_SIZE + u] = sum * 0.5 * ALPHA[u];
        }
    }

    // Column pass: spatial y -> frequency v.
    for x in 0..BLOCK_SIZE {
        for v in 0..BLOCK_SIZE {
            let mut sum = 0.0;
            for y in 0..BLOCK_SIZE {
                sum += temp[y * BLOCK_SIZE + x] * cos[v][y];
            }
            block[v * BLOCK_SIZE + x] = sum * 0.5 * ALPHA[v];
        }
    }
}

/// Inverse 2D DCT of one 8x8 block, in place.
pub fn inverse(block: &mut [f32; BLOCK_AREA]) {
    let cos = &*COS_BASIS;
    let mut temp = [0.0_f32; BLOCK_AREA];

    // Row pass: frequency u -> spatial x.
    for y in 0..BLOCK_SIZE {
        for x in 0..BLOCK_SIZE {
            let mut sum = 0.0;
            for u in 0..BLOCK_SIZE {
                sum += block[y * BLOCK_SIZE + u] * cos[u][x] * ALPHA[u];
            }
            temp[y * BLOCK_SIZE + x] = sum * 0.5;
        }
    }

    // Column pass: frequency v -> spatial y.
    for x in 0..BLOCK_SIZE {
        for y in 0..BLOCK_SIZE {
            let mut sum = 0.0;
            for v in 0..BLOCK_SIZE {
                sum += temp[v * BLOCK_SIZE + x] * cos[v][y] * ALPHA[v];
            }
            block[y * BLOCK_SIZE + x] = sum * 0.5;
        }
    }
}
