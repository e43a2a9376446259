//! SIMD row convolution using the `wide` crate.
//!
//! The horizontal Gaussian pass dominates smoothing cost; this module
//! evaluates eight output pixels per step with `f32x8`, accumulating kernel
//! taps in the same order as the scalar path.

use wide::f32x8;

const LANES: usize = 8;

#[inline]
fn load_f32x8(slice: &[f32]) -> f32x8 {
    f32x8::from([
        slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
    ])
}

/// Convolves a replicate-padded row, appending `width` outputs to `out`.
pub(crate) fn convolve_padded_row_simd(
    padded: &[f32],
    kernel: &[f32],
    width: usize,
    out: &mut Vec<f32>,
) {
    let simd_end = width / LANES * LANES;
    let mut x = 0;
    while x < simd_end {
        let mut acc = f32x8::ZERO;
        for (k, &weight) in kernel.iter().enumerate() {
            acc += f32x8::splat(weight) * load_f32x8(&padded[x + k..]);
        }
        out.extend_from_slice(&acc.to_array());
        x += LANES;
    }
    while x < width {
        let mut acc = 0.0f32;
        for (k, &weight) in kernel.iter().enumerate() {
            acc += weight * padded[x + k];
        }
        out.push(acc);
        x += 1;
    }
}
