//! Separable Gaussian smoothing.

use crate::image::FloatImage;
use crate::util::{RidgeError, RidgeResult};

/// Smallest sigma whose kernel stays finite in `f32`.
pub const MIN_SIGMA: f32 = 0.1;
/// Largest sigma; its kernel spans a few thousand taps.
pub const MAX_SIGMA: f32 = 1024.0;

/// Builds a normalized 1D Gaussian kernel with radius `ceil(3 * sigma)`.
///
/// `sigma` must lie in [`MIN_SIGMA`, `MAX_SIGMA`].
pub fn gaussian_kernel(sigma: f32) -> RidgeResult<Vec<f32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(RidgeError::InvalidParameter {
            name: "sigma",
            reason: "must be finite and > 0",
        });
    }
    if !(MIN_SIGMA..=MAX_SIGMA).contains(&sigma) {
        return Err(RidgeError::InvalidParameter {
            name: "sigma",
            reason: "must lie in [0.1, 1024]",
        });
    }
    let radius = (3.0 * sigma).ceil().max(1.0) as usize;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let d = i as f32 - radius as f32;
            (-d * d / denom).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in kernel.iter_mut() {
        *k /= sum;
    }
    Ok(kernel)
}

/// Horizontal pass: each row convolved with an odd-length kernel.
pub(crate) fn convolve_rows(src: &FloatImage, kernel: &[f32]) -> FloatImage {
    let width = src.width();
    let radius = kernel.len() / 2;
    let mut out = Vec::with_capacity(src.data().len());
    let mut padded = vec![0.0f32; width + 2 * radius];
    for row in src.data().chunks_exact(width) {
        pad_row(row, radius, &mut padded);
        convolve_padded_row(&padded, kernel, width, &mut out);
    }
    FloatImage::from_parts(out, width, src.height())
}

#[cfg(not(feature = "simd"))]
fn convolve_padded_row(padded: &[f32], kernel: &[f32], width: usize, out: &mut Vec<f32>) {
    for x in 0..width {
        let window = &padded[x..x + kernel.len()];
        let acc = window
            .iter()
            .zip(kernel.iter())
            .fold(0.0f32, |acc, (&v, &k)| acc + v * k);
        out.push(acc);
    }
}

#[cfg(feature = "simd")]
fn convolve_padded_row(padded: &[f32], kernel: &[f32], width: usize, out: &mut Vec<f32>) {
    crate::filter::simd::convolve_padded_row_simd(padded, kernel, width, out);
}

fn pad_row(row: &[f32], radius: usize, padded: &mut [f32]) {
    let width = row.len();
    let first = row[0];
    let last = row[width - 1];
    padded[..radius].fill(first);
    padded[radius..radius + width].copy_from_slice(row);
    padded[radius + width..].fill(last);
}

/// Vertical pass: accumulates whole rows so the inner loop runs along x.
pub(crate) fn convolve_cols(src: &FloatImage, kernel: &[f32]) -> FloatImage {
    let width = src.width();
    let height = src.height();
    let radius = kernel.len() as isize / 2;
    let data = src.data();
    let mut out = vec![0.0f32; data.len()];
    for (y, out_row) in out.chunks_exact_mut(width).enumerate() {
        for (k, &weight) in kernel.iter().enumerate() {
            let sy = (y as isize + k as isize - radius).clamp(0, height as isize - 1) as usize;
            let src_row = &data[sy * width..(sy + 1) * width];
            for (dst, &v) in out_row.iter_mut().zip(src_row.iter()) {
                *dst += weight * v;
            }
        }
    }
    FloatImage::from_parts(out, width, height)
}

/// Convolves with `kx` along rows, then `ky` along columns.
pub fn convolve_separable(src: &FloatImage, kx: &[f32], ky: &[f32]) -> FloatImage {
    let tmp = convolve_rows(src, kx);
    convolve_cols(&tmp, ky)
}

/// Isotropic Gaussian blur.
pub fn gaussian_blur(src: &FloatImage, sigma: f32) -> RidgeResult<FloatImage> {
    let kernel = gaussian_kernel(sigma)?;
    Ok(convolve_separable(src, &kernel, &kernel))
}
