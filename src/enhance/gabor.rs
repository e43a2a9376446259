//! Oriented Gabor filter bank tuned to the global ridge period.

use crate::image::FloatImage;
use std::f32::consts::{PI, TAU};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// One zero-mean even-symmetric Gabor kernel per quantized orientation.
#[derive(Clone, Debug)]
pub(crate) struct GaborBank {
    radius: usize,
    kernels: Vec<Vec<f32>>,
}

impl GaborBank {
    /// Builds `orientations` kernels for ridges of the given `period`.
    pub(crate) fn new(orientations: usize, period: f32, sigma: f32) -> Self {
        let radius = (3.0 * sigma).ceil().max(1.0) as usize;
        let side = 2 * radius + 1;
        let denom = 2.0 * sigma * sigma;
        let kernels = (0..orientations)
            .map(|i| {
                let theta = i as f32 * PI / orientations as f32;
                let (s, c) = theta.sin_cos();
                let mut envelope = Vec::with_capacity(side * side);
                let mut kernel = Vec::with_capacity(side * side);
                for ky in 0..side {
                    for kx in 0..side {
                        let x = kx as f32 - radius as f32;
                        let y = ky as f32 - radius as f32;
                        // Distance across the ridges.
                        let across = -x * s + y * c;
                        let g = (-(x * x + y * y) / denom).exp();
                        envelope.push(g);
                        kernel.push(g * (TAU * across / period).cos());
                    }
                }
                let env_sum: f32 = envelope.iter().sum();
                let dc = kernel.iter().sum::<f32>() / env_sum;
                for (k, g) in kernel.iter_mut().zip(&envelope) {
                    *k -= dc * g;
                }
                let norm: f32 = kernel.iter().map(|k| k.abs()).sum();
                if norm > 0.0 {
                    for k in kernel.iter_mut() {
                        *k /= norm;
                    }
                }
                kernel
            })
            .collect();
        Self { radius, kernels }
    }

    /// Bank index closest to the ridge direction `theta` (radians).
    pub(crate) fn index_for(&self, theta: f32) -> usize {
        let n = self.kernels.len();
        let step = PI / n as f32;
        ((theta.rem_euclid(PI) / step).round() as usize) % n
    }

    fn response_at(&self, src: &FloatImage, x: usize, y: usize, index: usize) -> f32 {
        let kernel = &self.kernels[index];
        let side = 2 * self.radius + 1;
        let r = self.radius as isize;
        let mut acc = 0.0f32;
        for ky in 0..side {
            let sy = y as isize + ky as isize - r;
            let row = &kernel[ky * side..(ky + 1) * side];
            for (kx, &w) in row.iter().enumerate() {
                acc += w * src.at_clamped(x as isize + kx as isize - r, sy);
            }
        }
        acc
    }

    fn filter_row(&self, src: &FloatImage, orientation: &[usize], y: usize) -> Vec<f32> {
        let width = src.width();
        (0..width)
            .map(|x| self.response_at(src, x, y, orientation[y * width + x]))
            .collect()
    }

    /// Filters every pixel with the kernel selected by `orientation`.
    pub(crate) fn filter(&self, src: &FloatImage, orientation: &[usize]) -> FloatImage {
        let rows: Vec<Vec<f32>> = (0..src.height())
            .map(|y| self.filter_row(src, orientation, y))
            .collect();
        FloatImage::from_parts(rows.concat(), src.width(), src.height())
    }

    /// Row-parallel variant of [`GaborBank::filter`].
    #[cfg(feature = "rayon")]
    pub(crate) fn filter_par(&self, src: &FloatImage, orientation: &[usize]) -> FloatImage {
        let rows: Vec<Vec<f32>> = (0..src.height())
            .into_par_iter()
            .map(|y| self.filter_row(src, orientation, y))
            .collect();
        FloatImage::from_parts(rows.concat(), src.width(), src.height())
    }
}
