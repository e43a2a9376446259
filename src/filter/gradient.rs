//! Image gradients and the smoothed gradient structure tensor.

use crate::filter::gaussian::gaussian_blur;
use crate::image::FloatImage;
use crate::util::RidgeResult;
use std::f32::consts::FRAC_PI_2;

/// 3x3 Sobel derivatives `(gx, gy)` with replicated borders.
pub fn sobel(src: &FloatImage) -> (FloatImage, FloatImage) {
    let width = src.width();
    let height = src.height();
    let mut gx = Vec::with_capacity(width * height);
    let mut gy = Vec::with_capacity(width * height);
    for y in 0..height as isize {
        for x in 0..width as isize {
            let p = |dx: isize, dy: isize| src.at_clamped(x + dx, y + dy);
            let dx = (p(1, -1) + 2.0 * p(1, 0) + p(1, 1)) - (p(-1, -1) + 2.0 * p(-1, 0) + p(-1, 1));
            let dy = (p(-1, 1) + 2.0 * p(0, 1) + p(1, 1)) - (p(-1, -1) + 2.0 * p(0, -1) + p(1, -1));
            gx.push(dx);
            gy.push(dy);
        }
    }
    (
        FloatImage::from_parts(gx, width, height),
        FloatImage::from_parts(gy, width, height),
    )
}

/// Gaussian-smoothed gradient moments `Gxx`, `Gyy`, `Gxy` per pixel.
pub struct StructureTensor {
    gxx: FloatImage,
    gyy: FloatImage,
    gxy: FloatImage,
}

impl StructureTensor {
    /// Computes the tensor of `src` smoothed with `sigma`.
    pub fn compute(src: &FloatImage, sigma: f32) -> RidgeResult<Self> {
        let (gx, gy) = sobel(src);
        let gxx = gaussian_blur(&gx.zip_map(&gx, |a, b| a * b), sigma)?;
        let gyy = gaussian_blur(&gy.zip_map(&gy, |a, b| a * b), sigma)?;
        let gxy = gaussian_blur(&gx.zip_map(&gy, |a, b| a * b), sigma)?;
        Ok(Self { gxx, gyy, gxy })
    }

    /// Ridge orientation at `(x, y)`, in [0, π): the direction along the ridges.
    pub fn orientation(&self, x: usize, y: usize) -> f32 {
        let (gxx, gyy, gxy) = self.moments(x, y);
        ridge_orientation(gxx, gyy, gxy)
    }

    /// Coherence at `(x, y)` in [0, 1]; 1 for a perfectly oriented pattern.
    pub fn coherence(&self, x: usize, y: usize) -> f32 {
        let (gxx, gyy, gxy) = self.moments(x, y);
        coherence(gxx, gyy, gxy)
    }

    /// Local gradient energy `Gxx + Gyy` at `(x, y)`.
    pub fn energy(&self, x: usize, y: usize) -> f32 {
        let (gxx, gyy, _) = self.moments(x, y);
        gxx + gyy
    }

    #[inline]
    fn moments(&self, x: usize, y: usize) -> (f32, f32, f32) {
        (self.gxx.at(x, y), self.gyy.at(x, y), self.gxy.at(x, y))
    }

    /// Width of the tensor field.
    pub fn width(&self) -> usize {
        self.gxx.width()
    }

    /// Height of the tensor field.
    pub fn height(&self) -> usize {
        self.gxx.height()
    }
}

/// Ridge direction from summed gradient moments, in [0, π).
pub(crate) fn ridge_orientation(gxx: f32, gyy: f32, gxy: f32) -> f32 {
    let gradient_dir = 0.5 * (2.0 * gxy).atan2(gxx - gyy);
    let ridge = gradient_dir + FRAC_PI_2;
    ridge.rem_euclid(std::f32::consts::PI)
}

/// Coherence from summed gradient moments.
pub(crate) fn coherence(gxx: f32, gyy: f32, gxy: f32) -> f32 {
    let sum = gxx + gyy;
    if sum <= 1e-6 {
        return 0.0;
    }
    let diff = gxx - gyy;
    ((diff * diff + 4.0 * gxy * gxy).sqrt() / sum).clamp(0.0, 1.0)
}
