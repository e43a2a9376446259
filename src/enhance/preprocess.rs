//! Illumination normalization and capture quality scoring.

use crate::filter::gaussian_blur;
use crate::filter::gradient::{coherence, sobel};
use crate::image::{FloatImage, ImageView, OwnedImage};
use crate::trace::{trace_event, trace_span};
use crate::util::{RidgeError, RidgeResult};

/// Quality at or above which a capture is suitable for extraction.
pub const QUALITY_THRESHOLD: f64 = 60.0;

const QUALITY_BLOCK: usize = 16;
const MIN_STD: f32 = 4.0;
const OUTPUT_MEAN: f32 = 128.0;
const OUTPUT_GAIN: f32 = 50.0;
/// Block standard deviation below which a block carries no weight.
const FLAT_STD: f64 = 4.0;
/// Block standard deviation at which a block carries full weight.
const TEXTURED_STD: f64 = 12.0;

/// Blur radii used by the preprocessor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PreprocessConfig {
    /// Sigma of the local mean estimate.
    pub sigma1: f32,
    /// Sigma of the local standard deviation estimate.
    pub sigma2: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            sigma1: 2.0,
            sigma2: 1.0,
        }
    }
}

/// Normalized image plus its capture quality.
#[derive(Clone, Debug)]
pub struct Preprocessed {
    /// Illumination-invariant grayscale image.
    pub image: OwnedImage,
    /// Quality score in [0, 100].
    pub quality: f64,
}

impl Preprocessed {
    /// True when the quality reaches [`QUALITY_THRESHOLD`].
    pub fn is_good(&self) -> bool {
        self.quality >= QUALITY_THRESHOLD
    }
}

/// Normalizes local brightness and contrast of `src`.
///
/// `sigma1` smooths the local mean and `sigma2` the local variance of the
/// mean-free signal. A low quality is reported, not treated as failure.
pub fn preprocess_fingerprint(
    src: ImageView<'_, u8>,
    sigma1: f32,
    sigma2: f32,
) -> RidgeResult<Preprocessed> {
    if src.width() < 3 || src.height() < 3 {
        return Err(RidgeError::Processing {
            reason: format!(
                "image {}x{} is too small to preprocess",
                src.width(),
                src.height()
            ),
        });
    }
    let _span = trace_span!("preprocess", width = src.width(), height = src.height()).entered();

    let f = src.to_float();
    let mean = gaussian_blur(&f, sigma1)?;
    let centered = f.zip_map(&mean, |v, m| v - m);
    let variance = gaussian_blur(&centered.map(|d| d * d), sigma2)?;
    let normalized = centered.zip_map(&variance, |d, var| {
        let std = var.max(0.0).sqrt().max(MIN_STD);
        OUTPUT_MEAN + OUTPUT_GAIN * d / std
    });

    let quality = quality_score(&f);
    trace_event!("preprocess_quality", quality = quality);
    Ok(Preprocessed {
        image: normalized.to_u8(),
        quality,
    })
}

/// Pixel-weighted mean of per-block `coherence * contrast_weight`, scaled
/// to [0, 100].
pub(crate) fn quality_score(f: &FloatImage) -> f64 {
    let (gx, gy) = sobel(f);
    let width = f.width();
    let height = f.height();
    let mut weighted = 0.0f64;
    let mut total = 0usize;

    for by in (0..height).step_by(QUALITY_BLOCK) {
        for bx in (0..width).step_by(QUALITY_BLOCK) {
            let bw = QUALITY_BLOCK.min(width - bx);
            let bh = QUALITY_BLOCK.min(height - by);
            let (mut gxx, mut gyy, mut gxy) = (0.0f32, 0.0f32, 0.0f32);
            let (mut sum, mut sum_sq) = (0.0f64, 0.0f64);
            for y in by..by + bh {
                for x in bx..bx + bw {
                    let (dx, dy) = (gx.at(x, y), gy.at(x, y));
                    gxx += dx * dx;
                    gyy += dy * dy;
                    gxy += dx * dy;
                    let v = f.at(x, y) as f64;
                    sum += v;
                    sum_sq += v * v;
                }
            }
            let n = (bw * bh) as f64;
            let mean = sum / n;
            let std = (sum_sq / n - mean * mean).max(0.0).sqrt();
            let weight = ((std - FLAT_STD) / (TEXTURED_STD - FLAT_STD)).clamp(0.0, 1.0);
            weighted += coherence(gxx, gyy, gxy) as f64 * weight * n;
            total += bw * bh;
        }
    }
    if total == 0 {
        return 0.0;
    }
    (100.0 * weighted / total as f64).clamp(0.0, 100.0)
}
