//! Preprocessing and ridge enhancement.
//!
//! [`preprocess_fingerprint`] flattens illumination and scores the capture;
//! [`enhance_fingerprint`] sharpens ridges with a Gabor bank steered by the
//! local orientation field and marks unreliable regions in an energy mask.

mod frequency;
mod gabor;
mod preprocess;

pub use preprocess::{preprocess_fingerprint, PreprocessConfig, Preprocessed, QUALITY_THRESHOLD};

use crate::enhance::frequency::PeriodEstimator;
use crate::enhance::gabor::GaborBank;
use crate::filter::morphology::{erode, open, KernelSize};
use crate::filter::StructureTensor;
use crate::image::{FloatImage, ImageView, Mask, OwnedImage};
use crate::trace::{trace_event, trace_span};
use crate::util::math::quantile;
use crate::util::{RidgeError, RidgeResult};

const OUTPUT_GAIN: f32 = 60.0;
const MAX_ORIENTATIONS: usize = 180;
const MAX_PERIOD: f32 = 64.0;
/// Gray level separating ridges (below) from valleys.
pub const RIDGE_LEVEL: u8 = 128;

/// Enhancement parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct EnhanceConfig {
    /// Smoothing of the gradient structure tensor.
    pub orientation_sigma: f32,
    /// Number of Gabor orientations.
    pub orientations: usize,
    /// Side of the x-signature window used for the period estimate.
    pub frequency_window: usize,
    /// Accepted ridge period range in pixels.
    pub period_range: (f32, f32),
    /// Period used when no window yields an estimate.
    pub fallback_period: f32,
    /// Gabor envelope sigma as a fraction of the period.
    pub gabor_sigma_factor: f32,
    /// Minimum orientation coherence for a reliable pixel.
    pub min_coherence: f32,
    /// Minimum gradient energy as a fraction of its 90th percentile.
    pub energy_fraction: f32,
    /// Distance kept clear of unreliable regions.
    pub mask_erosion: usize,
    /// Distance kept clear of the image border.
    pub mask_margin: usize,
    /// Filter rows in parallel when the `rayon` feature is enabled.
    pub parallel: bool,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            orientation_sigma: 5.0,
            orientations: 16,
            frequency_window: 32,
            period_range: (4.0, 20.0),
            fallback_period: 9.0,
            gabor_sigma_factor: 0.45,
            min_coherence: 0.35,
            energy_fraction: 0.1,
            mask_erosion: 8,
            mask_margin: 16,
            parallel: true,
        }
    }
}

impl EnhanceConfig {
    fn validate(&self) -> RidgeResult<()> {
        if !(1..=MAX_ORIENTATIONS).contains(&self.orientations) {
            return Err(RidgeError::InvalidParameter {
                name: "orientations",
                reason: "must be in 1..=180",
            });
        }
        if self.frequency_window < 8 {
            return Err(RidgeError::InvalidParameter {
                name: "frequency_window",
                reason: "must be >= 8",
            });
        }
        let (lo, hi) = self.period_range;
        if !(lo >= 2.0 && lo <= hi && hi <= MAX_PERIOD) {
            return Err(RidgeError::InvalidParameter {
                name: "period_range",
                reason: "must satisfy 2 <= min <= max <= 64",
            });
        }
        if !(self.gabor_sigma_factor > 0.0 && self.gabor_sigma_factor <= 2.0) {
            return Err(RidgeError::InvalidParameter {
                name: "gabor_sigma_factor",
                reason: "must be in (0, 2]",
            });
        }
        Ok(())
    }
}

/// Ridge-enhanced image and its reliability mask.
#[derive(Clone, Debug)]
pub struct Enhanced {
    /// Enhanced image; ridges are dark, valleys bright.
    pub image: OwnedImage,
    /// Pixels whose ridge structure is reliable enough for extraction.
    pub energy_mask: Mask,
    /// Ridge period used by the filter bank, in pixels.
    pub period: f32,
}

/// Enhances `src` with the default parameters.
pub fn enhance_fingerprint(src: ImageView<'_, u8>) -> RidgeResult<Enhanced> {
    enhance_fingerprint_with_config(src, &EnhanceConfig::default())
}

/// Enhances `src`, typically the output of [`preprocess_fingerprint`].
pub fn enhance_fingerprint_with_config(
    src: ImageView<'_, u8>,
    cfg: &EnhanceConfig,
) -> RidgeResult<Enhanced> {
    cfg.validate()?;
    if src.width() < 3 || src.height() < 3 {
        return Err(RidgeError::Processing {
            reason: format!("image {}x{} is too small to enhance", src.width(), src.height()),
        });
    }
    let _span = trace_span!("enhance", width = src.width(), height = src.height()).entered();

    let f = src.to_float();
    let tensor = StructureTensor::compute(&f, cfg.orientation_sigma)?;
    let estimator = PeriodEstimator {
        window: cfg.frequency_window,
        min_period: cfg.period_range.0,
        max_period: cfg.period_range.1,
        fallback: cfg.fallback_period,
    };
    let period = estimator.estimate(&f, &tensor);
    trace_event!("ridge_period", period = period);

    let bank = GaborBank::new(cfg.orientations, period, cfg.gabor_sigma_factor * period);
    let width = f.width();
    let mut orientation = Vec::with_capacity(width * f.height());
    for y in 0..f.height() {
        for x in 0..width {
            orientation.push(bank.index_for(tensor.orientation(x, y)));
        }
    }
    let response = filter_bank(&bank, &f, &orientation, cfg.parallel);
    let image = stretch(&response);
    let energy_mask = energy_mask(&tensor, cfg)?;
    trace_event!("energy_mask", coverage = energy_mask.coverage());

    Ok(Enhanced {
        image,
        energy_mask,
        period,
    })
}

fn filter_bank(
    bank: &GaborBank,
    f: &FloatImage,
    orientation: &[usize],
    parallel: bool,
) -> FloatImage {
    #[cfg(feature = "rayon")]
    {
        if parallel {
            return bank.filter_par(f, orientation);
        }
    }
    #[cfg(not(feature = "rayon"))]
    let _ = parallel;
    bank.filter(f, orientation)
}

/// Maps the signed filter response around [`RIDGE_LEVEL`].
fn stretch(response: &FloatImage) -> OwnedImage {
    let n = response.data().len() as f64;
    let var = response
        .data()
        .iter()
        .map(|&v| (v as f64) * (v as f64))
        .sum::<f64>()
        / n;
    let std = var.sqrt() as f32;
    if std < 1e-6 {
        return response.map(|_| RIDGE_LEVEL as f32).to_u8();
    }
    response
        .map(|v| RIDGE_LEVEL as f32 + OUTPUT_GAIN * v / std)
        .to_u8()
}

fn energy_mask(tensor: &StructureTensor, cfg: &EnhanceConfig) -> RidgeResult<Mask> {
    let (width, height) = (tensor.width(), tensor.height());
    let mut energies = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            energies.push(tensor.energy(x, y));
        }
    }
    let p90 = quantile(&energies, 0.9).unwrap_or(0.0);
    let min_energy = cfg.energy_fraction * p90;
    let raw = Mask::from_fn(width, height, |x, y| {
        tensor.coherence(x, y) >= cfg.min_coherence && energies[y * width + x] >= min_energy
    })?;
    let mut mask = open(&raw, KernelSize::square(3))?;
    if cfg.mask_erosion > 0 {
        mask = erode(&mask, KernelSize::square(2 * cfg.mask_erosion + 1))?;
    }
    let margin = cfg.mask_margin;
    if margin > 0 {
        for y in 0..height {
            for x in 0..width {
                if x < margin || y < margin || x + margin >= width || y + margin >= height {
                    mask.set(x, y, false);
                }
            }
        }
    }
    Ok(mask)
}

/// Splits an enhanced image into ridges (0) and valleys (255).
pub fn binarize(enhanced: ImageView<'_, u8>) -> OwnedImage {
    let mut data = Vec::with_capacity(enhanced.width() * enhanced.height());
    for row in enhanced.rows() {
        data.extend(row.iter().map(|&v| if v < RIDGE_LEVEL { 0 } else { 255 }));
    }
    OwnedImage::from_parts(data, enhanced.width(), enhanced.height())
}

#[cfg(test)]
mod tests {
    use super::{binarize, enhance_fingerprint, enhance_fingerprint_with_config, EnhanceConfig};
    use crate::image::OwnedImage;

    fn stripes(size: usize, period: f32) -> OwnedImage {
        OwnedImage::from_fn(size, size, |x, y| {
            let t = (x as f32 * 0.8 - y as f32 * 0.6) * std::f32::consts::TAU / period;
            (128.0 + 70.0 * t.cos()).round() as u8
        })
        .unwrap()
    }

    #[test]
    fn enhancement_preserves_ridge_polarity() {
        let img = stripes(96, 9.0);
        let out = enhance_fingerprint(img.view()).unwrap();
        assert!((out.period - 9.0).abs() < 1.0, "period {}", out.period);
        let bw = binarize(out.image.view());
        let mut agree = 0usize;
        let mut total = 0usize;
        for y in 20..76 {
            for x in 20..76 {
                let dark = img.get(x, y).unwrap() < 128;
                let ridge = bw.get(x, y).unwrap() == 0;
                total += 1;
                if dark == ridge {
                    agree += 1;
                }
            }
        }
        assert!(agree as f64 / total as f64 > 0.85, "{agree}/{total}");
    }

    #[test]
    fn energy_mask_respects_border_margin() {
        let img = stripes(96, 9.0);
        let out = enhance_fingerprint(img.view()).unwrap();
        assert!(out.energy_mask.is_set(48, 48));
        assert!(!out.energy_mask.is_set(5, 48));
        assert!(!out.energy_mask.is_set(48, 90));
    }

    #[test]
    fn flat_image_has_empty_mask() {
        let img = OwnedImage::from_fn(64, 64, |_, _| 128).unwrap();
        let out = enhance_fingerprint(img.view()).unwrap();
        assert!(out.energy_mask.is_empty());
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let img = stripes(48, 8.0);
        let seq = EnhanceConfig {
            parallel: false,
            ..EnhanceConfig::default()
        };
        let a = enhance_fingerprint_with_config(img.view(), &seq).unwrap();
        let b = enhance_fingerprint_with_config(img.view(), &EnhanceConfig::default()).unwrap();
        assert_eq!(a.image, b.image);
        assert_eq!(a.energy_mask, b.energy_mask);
    }
}
