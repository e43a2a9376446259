//! Global ridge period estimation from oriented x-signatures.

use crate::filter::StructureTensor;
use crate::image::FloatImage;
use crate::util::math::median;

/// Grid step between signature windows.
const STEP: usize = 16;
/// Minimum peak-to-valley amplitude of a usable signature.
const MIN_AMPLITUDE: f32 = 10.0;
const MIN_COHERENCE: f32 = 0.35;

/// Ridge period search parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PeriodEstimator {
    pub window: usize,
    pub min_period: f32,
    pub max_period: f32,
    pub fallback: f32,
}

impl PeriodEstimator {
    /// Median period over all windows with a clean signature.
    pub(crate) fn estimate(&self, image: &FloatImage, tensor: &StructureTensor) -> f32 {
        let half = self.window / 2;
        let mut periods = Vec::new();
        let mut cy = half;
        while cy + half < image.height() {
            let mut cx = half;
            while cx + half < image.width() {
                if tensor.coherence(cx, cy) >= MIN_COHERENCE {
                    let signature = self.signature(image, cx, cy, tensor.orientation(cx, cy));
                    if let Some(period) = self.period_of(&signature) {
                        periods.push(period);
                    }
                }
                cx += STEP;
            }
            cy += STEP;
        }
        median(&periods).unwrap_or(self.fallback)
    }

    /// Intensity profile across the ridges, averaged along them.
    fn signature(&self, image: &FloatImage, cx: usize, cy: usize, ridge_dir: f32) -> Vec<f32> {
        let (dx, dy) = (ridge_dir.cos(), ridge_dir.sin());
        let (nx, ny) = (-dy, dx);
        let half_len = (self.window / 4) as isize;
        let half = self.window as f32 / 2.0;
        (0..self.window)
            .map(|k| {
                let t = k as f32 - half;
                let mut acc = 0.0;
                for l in -half_len..=half_len {
                    let l = l as f32;
                    acc += image.sample_bilinear(
                        cx as f32 + t * nx + l * dx,
                        cy as f32 + t * ny + l * dy,
                    );
                }
                acc / (2 * half_len + 1) as f32
            })
            .collect()
    }

    /// Mean distance between consecutive maxima of the smoothed signature.
    fn period_of(&self, signature: &[f32]) -> Option<f32> {
        let n = signature.len();
        if n < 5 {
            return None;
        }
        let smooth: Vec<f32> = (0..n)
            .map(|i| {
                let a = signature[i.saturating_sub(1)];
                let b = signature[(i + 1).min(n - 1)];
                0.25 * a + 0.5 * signature[i] + 0.25 * b
            })
            .collect();
        let (lo, hi) = smooth
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if hi - lo < MIN_AMPLITUDE {
            return None;
        }
        let peaks: Vec<usize> = (1..n - 1)
            .filter(|&i| smooth[i] > smooth[i - 1] && smooth[i] >= smooth[i + 1])
            .collect();
        if peaks.len() < 2 {
            return None;
        }
        let span = (peaks[peaks.len() - 1] - peaks[0]) as f32;
        let period = span / (peaks.len() - 1) as f32;
        (self.min_period..=self.max_period)
            .contains(&period)
            .then_some(period)
    }
}
