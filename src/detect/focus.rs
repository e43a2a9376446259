//! Sharpness of a detected fingertip region.

use crate::detect::Finger;
use crate::filter::gaussian_blur;
use crate::image::{FloatImage, ImageView};
use crate::trace::trace_event;
use crate::util::RidgeResult;

const FINE_SIGMA: f32 = 0.8;
const COARSE_SIGMA: f32 = 8.0;
/// Band ratio mapped to a focus of 0.5.
const HALF_RATIO: f64 = 0.05;

/// Normalized sharpness of `finger`'s region in `image`, in [0, 1].
///
/// Ratio of fine detail energy (`f - G_0.8 f`) to band-pass energy
/// (`f - G_8 f`). Both terms scale with gain and ignore offsets, so the
/// measure is illumination independent. A flat region scores 0.
pub fn focus_measure(image: ImageView<'_, u8>, finger: &Finger) -> RidgeResult<f64> {
    let r = finger.region;
    let roi = image.roi(r.x, r.y, r.width, r.height)?.to_float();
    let fine = gaussian_blur(&roi, FINE_SIGMA)?;
    let coarse = gaussian_blur(&roi, COARSE_SIGMA)?;

    let e_hi = residual_energy(&roi, &fine);
    let e_total = residual_energy(&roi, &coarse);
    if e_total < 1e-6 {
        return Ok(0.0);
    }
    let ratio = e_hi / e_total;
    let focus = (ratio / (ratio + HALF_RATIO)).clamp(0.0, 1.0);
    trace_event!("focus_measure", focus = focus);
    Ok(focus)
}

fn residual_energy(src: &FloatImage, smooth: &FloatImage) -> f64 {
    let sum: f64 = src
        .data()
        .iter()
        .zip(smooth.data())
        .map(|(&a, &b)| {
            let d = (a - b) as f64;
            d * d
        })
        .sum();
    sum / src.data().len() as f64
}
