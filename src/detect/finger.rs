//! Fingertip localisation in grayscale frames.

use crate::detect::contour::{closed_length, trace_boundary};
use crate::detect::{DetectConfig, DetectMode, Finger};
use crate::filter::components::{Component, Components};
use crate::filter::gaussian_blur;
use crate::filter::morphology::{close, open};
use crate::filter::threshold::{histogram, otsu_threshold};
use crate::geom::{convex_hull, polygon_area};
use crate::image::{ImageView, Mask};
use crate::trace::{trace_event, trace_span};
use crate::util::{RidgeError, RidgeResult};

/// Locates the fingertip in `image` using the thresholds of `mode`.
pub fn find_finger(image: ImageView<'_, u8>, mode: DetectMode) -> RidgeResult<Finger> {
    find_finger_with_config(image, &DetectConfig::for_mode(mode))
}

/// Locates the fingertip in `image` with explicit thresholds.
pub fn find_finger_with_config(
    image: ImageView<'_, u8>,
    cfg: &DetectConfig,
) -> RidgeResult<Finger> {
    let _span =
        trace_span!("find_finger", width = image.width(), height = image.height()).entered();

    let foreground = bright_foreground(image, cfg)?;
    let components = Components::label(&foreground);
    let largest = components.largest().ok_or(RidgeError::NoFingerDetected {
        reason: "empty foreground",
    })?;

    let total = (image.width() * image.height()) as f64;
    let fraction = largest.area as f64 / total;
    if fraction < cfg.min_area_fraction {
        return Err(RidgeError::NoFingerDetected {
            reason: "region too small",
        });
    }
    if fraction > cfg.max_area_fraction {
        return Err(RidgeError::NoFingerDetected {
            reason: "region fills the frame",
        });
    }
    let aspect = largest.bbox.aspect_ratio();
    if aspect < cfg.aspect_range.0 || aspect > cfg.aspect_range.1 {
        return Err(RidgeError::NoFingerDetected {
            reason: "region aspect ratio out of range",
        });
    }

    let blob = components.mask_of(largest.label);
    let finger = finger_from_component(&blob, largest);
    let solidity = solidity(&finger);
    trace_event!("finger_candidate", area = finger.area, solidity = solidity);
    if solidity < cfg.min_solidity {
        return Err(RidgeError::NoFingerDetected {
            reason: "region is not convex enough",
        });
    }
    Ok(finger)
}

/// Thresholds the blurred frame and cleans it morphologically.
fn bright_foreground(image: ImageView<'_, u8>, cfg: &DetectConfig) -> RidgeResult<Mask> {
    let blurred = gaussian_blur(&image.to_float(), cfg.blur_sigma)?.to_u8();
    let hist = histogram(blurred.view());
    let threshold = otsu_threshold(&hist).ok_or(RidgeError::NoFingerDetected {
        reason: "frame has no contrast",
    })?;

    let (mut n_bg, mut s_bg, mut n_fg, mut s_fg) = (0u64, 0.0f64, 0u64, 0.0f64);
    for (v, &count) in hist.iter().enumerate() {
        if v as u8 > threshold {
            n_fg += count;
            s_fg += v as f64 * count as f64;
        } else {
            n_bg += count;
            s_bg += v as f64 * count as f64;
        }
    }
    if n_fg == 0 || n_bg == 0 {
        return Err(RidgeError::NoFingerDetected {
            reason: "frame has no contrast",
        });
    }
    let contrast = s_fg / n_fg as f64 - s_bg / n_bg as f64;
    if contrast < cfg.min_contrast {
        return Err(RidgeError::NoFingerDetected {
            reason: "insufficient contrast",
        });
    }

    let raw = Mask::from_fn(blurred.width(), blurred.height(), |x, y| {
        blurred.data()[y * blurred.width() + x] > threshold
    })?;
    let cleaned = open(&raw, cfg.cleanup_kernel)?;
    close(&cleaned, cfg.cleanup_kernel)
}

fn finger_from_component(blob: &Mask, component: &Component) -> Finger {
    Finger {
        region: component.bbox,
        contour: trace_boundary(blob, component.seed),
        area: component.area,
        centroid: component.centroid,
    }
}

/// Blob area over the pixel-count estimate of its convex hull.
fn solidity(finger: &Finger) -> f64 {
    let hull = convex_hull(&finger.contour);
    // Lattice polygons cover roughly area + perimeter / 2 + 1 pixels.
    let hull_pixels = polygon_area(&hull) + closed_length(&hull) * 0.5 + 1.0;
    (finger.area as f64 / hull_pixels).min(1.0)
}

/// Finger blobs found in a binary finger mask.
#[derive(Clone, Debug)]
pub struct FingerSet {
    /// Fingers ordered left to right by centroid.
    pub fingers: Vec<Finger>,
    /// Mask containing only the accepted fingers.
    pub finger_mask: Mask,
}

/// Splits a binary finger mask into individual fingers.
///
/// Components smaller than `min_area_fraction` of the mask are dropped.
pub fn find_fingers(mask: &Mask, min_area_fraction: f64) -> FingerSet {
    let _span = trace_span!("find_fingers", width = mask.width(), height = mask.height()).entered();
    let components = Components::label(mask);
    let min_area = (min_area_fraction * (mask.width() * mask.height()) as f64).ceil() as usize;

    let mut kept: Vec<&Component> = components
        .components()
        .iter()
        .filter(|c| c.area >= min_area.max(1))
        .collect();
    kept.sort_by(|a, b| a.centroid.0.total_cmp(&b.centroid.0));

    let mut finger_mask = vec![false; mask.width() * mask.height()];
    let mut fingers = Vec::with_capacity(kept.len());
    for component in kept {
        let blob = components.mask_of(component.label);
        for (dst, &v) in finger_mask.iter_mut().zip(blob.data()) {
            *dst |= v != 0;
        }
        fingers.push(finger_from_component(&blob, component));
    }

    trace_event!("fingers_found", count = fingers.len());
    FingerSet {
        fingers,
        finger_mask: Mask::from_bools(&finger_mask, mask.width(), mask.height()),
    }
}
