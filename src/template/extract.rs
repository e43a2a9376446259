//! Minutia detection on enhanced ridge images.

use crate::enhance::RIDGE_LEVEL;
use crate::filter::StructureTensor;
use crate::image::{ImageView, Mask};
use crate::template::skeleton::Skeleton;
use crate::template::{FingerprintTemplate, Minutia, MinutiaKind, RidgeFlow, TemplateFormat};
use crate::trace::{trace_event, trace_span};
use crate::util::math::{angle_dist, wrap_tau};
use crate::util::{RidgeError, RidgeResult};
use std::f32::consts::PI;

/// Minutia detection parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractConfig {
    /// Fewer minutiae than this fail with `InsufficientFeatures`.
    pub min_minutiae: usize,
    /// Minutiae closer than this are removed pairwise (spurs, bridges,
    /// short breaks).
    pub min_minutia_distance: f32,
    /// Skeleton pixels walked along each branch to estimate direction.
    pub trace_steps: usize,
    /// Smoothing of the orientation field used for angles and quality.
    pub orientation_sigma: f32,
    /// Minimum coherence for snapping a traced angle to the field.
    pub snap_coherence: f32,
    /// Ridge flow block side in pixels.
    pub flow_block: u16,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            min_minutiae: 10,
            min_minutia_distance: 6.0,
            trace_steps: 10,
            orientation_sigma: 5.0,
            snap_coherence: 0.3,
            flow_block: 16,
        }
    }
}

struct Detection {
    minutiae: Vec<Minutia>,
    flow: RidgeFlow,
}

/// Detects minutiae of `enhanced` inside `mask` without enforcing a
/// minimum count.
pub fn extract_minutiae(
    enhanced: ImageView<'_, u8>,
    mask: &Mask,
    cfg: &ExtractConfig,
) -> RidgeResult<Vec<Minutia>> {
    Ok(detect(enhanced, mask, cfg)?.minutiae)
}

fn detect(enhanced: ImageView<'_, u8>, mask: &Mask, cfg: &ExtractConfig) -> RidgeResult<Detection> {
    enhanced.ensure_same_size(&mask.view())?;
    if cfg.flow_block == 0 || cfg.trace_steps < 2 {
        return Err(RidgeError::InvalidParameter {
            name: "extract_config",
            reason: "flow_block must be > 0 and trace_steps >= 2",
        });
    }
    let _span = trace_span!(
        "extract_minutiae",
        width = enhanced.width(),
        height = enhanced.height(),
    )
    .entered();

    let (width, height) = enhanced.dims();
    let mut ridges = Vec::with_capacity(width * height);
    for row in enhanced.rows() {
        ridges.extend(row.iter().map(|&v| v < RIDGE_LEVEL));
    }
    let skeleton = Skeleton::thin(ridges, width, height);
    let tensor = StructureTensor::compute(&enhanced.to_float(), cfg.orientation_sigma)?;

    let mut candidates = Vec::new();
    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            if !skeleton.get(x as isize, y as isize) || !mask.is_set(x, y) {
                continue;
            }
            let kind = match skeleton.crossing_number(x, y) {
                1 => MinutiaKind::Ending,
                3 => MinutiaKind::Bifurcation,
                _ => continue,
            };
            candidates.push((x, y, kind));
        }
    }
    let raw = candidates.len();
    let candidates = remove_close_pairs(candidates, cfg.min_minutia_distance);

    let mut minutiae = Vec::with_capacity(candidates.len());
    for (x, y, kind) in candidates {
        let Some(traced) = traced_angle(&skeleton, x, y, kind, cfg.trace_steps) else {
            continue;
        };
        let coherence = tensor.coherence(x, y);
        let angle = if coherence >= cfg.snap_coherence {
            snap_to_field(traced, tensor.orientation(x, y))
        } else {
            traced
        };
        minutiae.push(Minutia {
            x: x as u16,
            y: y as u16,
            angle: wrap_tau(angle),
            kind,
            quality: (100.0 * coherence).round().clamp(0.0, 100.0) as u8,
        });
    }
    trace_event!("minutiae", raw = raw, kept = minutiae.len());

    let flow = RidgeFlow::compute(&tensor, mask, cfg.flow_block)?;
    Ok(Detection { minutiae, flow })
}

/// Drops both members of every pair closer than `min_dist`.
fn remove_close_pairs(
    candidates: Vec<(usize, usize, MinutiaKind)>,
    min_dist: f32,
) -> Vec<(usize, usize, MinutiaKind)> {
    let min_sq = min_dist * min_dist;
    let mut drop = vec![false; candidates.len()];
    for i in 0..candidates.len() {
        for j in i + 1..candidates.len() {
            let dx = candidates[i].0 as f32 - candidates[j].0 as f32;
            let dy = candidates[i].1 as f32 - candidates[j].1 as f32;
            if dx * dx + dy * dy < min_sq {
                drop[i] = true;
                drop[j] = true;
            }
        }
    }
    candidates
        .into_iter()
        .zip(drop)
        .filter_map(|(c, d)| (!d).then_some(c))
        .collect()
}

/// Direction of the minutia from the skeleton branches around it.
///
/// Endings point away from their ridge; bifurcations point from the stem
/// into the fork.
fn traced_angle(
    skeleton: &Skeleton,
    x: usize,
    y: usize,
    kind: MinutiaKind,
    steps: usize,
) -> Option<f32> {
    let dirs: Vec<f32> = skeleton
        .branch_ends(x, y, steps)
        .into_iter()
        .filter_map(|(ex, ey)| {
            let (dx, dy) = (ex - x as isize, ey - y as isize);
            (dx != 0 || dy != 0).then(|| (dy as f32).atan2(dx as f32))
        })
        .collect();
    match (kind, dirs.as_slice()) {
        (MinutiaKind::Ending, [branch]) => Some(branch + PI),
        (MinutiaKind::Bifurcation, [a, b, c]) => {
            let branches = [*a, *b, *c];
            let isolation = |i: usize| {
                (0..3)
                    .filter(|&j| j != i)
                    .map(|j| angle_dist(branches[i], branches[j]))
                    .fold(f32::MAX, f32::min)
            };
            let stem = (0..3)
                .max_by(|&i, &j| isolation(i).total_cmp(&isolation(j)).then(j.cmp(&i)))
                .map(|i| branches[i])?;
            Some(stem + PI)
        }
        _ => None,
    }
}

/// Picks the direction along `orientation` (mod π) nearest to `traced`.
fn snap_to_field(traced: f32, orientation: f32) -> f32 {
    let forward = wrap_tau(orientation);
    let backward = wrap_tau(orientation + PI);
    if angle_dist(traced, forward) <= angle_dist(traced, backward) {
        forward
    } else {
        backward
    }
}

fn build_template(
    enhanced: ImageView<'_, u8>,
    mask: &Mask,
    cfg: &ExtractConfig,
) -> RidgeResult<FingerprintTemplate> {
    let detection = detect(enhanced, mask, cfg)?;
    if detection.minutiae.len() < cfg.min_minutiae {
        return Err(RidgeError::InsufficientFeatures {
            found: detection.minutiae.len(),
            required: cfg.min_minutiae,
        });
    }
    FingerprintTemplate::from_minutiae(
        TemplateFormat::Proprietary,
        enhanced.width(),
        enhanced.height(),
        detection.minutiae,
        Some(detection.flow),
    )
}

/// Proprietary template of an enhanced image and its energy mask.
pub fn generate_fingerprint_template(
    enhanced: ImageView<'_, u8>,
    mask: &Mask,
) -> RidgeResult<FingerprintTemplate> {
    generate_fingerprint_template_with_config(enhanced, mask, &ExtractConfig::default())
}

/// [`generate_fingerprint_template`] with explicit parameters.
pub fn generate_fingerprint_template_with_config(
    enhanced: ImageView<'_, u8>,
    mask: &Mask,
    cfg: &ExtractConfig,
) -> RidgeResult<FingerprintTemplate> {
    build_template(enhanced, mask, cfg)
}

/// ISO 19794-2 template of an enhanced image and its energy mask.
pub fn generate_iso_fingerprint_template(
    enhanced: ImageView<'_, u8>,
    mask: &Mask,
) -> RidgeResult<FingerprintTemplate> {
    generate_iso_fingerprint_template_with_config(enhanced, mask, &ExtractConfig::default())
}

/// [`generate_iso_fingerprint_template`] with explicit parameters.
pub fn generate_iso_fingerprint_template_with_config(
    enhanced: ImageView<'_, u8>,
    mask: &Mask,
    cfg: &ExtractConfig,
) -> RidgeResult<FingerprintTemplate> {
    build_template(enhanced, mask, cfg)?.to_format(TemplateFormat::Iso)
}

#[cfg(test)]
mod tests {
    use super::{remove_close_pairs, snap_to_field, traced_angle};
    use crate::template::skeleton::Skeleton;
    use crate::template::MinutiaKind;
    use crate::util::math::angle_dist;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn close_pairs_are_removed_together() {
        let kept = remove_close_pairs(
            vec![
                (10, 10, MinutiaKind::Ending),
                (13, 10, MinutiaKind::Bifurcation),
                (40, 40, MinutiaKind::Ending),
            ],
            6.0,
        );
        assert_eq!(kept, vec![(40, 40, MinutiaKind::Ending)]);
    }

    #[test]
    fn ending_points_away_from_its_ridge() {
        let mut bits = vec![false; 20 * 5];
        for x in 5..18 {
            bits[2 * 20 + x] = true;
        }
        let skel = Skeleton::thin(bits, 20, 5);
        let left = traced_angle(&skel, 5, 2, MinutiaKind::Ending, 8).unwrap();
        assert!(angle_dist(left, PI) < 1e-4);
    }

    #[test]
    fn snapping_keeps_the_traced_sense() {
        let snapped = snap_to_field(3.0, 0.1);
        assert!(angle_dist(snapped, 0.1 + PI) < 1e-5);
        let snapped = snap_to_field(-FRAC_PI_2, FRAC_PI_2);
        assert!(angle_dist(snapped, 1.5 * PI) < 1e-5);
    }
}
