//! Angle and statistics helpers shared by the pipeline stages.

use std::f32::consts::{PI, TAU};

/// Wraps an angle in radians to the range [0, 2π).
pub(crate) fn wrap_tau(angle: f32) -> f32 {
    let mut wrapped = angle % TAU;
    if wrapped < 0.0 {
        wrapped += TAU;
    }
    if wrapped >= TAU {
        wrapped -= TAU;
    }
    wrapped
}

/// Wraps an angle in radians to the range [-π, π).
pub(crate) fn wrap_pi(angle: f32) -> f32 {
    let wrapped = wrap_tau(angle + PI) - PI;
    if wrapped >= PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

/// Absolute circular distance between two directions, in [0, π].
pub(crate) fn angle_dist(a: f32, b: f32) -> f32 {
    wrap_pi(a - b).abs()
}

/// Absolute distance between two undirected orientations, in [0, π/2].
pub(crate) fn orientation_dist(a: f32, b: f32) -> f32 {
    let d = wrap_tau(2.0 * (a - b));
    let d = if d > PI { TAU - d } else { d };
    d * 0.5
}

/// Returns the value at quantile `q` in [0, 1] without reordering `values`.
pub(crate) fn quantile(values: &[f32], q: f32) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut scratch = values.to_vec();
    let idx = ((scratch.len() - 1) as f32 * q.clamp(0.0, 1.0)).round() as usize;
    let (_, value, _) = scratch.select_nth_unstable_by(idx, |a, b| a.total_cmp(b));
    Some(*value)
}

/// Median of a slice, `None` when empty.
pub(crate) fn median(values: &[f32]) -> Option<f32> {
    quantile(values, 0.5)
}
