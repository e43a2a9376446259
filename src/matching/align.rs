//! Rigid alignment hypotheses, greedy pairing, and least-squares refinement.

use crate::matching::descriptor::{SimilarityMatrix, Tolerance};
use crate::template::{Minutia, RidgeFlow};
use crate::util::math::{angle_dist, orientation_dist};
use std::f32::consts::FRAC_PI_2;

/// Rotation about the origin followed by a translation, mapping probe
/// coordinates into reference coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Rigid {
    pub angle: f32,
    cos: f32,
    sin: f32,
    tx: f32,
    ty: f32,
}

impl Rigid {
    fn new(angle: f32, tx: f32, ty: f32) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            angle,
            cos,
            sin,
            tx,
            ty,
        }
    }

    /// Transform that lays probe minutia `b` exactly onto reference `a`.
    pub(crate) fn from_pair(a: &Minutia, b: &Minutia) -> Self {
        let angle = a.angle - b.angle;
        let (sin, cos) = angle.sin_cos();
        let (bx, by) = (b.x as f32, b.y as f32);
        let tx = a.x as f32 - (cos * bx - sin * by);
        let ty = a.y as f32 - (sin * bx + cos * by);
        Self::new(angle, tx, ty)
    }

    #[inline]
    pub(crate) fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.cos * x - self.sin * y + self.tx,
            self.sin * x + self.cos * y + self.ty,
        )
    }

    /// Least-squares rigid fit of the paired positions.
    fn fit(pairs: &[Pair], a: &[Minutia], b: &[Minutia]) -> Option<Self> {
        if pairs.len() < 2 {
            return None;
        }
        let n = pairs.len() as f32;
        let (mut ax, mut ay, mut bx, mut by) = (0.0f32, 0.0f32, 0.0f32, 0.0f32);
        for p in pairs {
            ax += a[p.a].x as f32;
            ay += a[p.a].y as f32;
            bx += b[p.b].x as f32;
            by += b[p.b].y as f32;
        }
        let (ax, ay, bx, by) = (ax / n, ay / n, bx / n, by / n);
        let (mut dot, mut cross) = (0.0f32, 0.0f32);
        for p in pairs {
            let (pax, pay) = (a[p.a].x as f32 - ax, a[p.a].y as f32 - ay);
            let (pbx, pby) = (b[p.b].x as f32 - bx, b[p.b].y as f32 - by);
            dot += pbx * pax + pby * pay;
            cross += pbx * pay - pby * pax;
        }
        if dot.abs() + cross.abs() < 1e-6 {
            return None;
        }
        let angle = cross.atan2(dot);
        let (sin, cos) = angle.sin_cos();
        Some(Self::new(
            angle,
            ax - (cos * bx - sin * by),
            ay - (sin * bx + cos * by),
        ))
    }
}

/// Corresponding minutiae with their pair value in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Pair {
    pub a: usize,
    pub b: usize,
    pub value: f32,
}

/// One-to-one pairing under `t`, best pair values first.
///
/// A pair value averages geometric closeness and descriptor similarity.
pub(crate) fn pair_up(
    a: &[Minutia],
    b: &[Minutia],
    sim: &SimilarityMatrix,
    t: &Rigid,
    tol: Tolerance,
) -> Vec<Pair> {
    let mut candidates = Vec::new();
    for (j, mb) in b.iter().enumerate() {
        let (x, y) = t.apply(mb.x as f32, mb.y as f32);
        let angle = mb.angle + t.angle;
        for (i, ma) in a.iter().enumerate() {
            let dx = ma.x as f32 - x;
            let dy = ma.y as f32 - y;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist > tol.distance {
                continue;
            }
            let turn = angle_dist(ma.angle, angle);
            if turn > tol.angle {
                continue;
            }
            let geometric = Tolerance::closeness(dist, tol.distance)
                * Tolerance::closeness(turn, tol.angle);
            candidates.push(Pair {
                a: i,
                b: j,
                value: 0.5 * (geometric + sim.get(i, j)),
            });
        }
    }
    candidates.sort_by(|p, q| {
        q.value
            .total_cmp(&p.value)
            .then((p.a, p.b).cmp(&(q.a, q.b)))
    });

    let mut used_a = vec![false; a.len()];
    let mut used_b = vec![false; b.len()];
    let mut pairs = Vec::new();
    for c in candidates {
        if used_a[c.a] || used_b[c.b] {
            continue;
        }
        used_a[c.a] = true;
        used_b[c.b] = true;
        pairs.push(c);
    }
    pairs
}

/// Best pairing reachable from one seed transform after `iterations`
/// least-squares refinements.
pub(crate) fn refine(
    a: &[Minutia],
    b: &[Minutia],
    sim: &SimilarityMatrix,
    seed: Rigid,
    tol: Tolerance,
    iterations: usize,
) -> (Rigid, Vec<Pair>) {
    let mut best_t = seed;
    let mut best = pair_up(a, b, sim, &seed, tol);
    let mut best_total = total(&best);
    let mut current = best.clone();
    for _ in 0..iterations {
        let Some(t) = Rigid::fit(&current, a, b) else {
            break;
        };
        current = pair_up(a, b, sim, &t, tol);
        let value = total(&current);
        if value > best_total {
            best_total = value;
            best = current.clone();
            best_t = t;
        }
    }
    (best_t, best)
}

pub(crate) fn total(pairs: &[Pair]) -> f32 {
    pairs.iter().map(|p| p.value).sum()
}

/// Minimum number of overlapping valid blocks for a flow comparison.
const MIN_FLOW_CELLS: usize = 4;

/// Mean orientation agreement in [0, 1] of probe flow blocks mapped
/// through `t` onto the reference flow, `None` without enough overlap.
pub(crate) fn flow_agreement(reference: &RidgeFlow, probe: &RidgeFlow, t: &Rigid) -> Option<f32> {
    let block = probe.block() as f32;
    let mut sum = 0.0f32;
    let mut count = 0usize;
    for by in 0..probe.rows() {
        for bx in 0..probe.cols() {
            let cx = (bx as f32 + 0.5) * block;
            let cy = (by as f32 + 0.5) * block;
            let Some(theta_b) = probe.orientation_at(cx, cy) else {
                continue;
            };
            let (rx, ry) = t.apply(cx, cy);
            let Some(theta_a) = reference.orientation_at(rx, ry) else {
                continue;
            };
            let diff = orientation_dist(theta_a, theta_b + t.angle);
            sum += 1.0 - diff / FRAC_PI_2;
            count += 1;
        }
    }
    (count >= MIN_FLOW_CELLS).then(|| sum / count as f32)
}
