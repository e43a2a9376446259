//! Rotation- and translation-invariant local minutia descriptors.

use crate::template::Minutia;
use crate::util::math::{angle_dist, wrap_tau};

#[derive(Clone, Copy, Debug, PartialEq)]
struct Neighbor {
    dist: f32,
    /// Direction to the neighbour relative to the minutia angle.
    bearing: f32,
    /// Neighbour angle relative to the minutia angle.
    turn: f32,
}

/// The `k` nearest neighbours of one minutia, nearest first.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Descriptor {
    neighbors: Vec<Neighbor>,
}

/// Distance and angle tolerances shared by descriptors and pairing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Tolerance {
    pub distance: f32,
    pub angle: f32,
}

impl Tolerance {
    /// Linear falloff from 1 at zero error to 0 at the tolerance.
    #[inline]
    pub(crate) fn closeness(error: f32, tolerance: f32) -> f32 {
        (1.0 - error / tolerance).max(0.0)
    }
}

/// Builds one descriptor per minutia.
pub(crate) fn describe(minutiae: &[Minutia], k: usize) -> Vec<Descriptor> {
    minutiae
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let mut others: Vec<(f32, usize)> = minutiae
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(j, n)| {
                    let dx = n.x as f32 - m.x as f32;
                    let dy = n.y as f32 - m.y as f32;
                    ((dx * dx + dy * dy).sqrt(), j)
                })
                .collect();
            others.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            let neighbors = others
                .into_iter()
                .take(k)
                .map(|(dist, j)| {
                    let n = &minutiae[j];
                    let dx = n.x as f32 - m.x as f32;
                    let dy = n.y as f32 - m.y as f32;
                    Neighbor {
                        dist,
                        bearing: wrap_tau(dy.atan2(dx) - m.angle),
                        turn: wrap_tau(n.angle - m.angle),
                    }
                })
                .collect();
            Descriptor { neighbors }
        })
        .collect()
}

fn one_way(a: &Descriptor, b: &Descriptor, tol: Tolerance) -> f32 {
    let total: f32 = a
        .neighbors
        .iter()
        .map(|na| {
            b.neighbors
                .iter()
                .map(|nb| {
                    Tolerance::closeness((na.dist - nb.dist).abs(), tol.distance)
                        * Tolerance::closeness(angle_dist(na.bearing, nb.bearing), tol.angle)
                        * Tolerance::closeness(angle_dist(na.turn, nb.turn), tol.angle)
                })
                .fold(0.0f32, f32::max)
        })
        .sum();
    total / a.neighbors.len() as f32
}

/// Symmetric similarity in [0, 1]; identical neighbourhoods score 1.
pub(crate) fn similarity(a: &Descriptor, b: &Descriptor, tol: Tolerance) -> f32 {
    match (a.neighbors.is_empty(), b.neighbors.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => 0.5 * (one_way(a, b, tol) + one_way(b, a, tol)),
    }
}

/// Row-major `a.len() x b.len()` descriptor similarity matrix.
#[derive(Clone, Debug)]
pub(crate) struct SimilarityMatrix {
    cols: usize,
    values: Vec<f32>,
}

impl SimilarityMatrix {
    pub(crate) fn new(a: &[Descriptor], b: &[Descriptor], tol: Tolerance) -> Self {
        let mut values = Vec::with_capacity(a.len() * b.len());
        for da in a {
            for db in b {
                values.push(similarity(da, db, tol));
            }
        }
        Self {
            cols: b.len(),
            values,
        }
    }

    #[inline]
    pub(crate) fn get(&self, i: usize, j: usize) -> f32 {
        self.values[i * self.cols + j]
    }

    /// The `limit` most similar pairs, ties broken by index.
    pub(crate) fn top_pairs(&self, limit: usize) -> Vec<(usize, usize)> {
        let mut pairs: Vec<(usize, usize)> = (0..self.values.len())
            .map(|idx| (idx / self.cols, idx % self.cols))
            .collect();
        pairs.sort_by(|&(i1, j1), &(i2, j2)| {
            self.get(i2, j2)
                .total_cmp(&self.get(i1, j1))
                .then((i1, j1).cmp(&(i2, j2)))
        });
        pairs.truncate(limit);
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::{describe, similarity, SimilarityMatrix, Tolerance};
    use crate::template::{Minutia, MinutiaKind};

    const TOL: Tolerance = Tolerance {
        distance: 12.0,
        angle: 0.35,
    };

    fn m(x: u16, y: u16, angle: f32) -> Minutia {
        Minutia {
            x,
            y,
            angle,
            kind: MinutiaKind::Ending,
            quality: 50,
        }
    }

    #[test]
    fn descriptors_ignore_translation() {
        let a = vec![m(10, 10, 0.5), m(30, 12, 1.0), m(15, 40, 2.0)];
        let b: Vec<Minutia> = a.iter().map(|p| m(p.x + 50, p.y + 20, p.angle)).collect();
        let da = describe(&a, 4);
        let db = describe(&b, 4);
        for (x, y) in da.iter().zip(&db) {
            assert!((similarity(x, y, TOL) - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn lone_minutiae_have_empty_descriptors() {
        let d = describe(&[m(1, 1, 0.0)], 4);
        assert!((similarity(&d[0], &d[0], TOL) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn top_pairs_prefers_similar_then_lower_index() {
        let a = vec![m(10, 10, 0.5), m(30, 12, 1.0), m(15, 40, 2.0)];
        let d = describe(&a, 4);
        let sim = SimilarityMatrix::new(&d, &d, TOL);
        let top = sim.top_pairs(3);
        assert_eq!(top, vec![(0, 0), (1, 1), (2, 2)]);
    }
}
