//! One-pixel-wide ridge skeletons and skeleton walking.

/// Neighbour offsets in circular order, starting north, clockwise.
pub(crate) const RING: [(isize, isize); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// Binary raster with out-of-bounds reads returning `false`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Skeleton {
    width: usize,
    height: usize,
    bits: Vec<bool>,
}

impl Skeleton {
    /// Thins the ridge pixels of `bits` with Zhang–Suen.
    pub(crate) fn thin(bits: Vec<bool>, width: usize, height: usize) -> Self {
        debug_assert_eq!(bits.len(), width * height);
        let mut skel = Self {
            width,
            height,
            bits,
        };
        let mut doomed = Vec::new();
        loop {
            let mut changed = false;
            for pass in 0..2 {
                doomed.clear();
                for y in 0..height {
                    for x in 0..width {
                        if skel.bits[y * width + x] && skel.deletable(x, y, pass) {
                            doomed.push(y * width + x);
                        }
                    }
                }
                for &idx in &doomed {
                    skel.bits[idx] = false;
                }
                changed |= !doomed.is_empty();
            }
            if !changed {
                break;
            }
        }
        skel
    }

    fn deletable(&self, x: usize, y: usize, pass: usize) -> bool {
        let p = self.ring(x, y);
        let b = p.iter().filter(|&&v| v).count();
        if !(2..=6).contains(&b) || transitions(&p) != 1 {
            return false;
        }
        // p[0]=N, p[2]=E, p[4]=S, p[6]=W
        if pass == 0 {
            !(p[0] && p[2] && p[4]) && !(p[2] && p[4] && p[6])
        } else {
            !(p[0] && p[2] && p[6]) && !(p[0] && p[4] && p[6])
        }
    }

    #[inline]
    pub(crate) fn get(&self, x: isize, y: isize) -> bool {
        if x < 0 || y < 0 || x >= self.width as isize || y >= self.height as isize {
            return false;
        }
        self.bits[y as usize * self.width + x as usize]
    }

    /// The 8 neighbours of `(x, y)` in [`RING`] order.
    pub(crate) fn ring(&self, x: usize, y: usize) -> [bool; 8] {
        let mut out = [false; 8];
        for (slot, (dx, dy)) in out.iter_mut().zip(RING) {
            *slot = self.get(x as isize + dx, y as isize + dy);
        }
        out
    }

    /// Crossing number: 1 at ridge endings, 3 at bifurcations.
    pub(crate) fn crossing_number(&self, x: usize, y: usize) -> usize {
        transitions(&self.ring(x, y))
    }

    /// Walks each branch leaving `(x, y)` for up to `steps` pixels and
    /// returns the far end of every branch.
    pub(crate) fn branch_ends(&self, x: usize, y: usize, steps: usize) -> Vec<(isize, isize)> {
        let ring = self.ring(x, y);
        let origin = (x as isize, y as isize);
        let mut visited: Vec<(isize, isize)> = vec![origin];
        for (i, (dx, dy)) in RING.iter().enumerate() {
            if ring[i] {
                visited.push((origin.0 + dx, origin.1 + dy));
            }
        }

        let mut ends = Vec::new();
        for start in branch_starts(&ring) {
            let (dx, dy) = RING[start];
            let mut cur = (origin.0 + dx, origin.1 + dy);
            for _ in 1..steps {
                match self.next_step(cur, &visited) {
                    Some(next) => {
                        visited.push(next);
                        cur = next;
                    }
                    None => break,
                }
            }
            ends.push(cur);
        }
        ends
    }

    /// Unvisited skeleton neighbour of `p`, edge neighbours first.
    fn next_step(&self, p: (isize, isize), visited: &[(isize, isize)]) -> Option<(isize, isize)> {
        let edge_first = [0usize, 2, 4, 6, 1, 3, 5, 7];
        edge_first.iter().find_map(|&i| {
            let (dx, dy) = RING[i];
            let q = (p.0 + dx, p.1 + dy);
            (self.get(q.0, q.1) && !visited.contains(&q)).then_some(q)
        })
    }
}

/// Number of 0 -> 1 transitions around the ring.
pub(crate) fn transitions(p: &[bool; 8]) -> usize {
    (0..8).filter(|&i| !p[i] && p[(i + 1) % 8]).count()
}

/// One representative neighbour per run of set neighbours, preferring
/// edge neighbours (even ring index).
fn branch_starts(p: &[bool; 8]) -> Vec<usize> {
    let mut starts = Vec::new();
    for i in 0..8 {
        if !(!p[i] && p[(i + 1) % 8]) {
            continue;
        }
        let mut best = (i + 1) % 8;
        let mut j = best;
        while p[j] {
            if j % 2 == 0 {
                best = j;
                break;
            }
            j = (j + 1) % 8;
            if j == (i + 1) % 8 {
                break;
            }
        }
        starts.push(best);
    }
    starts
}
