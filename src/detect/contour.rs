//! Moore-neighbour boundary tracing.

use crate::geom::Point;
use crate::image::Mask;

// Clockwise on screen (y grows downwards), starting at west.
const DIRS: [(isize, isize); 8] = [
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
];

fn dir_index(dx: isize, dy: isize) -> Option<usize> {
    DIRS.iter().position(|&d| d == (dx, dy))
}

fn step(mask: &Mask, p: Point, dir: usize) -> Option<Point> {
    let x = p.x as isize + DIRS[dir].0;
    let y = p.y as isize + DIRS[dir].1;
    if x < 0 || y < 0 {
        return None;
    }
    let q = Point::new(x as usize, y as usize);
    mask.is_set(q.x, q.y).then_some(q)
}

/// Traces the outer boundary of the component containing `start`.
///
/// `start` must be the first set pixel of its component in raster order,
/// which guarantees its west neighbour is background. The returned contour
/// is ordered clockwise on screen and does not repeat `start`.
pub fn trace_boundary(mask: &Mask, start: Point) -> Vec<Point> {
    let mut contour = vec![start];
    if !mask.is_set(start.x, start.y) {
        return Vec::new();
    }
    let max_steps = 4 * mask.count() + 8;
    let mut current = start;
    let mut back = 0usize;
    let mut second: Option<Point> = None;

    for _ in 0..max_steps {
        let mut next = None;
        for i in 1..=8 {
            let dir = (back + i) % 8;
            if let Some(q) = step(mask, current, dir) {
                let prev = DIRS[(back + i - 1) % 8];
                let bx = current.x as isize + prev.0;
                let by = current.y as isize + prev.1;
                let new_back = dir_index(bx - q.x as isize, by - q.y as isize).unwrap_or(0);
                next = Some((q, new_back));
                break;
            }
        }
        let Some((q, new_back)) = next else {
            break;
        };
        if current == start {
            match second {
                Some(s) if s == q => break,
                None => second = Some(q),
                _ => {}
            }
        }
        contour.push(q);
        current = q;
        back = new_back;
    }

    if contour.len() > 1 && contour.last() == Some(&start) {
        contour.pop();
    }
    contour
}

/// Length of a closed polyline.
pub(crate) fn closed_length(points: &[Point]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        let dx = p.x as f64 - q.x as f64;
        let dy = p.y as f64 - q.y as f64;
        total += (dx * dx + dy * dy).sqrt();
    }
    total
}

#[cfg(test)]
mod tests {
    use super::trace_boundary;
    use crate::geom::Point;
    use crate::image::Mask;

    #[test]
    fn square_boundary_visits_every_edge_pixel_once() {
        let mask = Mask::from_fn(6, 6, |x, y| (1..5).contains(&x) && (1..5).contains(&y)).unwrap();
        let contour = trace_boundary(&mask, Point::new(1, 1));
        assert_eq!(contour.len(), 12);
        assert_eq!(contour[0], Point::new(1, 1));
        assert_eq!(contour[1], Point::new(2, 1));
        let mut unique = contour.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 12);
    }

    #[test]
    fn single_pixel_contour() {
        let mask = Mask::from_fn(3, 3, |x, y| x == 1 && y == 1).unwrap();
        assert_eq!(trace_boundary(&mask, Point::new(1, 1)), vec![Point::new(1, 1)]);
    }

    #[test]
    fn thin_line_is_traced_both_ways() {
        let mask = Mask::from_fn(5, 3, |x, y| y == 1 && (1..4).contains(&x)).unwrap();
        let contour = trace_boundary(&mask, Point::new(1, 1));
        assert_eq!(
            contour,
            vec![Point::new(1, 1), Point::new(2, 1), Point::new(3, 1), Point::new(2, 1)]
        );
    }
}
