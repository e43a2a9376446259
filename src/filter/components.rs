//! 8-connected component labelling of binary masks.

use crate::geom::{Point, Rect};
use crate::image::Mask;
use std::collections::VecDeque;

/// Summary of one connected component.
#[derive(Clone, Debug, PartialEq)]
pub struct Component {
    /// Label stored in the label map (1-based).
    pub label: u32,
    /// Pixel count.
    pub area: usize,
    /// Bounding rectangle.
    pub bbox: Rect,
    /// First pixel in raster order; always on the outer boundary.
    pub seed: Point,
    /// Mean pixel position `(x, y)`.
    pub centroid: (f64, f64),
}

/// Label map plus per-component statistics.
#[derive(Clone, Debug)]
pub struct Components {
    width: usize,
    height: usize,
    labels: Vec<u32>,
    components: Vec<Component>,
}

pub(crate) const NEIGHBORS_8: [(isize, isize); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

impl Components {
    /// Labels all set pixels of `mask`.
    pub fn label(mask: &Mask) -> Self {
        let width = mask.width();
        let height = mask.height();
        let mut labels = vec![0u32; width * height];
        let mut components = Vec::new();
        let mut queue = VecDeque::new();

        for y in 0..height {
            for x in 0..width {
                if !mask.is_set(x, y) || labels[y * width + x] != 0 {
                    continue;
                }
                let label = components.len() as u32 + 1;
                let seed = Point::new(x, y);
                let mut bbox = Rect::new(x, y, 1, 1);
                let mut area = 0usize;
                let (mut sx, mut sy) = (0.0f64, 0.0f64);
                labels[y * width + x] = label;
                queue.push_back(seed);
                while let Some(p) = queue.pop_front() {
                    area += 1;
                    sx += p.x as f64;
                    sy += p.y as f64;
                    bbox.include(p);
                    for (dx, dy) in NEIGHBORS_8 {
                        let nx = p.x as isize + dx;
                        let ny = p.y as isize + dy;
                        if nx < 0 || ny < 0 || nx >= width as isize || ny >= height as isize {
                            continue;
                        }
                        let (nx, ny) = (nx as usize, ny as usize);
                        let idx = ny * width + nx;
                        if labels[idx] == 0 && mask.is_set(nx, ny) {
                            labels[idx] = label;
                            queue.push_back(Point::new(nx, ny));
                        }
                    }
                }
                components.push(Component {
                    label,
                    area,
                    bbox,
                    seed,
                    centroid: (sx / area as f64, sy / area as f64),
                });
            }
        }

        Self {
            width,
            height,
            labels,
            components,
        }
    }

    /// All components in discovery (raster) order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Component with the largest area; ties keep the earliest.
    pub fn largest(&self) -> Option<&Component> {
        self.components
            .iter()
            .fold(None, |best: Option<&Component>, c| match best {
                Some(b) if b.area >= c.area => Some(b),
                _ => Some(c),
            })
    }

    /// Label at `(x, y)`, 0 for background.
    pub fn label_at(&self, x: usize, y: usize) -> u32 {
        self.labels[y * self.width + x]
    }

    /// Mask containing only the pixels of `label`.
    pub fn mask_of(&self, label: u32) -> Mask {
        let bits: Vec<bool> = self.labels.iter().map(|&l| l == label).collect();
        Mask::from_bools(&bits, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::Components;
    use crate::geom::Rect;
    use crate::image::Mask;

    #[test]
    fn diagonal_pixels_are_connected() {
        let mask = Mask::from_fn(4, 4, |x, y| x == y).unwrap();
        let comps = Components::label(&mask);
        assert_eq!(comps.components().len(), 1);
        assert_eq!(comps.components()[0].area, 4);
        assert_eq!(comps.components()[0].bbox, Rect::new(0, 0, 4, 4));
    }

    #[test]
    fn largest_component_wins() {
        let mask = Mask::from_fn(10, 3, |x, _| x == 0 || x >= 5).unwrap();
        let comps = Components::label(&mask);
        assert_eq!(comps.components().len(), 2);
        let largest = comps.largest().unwrap();
        assert_eq!(largest.area, 15);
        let only = comps.mask_of(largest.label);
        assert!(!only.is_set(0, 0));
        assert!(only.is_set(7, 1));
    }
}
