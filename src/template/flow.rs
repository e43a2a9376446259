//! Coarse block orientation grid stored alongside native templates.

use crate::filter::StructureTensor;
use crate::image::Mask;
use crate::util::{RidgeError, RidgeResult};
use std::f32::consts::PI;

/// Cell value marking a block without reliable ridges.
pub const INVALID_CELL: u8 = 255;
const STEPS: f32 = 180.0;
/// Fraction of a block that must be inside the mask.
const MIN_BLOCK_COVERAGE: f32 = 0.5;

/// Ridge orientation per square block, quantized to whole degrees.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RidgeFlow {
    block: u16,
    cols: u16,
    rows: u16,
    cells: Vec<u8>,
}

impl RidgeFlow {
    /// Builds a grid from raw cells (0..180 degrees, or [`INVALID_CELL`]).
    pub fn from_parts(block: u16, cols: u16, rows: u16, cells: Vec<u8>) -> RidgeResult<Self> {
        if block == 0 {
            return Err(RidgeError::InvalidParameter {
                name: "block",
                reason: "must be > 0",
            });
        }
        if cells.len() != cols as usize * rows as usize {
            return Err(RidgeError::BufferTooSmall {
                needed: cols as usize * rows as usize,
                got: cells.len(),
            });
        }
        if let Some(&bad) = cells.iter().find(|&&c| c >= STEPS as u8 && c != INVALID_CELL) {
            return Err(RidgeError::malformed(format!("ridge flow cell {bad} out of range")));
        }
        Ok(Self {
            block,
            cols,
            rows,
            cells,
        })
    }

    /// Summarizes `tensor` over blocks of side `block` that are mostly
    /// inside `mask`.
    pub(crate) fn compute(tensor: &StructureTensor, mask: &Mask, block: u16) -> RidgeResult<Self> {
        let b = block as usize;
        let cols = tensor.width().div_ceil(b);
        let rows = tensor.height().div_ceil(b);
        let (cols16, rows16) = match (u16::try_from(cols), u16::try_from(rows)) {
            (Ok(c), Ok(r)) => (c, r),
            _ => {
                return Err(RidgeError::InvalidDimensions {
                    width: tensor.width(),
                    height: tensor.height(),
                })
            }
        };
        let mut cells = Vec::with_capacity(cols * rows);
        for by in 0..rows {
            for bx in 0..cols {
                let x_end = ((bx + 1) * b).min(tensor.width());
                let y_end = ((by + 1) * b).min(tensor.height());
                let (mut cos2, mut sin2, mut weight) = (0.0f32, 0.0f32, 0.0f32);
                let (mut inside, mut total) = (0usize, 0usize);
                for y in by * b..y_end {
                    for x in bx * b..x_end {
                        total += 1;
                        if !mask.is_set(x, y) {
                            continue;
                        }
                        inside += 1;
                        // Double-angle averaging of the smoothed orientation.
                        let theta = tensor.orientation(x, y);
                        let w = tensor.coherence(x, y);
                        cos2 += w * (2.0 * theta).cos();
                        sin2 += w * (2.0 * theta).sin();
                        weight += w;
                    }
                }
                let cell = if total == 0
                    || (inside as f32) < MIN_BLOCK_COVERAGE * total as f32
                    || weight <= 1e-6
                {
                    INVALID_CELL
                } else {
                    quantize(0.5 * sin2.atan2(cos2))
                };
                cells.push(cell);
            }
        }
        Self::from_parts(block, cols16, rows16, cells)
    }

    /// Block side in pixels.
    pub fn block(&self) -> u16 {
        self.block
    }

    /// Grid columns.
    pub fn cols(&self) -> u16 {
        self.cols
    }

    /// Grid rows.
    pub fn rows(&self) -> u16 {
        self.rows
    }

    /// Raw cells in row-major order.
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// Ridge orientation in [0, π) of the block containing `(x, y)`.
    pub fn orientation_at(&self, x: f32, y: f32) -> Option<f32> {
        if !(x >= 0.0 && y >= 0.0) {
            return None;
        }
        let bx = (x / self.block as f32) as usize;
        let by = (y / self.block as f32) as usize;
        if bx >= self.cols as usize || by >= self.rows as usize {
            return None;
        }
        match self.cells[by * self.cols as usize + bx] {
            INVALID_CELL => None,
            c => Some(c as f32 * PI / STEPS),
        }
    }

    /// Number of blocks holding an orientation.
    pub fn valid_cells(&self) -> usize {
        self.cells.iter().filter(|&&c| c != INVALID_CELL).count()
    }
}

fn quantize(theta: f32) -> u8 {
    let deg = (theta.rem_euclid(PI) * STEPS / PI).round() as u32;
    (deg % STEPS as u32) as u8
}
