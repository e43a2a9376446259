//! Binary morphology on masks with rectangular structuring elements.
//!
//! Windows are clipped to the image, so the border neither erodes nor
//! dilates on its own.

use crate::image::Mask;
use crate::util::{RidgeError, RidgeResult};

/// Size of a rectangular structuring element; both sides must be odd.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelSize {
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
}

impl KernelSize {
    /// Creates a kernel size.
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Square kernel of side `side`.
    pub const fn square(side: usize) -> Self {
        Self::new(side, side)
    }

    pub(crate) fn validate(self) -> RidgeResult<Self> {
        if self.width == 0 || self.height == 0 || self.width % 2 == 0 || self.height % 2 == 0 {
            return Err(RidgeError::InvalidParameter {
                name: "kernel_size",
                reason: "both sides must be odd and >= 1",
            });
        }
        Ok(self)
    }
}

impl Default for KernelSize {
    fn default() -> Self {
        Self::square(5)
    }
}

fn filter_1d(
    src: &[bool],
    dst: &mut [bool],
    len: usize,
    step: usize,
    radius: usize,
    keep_all: bool,
) {
    for i in 0..len {
        let lo = i.saturating_sub(radius);
        let hi = (i + radius).min(len - 1);
        let mut acc = keep_all;
        for j in lo..=hi {
            let v = src[j * step];
            if keep_all && !v {
                acc = false;
                break;
            }
            if !keep_all && v {
                acc = true;
                break;
            }
        }
        dst[i * step] = acc;
    }
}

fn separable(mask: &Mask, kernel: KernelSize, keep_all: bool) -> Mask {
    let width = mask.width();
    let height = mask.height();
    let src = mask.to_bools();
    let mut tmp = vec![false; src.len()];
    for y in 0..height {
        let row = y * width;
        filter_1d(
            &src[row..row + width],
            &mut tmp[row..row + width],
            width,
            1,
            kernel.width / 2,
            keep_all,
        );
    }
    let mut out = vec![false; src.len()];
    for x in 0..width {
        filter_1d(&tmp[x..], &mut out[x..], height, width, kernel.height / 2, keep_all);
    }
    Mask::from_bools(&out, width, height)
}

/// Erosion: a pixel stays set only if its whole window is set.
pub fn erode(mask: &Mask, kernel: KernelSize) -> RidgeResult<Mask> {
    Ok(separable(mask, kernel.validate()?, true))
}

/// Dilation: a pixel becomes set if any pixel in its window is set.
pub fn dilate(mask: &Mask, kernel: KernelSize) -> RidgeResult<Mask> {
    Ok(separable(mask, kernel.validate()?, false))
}

/// Opening (erode then dilate) removes specks smaller than the kernel.
pub fn open(mask: &Mask, kernel: KernelSize) -> RidgeResult<Mask> {
    dilate(&erode(mask, kernel)?, kernel)
}

/// Closing (dilate then erode) fills gaps smaller than the kernel.
pub fn close(mask: &Mask, kernel: KernelSize) -> RidgeResult<Mask> {
    erode(&dilate(mask, kernel)?, kernel)
}

#[cfg(test)]
mod tests {
    use super::{close, dilate, erode, open, KernelSize};
    use crate::image::Mask;

    #[test]
    fn even_kernels_are_rejected() {
        let mask = Mask::full(4, 4).unwrap();
        assert!(erode(&mask, KernelSize::new(4, 3)).is_err());
        assert!(erode(&mask, KernelSize::new(0, 3)).is_err());
    }

    #[test]
    fn opening_removes_isolated_pixel() {
        let mask = Mask::from_fn(9, 9, |x, y| (x == 4 && y == 4) || (x < 3 && y < 3)).unwrap();
        let opened = open(&mask, KernelSize::square(3)).unwrap();
        assert!(!opened.is_set(4, 4));
        assert!(opened.is_set(1, 1));
        assert!(opened.is_set(0, 0));
    }

    #[test]
    fn closing_fills_single_pixel_hole() {
        let mask = Mask::from_fn(7, 7, |x, y| !(x == 3 && y == 3)).unwrap();
        let closed = close(&mask, KernelSize::square(3)).unwrap();
        assert!(closed.is_set(3, 3));
        assert_eq!(closed.count(), 49);
    }

    #[test]
    fn dilate_then_erode_sizes() {
        let mask = Mask::from_fn(9, 9, |x, y| x == 4 && y == 4).unwrap();
        let grown = dilate(&mask, KernelSize::square(3)).unwrap();
        assert_eq!(grown.count(), 9);
        let shrunk = erode(&grown, KernelSize::square(3)).unwrap();
        assert_eq!(shrunk.count(), 1);
    }
}
