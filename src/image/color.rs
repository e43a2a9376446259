//! Packed RGB8 color images.

use crate::image::{FloatImage, Mask, OwnedImage};
use crate::util::{RidgeError, RidgeResult};

/// Owned packed RGB image (3 bytes per pixel, row-major, no padding).
#[derive(Clone, Debug, PartialEq)]
pub struct ColorImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl ColorImage {
    /// Number of interleaved channels.
    pub const CHANNELS: usize = 3;

    /// Wraps a packed RGB buffer of exactly `width * height * 3` bytes.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> RidgeResult<Self> {
        if width == 0 || height == 0 {
            return Err(RidgeError::InvalidDimensions { width, height });
        }
        let needed = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(Self::CHANNELS))
            .ok_or(RidgeError::InvalidDimensions { width, height })?;
        if data.len() != needed {
            return Err(RidgeError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Builds an image from a per-pixel RGB function.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> [u8; 3],
    ) -> RidgeResult<Self> {
        if width == 0 || height == 0 {
            return Err(RidgeError::InvalidDimensions { width, height });
        }
        let mut data = Vec::with_capacity(width * height * Self::CHANNELS);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub(crate) fn from_parts(data: Vec<u8>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height * Self::CHANNELS);
        Self {
            data,
            width,
            height,
        }
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the packed RGB bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns the RGB triple at `(x, y)`.
    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y * self.width + x) * Self::CHANNELS;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    /// Converts to grayscale with BT.601 luma weights.
    pub fn to_gray(&self) -> OwnedImage {
        let data = self
            .data
            .chunks_exact(Self::CHANNELS)
            .map(|px| luma(px[0], px[1], px[2]))
            .collect();
        OwnedImage::from_parts(data, self.width, self.height)
    }

    /// Extracts one channel as a float plane.
    #[cfg_attr(not(feature = "candle"), allow(dead_code))]
    pub(crate) fn channel_plane(&self, channel: usize) -> FloatImage {
        let data = self
            .data
            .chunks_exact(Self::CHANNELS)
            .map(|px| px[channel] as f32)
            .collect();
        FloatImage::from_parts(data, self.width, self.height)
    }

    /// Copies pixels inside `mask` and zeroes the rest.
    pub fn masked(&self, mask: &Mask) -> RidgeResult<ColorImage> {
        if (mask.width(), mask.height()) != (self.width, self.height) {
            return Err(RidgeError::DimensionMismatch {
                expected: (self.width, self.height),
                got: (mask.width(), mask.height()),
            });
        }
        let mut data = vec![0u8; self.data.len()];
        for (idx, (dst, src)) in data
            .chunks_exact_mut(Self::CHANNELS)
            .zip(self.data.chunks_exact(Self::CHANNELS))
            .enumerate()
        {
            if mask.data()[idx] != 0 {
                dst.copy_from_slice(src);
            }
        }
        Ok(ColorImage::from_parts(data, self.width, self.height))
    }
}

/// BT.601 luma of an RGB triple.
#[inline]
pub(crate) fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    y.round().clamp(0.0, 255.0) as u8
}

/// BT.601 full-range RGB to `(Y, Cb, Cr)`.
#[inline]
pub(crate) fn rgb_to_ycbcr(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = 128.0 + 0.564 * (b - y);
    let cr = 128.0 + 0.713 * (r - y);
    (y, cb, cr)
}

#[cfg(test)]
mod tests {
    use super::{rgb_to_ycbcr, ColorImage};
    use crate::image::Mask;

    #[test]
    fn gray_conversion_uses_luma_weights() {
        let img = ColorImage::new(vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 10, 10, 10], 2, 2).unwrap();
        assert_eq!(img.to_gray().data(), &[76, 150, 29, 10]);
    }

    #[test]
    fn masked_copy_zeroes_background() {
        let img = ColorImage::from_fn(2, 1, |_, _| [9, 8, 7]).unwrap();
        let mask = Mask::from_fn(2, 1, |x, _| x == 1).unwrap();
        assert_eq!(img.masked(&mask).unwrap().data(), &[0, 0, 0, 9, 8, 7]);
    }

    #[test]
    fn neutral_gray_has_centered_chroma() {
        let (y, cb, cr) = rgb_to_ycbcr(100, 100, 100);
        assert!((y - 100.0).abs() < 1e-3);
        assert!((cb - 128.0).abs() < 1e-3);
        assert!((cr - 128.0).abs() < 1e-3);
    }
}
