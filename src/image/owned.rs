//! Owned image buffers: 8-bit grayscale, `f32` working planes and masks.

use crate::image::ImageView;
use crate::util::{RidgeError, RidgeResult};

fn checked_len(width: usize, height: usize) -> RidgeResult<usize> {
    if width == 0 || height == 0 {
        return Err(RidgeError::InvalidDimensions { width, height });
    }
    width
        .checked_mul(height)
        .ok_or(RidgeError::InvalidDimensions { width, height })
}

fn check_exact_len(len: usize, width: usize, height: usize) -> RidgeResult<()> {
    let needed = checked_len(width, height)?;
    if len < needed {
        return Err(RidgeError::BufferTooSmall { needed, got: len });
    }
    if len > needed {
        return Err(RidgeError::MalformedInput {
            reason: format!("buffer of {len} bytes exceeds {width}x{height}"),
        });
    }
    Ok(())
}

/// Owned contiguous 8-bit grayscale image.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl OwnedImage {
    /// Wraps a contiguous buffer of exactly `width * height` bytes.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> RidgeResult<Self> {
        check_exact_len(data.len(), width, height)?;
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Builds an image by evaluating `f(x, y)` at every pixel.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> u8,
    ) -> RidgeResult<Self> {
        let len = checked_len(width, height)?;
        let mut data = Vec::with_capacity(len);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub(crate) fn from_parts(data: Vec<u8>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height);
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

    /// Returns the raw row-major pixels.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the image and returns its pixels.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Returns the pixel at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[y * self.width + x])
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, u8> {
        ImageView::new_unchecked(&self.data, self.width, self.height)
    }
}

/// Owned `f32` image used as an intermediate plane by the filters.
#[derive(Clone, Debug, PartialEq)]
pub struct FloatImage {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl FloatImage {
    /// Creates a zero-filled plane.
    pub fn zeros(width: usize, height: usize) -> RidgeResult<Self> {
        let len = checked_len(width, height)?;
        Ok(Self {
            data: vec![0.0; len],
            width,
            height,
        })
    }

    pub(crate) fn from_parts(data: Vec<f32>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            data,
            width,
            height,
        }
    }

    /// Returns the plane width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the plane height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the row-major values.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Returns the value at `(x, y)`; callers guarantee bounds.
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    /// Returns the value at `(x, y)` with coordinates clamped to the border.
    #[inline]
    pub fn at_clamped(&self, x: isize, y: isize) -> f32 {
        let cx = x.clamp(0, self.width as isize - 1) as usize;
        let cy = y.clamp(0, self.height as isize - 1) as usize;
        self.data[cy * self.width + cx]
    }

    /// Bilinear sample at a fractional position, clamped to the border.
    pub fn sample_bilinear(&self, x: f32, y: f32) -> f32 {
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;
        let x = x.clamp(0.0, max_x);
        let y = y.clamp(0.0, max_y);
        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;
        let a = self.at(x0, y0);
        let b = self.at(x1, y0);
        let c = self.at(x0, y1);
        let d = self.at(x1, y1);
        a * (1.0 - fx) * (1.0 - fy) + b * fx * (1.0 - fy) + c * (1.0 - fx) * fy + d * fx * fy
    }

    /// Applies `f` to every value, producing a new plane.
    pub fn map(&self, f: impl Fn(f32) -> f32) -> FloatImage {
        FloatImage::from_parts(
            self.data.iter().map(|&v| f(v)).collect(),
            self.width,
            self.height,
        )
    }

    /// Combines two planes of identical size element-wise.
    pub fn zip_map(&self, other: &FloatImage, f: impl Fn(f32, f32) -> f32) -> FloatImage {
        debug_assert_eq!(self.data.len(), other.data.len());
        FloatImage::from_parts(
            self.data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
            self.width,
            self.height,
        )
    }

    /// Rounds and clamps the plane into an 8-bit image.
    pub fn to_u8(&self) -> OwnedImage {
        let data = self
            .data
            .iter()
            .map(|&v| v.round().clamp(0.0, 255.0) as u8)
            .collect();
        OwnedImage::from_parts(data, self.width, self.height)
    }
}

/// Binary mask aligned with an image; set pixels are stored as 255.
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl Mask {
    /// Value stored for set pixels.
    pub const SET: u8 = 255;

    /// Creates an all-clear mask.
    pub fn empty(width: usize, height: usize) -> RidgeResult<Self> {
        let len = checked_len(width, height)?;
        Ok(Self {
            data: vec![0; len],
            width,
            height,
        })
    }

    /// Creates an all-set mask.
    pub fn full(width: usize, height: usize) -> RidgeResult<Self> {
        let len = checked_len(width, height)?;
        Ok(Self {
            data: vec![Self::SET; len],
            width,
            height,
        })
    }

    /// Builds a mask from a predicate evaluated at every pixel.
    pub fn from_fn(
        width: usize,
        height: usize,
        mut f: impl FnMut(usize, usize) -> bool,
    ) -> RidgeResult<Self> {
        let len = checked_len(width, height)?;
        let mut data = Vec::with_capacity(len);
        for y in 0..height {
            for x in 0..width {
                data.push(if f(x, y) { Self::SET } else { 0 });
            }
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Interprets any non-zero pixel of an 8-bit view as set.
    pub fn from_view(view: ImageView<'_, u8>) -> Self {
        let mut data = Vec::with_capacity(view.width() * view.height());
        for row in view.rows() {
            data.extend(row.iter().map(|&v| if v != 0 { Self::SET } else { 0 }));
        }
        Self {
            data,
            width: view.width(),
            height: view.height(),
        }
    }

    pub(crate) fn from_bools(bits: &[bool], width: usize, height: usize) -> Self {
        debug_assert_eq!(bits.len(), width * height);
        Self {
            data: bits
                .iter()
                .map(|&b| if b { Self::SET } else { 0 })
                .collect(),
            width,
            height,
        }
    }

    /// Returns the mask width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the mask height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the raw 0/255 bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns true when `(x, y)` is inside the mask and set.
    #[inline]
    pub fn is_set(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.data[y * self.width + x] != 0
    }

    pub(crate) fn set(&mut self, x: usize, y: usize, value: bool) {
        self.data[y * self.width + x] = if value { Self::SET } else { 0 };
    }

    /// Number of set pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Fraction of set pixels in [0, 1].
    pub fn coverage(&self) -> f64 {
        self.count() as f64 / self.data.len() as f64
    }

    /// Returns true if no pixel is set.
    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|&v| v == 0)
    }

    pub(crate) fn to_bools(&self) -> Vec<bool> {
        self.data.iter().map(|&v| v != 0).collect()
    }

    /// Returns a borrowed 8-bit view of the mask.
    pub fn view(&self) -> ImageView<'_, u8> {
        ImageView::new_unchecked(&self.data, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::{FloatImage, Mask, OwnedImage};
    use crate::util::RidgeError;

    #[test]
    fn owned_image_rejects_wrong_length() {
        let err = OwnedImage::new(vec![0; 3], 2, 2).unwrap_err();
        assert_eq!(err, RidgeError::BufferTooSmall { needed: 4, got: 3 });
        assert!(OwnedImage::new(vec![0; 5], 2, 2).is_err());
    }

    #[test]
    fn float_plane_rounds_into_u8() {
        let plane = FloatImage::from_parts(vec![-3.0, 12.4, 12.6, 300.0], 2, 2);
        assert_eq!(plane.to_u8().data(), &[0, 12, 13, 255]);
    }

    #[test]
    fn bilinear_sample_interpolates() {
        let plane = FloatImage::from_parts(vec![0.0, 10.0, 20.0, 30.0], 2, 2);
        assert!((plane.sample_bilinear(0.5, 0.5) - 15.0).abs() < 1e-5);
        assert!((plane.sample_bilinear(-4.0, 0.0) - 0.0).abs() < 1e-6);
    }

    #[test]
    fn mask_counts_set_pixels() {
        let mask = Mask::from_fn(4, 2, |x, _| x < 1).unwrap();
        assert_eq!(mask.count(), 2);
        assert!((mask.coverage() - 0.25).abs() < 1e-9);
        assert!(mask.is_set(0, 1));
        assert!(!mask.is_set(5, 0));
    }
}
