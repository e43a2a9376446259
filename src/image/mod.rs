//! Image containers shared by every pipeline stage.
//!
//! `ImageView` is a borrowed 2D view into a 1D buffer with an explicit row
//! stride, so camera buffers with padded rows can be read without copying.
//! Stages never mutate their inputs; they produce new `OwnedImage`,
//! `FloatImage`, `ColorImage` or `Mask` values.

use crate::util::{RidgeError, RidgeResult};

pub(crate) mod color;
#[cfg(feature = "image-io")]
pub mod io;
mod owned;
pub mod pyramid;
pub mod yuv;

pub use color::ColorImage;
pub use owned::{FloatImage, Mask, OwnedImage};

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> RidgeResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> RidgeResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(RidgeError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    pub(crate) fn new_unchecked(data: &'a [T], width: usize, height: usize) -> Self {
        debug_assert!(data.len() >= width * height);
        Self {
            data,
            width,
            height,
            stride: width,
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

    /// Returns `(width, height)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y * self.stride + x)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y * self.stride;
        self.data.get(start..start + self.width)
    }

    /// Iterates over rows from top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &'a [T]> + '_ {
        (0..self.height).filter_map(move |y| self.row(y))
    }

    /// Returns a zero-copy view of the rectangle `(x, y, width, height)`.
    pub fn roi(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> RidgeResult<ImageView<'a, T>> {
        if width == 0 || height == 0 {
            return Err(RidgeError::InvalidDimensions { width, height });
        }
        let fits_x = x.checked_add(width).is_some_and(|end| end <= self.width);
        let fits_y = y.checked_add(height).is_some_and(|end| end <= self.height);
        if !fits_x || !fits_y {
            return Err(RidgeError::MalformedInput {
                reason: format!(
                    "roi ({x}, {y}, {width}x{height}) outside {}x{} image",
                    self.width, self.height
                ),
            });
        }
        let start = y * self.stride + x;
        ImageView::new(&self.data[start..], width, height, self.stride)
    }

    /// Fails with `DimensionMismatch` unless `other` has the same size.
    pub fn ensure_same_size<U>(&self, other: &ImageView<'_, U>) -> RidgeResult<()> {
        if self.dims() != other.dims() {
            return Err(RidgeError::DimensionMismatch {
                expected: self.dims(),
                got: other.dims(),
            });
        }
        Ok(())
    }
}

impl ImageView<'_, u8> {
    /// Copies the view into a contiguous owned image.
    pub fn to_owned_image(&self) -> OwnedImage {
        let mut data = Vec::with_capacity(self.width * self.height);
        for row in self.rows() {
            data.extend_from_slice(row);
        }
        OwnedImage::from_parts(data, self.width, self.height)
    }

    /// Converts the view to a float working buffer.
    pub fn to_float(&self) -> FloatImage {
        let mut data = Vec::with_capacity(self.width * self.height);
        for row in self.rows() {
            data.extend(row.iter().map(|&v| v as f32));
        }
        FloatImage::from_parts(data, self.width, self.height)
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> RidgeResult<usize> {
    if width == 0 || height == 0 {
        return Err(RidgeError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(RidgeError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(RidgeError::InvalidDimensions { width, height })
}
