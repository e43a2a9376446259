//! Multi-scale copies of a grayscale capture for depth-tolerant matching.
//!
//! Resampling uses bilinear interpolation with pixel-center alignment:
//! destination pixel `x` samples the source at `(x + 0.5) / s - 0.5`. A scale
//! of exactly 1.0 copies the source unchanged so that single-scale matching
//! reproduces plain verification.

use crate::image::{ImageView, OwnedImage};
use crate::util::{RidgeError, RidgeResult};

/// Smallest side length a resampled level may have.
pub const MIN_LEVEL_SIDE: usize = 16;

/// Resizes a grayscale view to `dst_width x dst_height`.
pub fn resize_bilinear(
    src: ImageView<'_, u8>,
    dst_width: usize,
    dst_height: usize,
) -> RidgeResult<OwnedImage> {
    if dst_width == 0 || dst_height == 0 {
        return Err(RidgeError::InvalidDimensions {
            width: dst_width,
            height: dst_height,
        });
    }
    let sx = src.width() as f32 / dst_width as f32;
    let sy = src.height() as f32 / dst_height as f32;
    let max_x = src.width() - 1;
    let max_y = src.height() - 1;

    let mut out = Vec::with_capacity(dst_width * dst_height);
    for y in 0..dst_height {
        let fy = ((y as f32 + 0.5) * sy - 0.5).clamp(0.0, max_y as f32);
        let y0 = fy.floor() as usize;
        let y1 = (y0 + 1).min(max_y);
        let wy = fy - y0 as f32;
        let (Some(row0), Some(row1)) = (src.row(y0), src.row(y1)) else {
            return Err(RidgeError::BufferTooSmall {
                needed: (y1 + 1) * src.stride(),
                got: src.as_slice().len(),
            });
        };
        for x in 0..dst_width {
            let fx = ((x as f32 + 0.5) * sx - 0.5).clamp(0.0, max_x as f32);
            let x0 = fx.floor() as usize;
            let x1 = (x0 + 1).min(max_x);
            let wx = fx - x0 as f32;
            let top = row0[x0] as f32 * (1.0 - wx) + row0[x1] as f32 * wx;
            let bottom = row1[x0] as f32 * (1.0 - wx) + row1[x1] as f32 * wx;
            let value = top * (1.0 - wy) + bottom * wy;
            out.push(value.round().clamp(0.0, 255.0) as u8);
        }
    }
    OwnedImage::new(out, dst_width, dst_height)
}

/// Scales a grayscale view by `factor`, rounding the output size.
pub fn rescale(src: ImageView<'_, u8>, factor: f64) -> RidgeResult<OwnedImage> {
    validate_scale(factor)?;
    if factor == 1.0 {
        return Ok(src.to_owned_image());
    }
    let width = (src.width() as f64 * factor).round() as usize;
    let height = (src.height() as f64 * factor).round() as usize;
    if width < MIN_LEVEL_SIDE || height < MIN_LEVEL_SIDE {
        return Err(RidgeError::MalformedInput {
            reason: format!("scale {factor} shrinks the image to {width}x{height}"),
        });
    }
    resize_bilinear(src, width, height)
}

pub(crate) fn validate_scale(factor: f64) -> RidgeResult<()> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(RidgeError::InvalidParameter {
            name: "scale",
            reason: "must be finite and > 0",
        });
    }
    Ok(())
}

/// One resampled copy of the capture.
#[derive(Clone, Debug)]
pub struct ScaleLevel {
    /// Scale factor relative to the source.
    pub scale: f64,
    /// Resampled image.
    pub image: OwnedImage,
}

/// Owned set of rescaled copies, one per requested factor, in request order.
///
/// A factor whose level would fall below [`MIN_LEVEL_SIDE`] is recorded in
/// [`ScalePyramid::skipped`] instead of failing the whole pyramid.
#[derive(Clone, Debug)]
pub struct ScalePyramid {
    levels: Vec<ScaleLevel>,
    skipped: Vec<(f64, RidgeError)>,
}

impl ScalePyramid {
    /// Builds one level per factor in `scales`.
    ///
    /// Fails on an empty or invalid scale list, or when no level could be
    /// resampled; the error is then the one of the first requested scale.
    pub fn build(base: ImageView<'_, u8>, scales: &[f64]) -> RidgeResult<Self> {
        if scales.is_empty() {
            return Err(RidgeError::InvalidParameter {
                name: "scales",
                reason: "at least one scale is required",
            });
        }
        for &scale in scales {
            validate_scale(scale)?;
        }
        let mut levels = Vec::with_capacity(scales.len());
        let mut skipped = Vec::new();
        for &scale in scales {
            match rescale(base, scale) {
                Ok(image) => levels.push(ScaleLevel { scale, image }),
                Err(err) => skipped.push((scale, err)),
            }
        }
        if levels.is_empty() {
            if let Some((_, err)) = skipped.drain(..).next() {
                return Err(err);
            }
        }
        Ok(Self { levels, skipped })
    }

    /// Returns all levels in request order.
    pub fn levels(&self) -> &[ScaleLevel] {
        &self.levels
    }

    /// Returns the view of a single level.
    pub fn level(&self, index: usize) -> Option<ImageView<'_, u8>> {
        self.levels.get(index).map(|level| level.image.view())
    }

    /// Factors that could not be resampled, with the reason.
    pub fn skipped(&self) -> &[(f64, RidgeError)] {
        &self.skipped
    }
}
