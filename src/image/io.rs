//! Loading and saving captures via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::{ColorImage, OwnedImage};
use crate::util::{RidgeError, RidgeResult};
use std::path::Path;

fn io_error(err: image::ImageError) -> RidgeError {
    RidgeError::ImageIo {
        reason: err.to_string(),
    }
}

/// Creates an owned image from a grayscale image buffer.
pub fn owned_from_gray_image(img: &image::GrayImage) -> RidgeResult<OwnedImage> {
    OwnedImage::new(
        img.as_raw().clone(),
        img.width() as usize,
        img.height() as usize,
    )
}

/// Creates a color image from an RGB buffer.
pub fn color_from_rgb_image(img: &image::RgbImage) -> RidgeResult<ColorImage> {
    ColorImage::new(
        img.as_raw().clone(),
        img.width() as usize,
        img.height() as usize,
    )
}

/// Loads an image from disk and converts it to grayscale.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> RidgeResult<OwnedImage> {
    let img = image::open(path).map_err(io_error)?;
    owned_from_gray_image(&img.to_luma8())
}

/// Loads an image from disk and converts it to packed RGB.
pub fn load_color_image<P: AsRef<Path>>(path: P) -> RidgeResult<ColorImage> {
    let img = image::open(path).map_err(io_error)?;
    color_from_rgb_image(&img.to_rgb8())
}

/// Writes a grayscale image; the format follows the file extension.
pub fn save_gray_image<P: AsRef<Path>>(img: &OwnedImage, path: P) -> RidgeResult<()> {
    let buffer = image::GrayImage::from_raw(
        img.width() as u32,
        img.height() as u32,
        img.data().to_vec(),
    )
    .ok_or(RidgeError::InvalidDimensions {
        width: img.width(),
        height: img.height(),
    })?;
    buffer.save(path).map_err(io_error)
}
