//! Fingertip localisation, focus assessment and finger segmentation.

pub mod contour;
mod finger;
mod focus;
mod segment;

pub use finger::{find_finger, find_finger_with_config, find_fingers, FingerSet};
pub use focus::focus_measure;
pub use segment::{segment_finger, Segmentation};

use crate::filter::morphology::KernelSize;
use crate::geom::{Point, Rect};

/// How strictly a candidate region must look like a fingertip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetectMode {
    /// Firm, static contact ("dead finger" capture): high contrast and a
    /// compact, well-filled blob are required.
    Strict,
    /// Live capture with motion blur or partial contact; thresholds are
    /// relaxed.
    #[default]
    Tolerant,
}

/// Thresholds applied by the finger locator.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectConfig {
    /// Gaussian blur applied before thresholding.
    pub blur_sigma: f32,
    /// Minimum mean intensity difference between finger and background.
    pub min_contrast: f64,
    /// Minimum finger area as a fraction of the image.
    pub min_area_fraction: f64,
    /// Maximum finger area as a fraction of the image.
    pub max_area_fraction: f64,
    /// Minimum ratio of blob area to convex hull area.
    pub min_solidity: f64,
    /// Accepted bounding box height/width range.
    pub aspect_range: (f64, f64),
    /// Structuring element used to clean the foreground.
    pub cleanup_kernel: KernelSize,
}

impl DetectConfig {
    /// Default thresholds for a detection mode.
    pub fn for_mode(mode: DetectMode) -> Self {
        match mode {
            DetectMode::Strict => Self {
                blur_sigma: 2.0,
                min_contrast: 40.0,
                min_area_fraction: 0.05,
                max_area_fraction: 0.95,
                min_solidity: 0.8,
                aspect_range: (0.3, 3.5),
                cleanup_kernel: KernelSize::square(5),
            },
            DetectMode::Tolerant => Self {
                blur_sigma: 2.0,
                min_contrast: 20.0,
                min_area_fraction: 0.02,
                max_area_fraction: 0.98,
                min_solidity: 0.65,
                aspect_range: (0.25, 4.0),
                cleanup_kernel: KernelSize::square(5),
            },
        }
    }
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self::for_mode(DetectMode::default())
    }
}

/// A detected fingertip: bounding region plus ordered boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct Finger {
    /// Bounding rectangle of the fingertip blob.
    pub region: Rect,
    /// Boundary pixels in clockwise order.
    pub contour: Vec<Point>,
    /// Blob area in pixels.
    pub area: usize,
    /// Blob centroid `(x, y)`.
    pub centroid: (f64, f64),
}
