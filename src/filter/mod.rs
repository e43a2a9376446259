//! Low-level image filters used by the detection and enhancement stages.
//!
//! All filters replicate border pixels; none of them mutate their input.

pub mod components;
pub mod gaussian;
pub mod gradient;
pub mod morphology;
pub mod threshold;

#[cfg(feature = "simd")]
pub mod simd;

pub use gaussian::{convolve_separable, gaussian_blur, gaussian_kernel};
pub use gradient::{sobel, StructureTensor};
