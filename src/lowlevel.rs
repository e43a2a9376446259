//! Low-level building blocks for custom fingerprint pipelines.
//!
//! These expose the filters, morphology, and record-level codecs used by
//! the pipeline stages. Most users should prefer [`crate::process_fingerprint`],
//! the template generators, and [`crate::Matcher`].

pub use crate::detect::contour::trace_boundary;
pub use crate::detect::DetectConfig;
pub use crate::enhance::{enhance_fingerprint_with_config, EnhanceConfig, RIDGE_LEVEL};
pub use crate::filter::components::{Component, Components};
pub use crate::filter::morphology::{close, dilate, erode, open};
pub use crate::filter::threshold::{histogram, otsu_threshold};
pub use crate::filter::{convolve_separable, gaussian_blur, gaussian_kernel, sobel, StructureTensor};
pub use crate::geom::{convex_hull, polygon_area};
pub use crate::image::pyramid::{rescale, resize_bilinear, ScaleLevel, ScalePyramid};
pub use crate::template::iso::{decode_iso_record, IsoFingerView, IsoMinutia, IsoRecord};
pub use crate::template::{
    extract_minutiae, generate_fingerprint_template_with_config,
    generate_iso_fingerprint_template_with_config, ExtractConfig,
};
