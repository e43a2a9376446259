//! Ridgeprint is a CPU fingerprint recognition engine.
//!
//! The pipeline runs from raw camera buffers to match scores:
//! YUV conversion, fingertip detection and segmentation, illumination
//! normalization with a quality score, Gabor ridge enhancement, minutia
//! extraction into native or ISO 19794-2 templates, and 1:1 / 1:N matching
//! with multi-scale probes. A small dense-network liveness classifier runs
//! on colour frames independently of the templates.
//!
//! Identification fans out over the gallery with the `rayon` feature
//! (enabled by default); the `simd` feature vectorizes separable filtering.
//! Liveness inference runs on candle behind the default `candle` feature.

pub mod detect;
pub mod enhance;
pub mod filter;
pub mod geom;
pub mod image;
#[cfg(feature = "candle")]
pub mod liveness;
pub mod lowlevel;
pub mod matching;
pub mod pipeline;
pub mod template;
mod trace;
pub mod util;

/// Engine version reported alongside results.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use detect::{
    find_finger, find_fingers, focus_measure, segment_finger, DetectMode, Finger, FingerSet,
    Segmentation,
};
pub use enhance::{
    binarize, enhance_fingerprint, preprocess_fingerprint, Enhanced, Preprocessed,
    QUALITY_THRESHOLD,
};
pub use filter::morphology::KernelSize;
pub use geom::{Point, Rect};
pub use image::yuv::{yuv420_to_nv21, yuv420_to_rgb, Yuv420Layout};
pub use image::{ColorImage, FloatImage, ImageView, Mask, OwnedImage};
#[cfg(feature = "candle")]
pub use liveness::{check_liveness, ModelCache};
pub use matching::{
    identify, pyramid_identify, pyramid_verify, verify, verify_encoded, MatchConfig, MatchResult,
    Matcher, DEFAULT_PYRAMID_SCALES,
};
pub use pipeline::{
    extract_template, process_fingerprint, CaptureMetrics, PipelineConfig, ProcessedFingerprint,
};
pub use template::{
    generate_fingerprint_template, generate_iso_fingerprint_template, FingerprintTemplate,
    Minutia, MinutiaKind, RidgeFlow, TemplateFormat,
};
pub use util::{ErrorKind, RidgeError, RidgeResult};
