//! Error types for ridgeprint.

use thiserror::Error;

/// Result alias for ridgeprint operations.
pub type RidgeResult<T> = std::result::Result<T, RidgeError>;

/// Coarse failure classes surfaced to callers deciding on a retry policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Dimension, stride, parameter or encoding contract violation.
    MalformedInput,
    /// No fingertip-shaped region was found.
    NoFingerDetected,
    /// Finger segmentation produced an empty mask.
    Segmentation,
    /// Too few reliable minutiae for a usable template.
    InsufficientFeatures,
    /// A liveness model file could not be loaded.
    ModelLoad,
    /// Liveness inference rejected its input.
    Inference,
    /// Unexpected internal fault.
    Processing,
}

/// Errors that can occur when running ridgeprint algorithms.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RidgeError {
    /// Width or height is zero or overflows.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is shorter than the declared layout.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Two images that must be aligned have different sizes.
    #[error("dimension mismatch: expected {expected:?}, got {got:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
    /// A tuning parameter is out of its valid range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: &'static str,
    },
    /// A sensor buffer or argument set is inconsistent.
    #[error("malformed input: {reason}")]
    MalformedInput { reason: String },
    /// A template byte stream could not be decoded.
    #[error("template decode failed: {reason}")]
    TemplateDecode { reason: String },
    /// No qualifying fingertip region was found.
    #[error("no finger detected: {reason}")]
    NoFingerDetected { reason: &'static str },
    /// The finger mask collapsed to empty.
    #[error("segmentation failed: {reason}")]
    Segmentation { reason: &'static str },
    /// Feature detection found fewer minutiae than required.
    #[error("insufficient features: found {found}, required {required}")]
    InsufficientFeatures { found: usize, required: usize },
    /// A liveness model file could not be read or parsed.
    #[error("failed to load model {path}: {reason}")]
    ModelLoad { path: String, reason: String },
    /// Liveness inference rejected the input.
    #[error("inference failed: {reason}")]
    Inference { reason: String },
    /// Internal processing fault.
    #[error("processing failed: {reason}")]
    Processing { reason: String },
    /// Image decoding or encoding failed.
    #[error("image io failed: {reason}")]
    ImageIo { reason: String },
}

impl RidgeError {
    /// Returns the failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RidgeError::InvalidDimensions { .. }
            | RidgeError::InvalidStride { .. }
            | RidgeError::BufferTooSmall { .. }
            | RidgeError::DimensionMismatch { .. }
            | RidgeError::InvalidParameter { .. }
            | RidgeError::MalformedInput { .. }
            | RidgeError::TemplateDecode { .. } => ErrorKind::MalformedInput,
            RidgeError::NoFingerDetected { .. } => ErrorKind::NoFingerDetected,
            RidgeError::Segmentation { .. } => ErrorKind::Segmentation,
            RidgeError::InsufficientFeatures { .. } => ErrorKind::InsufficientFeatures,
            RidgeError::ModelLoad { .. } => ErrorKind::ModelLoad,
            RidgeError::Inference { .. } => ErrorKind::Inference,
            RidgeError::Processing { .. } | RidgeError::ImageIo { .. } => ErrorKind::Processing,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        RidgeError::MalformedInput {
            reason: reason.into(),
        }
    }

    pub(crate) fn decode(reason: impl Into<String>) -> Self {
        RidgeError::TemplateDecode {
            reason: reason.into(),
        }
    }
}
