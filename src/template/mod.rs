//! Minutiae templates: extraction, ridge flow, and both binary encodings.
//!
//! A [`FingerprintTemplate`] is tagged with its [`TemplateFormat`]. Minutia
//! angles are quantized to the resolution of that format on construction,
//! so `decode(to_bytes())` reproduces the template exactly.

mod codec;
mod extract;
mod flow;
pub mod iso;
mod skeleton;

pub use extract::{
    extract_minutiae, generate_fingerprint_template, generate_fingerprint_template_with_config,
    generate_iso_fingerprint_template, generate_iso_fingerprint_template_with_config,
    ExtractConfig,
};
pub use flow::RidgeFlow;

use crate::util::math::wrap_tau;
use crate::util::{RidgeError, RidgeResult};
use std::f32::consts::TAU;

/// Most minutiae one template can hold; the native count field is 16 bits.
pub const MAX_TEMPLATE_MINUTIAE: usize = u16::MAX as usize;

/// Minutia type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MinutiaKind {
    /// Ridge ending.
    Ending,
    /// Ridge bifurcation.
    Bifurcation,
    /// Any other singularity; only produced by decoding foreign records.
    Other,
}

/// A ridge singularity in image coordinates (y grows downwards).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Minutia {
    /// Column.
    pub x: u16,
    /// Row.
    pub y: u16,
    /// Direction in radians, [0, 2π), measured from +x towards +y.
    pub angle: f32,
    /// Minutia type.
    pub kind: MinutiaKind,
    /// Reliability in [0, 100].
    pub quality: u8,
}

/// Binary template encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TemplateFormat {
    /// Versioned native encoding, carries ridge flow for faster scoring.
    #[default]
    Proprietary,
    /// ISO/IEC 19794-2:2005 finger minutiae record.
    Iso,
}

impl TemplateFormat {
    /// Number of angle steps per full turn in this encoding.
    pub(crate) fn angle_steps(self) -> u32 {
        match self {
            TemplateFormat::Proprietary => codec::ANGLE_STEPS,
            TemplateFormat::Iso => iso::ANGLE_STEPS,
        }
    }

    fn quantize(self, angle: f32) -> f32 {
        let steps = self.angle_steps();
        let unit = TAU / steps as f32;
        let idx = (wrap_tau(angle) / unit).round() as u32 % steps;
        idx as f32 * unit
    }
}

/// Encoded-feature representation of one fingerprint.
///
/// Templates are compared through the matcher only, so no structural
/// equality is provided.
#[derive(Clone, Debug)]
pub struct FingerprintTemplate {
    format: TemplateFormat,
    width: u16,
    height: u16,
    minutiae: Vec<Minutia>,
    ridge_flow: Option<RidgeFlow>,
}

impl FingerprintTemplate {
    /// Builds a template from minutiae of a `width` x `height` image.
    ///
    /// ISO templates cannot carry ridge flow; it is dropped for that format.
    pub fn from_minutiae(
        format: TemplateFormat,
        width: usize,
        height: usize,
        minutiae: Vec<Minutia>,
        ridge_flow: Option<RidgeFlow>,
    ) -> RidgeResult<Self> {
        let (width, height) = match (u16::try_from(width), u16::try_from(height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
            _ => return Err(RidgeError::InvalidDimensions { width, height }),
        };
        if minutiae.len() > MAX_TEMPLATE_MINUTIAE {
            return Err(RidgeError::InvalidParameter {
                name: "minutiae",
                reason: "at most 65535 per template",
            });
        }
        if let Some(m) = minutiae.iter().find(|m| m.x >= width || m.y >= height) {
            return Err(RidgeError::malformed(format!(
                "minutia ({}, {}) outside {width}x{height} image",
                m.x, m.y
            )));
        }
        if format == TemplateFormat::Iso {
            iso::check_encodable(width, height, &minutiae)?;
        }
        let minutiae = minutiae
            .into_iter()
            .map(|m| Minutia {
                angle: format.quantize(m.angle),
                quality: m.quality.min(100),
                ..m
            })
            .collect();
        let ridge_flow = match format {
            TemplateFormat::Proprietary => ridge_flow,
            TemplateFormat::Iso => None,
        };
        Ok(Self {
            format,
            width,
            height,
            minutiae,
            ridge_flow,
        })
    }

    /// Encoding this template serializes to.
    pub fn format(&self) -> TemplateFormat {
        self.format
    }

    /// Width of the source image.
    pub fn width(&self) -> usize {
        self.width as usize
    }

    /// Height of the source image.
    pub fn height(&self) -> usize {
        self.height as usize
    }

    /// Detected minutiae.
    pub fn minutiae(&self) -> &[Minutia] {
        &self.minutiae
    }

    /// Block orientation summary, present only for proprietary templates.
    pub fn ridge_flow(&self) -> Option<&RidgeFlow> {
        self.ridge_flow.as_ref()
    }

    /// Serializes in this template's format.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self.format {
            TemplateFormat::Proprietary => codec::encode_proprietary(self),
            TemplateFormat::Iso => iso::encode_iso(self),
        }
    }

    /// Parses `bytes` as the explicitly requested `format`.
    pub fn decode(bytes: &[u8], format: TemplateFormat) -> RidgeResult<Self> {
        match format {
            TemplateFormat::Proprietary => codec::decode_proprietary(bytes),
            TemplateFormat::Iso => iso::decode_iso(bytes),
        }
    }

    /// Re-encodes the same minutiae in another format.
    ///
    /// Converting to ISO quantizes angles and drops ridge flow; converting
    /// back does not restore either.
    pub fn to_format(&self, format: TemplateFormat) -> RidgeResult<Self> {
        if format == self.format {
            return Ok(self.clone());
        }
        let minutiae = match format {
            TemplateFormat::Iso => iso::select_for_record(&self.minutiae),
            TemplateFormat::Proprietary => self.minutiae.clone(),
        };
        Self::from_minutiae(
            format,
            self.width(),
            self.height(),
            minutiae,
            self.ridge_flow.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{FingerprintTemplate, Minutia, MinutiaKind, TemplateFormat};
    use crate::util::ErrorKind;
    use std::f32::consts::PI;

    fn minutia(x: u16, y: u16, angle: f32) -> Minutia {
        Minutia {
            x,
            y,
            angle,
            kind: MinutiaKind::Ending,
            quality: 80,
        }
    }

    #[test]
    fn angles_are_quantized_per_format() {
        let raw = vec![minutia(10, 10, 0.3), minutia(20, 5, -PI / 2.0)];
        let iso =
            FingerprintTemplate::from_minutiae(TemplateFormat::Iso, 64, 64, raw.clone(), None)
                .unwrap();
        let step = 2.0 * PI / 256.0;
        for m in iso.minutiae() {
            let units = m.angle / step;
            assert!((units - units.round()).abs() < 1e-3);
            assert!((0.0..2.0 * PI).contains(&m.angle));
        }
        assert!((iso.minutiae()[1].angle - 1.5 * PI).abs() < 1e-4);
    }

    #[test]
    fn minutiae_outside_the_image_are_rejected() {
        let err = FingerprintTemplate::from_minutiae(
            TemplateFormat::Proprietary,
            32,
            32,
            vec![minutia(40, 3, 0.0)],
            None,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn conversion_keeps_positions_and_kinds() {
        let raw = vec![
            minutia(3, 4, 1.0),
            Minutia {
                kind: MinutiaKind::Bifurcation,
                ..minutia(30, 40, 2.0)
            },
        ];
        let native =
            FingerprintTemplate::from_minutiae(TemplateFormat::Proprietary, 64, 64, raw, None)
                .unwrap();
        let iso = native.to_format(TemplateFormat::Iso).unwrap();
        assert_eq!(iso.format(), TemplateFormat::Iso);
        assert!(iso.ridge_flow().is_none());
        for (a, b) in native.minutiae().iter().zip(iso.minutiae()) {
            assert_eq!((a.x, a.y, a.kind), (b.x, b.y, b.kind));
        }
    }
}
