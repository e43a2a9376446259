//! ISO/IEC 19794-2:2005 finger minutiae record.
//!
//! ```text
//! record header (24 bytes)
//!   "FMR\0" | " 20\0" | record length u32 | device info u16
//!   | width u16 | height u16 | x resolution u16 | y resolution u16
//!   | view count u8 | reserved u8
//! finger view header (4 bytes)
//!   position u8 | view number (4 bits) + impression type (4 bits)
//!   | quality u8 | minutia count u8
//! minutia (6 bytes)
//!   type (2 bits) + x (14 bits) | reserved (2 bits) + y (14 bits)
//!   | angle u8 (1.40625 degree units, counter-clockwise) | quality u8
//! extended data length u16
//! ```
//!
//! Angles in the record are counter-clockwise with y pointing up; template
//! angles are clockwise in image coordinates, so the sign flips on the way
//! in and out.

use crate::template::codec::ByteReader;
use crate::template::{FingerprintTemplate, Minutia, MinutiaKind, TemplateFormat};
use crate::util::{RidgeError, RidgeResult};
use std::f32::consts::TAU;

pub(crate) const ANGLE_STEPS: u32 = 256;

const FORMAT_ID: &[u8; 4] = b"FMR\0";
const VERSION: &[u8; 4] = b" 20\0";
const HEADER_LEN: usize = 24;
const VIEW_HEADER_LEN: usize = 4;
const MINUTIA_LEN: usize = 6;
/// 500 dpi expressed in pixels per centimetre.
pub const RESOLUTION_PPCM: u16 = 197;
/// Largest coordinate representable in 14 bits.
pub const MAX_COORDINATE: u16 = (1 << 14) - 1;
/// Largest minutia count of one finger view.
pub const MAX_MINUTIAE: usize = u8::MAX as usize;
/// Impression type for a live-scan plain capture.
const LIVE_SCAN_PLAIN: u8 = 0;

/// Minutia as stored in the record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IsoMinutia {
    /// Minutia type.
    pub kind: MinutiaKind,
    /// Column.
    pub x: u16,
    /// Row.
    pub y: u16,
    /// Counter-clockwise angle in units of 360/256 degrees.
    pub angle: u8,
    /// Quality in [0, 100].
    pub quality: u8,
}

/// One finger view of a record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IsoFingerView {
    /// Finger position code (0 = unknown).
    pub position: u8,
    /// View number within the position.
    pub view_number: u8,
    /// Impression type code.
    pub impression: u8,
    /// Overall finger quality in [0, 100].
    pub quality: u8,
    /// Minutiae in record order.
    pub minutiae: Vec<IsoMinutia>,
}

/// Parsed finger minutiae record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IsoRecord {
    /// Capture device information word.
    pub device_info: u16,
    /// Image width in pixels.
    pub width: u16,
    /// Image height in pixels.
    pub height: u16,
    /// Horizontal resolution in pixels per centimetre.
    pub x_resolution: u16,
    /// Vertical resolution in pixels per centimetre.
    pub y_resolution: u16,
    /// Finger views.
    pub views: Vec<IsoFingerView>,
}

fn iso_kind(kind: MinutiaKind) -> u16 {
    match kind {
        MinutiaKind::Other => 0b00,
        MinutiaKind::Ending => 0b01,
        MinutiaKind::Bifurcation => 0b10,
    }
}

fn kind_from_iso(bits: u16) -> RidgeResult<MinutiaKind> {
    match bits {
        0b00 => Ok(MinutiaKind::Other),
        0b01 => Ok(MinutiaKind::Ending),
        0b10 => Ok(MinutiaKind::Bifurcation),
        _ => Err(RidgeError::decode("reserved minutia type 0b11")),
    }
}

/// Record angle units for a clockwise image-space angle.
pub(crate) fn angle_to_iso(angle: f32) -> u8 {
    let ccw = (TAU - angle).rem_euclid(TAU);
    ((ccw / TAU * ANGLE_STEPS as f32).round() as u32 % ANGLE_STEPS) as u8
}

/// Clockwise image-space angle for record angle units.
pub(crate) fn angle_from_iso(units: u8) -> f32 {
    let ccw = units as f32 * TAU / ANGLE_STEPS as f32;
    (TAU - ccw).rem_euclid(TAU)
}

pub(crate) fn check_encodable(width: u16, height: u16, minutiae: &[Minutia]) -> RidgeResult<()> {
    if width > MAX_COORDINATE + 1 || height > MAX_COORDINATE + 1 {
        return Err(RidgeError::malformed(format!(
            "{width}x{height} image exceeds ISO coordinate range"
        )));
    }
    if minutiae.len() > MAX_MINUTIAE {
        return Err(RidgeError::malformed(format!(
            "{} minutiae exceed the ISO view limit of {MAX_MINUTIAE}",
            minutiae.len()
        )));
    }
    Ok(())
}

/// Keeps at most [`MAX_MINUTIAE`], highest quality first, in original order.
pub(crate) fn select_for_record(minutiae: &[Minutia]) -> Vec<Minutia> {
    if minutiae.len() <= MAX_MINUTIAE {
        return minutiae.to_vec();
    }
    let mut order: Vec<usize> = (0..minutiae.len()).collect();
    order.sort_by(|&a, &b| minutiae[b].quality.cmp(&minutiae[a].quality).then(a.cmp(&b)));
    order.truncate(MAX_MINUTIAE);
    order.sort_unstable();
    order.into_iter().map(|i| minutiae[i]).collect()
}

fn view_quality(minutiae: &[Minutia]) -> u8 {
    if minutiae.is_empty() {
        return 0;
    }
    let sum: u32 = minutiae.iter().map(|m| m.quality as u32).sum();
    (sum / minutiae.len() as u32) as u8
}

pub(crate) fn encode_iso(template: &FingerprintTemplate) -> Vec<u8> {
    let minutiae = template.minutiae();
    let count = minutiae.len().min(MAX_MINUTIAE);
    let total = HEADER_LEN + VIEW_HEADER_LEN + count * MINUTIA_LEN + 2;
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(FORMAT_ID);
    out.extend_from_slice(VERSION);
    out.extend_from_slice(&(total as u32).to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&template.width.to_be_bytes());
    out.extend_from_slice(&template.height.to_be_bytes());
    out.extend_from_slice(&RESOLUTION_PPCM.to_be_bytes());
    out.extend_from_slice(&RESOLUTION_PPCM.to_be_bytes());
    out.push(1);
    out.push(0);

    out.push(0);
    out.push(LIVE_SCAN_PLAIN);
    out.push(view_quality(minutiae));
    out.push(count as u8);
    for m in &minutiae[..count] {
        let x = (iso_kind(m.kind) << 14) | (m.x & MAX_COORDINATE);
        let y = m.y & MAX_COORDINATE;
        out.extend_from_slice(&x.to_be_bytes());
        out.extend_from_slice(&y.to_be_bytes());
        out.push(angle_to_iso(m.angle));
        out.push(m.quality);
    }
    out.extend_from_slice(&0u16.to_be_bytes());
    out
}

/// Parses a complete finger minutiae record.
pub fn decode_iso_record(bytes: &[u8]) -> RidgeResult<IsoRecord> {
    let mut r = ByteReader::new(bytes);
    if r.take(4, "format identifier")? != FORMAT_ID {
        return Err(RidgeError::decode("not a finger minutiae record"));
    }
    if r.take(4, "version")? != VERSION {
        return Err(RidgeError::decode("unsupported record version"));
    }
    let length = r.u32("record length")? as usize;
    if length != bytes.len() {
        return Err(RidgeError::decode(format!(
            "record length {length} does not match {} bytes",
            bytes.len()
        )));
    }
    let device_info = r.u16("device info")?;
    let width = r.u16("image width")?;
    let height = r.u16("image height")?;
    let x_resolution = r.u16("x resolution")?;
    let y_resolution = r.u16("y resolution")?;
    let view_count = r.u8("view count")?;
    r.u8("reserved")?;

    let mut views = Vec::with_capacity(view_count as usize);
    for _ in 0..view_count {
        let position = r.u8("finger position")?;
        let packed = r.u8("view number")?;
        let quality = r.u8("finger quality")?;
        let count = r.u8("minutia count")? as usize;
        let mut minutiae = Vec::with_capacity(count);
        for _ in 0..count {
            let xw = r.u16("minutia x")?;
            let yw = r.u16("minutia y")?;
            let angle = r.u8("minutia angle")?;
            let quality = r.u8("minutia quality")?;
            minutiae.push(IsoMinutia {
                kind: kind_from_iso(xw >> 14)?,
                x: xw & MAX_COORDINATE,
                y: yw & MAX_COORDINATE,
                angle,
                quality,
            });
        }
        let ext_len = r.u16("extended data length")? as usize;
        r.take(ext_len, "extended data")?;
        views.push(IsoFingerView {
            position,
            view_number: packed >> 4,
            impression: packed & 0x0f,
            quality,
            minutiae,
        });
    }
    debug_assert!(r.offset() <= bytes.len());
    r.finish()?;

    Ok(IsoRecord {
        device_info,
        width,
        height,
        x_resolution,
        y_resolution,
        views,
    })
}

pub(crate) fn decode_iso(bytes: &[u8]) -> RidgeResult<FingerprintTemplate> {
    let record = decode_iso_record(bytes)?;
    let view = record
        .views
        .first()
        .ok_or_else(|| RidgeError::decode("record has no finger view"))?;
    let minutiae = view
        .minutiae
        .iter()
        .map(|m| {
            if m.quality > 100 {
                return Err(RidgeError::decode(format!(
                    "minutia quality {} > 100",
                    m.quality
                )));
            }
            Ok(Minutia {
                x: m.x,
                y: m.y,
                angle: angle_from_iso(m.angle),
                kind: m.kind,
                quality: m.quality,
            })
        })
        .collect::<RidgeResult<Vec<_>>>()?;
    FingerprintTemplate::from_minutiae(
        TemplateFormat::Iso,
        record.width as usize,
        record.height as usize,
        minutiae,
        None,
    )
    .map_err(|e| RidgeError::decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{angle_from_iso, angle_to_iso, decode_iso_record, encode_iso};
    use crate::template::{FingerprintTemplate, Minutia, MinutiaKind, TemplateFormat};
    use std::f32::consts::{FRAC_PI_2, PI};

    fn record() -> FingerprintTemplate {
        let minutiae = vec![
            Minutia {
                x: 100,
                y: 200,
                angle: FRAC_PI_2,
                kind: MinutiaKind::Ending,
                quality: 60,
            },
            Minutia {
                x: 5,
                y: 9,
                angle: PI,
                kind: MinutiaKind::Bifurcation,
                quality: 80,
            },
        ];
        FingerprintTemplate::from_minutiae(TemplateFormat::Iso, 256, 320, minutiae, None).unwrap()
    }

    #[test]
    fn header_fields_follow_the_standard_layout() {
        let bytes = encode_iso(&record());
        assert_eq!(bytes.len(), 24 + 4 + 2 * 6 + 2);
        assert_eq!(&bytes[0..4], b"FMR\0");
        assert_eq!(&bytes[4..8], b" 20\0");
        assert_eq!(u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]), 42);
        assert_eq!(u16::from_be_bytes([bytes[14], bytes[15]]), 256);
        assert_eq!(u16::from_be_bytes([bytes[16], bytes[17]]), 320);
        assert_eq!(u16::from_be_bytes([bytes[18], bytes[19]]), 197);
        assert_eq!(bytes[22], 1);
        assert_eq!(bytes[27], 2);
        // Ending at x = 100: type bits 01.
        assert_eq!(u16::from_be_bytes([bytes[28], bytes[29]]), 0x4000 | 100);
        // Bifurcation at x = 5: type bits 10.
        assert_eq!(u16::from_be_bytes([bytes[34], bytes[35]]), 0x8000 | 5);
    }

    #[test]
    fn angles_are_counter_clockwise() {
        // Pointing down in image space is 270 degrees counter-clockwise.
        assert_eq!(angle_to_iso(FRAC_PI_2), 192);
        assert_eq!(angle_to_iso(0.0), 0);
        assert!((angle_from_iso(64) - 1.5 * PI).abs() < 1e-5);
    }

    #[test]
    fn reader_exposes_every_view_field() {
        let parsed = decode_iso_record(&encode_iso(&record())).unwrap();
        assert_eq!(parsed.views.len(), 1);
        let view = &parsed.views[0];
        assert_eq!(view.quality, 70);
        assert_eq!(view.minutiae[0].x, 100);
        assert_eq!(view.minutiae[0].y, 200);
        assert_eq!(view.minutiae[1].kind, MinutiaKind::Bifurcation);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let mut bytes = encode_iso(&record());
        bytes.push(0);
        assert!(decode_iso_record(&bytes).is_err());
    }
}
