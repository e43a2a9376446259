//! Native `RDGP` template encoding and shared byte reading helpers.
//!
//! Layout (big-endian):
//!
//! ```text
//! magic "RDGP" | version u16 | width u16 | height u16 | count u16
//! count x { x u16 | y u16 | angle u16 | kind u8 | quality u8 }
//! block u16 | cols u16 | rows u16 | cols*rows x orientation u8
//! ```
//!
//! A zero block size means the template carries no ridge flow.

use crate::template::{FingerprintTemplate, Minutia, MinutiaKind, RidgeFlow, TemplateFormat};
use crate::util::{RidgeError, RidgeResult};
use std::f32::consts::TAU;

pub(crate) const MAGIC: &[u8; 4] = b"RDGP";
pub(crate) const VERSION: u16 = 1;
pub(crate) const ANGLE_STEPS: u32 = 1 << 16;
/// Magic, version, width, height and minutia count.
const HEADER_LEN: usize = 12;
const MINUTIA_LEN: usize = 8;
/// Block size, columns and rows of the ridge-flow grid.
const FLOW_HEADER_LEN: usize = 6;

/// Cursor over a byte slice; every read checks the remaining length.
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub(crate) fn take(&mut self, len: usize, what: &str) -> RidgeResult<&'a [u8]> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                RidgeError::decode(format!("truncated {what} at offset {}", self.offset))
            })?;
        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    pub(crate) fn u8(&mut self, what: &str) -> RidgeResult<u8> {
        Ok(self.take(1, what)?[0])
    }

    pub(crate) fn u16(&mut self, what: &str) -> RidgeResult<u16> {
        let b = self.take(2, what)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32(&mut self, what: &str) -> RidgeResult<u32> {
        let b = self.take(4, what)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn finish(self) -> RidgeResult<()> {
        if self.offset != self.data.len() {
            return Err(RidgeError::decode(format!(
                "{} trailing bytes",
                self.data.len() - self.offset
            )));
        }
        Ok(())
    }
}

pub(crate) fn kind_code(kind: MinutiaKind) -> u8 {
    match kind {
        MinutiaKind::Other => 0,
        MinutiaKind::Ending => 1,
        MinutiaKind::Bifurcation => 2,
    }
}

pub(crate) fn kind_from_code(code: u8) -> RidgeResult<MinutiaKind> {
    match code {
        0 => Ok(MinutiaKind::Other),
        1 => Ok(MinutiaKind::Ending),
        2 => Ok(MinutiaKind::Bifurcation),
        other => Err(RidgeError::decode(format!("unknown minutia type {other}"))),
    }
}

fn angle_to_u16(angle: f32) -> u16 {
    ((angle / TAU * ANGLE_STEPS as f32).round() as u32 % ANGLE_STEPS) as u16
}

fn angle_from_u16(units: u16) -> f32 {
    units as f32 * TAU / ANGLE_STEPS as f32
}

pub(crate) fn encode_proprietary(template: &FingerprintTemplate) -> Vec<u8> {
    let minutiae = template.minutiae();
    let flow_len = template.ridge_flow().map_or(0, |f| f.cells().len());
    let mut out =
        Vec::with_capacity(HEADER_LEN + minutiae.len() * MINUTIA_LEN + FLOW_HEADER_LEN + flow_len);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_be_bytes());
    out.extend_from_slice(&template.width.to_be_bytes());
    out.extend_from_slice(&template.height.to_be_bytes());
    // `from_minutiae` bounds the count by MAX_TEMPLATE_MINUTIAE.
    out.extend_from_slice(&(minutiae.len() as u16).to_be_bytes());
    for m in minutiae {
        out.extend_from_slice(&m.x.to_be_bytes());
        out.extend_from_slice(&m.y.to_be_bytes());
        out.extend_from_slice(&angle_to_u16(m.angle).to_be_bytes());
        out.push(kind_code(m.kind));
        out.push(m.quality);
    }
    match template.ridge_flow() {
        Some(flow) => {
            out.extend_from_slice(&flow.block().to_be_bytes());
            out.extend_from_slice(&flow.cols().to_be_bytes());
            out.extend_from_slice(&flow.rows().to_be_bytes());
            out.extend_from_slice(flow.cells());
        }
        None => out.extend_from_slice(&[0; FLOW_HEADER_LEN]),
    }
    out
}

pub(crate) fn decode_proprietary(bytes: &[u8]) -> RidgeResult<FingerprintTemplate> {
    if bytes.len() < HEADER_LEN {
        return Err(RidgeError::decode(format!(
            "template holds {} bytes, header needs {HEADER_LEN}",
            bytes.len()
        )));
    }
    let mut r = ByteReader::new(bytes);
    if r.take(4, "magic")? != MAGIC {
        return Err(RidgeError::decode("not an RDGP template"));
    }
    let version = r.u16("version")?;
    if version != VERSION {
        return Err(RidgeError::decode(format!("unsupported version {version}")));
    }
    let width = r.u16("width")?;
    let height = r.u16("height")?;
    let count = r.u16("minutia count")? as usize;
    let mut minutiae = Vec::with_capacity(count);
    for _ in 0..count {
        let x = r.u16("minutia x")?;
        let y = r.u16("minutia y")?;
        let angle = angle_from_u16(r.u16("minutia angle")?);
        let kind = kind_from_code(r.u8("minutia type")?)?;
        let quality = r.u8("minutia quality")?;
        if quality > 100 {
            return Err(RidgeError::decode(format!("minutia quality {quality} > 100")));
        }
        minutiae.push(Minutia {
            x,
            y,
            angle,
            kind,
            quality,
        });
    }
    let block = r.u16("flow block")?;
    let cols = r.u16("flow columns")?;
    let rows = r.u16("flow rows")?;
    let ridge_flow = if block == 0 {
        if cols != 0 || rows != 0 {
            return Err(RidgeError::decode("ridge flow grid without block size"));
        }
        None
    } else {
        let cells = r.take(cols as usize * rows as usize, "ridge flow")?.to_vec();
        Some(RidgeFlow::from_parts(block, cols, rows, cells)?)
    };
    r.finish()?;

    FingerprintTemplate::from_minutiae(
        TemplateFormat::Proprietary,
        width as usize,
        height as usize,
        minutiae,
        ridge_flow,
    )
    .map_err(|e| RidgeError::decode(e.to_string()))
}
