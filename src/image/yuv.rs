//! Sensor YUV 4:2:0 ingestion.
//!
//! Camera stacks deliver 4:2:0 frames as a luma plane plus an interleaved
//! chroma plane, each with its own row stride and pixel stride. The input
//! buffer holds the luma plane at offset 0 and the chroma plane starting at
//! `y_row_stride * height`; chroma samples are stored as V followed by U.
//! Conversion produces tightly packed NV21 (`w * h` luma bytes followed by
//! `(w / 2) * (h / 2)` V/U pairs), the canonical layout decoded by
//! [`ColorImage::from_nv21`].

use crate::image::ColorImage;
use crate::trace::{trace_event, trace_span};
use crate::util::{RidgeError, RidgeResult};

/// Row and pixel strides of a camera 4:2:0 buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Yuv420Layout {
    /// Bytes between the starts of consecutive luma rows.
    pub y_row_stride: usize,
    /// Bytes between horizontally adjacent luma samples.
    pub y_pixel_stride: usize,
    /// Bytes between the starts of consecutive chroma rows.
    pub uv_row_stride: usize,
    /// Bytes between horizontally adjacent chroma pairs.
    pub uv_pixel_stride: usize,
}

impl Yuv420Layout {
    /// Layout of an already packed NV21 buffer of the given width.
    pub fn packed(width: usize) -> Self {
        Self {
            y_row_stride: width,
            y_pixel_stride: 1,
            uv_row_stride: width,
            uv_pixel_stride: 2,
        }
    }

    fn validate(&self, len: usize, width: usize, height: usize) -> RidgeResult<usize> {
        if width == 0 || height == 0 {
            return Err(RidgeError::InvalidDimensions { width, height });
        }
        if width % 2 != 0 || height % 2 != 0 {
            return Err(RidgeError::malformed(format!(
                "4:2:0 frames need even dimensions, got {width}x{height}"
            )));
        }
        if self.y_pixel_stride == 0 {
            return Err(RidgeError::malformed("luma pixel stride must be at least 1"));
        }
        if self.uv_pixel_stride < 2 {
            return Err(RidgeError::malformed(
                "interleaved chroma pixel stride must be at least 2",
            ));
        }
        let overflow = || RidgeError::malformed("YUV layout strides overflow the address space");
        let y_row_len = (width - 1)
            .checked_mul(self.y_pixel_stride)
            .and_then(|v| v.checked_add(1))
            .ok_or_else(overflow)?;
        if self.y_row_stride < y_row_len {
            return Err(RidgeError::malformed(format!(
                "luma row stride {} shorter than row span {y_row_len}",
                self.y_row_stride
            )));
        }
        let chroma_w = width / 2;
        let chroma_h = height / 2;
        let uv_row_len = (chroma_w - 1)
            .checked_mul(self.uv_pixel_stride)
            .and_then(|v| v.checked_add(2))
            .ok_or_else(overflow)?;
        if self.uv_row_stride < uv_row_len {
            return Err(RidgeError::malformed(format!(
                "chroma row stride {} shorter than row span {uv_row_len}",
                self.uv_row_stride
            )));
        }
        let chroma_offset = self.y_row_stride.checked_mul(height).ok_or_else(overflow)?;
        let needed = (chroma_h - 1)
            .checked_mul(self.uv_row_stride)
            .and_then(|v| v.checked_add(uv_row_len))
            .and_then(|v| v.checked_add(chroma_offset))
            .ok_or_else(overflow)?;
        if len < needed {
            return Err(RidgeError::malformed(format!(
                "sensor buffer holds {len} bytes, layout needs {needed}"
            )));
        }
        Ok(chroma_offset)
    }
}

/// Repacks a strided camera 4:2:0 buffer into tightly packed NV21.
pub fn yuv420_to_nv21(
    buffer: &[u8],
    width: usize,
    height: usize,
    layout: Yuv420Layout,
) -> RidgeResult<Vec<u8>> {
    let _span = trace_span!("yuv420_to_nv21", width = width, height = height).entered();
    let chroma_offset = layout.validate(buffer.len(), width, height)?;

    let chroma_w = width / 2;
    let chroma_h = height / 2;
    let mut out = Vec::with_capacity(width * height + 2 * chroma_w * chroma_h);

    for y in 0..height {
        let row = y * layout.y_row_stride;
        out.extend((0..width).map(|x| buffer[row + x * layout.y_pixel_stride]));
    }
    for cy in 0..chroma_h {
        let row = chroma_offset + cy * layout.uv_row_stride;
        for cx in 0..chroma_w {
            let idx = row + cx * layout.uv_pixel_stride;
            out.push(buffer[idx]);
            out.push(buffer[idx + 1]);
        }
    }

    trace_event!("nv21_packed", bytes = out.len());
    Ok(out)
}

impl ColorImage {
    /// Decodes packed NV21 into RGB with BT.601 full-range coefficients.
    pub fn from_nv21(nv21: &[u8], width: usize, height: usize) -> RidgeResult<ColorImage> {
        Yuv420Layout::packed(width).validate(nv21.len(), width, height)?;
        let luma_len = width * height;
        let mut data = Vec::with_capacity(luma_len * ColorImage::CHANNELS);
        for y in 0..height {
            let chroma_row = luma_len + (y / 2) * width;
            for x in 0..width {
                let luma = nv21[y * width + x] as f32;
                let pair = chroma_row + (x / 2) * 2;
                let v = nv21[pair] as f32 - 128.0;
                let u = nv21[pair + 1] as f32 - 128.0;
                let r = luma + 1.402 * v;
                let g = luma - 0.344_136 * u - 0.714_136 * v;
                let b = luma + 1.772 * u;
                data.push(r.round().clamp(0.0, 255.0) as u8);
                data.push(g.round().clamp(0.0, 255.0) as u8);
                data.push(b.round().clamp(0.0, 255.0) as u8);
            }
        }
        Ok(ColorImage::from_parts(data, width, height))
    }
}

/// Converts a strided camera 4:2:0 buffer straight to RGB.
pub fn yuv420_to_rgb(
    buffer: &[u8],
    width: usize,
    height: usize,
    layout: Yuv420Layout,
) -> RidgeResult<ColorImage> {
    let nv21 = yuv420_to_nv21(buffer, width, height, layout)?;
    ColorImage::from_nv21(&nv21, width, height)
}
