use ridgeprint::{yuv420_to_nv21, yuv420_to_rgb, ColorImage, ErrorKind, Yuv420Layout};

/// Writes a 4:2:0 frame with uniform luma and chroma into a strided buffer.
fn strided_frame(
    width: usize,
    height: usize,
    layout: Yuv420Layout,
    luma: u8,
    v: u8,
    u: u8,
) -> Vec<u8> {
    let chroma_offset = layout.y_row_stride * height;
    let chroma_rows = height / 2;
    let len = chroma_offset
        + (chroma_rows - 1) * layout.uv_row_stride
        + (width / 2 - 1) * layout.uv_pixel_stride
        + 2;
    let mut buf = vec![0xEEu8; len];
    for y in 0..height {
        for x in 0..width {
            buf[y * layout.y_row_stride + x * layout.y_pixel_stride] = luma;
        }
    }
    for cy in 0..chroma_rows {
        for cx in 0..width / 2 {
            let idx = chroma_offset + cy * layout.uv_row_stride + cx * layout.uv_pixel_stride;
            buf[idx] = v;
            buf[idx + 1] = u;
        }
    }
    buf
}

#[test]
fn padded_buffer_repacks_to_nv21() {
    let layout = Yuv420Layout {
        y_row_stride: 12,
        y_pixel_stride: 2,
        uv_row_stride: 8,
        uv_pixel_stride: 4,
    };
    let buf = strided_frame(4, 4, layout, 100, 178, 128);
    let nv21 = yuv420_to_nv21(&buf, 4, 4, layout).unwrap();
    assert_eq!(nv21.len(), 16 + 8);
    assert!(nv21[..16].iter().all(|&v| v == 100));
    assert_eq!(&nv21[16..], &[178, 128, 178, 128, 178, 128, 178, 128]);
}

#[test]
fn solid_color_decodes_with_bt601() {
    let layout = Yuv420Layout::packed(4);
    let buf = strided_frame(4, 2, layout, 100, 178, 128);
    let rgb = yuv420_to_rgb(&buf, 4, 2, layout).unwrap();
    for y in 0..2 {
        for x in 0..4 {
            assert_eq!(rgb.pixel(x, y), Some([170, 64, 100]));
        }
    }
}

#[test]
fn decoding_is_deterministic_across_layouts() {
    let packed = Yuv420Layout::packed(6);
    let padded = Yuv420Layout {
        y_row_stride: 8,
        y_pixel_stride: 1,
        uv_row_stride: 10,
        uv_pixel_stride: 2,
    };
    let a = yuv420_to_rgb(&strided_frame(6, 4, packed, 60, 120, 150), 6, 4, packed).unwrap();
    let b = yuv420_to_rgb(&strided_frame(6, 4, padded, 60, 120, 150), 6, 4, padded).unwrap();
    assert_eq!(a, b);
}

#[test]
fn short_buffer_is_malformed() {
    let layout = Yuv420Layout::packed(4);
    let buf = vec![0u8; 4 * 4 + 7];
    let err = yuv420_to_nv21(&buf, 4, 4, layout).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
}

#[test]
fn inconsistent_strides_are_malformed() {
    let layout = Yuv420Layout {
        y_row_stride: 3,
        y_pixel_stride: 1,
        uv_row_stride: 4,
        uv_pixel_stride: 2,
    };
    let buf = vec![0u8; 64];
    assert_eq!(
        yuv420_to_nv21(&buf, 4, 4, layout).unwrap_err().kind(),
        ErrorKind::MalformedInput
    );
    let zero = Yuv420Layout {
        y_pixel_stride: 0,
        ..Yuv420Layout::packed(4)
    };
    assert!(yuv420_to_nv21(&buf, 4, 4, zero).is_err());
}

#[test]
fn overflowing_strides_are_malformed() {
    let buf = vec![0u8; 64];
    let wide_luma = Yuv420Layout {
        y_row_stride: 4,
        y_pixel_stride: usize::MAX / 2,
        uv_row_stride: 4,
        uv_pixel_stride: 2,
    };
    assert_eq!(
        yuv420_to_nv21(&buf, 4, 2, wide_luma).unwrap_err().kind(),
        ErrorKind::MalformedInput
    );

    let wide_chroma = Yuv420Layout {
        uv_pixel_stride: usize::MAX / 2,
        ..Yuv420Layout::packed(8)
    };
    assert_eq!(
        yuv420_to_nv21(&buf, 8, 2, wide_chroma).unwrap_err().kind(),
        ErrorKind::MalformedInput
    );

    let tall_rows = Yuv420Layout {
        y_row_stride: usize::MAX,
        ..Yuv420Layout::packed(4)
    };
    assert_eq!(
        yuv420_to_rgb(&buf, 4, 2, tall_rows).unwrap_err().kind(),
        ErrorKind::MalformedInput
    );
}

#[test]
fn nv21_gray_round_trip() {
    let nv21 = [50u8, 60, 70, 80, 128, 128];
    let rgb = ColorImage::from_nv21(&nv21, 2, 2).unwrap();
    assert_eq!(rgb.to_gray().data(), &[50, 60, 70, 80]);
}
