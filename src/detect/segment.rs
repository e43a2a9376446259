//! Skin-colour finger segmentation.

use crate::filter::components::Components;
use crate::filter::morphology::{close, open, KernelSize};
use crate::image::color::rgb_to_ycbcr;
use crate::image::{ColorImage, Mask};
use crate::trace::{trace_event, trace_span};
use crate::util::{RidgeError, RidgeResult};

const CR_RANGE: (f32, f32) = (133.0, 173.0);
const CB_RANGE: (f32, f32) = (77.0, 127.0);
const MIN_LUMA: f32 = 40.0;

/// Segmented colour frame together with the finger mask that produced it.
#[derive(Clone, Debug)]
pub struct Segmentation {
    /// Input pixels inside the mask, black elsewhere.
    pub segmented: ColorImage,
    /// Binary finger mask aligned with the input.
    pub mask: Mask,
}

fn is_skin(rgb: [u8; 3]) -> bool {
    let (y, cb, cr) = rgb_to_ycbcr(rgb[0], rgb[1], rgb[2]);
    y >= MIN_LUMA
        && (CR_RANGE.0..=CR_RANGE.1).contains(&cr)
        && (CB_RANGE.0..=CB_RANGE.1).contains(&cb)
}

/// Separates the finger from the background of `image`.
///
/// Skin-coloured pixels are opened and closed with `kernel` and only the
/// largest connected region is kept.
pub fn segment_finger(image: &ColorImage, kernel: KernelSize) -> RidgeResult<Segmentation> {
    let kernel = kernel.validate()?;
    let _span =
        trace_span!("segment_finger", width = image.width(), height = image.height()).entered();

    let skin = Mask::from_fn(image.width(), image.height(), |x, y| {
        image.pixel(x, y).is_some_and(is_skin)
    })?;
    let cleaned = close(&open(&skin, kernel)?, kernel)?;
    let components = Components::label(&cleaned);
    let largest = components.largest().ok_or(RidgeError::Segmentation {
        reason: "finger mask is empty",
    })?;
    let mask = components.mask_of(largest.label);
    trace_event!("segment_mask", coverage = mask.coverage());

    Ok(Segmentation {
        segmented: image.masked(&mask)?,
        mask,
    })
}

#[cfg(test)]
mod tests {
    use super::segment_finger;
    use crate::filter::morphology::KernelSize;
    use crate::image::ColorImage;
    use crate::util::ErrorKind;

    const SKIN: [u8; 3] = [224, 172, 140];
    const BACKGROUND: [u8; 3] = [20, 60, 200];

    #[test]
    fn keeps_largest_skin_region() {
        let img = ColorImage::from_fn(60, 40, |x, y| {
            let in_finger = (10..40).contains(&x) && (5..35).contains(&y);
            let speck = (50..53).contains(&x) && (5..8).contains(&y);
            if in_finger || speck {
                SKIN
            } else {
                BACKGROUND
            }
        })
        .unwrap();
        let seg = segment_finger(&img, KernelSize::default()).unwrap();
        assert!(seg.mask.is_set(25, 20));
        assert!(!seg.mask.is_set(51, 6));
        assert_eq!(seg.segmented.pixel(2, 2), Some([0, 0, 0]));
        assert_eq!(seg.segmented.pixel(25, 20), Some(SKIN));
    }

    #[test]
    fn background_only_frame_fails() {
        let img = ColorImage::from_fn(32, 32, |_, _| BACKGROUND).unwrap();
        let err = segment_finger(&img, KernelSize::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Segmentation);
    }

    #[test]
    fn even_kernel_is_malformed() {
        let img = ColorImage::from_fn(8, 8, |_, _| SKIN).unwrap();
        let err = segment_finger(&img, KernelSize::new(4, 5)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput);
    }
}
