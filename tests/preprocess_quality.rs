use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ridgeprint::enhance::{enhance_fingerprint_with_config, EnhanceConfig};
use ridgeprint::{preprocess_fingerprint, ErrorKind, ImageView, OwnedImage, QUALITY_THRESHOLD};

fn ridges(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let phase = (x as f32 * 0.6 - y as f32 * 0.8) * std::f32::consts::TAU / 10.0;
            data.push((120.0 + 80.0 * phase.cos()).round() as u8);
        }
    }
    data
}

#[test]
fn noise_scores_below_threshold() {
    let mut rng = StdRng::seed_from_u64(7);
    let img = OwnedImage::from_fn(96, 96, |_, _| rng.random_range(0..=255u8)).unwrap();
    let out = preprocess_fingerprint(img.view(), 2.0, 1.0).unwrap();
    assert!(out.quality < QUALITY_THRESHOLD, "quality {}", out.quality);
    assert!(!out.is_good());
}

#[test]
fn ridge_pattern_is_good_and_centered() {
    let data = ridges(80, 64);
    let view = ImageView::from_slice(&data, 80, 64).unwrap();
    let out = preprocess_fingerprint(view, 2.0, 1.0).unwrap();
    assert!(out.is_good(), "quality {}", out.quality);
    assert_eq!((out.image.width(), out.image.height()), (80, 64));
    let mean = out.image.data().iter().map(|&v| v as f64).sum::<f64>() / (80.0 * 64.0);
    assert!((mean - 128.0).abs() < 8.0, "mean {mean}");
}

#[test]
fn strided_input_matches_contiguous_input() {
    let (width, height, stride) = (48, 40, 56);
    let data = ridges(width, height);
    let mut padded = vec![0u8; stride * height];
    for y in 0..height {
        padded[y * stride..y * stride + width].copy_from_slice(&data[y * width..(y + 1) * width]);
    }
    let contiguous = ImageView::from_slice(&data, width, height).unwrap();
    let strided = ImageView::new(&padded, width, height, stride).unwrap();
    let a = preprocess_fingerprint(contiguous, 2.0, 1.0).unwrap();
    let b = preprocess_fingerprint(strided, 2.0, 1.0).unwrap();
    assert_eq!(a.image, b.image);
    assert_eq!(a.quality, b.quality);
}

#[test]
fn quality_stays_in_range_for_saturated_frames() {
    for level in [0u8, 255] {
        let img = OwnedImage::from_fn(40, 40, |_, _| level).unwrap();
        let out = preprocess_fingerprint(img.view(), 2.0, 1.0).unwrap();
        assert!((0.0..=100.0).contains(&out.quality));
        assert!(out.image.data().iter().all(|&v| v == 128));
    }
}

#[test]
fn out_of_range_sigmas_are_rejected() {
    let img = OwnedImage::from_fn(16, 16, |x, y| ((x * 16 + y * 3) % 256) as u8).unwrap();
    for (sigma1, sigma2) in [(1e30, 1.0), (2.0, 1e30), (f32::MAX, 1.0), (1e-30, 1.0)] {
        let err = preprocess_fingerprint(img.view(), sigma1, sigma2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedInput, "sigmas {sigma1} {sigma2}");
    }

    let data = ridges(64, 64);
    let view = ImageView::from_slice(&data, 64, 64).unwrap();
    let cfg = EnhanceConfig {
        orientation_sigma: 1e30,
        ..EnhanceConfig::default()
    };
    let err = enhance_fingerprint_with_config(view, &cfg).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);

    let cfg = EnhanceConfig {
        period_range: (4.0, 1e30),
        ..EnhanceConfig::default()
    };
    let err = enhance_fingerprint_with_config(view, &cfg).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
}
