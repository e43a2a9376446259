use ridgeprint::detect::find_finger_with_config;
use ridgeprint::detect::DetectConfig;
use ridgeprint::{
    find_finger, find_fingers, focus_measure, DetectMode, ErrorKind, Finger, Mask, OwnedImage,
    Point, Rect,
};

const WIDTH: usize = 200;
const HEIGHT: usize = 150;

fn ellipse_frame(fg: u8, bg: u8) -> OwnedImage {
    OwnedImage::from_fn(WIDTH, HEIGHT, |x, y| {
        let dx = (x as f64 - 100.0) / 40.0;
        let dy = (y as f64 - 75.0) / 55.0;
        if dx * dx + dy * dy <= 1.0 {
            fg
        } else {
            bg
        }
    })
    .unwrap()
}

fn stripes(size: usize, square: bool) -> OwnedImage {
    OwnedImage::from_fn(size, size, |x, _| {
        let c = (x as f64 * std::f64::consts::TAU / 9.0).cos();
        let v = if square { c.signum() } else { c };
        (130.0 + 90.0 * v).round() as u8
    })
    .unwrap()
}

fn whole(size: usize) -> Finger {
    Finger {
        region: Rect::new(0, 0, size, size),
        contour: Vec::new(),
        area: size * size,
        centroid: (size as f64 / 2.0, size as f64 / 2.0),
    }
}

#[test]
fn bright_ellipse_is_found_in_both_modes() {
    let frame = ellipse_frame(200, 30);
    for mode in [DetectMode::Strict, DetectMode::Tolerant] {
        let finger = find_finger(frame.view(), mode).unwrap();
        assert!((finger.centroid.0 - 100.0).abs() < 2.0);
        assert!((finger.centroid.1 - 75.0).abs() < 2.0);
        assert!(finger.region.width.abs_diff(81) <= 4, "{:?}", finger.region);
        assert!(finger.region.height.abs_diff(111) <= 4, "{:?}", finger.region);
        assert!(finger.region.contains(Point::new(100, 75)));
        assert!(finger.contour.len() > 100);
        assert!(finger
            .contour
            .iter()
            .all(|p| finger.region.contains(*p)));
    }
}

#[test]
fn flat_frame_has_no_finger() {
    let frame = OwnedImage::from_fn(WIDTH, HEIGHT, |_, _| 90).unwrap();
    let err = find_finger(frame.view(), DetectMode::Tolerant).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoFingerDetected);
}

#[test]
fn thin_bar_is_rejected() {
    let frame = OwnedImage::from_fn(WIDTH, HEIGHT, |_, y| {
        if (70..78).contains(&y) {
            220
        } else {
            20
        }
    })
    .unwrap();
    let err = find_finger(frame.view(), DetectMode::Tolerant).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoFingerDetected);
}

#[test]
fn crescent_fails_solidity() {
    let frame = OwnedImage::from_fn(WIDTH, HEIGHT, |x, y| {
        let (fx, fy) = (x as f64, y as f64);
        let outer = (fx - 100.0).powi(2) + (fy - 75.0).powi(2) <= 40.0 * 40.0;
        let inner = (fx - 115.0).powi(2) + (fy - 75.0).powi(2) <= 30.0 * 30.0;
        if outer && !inner {
            210
        } else {
            25
        }
    })
    .unwrap();
    let err = find_finger(frame.view(), DetectMode::Strict).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoFingerDetected);
}

#[test]
fn low_contrast_needs_tolerant_mode() {
    let frame = ellipse_frame(130, 95);
    assert!(find_finger(frame.view(), DetectMode::Strict).is_err());
    assert!(find_finger(frame.view(), DetectMode::Tolerant).is_ok());
}

#[test]
fn custom_thresholds_override_mode() {
    let frame = ellipse_frame(200, 30);
    let cfg = DetectConfig {
        max_area_fraction: 0.1,
        ..DetectConfig::default()
    };
    let err = find_finger_with_config(frame.view(), &cfg).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoFingerDetected);
}

#[test]
fn finger_mask_splits_into_ordered_fingers() {
    let centers = [(150.0, 60.0), (40.0, 70.0), (95.0, 50.0)];
    let mask = Mask::from_fn(WIDTH, HEIGHT, |x, y| {
        let (fx, fy) = (x as f64, y as f64);
        let blob = centers.iter().any(|&(cx, cy)| {
            let dx = (fx - cx) / 15.0;
            let dy = (fy - cy) / 35.0;
            dx * dx + dy * dy <= 1.0
        });
        let speck = (5..8).contains(&x) && (140..143).contains(&y);
        blob || speck
    })
    .unwrap();

    let set = find_fingers(&mask, 0.01);
    assert_eq!(set.fingers.len(), 3);
    let xs: Vec<f64> = set.fingers.iter().map(|f| f.centroid.0).collect();
    assert!(xs.windows(2).all(|w| w[0] < w[1]), "{xs:?}");
    assert!((xs[0] - 40.0).abs() < 1.0);
    assert!(!set.finger_mask.is_set(6, 141));
    assert!(set.finger_mask.is_set(95, 50));
    assert_eq!(mask.count() - 9, set.finger_mask.count());
}

#[test]
fn sharp_ridges_focus_higher_than_soft_ridges() {
    let sharp = stripes(64, true);
    let soft = stripes(64, false);
    let region = whole(64);
    let f_sharp = focus_measure(sharp.view(), &region).unwrap();
    let f_soft = focus_measure(soft.view(), &region).unwrap();
    assert!((0.0..=1.0).contains(&f_sharp));
    assert!(f_sharp > f_soft, "sharp {f_sharp} soft {f_soft}");
}

#[test]
fn focus_ignores_gain_and_offset() {
    let sharp = stripes(64, true);
    let dimmer = OwnedImage::from_fn(64, 64, |x, y| sharp.get(x, y).unwrap() / 2 + 20).unwrap();
    let region = whole(64);
    let a = focus_measure(sharp.view(), &region).unwrap();
    let b = focus_measure(dimmer.view(), &region).unwrap();
    assert!((a - b).abs() < 1e-3, "{a} vs {b}");
}

#[test]
fn flat_region_has_zero_focus() {
    let flat = OwnedImage::from_fn(32, 32, |_, _| 77).unwrap();
    assert_eq!(focus_measure(flat.view(), &whole(32)).unwrap(), 0.0);
}

#[test]
fn region_outside_frame_is_malformed() {
    let img = stripes(32, true);
    let err = focus_measure(img.view(), &whole(40)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
}
