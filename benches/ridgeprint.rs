use ridgeprint::enhance::{enhance_fingerprint_with_config, EnhanceConfig};
use ridgeprint::{
    extract_template, preprocess_fingerprint, FingerprintTemplate, MatchConfig, Matcher, Minutia,
    MinutiaKind, OwnedImage, PipelineConfig, TemplateFormat, DEFAULT_PYRAMID_SCALES,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::f64::consts::TAU;
use std::hint::black_box;

const SIZE: usize = 256;

/// Straight ridges at 9 px with a 4x4 grid of phase vortices, one minutia each.
fn make_capture(carrier: f64) -> OwnedImage {
    let vortices: Vec<(f64, f64, f64)> = (0..16)
        .map(|i| {
            let x = 56.0 + 48.0 * (i % 4) as f64;
            let y = 56.0 + 48.0 * (i / 4) as f64;
            let charge = if (i + i / 4) % 2 == 0 { 1.0 } else { -1.0 };
            (x, y, charge)
        })
        .collect();
    let (sa, ca) = carrier.sin_cos();
    OwnedImage::from_fn(SIZE, SIZE, |x, y| {
        let (px, py) = (x as f64, y as f64);
        let mut phase = TAU * (px * ca + py * sa) / 9.0;
        for &(vx, vy, charge) in &vortices {
            phase += charge * (py - vy).atan2(px - vx);
        }
        (128.0 + 90.0 * phase.cos()).round() as u8
    })
    .unwrap()
}

/// Deterministic pseudo-random template; `seed` varies the layout.
fn make_template(seed: usize) -> FingerprintTemplate {
    let minutiae = (0..40)
        .map(|i| {
            let k = i * 7 + seed * 13;
            Minutia {
                x: (20 + (k * 37) % 216) as u16,
                y: (20 + (k * 53 + seed) % 216) as u16,
                angle: ((k * 29) % 360) as f32 * std::f32::consts::PI / 180.0,
                kind: if k % 3 == 0 {
                    MinutiaKind::Bifurcation
                } else {
                    MinutiaKind::Ending
                },
                quality: 60 + (k % 40) as u8,
            }
        })
        .collect();
    FingerprintTemplate::from_minutiae(TemplateFormat::Proprietary, SIZE, SIZE, minutiae, None)
        .unwrap()
}

fn bench_pipeline(c: &mut Criterion) {
    let capture = make_capture(0.6);
    let pre = preprocess_fingerprint(capture.view(), 2.0, 1.0).unwrap();

    c.bench_function("preprocess_256", |b| {
        b.iter(|| black_box(preprocess_fingerprint(capture.view(), 2.0, 1.0).unwrap()));
    });

    let sequential = EnhanceConfig {
        parallel: false,
        ..EnhanceConfig::default()
    };
    c.bench_function("enhance_256", |b| {
        b.iter(|| {
            black_box(enhance_fingerprint_with_config(pre.image.view(), &sequential).unwrap())
        });
    });

    if cfg!(feature = "rayon") {
        let parallel = EnhanceConfig::default();
        c.bench_function("enhance_256_parallel", |b| {
            b.iter(|| {
                black_box(enhance_fingerprint_with_config(pre.image.view(), &parallel).unwrap())
            });
        });
    }

    let pipeline = PipelineConfig::default();
    c.bench_function("extract_template_256", |b| {
        b.iter(|| {
            black_box(
                extract_template(capture.view(), TemplateFormat::Proprietary, &pipeline).unwrap(),
            )
        });
    });
}

fn bench_matching(c: &mut Criterion) {
    let sequential = Matcher::new(MatchConfig {
        parallel: false,
        ..MatchConfig::default()
    })
    .unwrap();
    let reference = make_template(1);
    let probe = make_template(2);

    c.bench_function("verify_40x40", |b| {
        b.iter(|| black_box(sequential.verify(&reference, &probe)));
    });

    let gallery: Vec<FingerprintTemplate> = (0..64).map(make_template).collect();
    c.bench_function("identify_64", |b| {
        b.iter(|| black_box(sequential.identify(&gallery, &probe).unwrap()));
    });

    if cfg!(feature = "rayon") {
        let parallel = Matcher::new(MatchConfig::default()).unwrap();
        c.bench_function("identify_64_parallel", |b| {
            b.iter(|| black_box(parallel.identify(&gallery, &probe).unwrap()));
        });
    }

    let capture = make_capture(0.6);
    let enrolled =
        extract_template(capture.view(), TemplateFormat::Proprietary, &PipelineConfig::default())
            .unwrap();
    let rotated = make_capture(0.75);
    c.bench_function("pyramid_verify_3_scales", |b| {
        b.iter(|| {
            black_box(
                sequential
                    .pyramid_verify(&enrolled, rotated.view(), &DEFAULT_PYRAMID_SCALES)
                    .unwrap(),
            )
        });
    });
}

criterion_group!(benches, bench_pipeline, bench_matching);
criterion_main!(benches);
