#![cfg(feature = "candle")]

use candle_core::{Device, Tensor};
use ridgeprint::liveness::check_liveness_with_cache;
use ridgeprint::{check_liveness, ColorImage, ErrorKind, ModelCache};
use std::collections::HashMap;
use std::path::PathBuf;

/// 2x2 input, a ReLU hidden layer of two units and a two-way head that
/// prefers "real" for warm crops and "fake" for cool ones.
fn warm_is_real() -> HashMap<String, Tensor> {
    let dev = Device::Cpu;
    let red = [1f32, 0., 0., 1., 0., 0., 1., 0., 0., 1., 0., 0.];
    let blue = [0f32, 0., 1., 0., 0., 1., 0., 0., 1., 0., 0., 1.];
    HashMap::from([
        ("normalize.mean".to_string(), Tensor::new(&[0.5f32, 0.5, 0.5], &dev).unwrap()),
        ("normalize.std".to_string(), Tensor::new(&[0.5f32, 0.5, 0.5], &dev).unwrap()),
        ("layers.0.weight".to_string(), Tensor::new(&[red, blue], &dev).unwrap()),
        ("layers.0.bias".to_string(), Tensor::new(&[0f32, 0.0], &dev).unwrap()),
        (
            "layers.1.weight".to_string(),
            Tensor::new(&[[1f32, -1.0], [-1.0, 1.0]], &dev).unwrap(),
        ),
        ("layers.1.bias".to_string(), Tensor::new(&[0f32, 0.0], &dev).unwrap()),
    ])
}

struct Fixture {
    path: PathBuf,
}

impl Fixture {
    fn path_for(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "ridgeprint-liveness-{}-{}.safetensors",
            std::process::id(),
            name
        ))
    }

    fn new(name: &str, tensors: &HashMap<String, Tensor>) -> Self {
        let path = Self::path_for(name);
        candle_core::safetensors::save(tensors, &path).unwrap();
        Self { path }
    }

    fn raw(name: &str, bytes: &[u8]) -> Self {
        let path = Self::path_for(name);
        std::fs::write(&path, bytes).unwrap();
        Self { path }
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn solid(width: usize, height: usize, rgb: [u8; 3]) -> ColorImage {
    ColorImage::from_fn(width, height, |_, _| rgb).unwrap()
}

#[test]
fn warm_and_cool_frames_are_separated() {
    let model = Fixture::new("separated", &warm_is_real());
    let cache = ModelCache::new();

    let [real, fake] =
        check_liveness_with_cache(&cache, &solid(40, 30, [230, 120, 40]), &model.path).unwrap();
    assert!((real + fake - 1.0).abs() < 1e-6);
    assert!(real > 0.9, "real {real}");

    let [real, fake] =
        check_liveness_with_cache(&cache, &solid(30, 40, [40, 120, 230]), &model.path).unwrap();
    assert!((real + fake - 1.0).abs() < 1e-6);
    assert!(fake > 0.9, "fake {fake}");
}

#[test]
fn model_is_loaded_once_per_path() {
    let first = Fixture::new("once-a", &warm_is_real());
    let second = Fixture::new("once-b", &warm_is_real());
    let cache = ModelCache::new();
    let frame = solid(16, 16, [200, 90, 60]);

    for _ in 0..5 {
        check_liveness_with_cache(&cache, &frame, &first.path).unwrap();
    }
    assert_eq!(cache.load_count(), 1);

    check_liveness_with_cache(&cache, &frame, &second.path).unwrap();
    assert_eq!(cache.load_count(), 2);
}

#[test]
fn concurrent_first_use_loads_once() {
    let model = Fixture::new("concurrent", &warm_is_real());
    let cache = ModelCache::new();
    let frame = solid(24, 24, [180, 100, 90]);

    let (cache_ref, frame_ref, path) = (&cache, &frame, model.path.as_path());
    let scores: Vec<[f32; 2]> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(move || check_liveness_with_cache(cache_ref, frame_ref, path)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect()
    });

    assert_eq!(cache.load_count(), 1);
    assert!(scores.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn process_wide_entry_point_matches_explicit_cache() {
    let model = Fixture::new("process", &warm_is_real());
    let frame = solid(20, 20, [220, 130, 70]);
    let cache = ModelCache::new();
    let expected = check_liveness_with_cache(&cache, &frame, &model.path).unwrap();
    assert_eq!(check_liveness(&frame, &model.path).unwrap(), expected);
    assert_eq!(check_liveness(&frame, &model.path).unwrap(), expected);
}

#[test]
fn load_failures_are_reported_and_not_cached() {
    let cache = ModelCache::new();
    let frame = solid(16, 16, [0, 0, 0]);

    let missing = std::env::temp_dir().join("ridgeprint-liveness-does-not-exist.safetensors");
    let err = check_liveness_with_cache(&cache, &frame, &missing).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModelLoad);

    let broken = Fixture::raw("broken", b"{ \"input_size\": 2, ");
    let err = check_liveness_with_cache(&cache, &frame, &broken.path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModelLoad);

    // Second layer expects two inputs but gets three.
    let mut misshapen = warm_is_real();
    misshapen.insert(
        "layers.1.weight".into(),
        Tensor::new(&[[1f32, -1.0, 0.0], [-1.0, 1.0, 0.0]], &Device::Cpu).unwrap(),
    );
    let misshapen = Fixture::new("misshapen", &misshapen);
    let err = check_liveness_with_cache(&cache, &frame, &misshapen.path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModelLoad);

    assert_eq!(cache.load_count(), 0);

    candle_core::safetensors::save(&warm_is_real(), &broken.path).unwrap();
    check_liveness_with_cache(&cache, &frame, &broken.path).unwrap();
    assert_eq!(cache.load_count(), 1);
}

#[test]
fn malformed_layer_tensors_fail_loading() {
    let cache = ModelCache::new();
    let frame = solid(16, 16, [0, 0, 0]);

    // 15 inputs are five RGB pixels, which is not a square crop.
    let mut ragged = warm_is_real();
    ragged.insert(
        "layers.0.weight".into(),
        Tensor::zeros((2, 15), candle_core::DType::F32, &Device::Cpu).unwrap(),
    );
    let ragged = Fixture::new("ragged", &ragged);
    let err = check_liveness_with_cache(&cache, &frame, &ragged.path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModelLoad);

    let mut unbiased = warm_is_real();
    unbiased.remove("layers.1.bias");
    let unbiased = Fixture::new("unbiased", &unbiased);
    let err = check_liveness_with_cache(&cache, &frame, &unbiased.path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModelLoad);

    assert_eq!(cache.load_count(), 0);
}

#[test]
fn undersized_frames_fail_inference() {
    let model = Fixture::new("undersized", &warm_is_real());
    let cache = ModelCache::new();
    let err = check_liveness_with_cache(&cache, &solid(64, 5, [10, 10, 10]), &model.path)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Inference);
    // The model itself loaded fine.
    assert_eq!(cache.load_count(), 1);
}
