//! Liveness classification of colour finger images.
//!
//! Models are candle dense networks read from safetensors files; the
//! module is compiled with the `candle` feature (on by default).

mod cache;
mod model;

pub use cache::ModelCache;
pub use model::{LivenessModel, MIN_INPUT_SIDE};

use crate::image::ColorImage;
use crate::trace::{trace_event, trace_span};
use crate::util::RidgeResult;
use std::path::Path;
use std::sync::OnceLock;

fn process_cache() -> &'static ModelCache {
    static CACHE: OnceLock<ModelCache> = OnceLock::new();
    CACHE.get_or_init(ModelCache::new)
}

/// `[real, fake]` confidences for `image` from the model at `model_file`.
///
/// The model is loaded once per distinct path for the life of the process.
pub fn check_liveness(image: &ColorImage, model_file: impl AsRef<Path>) -> RidgeResult<[f32; 2]> {
    check_liveness_with_cache(process_cache(), image, model_file.as_ref())
}

/// [`check_liveness`] against a caller-owned cache.
pub fn check_liveness_with_cache(
    cache: &ModelCache,
    image: &ColorImage,
    model_file: &Path,
) -> RidgeResult<[f32; 2]> {
    let _span =
        trace_span!("check_liveness", width = image.width(), height = image.height()).entered();
    let model = cache.get_or_load(model_file)?;
    let scores = model.predict(image)?;
    trace_event!("liveness", real = scores[0], fake = scores[1]);
    Ok(scores)
}
