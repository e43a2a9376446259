//! Load-once cache of liveness models keyed by path.

use crate::liveness::model::LivenessModel;
use crate::trace::trace_event;
use crate::util::{RidgeError, RidgeResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

type Slot = Arc<Mutex<Option<Arc<LivenessModel>>>>;

/// Models loaded on first use and shared afterwards.
///
/// The map lock is held only to find a path's slot. Loading happens under
/// the slot lock, so concurrent first use of one path loads it once while
/// other paths proceed independently. Failed loads are not cached.
#[derive(Debug, Default)]
pub struct ModelCache {
    slots: Mutex<HashMap<PathBuf, Slot>>,
    loads: AtomicUsize,
}

fn poisoned<T>(_: T) -> RidgeError {
    RidgeError::Processing {
        reason: "liveness model cache lock poisoned".into(),
    }
}

impl ModelCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, path: &Path) -> RidgeResult<Slot> {
        let mut slots = self.slots.lock().map_err(poisoned)?;
        Ok(slots.entry(path.to_path_buf()).or_default().clone())
    }

    /// Returns the model at `path`, loading it on first use.
    pub fn get_or_load(&self, path: &Path) -> RidgeResult<Arc<LivenessModel>> {
        let slot = self.slot(path)?;
        let mut guard: MutexGuard<'_, Option<Arc<LivenessModel>>> = slot.lock().map_err(poisoned)?;
        if let Some(model) = guard.as_ref() {
            return Ok(Arc::clone(model));
        }
        let model = Arc::new(LivenessModel::load(path)?);
        self.loads.fetch_add(1, Ordering::Relaxed);
        trace_event!("liveness_model_loaded", layers = model.layer_count());
        *guard = Some(Arc::clone(&model));
        Ok(model)
    }

    /// Number of successful loads so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}
