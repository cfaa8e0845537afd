//! Per-backend cache of loaded models.
//!
//! Loading a local model is expensive, so a backend keeps each loaded model
//! in memory keyed by model identifier. The mutex guards only the
//! load-if-absent step; callers run inference on the returned `Arc` without
//! holding the lock.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::error::MetricError;

pub struct ModelCache<M> {
    models: Mutex<HashMap<String, Arc<M>>>,
    known_models: Option<HashSet<String>>,
}

impl<M> ModelCache<M> {
    /// A cache that accepts any model identifier.
    pub fn new() -> Self {
        Self {
            models: Mutex::new(HashMap::new()),
            known_models: None,
        }
    }

    /// A cache restricted to the given model identifiers.
    pub fn with_known_models<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            models: Mutex::new(HashMap::new()),
            known_models: Some(ids.into_iter().map(Into::into).collect()),
        }
    }

    /// Return the cached model for `model_id`, loading it with `loader` on first use.
    ///
    /// Concurrent callers for the same id wait for the first load instead of
    /// loading twice. A failed load caches nothing.
    pub fn get_or_load<F, E>(&self, model_id: &str, loader: F) -> Result<Arc<M>, MetricError>
    where
        F: FnOnce(&str) -> Result<M, E>,
        E: std::fmt::Display,
    {
        if let Some(known) = &self.known_models {
            if !known.contains(model_id) {
                return Err(MetricError::UnknownModel {
                    model: model_id.to_string(),
                });
            }
        }

        let mut models = self
            .models
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(model) = models.get(model_id) {
            return Ok(Arc::clone(model));
        }

        tracing::info!(model = model_id, "Loading model and caching in memory");
        let model = Arc::new(loader(model_id).map_err(|e| MetricError::ModelLoad {
            model: model_id.to_string(),
            message: e.to_string(),
        })?);
        models.insert(model_id.to_string(), Arc::clone(&model));
        Ok(model)
    }

    pub fn is_loaded(&self, model_id: &str) -> bool {
        self.models
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(model_id)
    }
}

impl<M> Default for ModelCache<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[derive(Debug)]
    struct FakeModel {
        name: String,
    }

    #[test]
    fn test_loads_once() {
        let cache: ModelCache<FakeModel> = ModelCache::new();
        let loads = AtomicUsize::new(0);
        let load = |id: &str| -> Result<FakeModel, String> {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok(FakeModel { name: id.to_string() })
        };

        let a = cache.get_or_load("qwen-audio-chat", load).unwrap();
        let b = cache.get_or_load("qwen-audio-chat", load).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.name, "qwen-audio-chat");
    }

    #[test]
    fn test_concurrent_callers_share_one_load() {
        let cache: Arc<ModelCache<FakeModel>> = Arc::new(ModelCache::new());
        let loads = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let loads = Arc::clone(&loads);
                thread::spawn(move || {
                    cache
                        .get_or_load("m", |id| -> Result<FakeModel, String> {
                            loads.fetch_add(1, Ordering::SeqCst);
                            Ok(FakeModel { name: id.to_string() })
                        })
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_model_rejected() {
        let cache: ModelCache<FakeModel> = ModelCache::with_known_models(["qwen-audio-chat"]);
        let err = cache
            .get_or_load("gpt-2", |id| -> Result<FakeModel, String> {
                Ok(FakeModel { name: id.to_string() })
            })
            .unwrap_err();
        assert!(matches!(err, MetricError::UnknownModel { .. }));
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let cache: Arc<ModelCache<FakeModel>> = Arc::new(ModelCache::new());
        cache
            .get_or_load("m", |id| -> Result<FakeModel, String> {
                Ok(FakeModel { name: id.to_string() })
            })
            .unwrap();

        let poisoner = Arc::clone(&cache);
        let result = thread::spawn(move || {
            let _guard = poisoner.models.lock().unwrap();
            panic!("loader crashed while holding the lock");
        })
        .join();
        assert!(result.is_err());
        assert!(cache.models.is_poisoned());

        assert!(cache.is_loaded("m"));
        let model = cache
            .get_or_load("m", |_| -> Result<FakeModel, String> { Err("reloaded".into()) })
            .unwrap();
        assert_eq!(model.name, "m");
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let cache: ModelCache<FakeModel> = ModelCache::new();
        let err = cache
            .get_or_load("m", |_| -> Result<FakeModel, String> { Err("out of memory".into()) })
            .unwrap_err();
        assert!(matches!(err, MetricError::ModelLoad { .. }));
        assert!(!cache.is_loaded("m"));
    }
}
