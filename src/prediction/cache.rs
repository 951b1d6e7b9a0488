// src/prediction/cache.rs
use log::info;
use lru::LruCache;
use ndarray::Array2;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::algorithm::Algorithm;

/// Default cache size - can be configured via PREDICTION_CACHE_SIZE
pub const DEFAULT_CACHE_SIZE: usize = 1024;

/// Identifies one prediction: the registry generation it was computed under,
/// the model, and the exact bit pattern of the prepared features.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    generation: u64,
    algorithm: Algorithm,
    features: Vec<u64>,
}

impl CacheKey {
    pub fn new(generation: u64, algorithm: Algorithm, features: &Array2<f64>) -> Self {
        Self {
            generation,
            algorithm,
            features: features.iter().map(|v| v.to_bits()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub len: usize,
    pub capacity: usize,
}

/// LRU cache of model outputs. A capacity of zero disables caching.
pub struct PredictionCache {
    entries: Option<LruCache<CacheKey, f64>>,
    pub hits: usize,
    pub misses: usize,
}

impl PredictionCache {
    pub fn new(capacity: usize) -> Self {
        info!("Initializing PredictionCache with cache size: {}", capacity);
        Self {
            entries: NonZeroUsize::new(capacity).map(LruCache::new),
            hits: 0,
            misses: 0,
        }
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<f64> {
        let entries = self.entries.as_mut()?;
        match entries.get(key) {
            Some(area) => {
                self.hits += 1;
                if self.hits % 100 == 0 {
                    info!(
                        "PredictionCache stats - hits: {}, misses: {}, hit rate: {:.2}%",
                        self.hits,
                        self.misses,
                        (self.hits as f64 / (self.hits + self.misses) as f64) * 100.0
                    );
                }
                Some(*area)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, key: CacheKey, area: f64) {
        if let Some(entries) = self.entries.as_mut() {
            entries.put(key, area);
        }
    }

    pub fn clear(&mut self) {
        if let Some(entries) = self.entries.as_mut() {
            entries.clear();
        }
        self.hits = 0;
        self.misses = 0;
        info!("Prediction cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            len: self.entries.as_ref().map_or(0, LruCache::len),
            capacity: self.entries.as_ref().map_or(0, |e| e.cap().get()),
        }
    }
}

/// A thread-safe wrapper for the PredictionCache
pub type SharedPredictionCache = Arc<Mutex<PredictionCache>>;

pub fn create_shared_cache(capacity: usize) -> SharedPredictionCache {
    Arc::new(Mutex::new(PredictionCache::new(capacity)))
}
