use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use crate::core::error::Result;
use crate::core::types::RecordId;
use crate::query::ast::FilterChain;
use crate::search::sort::SortSpec;

/// Cached, already sorted identifiers of one evaluated query
#[derive(Debug, Clone)]
pub struct CachedResult {
    pub ids: Arc<Vec<RecordId>>,
}

/// Entries are tied to the snapshot version they were computed on, so a
/// refresh makes every older entry unreachable.
///
/// Chain and sort are keyed by their bincode encoding: distinct trees never
/// share a key, which their rendered text does not guarantee.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct QueryKey {
    pub version: u64,
    pub chain: Vec<u8>,
    pub sort: Vec<u8>,
}

impl QueryKey {
    pub fn new(version: u64, chain: &FilterChain, sort: Option<&SortSpec>) -> Result<Self> {
        Ok(QueryKey {
            version,
            chain: bincode::serialize(chain)?,
            sort: match sort {
                Some(spec) => bincode::serialize(spec)?,
                None => Vec::new(),
            },
        })
    }
}

pub struct QueryCache {
    cache: Mutex<LruCache<QueryKey, CachedResult>>,
    capacity: usize,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        QueryCache {
            cache: Mutex::new(LruCache::new(cap)),
            capacity: cap.get(),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &QueryKey) -> Option<CachedResult> {
        let mut cache = self.cache.lock();
        match cache.get(key) {
            Some(result) => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Some(result.clone())
            }
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, key: QueryKey, result: CachedResult) {
        self.cache.lock().put(key, result);
    }

    /// Drop entries computed on versions older than `version`
    pub fn evict_before(&self, version: u64) {
        let mut cache = self.cache.lock();
        let stale: Vec<QueryKey> = cache
            .iter()
            .filter(|(key, _)| key.version < version)
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            cache.pop(&key);
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
            size: self.cache.lock().len(),
            capacity: self.capacity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hit_count: u64,
    pub miss_count: u64,
    pub size: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}
