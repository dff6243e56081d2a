use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::table::RangeTable;

pub const DEFAULT_CACHE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub loads: u64,
}

/// Parsed tables keyed by canonical file path.
pub struct TableCache {
    cache: Mutex<LruCache<PathBuf, Arc<RangeTable>>>,
    hits: AtomicU64,
    loads: AtomicU64,
}

impl Default for TableCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl TableCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            loads: AtomicU64::new(0),
        }
    }

    pub fn get(&self, path: &Path) -> Option<Arc<RangeTable>> {
        let mut cache = self.cache.lock();
        let table = cache.get(path).cloned();
        if table.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        table
    }

    /// Returns the cached table or runs `load` while holding the lock, so a
    /// path is parsed at most once even under concurrent first access.
    pub fn get_or_try_load<F, E>(&self, path: &Path, load: F) -> Result<Arc<RangeTable>, E>
    where
        F: FnOnce() -> Result<RangeTable, E>,
    {
        let mut cache = self.cache.lock();
        if let Some(table) = cache.get(path) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(table.clone());
        }

        let table = Arc::new(load()?);
        self.loads.fetch_add(1, Ordering::Relaxed);
        cache.put(path.to_path_buf(), table.clone());
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}
