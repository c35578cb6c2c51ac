//! Cache client contract and an in-memory implementation.
//!
//! The cache is never authoritative: implementations are infallible by
//! contract and map their own faults to a miss / no-op internally, so a
//! broken cache can never turn a successful durable operation into a
//! reported failure.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::trace;

/// Default capacity of the in-memory cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Minimal key/value cache capability consumed by the repository.
///
/// `get` returns `None` for a missing, expired or faulted entry; `set` and
/// `delete` are best-effort.
pub trait CacheClient: Send + Sync {
    /// Fetch the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store `value` under `key` for at most `ttl`.
    fn set(&self, key: &str, value: &[u8], ttl: Duration);

    /// Drop the entry under `key`, if any.
    fn delete(&self, key: &str);
}

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

/// Capacity-bounded in-memory cache with per-entry TTL.
///
/// LRU eviction keeps memory bounded; expired entries are dropped lazily on
/// access.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, Entry>>,
}

impl MemoryCache {
    /// Create a cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or_else(|| NonZeroUsize::new(1).unwrap());
        Self {
            entries: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Current number of entries, including not-yet-collected expired ones.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl CacheClient for MemoryCache {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let mut entries = self.entries.lock();

        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                trace!(key, "cache hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                trace!(key, "cache entry expired");
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    fn set(&self, key: &str, value: &[u8], ttl: Duration) {
        let entry = Entry {
            value: value.to_vec(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.lock().put(key.to_string(), entry);
    }

    fn delete(&self, key: &str) {
        self.entries.lock().pop(key);
    }
}
