//! The session repository facade.
//!
//! One CRUD surface combining the durable [`RecordStore`] with an optional
//! [`CacheClient`] fast path. The durable store is the source of truth; the
//! cache is probed first on reads, populated on every successful durable
//! read or write, and invalidated on destroy.
//!
//! This is also the degradation boundary: storage faults are logged and
//! surfaced as empty bytes / `false` / `None`, never as errors, so a flaky
//! store cannot abort an otherwise-valid request.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::CacheClient;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::store::RecordStore;

/// Cache-aside facade over the durable record store.
pub struct SessionRepository {
    store: Arc<dyn RecordStore>,
    cache: Option<Arc<dyn CacheClient>>,
    config: StoreConfig,
}

impl SessionRepository {
    /// Create a repository without a cache layer.
    pub fn new(store: Arc<dyn RecordStore>, config: StoreConfig) -> Self {
        Self {
            store,
            cache: None,
            config,
        }
    }

    /// Create a repository with a cache fast path in front of the store.
    pub fn with_cache(
        store: Arc<dyn RecordStore>,
        cache: Arc<dyn CacheClient>,
        config: StoreConfig,
    ) -> Self {
        Self {
            store,
            cache: Some(cache),
            config,
        }
    }

    /// The configured store-wide record lifetime in seconds.
    pub fn max_lifetime_secs(&self) -> i64 {
        self.config.max_lifetime_secs
    }

    fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.config.max_lifetime_secs.max(0) as u64)
    }

    /// Read the payload for `id`, cache first.
    ///
    /// Returns empty bytes for a missing/expired record or on a storage
    /// fault.
    pub fn read(&self, id: &str) -> Vec<u8> {
        if id.is_empty() {
            return Vec::new();
        }

        let key = self.config.cache_key(id);
        if let Some(cache) = &self.cache {
            match cache.get(&key) {
                Some(value) if !value.is_empty() => return value,
                Some(_) => {
                    // A zero-length cached value is malformed; purge it and
                    // fall through to the store.
                    warn!(id, "malformed cache entry, treating as miss");
                    cache.delete(&key);
                }
                None => {}
            }
        }

        let data = match self.store.read(id) {
            Ok(data) => data,
            Err(err) => {
                warn!(id, error = %err, "session read failed, yielding empty session");
                return Vec::new();
            }
        };

        if !data.is_empty() {
            if let Some(cache) = &self.cache {
                cache.set(&key, &data, self.cache_ttl());
            }
        }

        data
    }

    /// Write the payload for `id` through to the store, then populate the
    /// cache best-effort. Returns false only on a durable fault.
    pub fn write(&self, id: &str, data: &[u8]) -> bool {
        if let Err(err) = self.store.write(id, data) {
            warn!(id, error = %err, "session write failed, dropping write");
            return false;
        }

        if !id.is_empty() {
            if let Some(cache) = &self.cache {
                cache.set(&self.config.cache_key(id), data, self.cache_ttl());
            }
        }

        true
    }

    /// Delete `id` from cache (best-effort) and store. The result reflects
    /// the durable delete only.
    pub fn destroy(&self, id: &str) -> bool {
        if let Some(cache) = &self.cache {
            cache.delete(&self.config.cache_key(id));
        }

        match self.store.destroy(id) {
            Ok(()) => true,
            Err(err) => {
                warn!(id, error = %err, "session destroy failed");
                false
            }
        }
    }

    /// Whether a live record exists for `id`. A non-empty cache hit counts
    /// as existence; otherwise the store decides.
    pub fn exists(&self, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }

        if let Some(cache) = &self.cache {
            if matches!(cache.get(&self.config.cache_key(id)), Some(v) if !v.is_empty()) {
                return true;
            }
        }

        match self.store.exists(id) {
            Ok(exists) => exists,
            Err(err) => {
                warn!(id, error = %err, "session existence check failed");
                false
            }
        }
    }

    /// Raw `written_at` for `id`, or `None` on absence or fault.
    pub fn last_modified(&self, id: &str) -> Option<i64> {
        match self.store.last_modified(id) {
            Ok(ts) => ts,
            Err(err) => {
                warn!(id, error = %err, "last-modified lookup failed");
                None
            }
        }
    }

    /// Refresh `written_at` for a live `id` without rewriting the payload.
    pub fn touch(&self, id: &str) -> bool {
        match self.store.touch(id) {
            Ok(()) => true,
            Err(err) => {
                warn!(id, error = %err, "session touch failed");
                false
            }
        }
    }

    /// Purge records older than `max_lifetime_secs`, returning the deleted
    /// count.
    ///
    /// Unlike the request-path operations this surfaces faults: it is an
    /// administrative sweep and its caller wants to know it failed.
    pub fn gc(&self, max_lifetime_secs: i64) -> Result<u64> {
        let deleted = self.store.gc(max_lifetime_secs)?;
        debug!(deleted, max_lifetime_secs, "session gc sweep complete");
        Ok(deleted)
    }
}
