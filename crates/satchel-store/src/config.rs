//! Configuration for the record store and repository.

/// Default time-to-live for durable session records, in seconds (one day).
pub const DEFAULT_MAX_LIFETIME_SECS: i64 = 86_400;

/// Default key prefix for cache entries.
pub const DEFAULT_CACHE_PREFIX: &str = "satchel:";

/// Default name of the durable session table.
pub const DEFAULT_TABLE: &str = "sessions";

/// Configuration shared by the record store and the repository facade.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Store-wide record lifetime in seconds. This value, not the per-row
    /// `lifetime_secs` column, decides read-side liveness.
    pub max_lifetime_secs: i64,

    /// Prefix prepended to session ids to form cache keys.
    pub cache_prefix: String,

    /// Name of the durable session table.
    pub table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_lifetime_secs: DEFAULT_MAX_LIFETIME_SECS,
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

impl StoreConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the store-wide record lifetime in seconds.
    pub fn with_max_lifetime(mut self, secs: i64) -> Self {
        self.max_lifetime_secs = secs;
        self
    }

    /// Set the cache key prefix.
    pub fn with_cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_prefix = prefix.into();
        self
    }

    /// Set the durable table name.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Cache key for a session id.
    pub fn cache_key(&self, id: &str) -> String {
        format!("{}{}", self.cache_prefix, id)
    }
}
