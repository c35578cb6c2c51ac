//! The reserved session metadata bag.

use std::any::Any;

use serde_json::{Map, Value};

use crate::bag::SessionBag;

/// Registry name and storage key of the metadata bag.
pub const METADATA_BAG: &str = "_meta";

const KEY_CREATED: &str = "created";
const KEY_LAST_USED: &str = "last_used";
const KEY_LIFETIME: &str = "lifetime";

/// Reserved bag tracking session freshness metadata.
///
/// Persisted fields are `created`, `last_used` and `lifetime` (unix seconds
/// / seconds). The freshness marker set by `stamp_new` is in-memory only:
/// it reports that the current id was minted during this use (e.g. by
/// `regenerate`). The durable record's `written_at` column, not
/// `last_used`, is the authoritative recency signal.
#[derive(Debug, Clone)]
pub struct MetadataBag {
    created: i64,
    last_used: i64,
    lifetime: i64,
    fresh: bool,
}

impl MetadataBag {
    pub fn new() -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            created: now,
            last_used: now,
            lifetime: 0,
            fresh: false,
        }
    }

    /// Unix seconds at which this session was first created.
    pub fn created(&self) -> i64 {
        self.created
    }

    /// Unix seconds of the last recorded explicit use.
    pub fn last_used(&self) -> i64 {
        self.last_used
    }

    /// Nominal lifetime in seconds recorded for this session.
    pub fn lifetime(&self) -> i64 {
        self.lifetime
    }

    /// Whether the current id was minted during this use.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Restart the metadata clock for a newly minted session id.
    pub fn stamp_new(&mut self, lifetime: Option<i64>) {
        let now = chrono::Utc::now().timestamp();
        self.created = now;
        self.last_used = now;
        if let Some(lifetime) = lifetime {
            self.lifetime = lifetime;
        }
        self.fresh = true;
    }

    /// Record an explicit use of the session.
    pub fn stamp_use(&mut self) {
        self.last_used = chrono::Utc::now().timestamp();
    }
}

impl Default for MetadataBag {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBag for MetadataBag {
    fn name(&self) -> &str {
        METADATA_BAG
    }

    fn storage_key(&self) -> &str {
        METADATA_BAG
    }

    fn initialize(&mut self, section: Map<String, Value>) {
        match section.get(KEY_CREATED).and_then(Value::as_i64) {
            Some(created) => {
                self.created = created;
                self.last_used = section
                    .get(KEY_LAST_USED)
                    .and_then(Value::as_i64)
                    .unwrap_or(created);
                self.lifetime = section
                    .get(KEY_LIFETIME)
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                self.fresh = false;
            }
            None => self.stamp_new(None),
        }
    }

    fn clear(&mut self) {
        self.stamp_new(None);
    }

    fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(KEY_CREATED.into(), self.created.into());
        map.insert(KEY_LAST_USED.into(), self.last_used.into());
        map.insert(KEY_LIFETIME.into(), self.lifetime.into());
        map
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
