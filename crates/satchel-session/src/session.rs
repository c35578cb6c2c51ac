//! The session lifecycle state machine.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use satchel_store::SessionRepository;

use crate::bag::{AttributeBag, SessionBag, ATTRIBUTES_BAG};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::metadata::{MetadataBag, METADATA_BAG};

/// One logical use of a session: load, mutate through bags, save.
///
/// State machine: `New -> Started -> Closed`, with `Destroyed` reachable
/// from either and terminal. A closed instance is done; reuse requires a
/// fresh load through the factory.
///
/// Storage faults and corrupt payloads degrade to an empty session and are
/// logged; only caller-side protocol violations (bag registration after
/// start, unknown bag names) return errors.
pub struct Session {
    repo: Arc<SessionRepository>,
    config: SessionConfig,

    /// Resolved id, cached until `regenerate` replaces it.
    id: Option<String>,
    /// Id carried by the inbound request's cookie, if any.
    cookie_id: Option<String>,

    /// Registered bags in registration order. The metadata bag lives
    /// outside this registry under its reserved key.
    bags: Vec<Box<dyn SessionBag>>,
    metadata: MetadataBag,

    /// Deep copy of the loaded snapshot, for the dirty check.
    initial: Map<String, Value>,

    started: bool,
    closed: bool,
    destroyed: bool,
}

impl Session {
    /// Create a session seeded with the id found on the inbound request's
    /// cookie (if any). Registers the default attribute bag.
    pub fn new(
        repo: Arc<SessionRepository>,
        config: SessionConfig,
        cookie_id: Option<String>,
    ) -> Self {
        let mut session = Self {
            repo,
            config,
            id: None,
            cookie_id,
            bags: Vec::new(),
            metadata: MetadataBag::new(),
            initial: Map::new(),
            started: false,
            closed: false,
            destroyed: false,
        };

        // Every session carries a general-purpose attribute bag.
        session.bags.push(Box::new(AttributeBag::new()));
        session
    }

    // ── State & identity ────────────────────────────────────────────

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The session (cookie) name.
    pub fn name(&self) -> &str {
        &self.config.cookie_name
    }

    /// The session id, resolving it on first use: an explicitly set id
    /// wins, then a non-empty cookie id, then a freshly generated one.
    pub fn id(&mut self) -> &str {
        self.resolve_id();
        self.id.as_deref().unwrap_or_default()
    }

    /// Pin the session id explicitly.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    fn resolve_id(&mut self) {
        if self.id.is_some() {
            return;
        }

        self.id = match self.cookie_id.as_deref() {
            Some(cookie_id) if !cookie_id.is_empty() => Some(cookie_id.to_string()),
            _ => Some(generate_id()),
        };
    }

    // ── Bag registry ────────────────────────────────────────────────

    /// Register a bag. Only allowed before the session starts; a bag with
    /// the same name replaces the prior registration.
    pub fn register_bag(&mut self, bag: Box<dyn SessionBag>) -> Result<()> {
        if self.started {
            return Err(SessionError::RegisterAfterStart(bag.name().to_string()));
        }
        if bag.name() == METADATA_BAG {
            return Err(SessionError::ReservedBagName(METADATA_BAG.to_string()));
        }

        match self.bags.iter_mut().find(|b| b.name() == bag.name()) {
            Some(slot) => *slot = bag,
            None => self.bags.push(bag),
        }
        Ok(())
    }

    /// Fetch a registered bag by name, auto-starting the session if needed.
    pub fn bag(&mut self, name: &str) -> Result<&dyn SessionBag> {
        self.ensure_started();

        if name == METADATA_BAG {
            return Ok(&self.metadata);
        }
        self.bags
            .iter()
            .find(|b| b.name() == name)
            .map(|b| b.as_ref())
            .ok_or_else(|| SessionError::UnknownBag(name.to_string()))
    }

    /// Mutable variant of [`bag`](Self::bag).
    pub fn bag_mut(&mut self, name: &str) -> Result<&mut dyn SessionBag> {
        self.ensure_started();

        if name == METADATA_BAG {
            return Ok(&mut self.metadata);
        }
        self.bags
            .iter_mut()
            .find(|b| b.name() == name)
            .map(|b| b.as_mut() as &mut dyn SessionBag)
            .ok_or_else(|| SessionError::UnknownBag(name.to_string()))
    }

    /// The default attribute bag.
    pub fn attributes(&mut self) -> Result<&AttributeBag> {
        self.bag(ATTRIBUTES_BAG)?
            .as_any()
            .downcast_ref()
            .ok_or_else(|| SessionError::UnknownBag(ATTRIBUTES_BAG.to_string()))
    }

    /// Mutable access to the default attribute bag.
    pub fn attributes_mut(&mut self) -> Result<&mut AttributeBag> {
        self.bag_mut(ATTRIBUTES_BAG)?
            .as_any_mut()
            .downcast_mut()
            .ok_or_else(|| SessionError::UnknownBag(ATTRIBUTES_BAG.to_string()))
    }

    /// The metadata bag.
    pub fn metadata(&mut self) -> &MetadataBag {
        self.ensure_started();
        &self.metadata
    }

    // ── Attribute passthroughs ──────────────────────────────────────

    pub fn get(&mut self, key: &str) -> Option<Value> {
        self.attributes().ok()?.get(key).cloned()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        if let Ok(attributes) = self.attributes_mut() {
            attributes.set(key, value);
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.attributes_mut().ok()?.remove(key)
    }

    pub fn has(&mut self, key: &str) -> bool {
        self.attributes().map(|a| a.has(key)).unwrap_or(false)
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Load the session. Idempotent: starting an already-started session is
    /// a no-op. A closed or destroyed instance stays closed.
    pub fn start(&mut self) {
        if self.started || self.closed || self.destroyed {
            return;
        }

        self.resolve_id();
        let id = self.id.clone().unwrap_or_default();
        let bytes = self.repo.read(&id);
        let snapshot = decode_payload(&id, &bytes);

        self.initial = snapshot.clone();
        self.initialize_bags(&snapshot);
        self.started = true;

        debug!(id = %id, keys = snapshot.len(), "session started");
    }

    fn ensure_started(&mut self) {
        if !self.started {
            self.start();
        }
    }

    /// Initialize every bag (and the metadata bag) from its storage-key
    /// slice of the snapshot. A missing or non-object slice yields an empty
    /// section.
    fn initialize_bags(&mut self, snapshot: &Map<String, Value>) {
        for bag in &mut self.bags {
            bag.initialize(object_section(snapshot, bag.storage_key()));
        }
        self.metadata
            .initialize(object_section(snapshot, METADATA_BAG));
    }

    /// Reconcile the working snapshot and persist it if anything changed.
    ///
    /// Unchanged sessions skip the durable write entirely. Transitions to
    /// closed either way. Closed and destroyed instances are terminal:
    /// calling `save` again is a no-op.
    pub fn save(&mut self) {
        if self.closed || self.destroyed {
            return;
        }

        let snapshot = self.collect_snapshot();
        if snapshot == self.initial {
            debug!("session unchanged, skipping write");
        } else {
            self.resolve_id();
            let id = self.id.clone().unwrap_or_default();
            match serde_json::to_vec(&Value::Object(snapshot)) {
                Ok(bytes) => {
                    self.repo.write(&id, &bytes);
                }
                Err(err) => {
                    warn!(id = %id, error = %err, "session payload serialization failed, dropping write");
                }
            }
        }

        self.started = false;
        self.closed = true;
    }

    /// Flatten every bag's contents keyed by its storage name, omitting
    /// empty sections. A snapshot that would carry nothing but metadata
    /// collapses to empty.
    fn collect_snapshot(&self) -> Map<String, Value> {
        let mut snapshot = Map::new();

        for bag in &self.bags {
            let section = bag.to_map();
            if !section.is_empty() {
                snapshot.insert(bag.storage_key().to_string(), Value::Object(section));
            }
        }

        if snapshot.is_empty() {
            return snapshot;
        }
        snapshot.insert(
            METADATA_BAG.to_string(),
            Value::Object(self.metadata.to_map()),
        );
        snapshot
    }

    /// Clear every bag in place and re-initialize from an empty snapshot.
    /// Does not change the started state.
    pub fn clear(&mut self) {
        for bag in &mut self.bags {
            bag.clear();
        }

        let empty = Map::new();
        self.initialize_bags(&empty);
    }

    /// Destroy the durable record and terminate this instance.
    pub fn destroy(&mut self) {
        self.resolve_id();
        let id = self.id.clone().unwrap_or_default();
        self.repo.destroy(&id);

        self.initial = Map::new();
        self.clear();

        self.started = false;
        self.closed = true;
        self.destroyed = true;

        debug!(id = %id, "session destroyed");
    }

    /// Assign a freshly generated id, optionally destroying the old durable
    /// record. Touches no session data.
    pub fn regenerate(&mut self, destroy: bool, lifetime: Option<i64>) {
        if destroy {
            let old_id = self
                .id
                .clone()
                .or_else(|| self.cookie_id.clone())
                .filter(|id| !id.is_empty());

            if let Some(old_id) = old_id {
                self.repo.destroy(&old_id);
                self.metadata.stamp_new(lifetime);
                debug!(old_id = %old_id, "regenerate destroyed old session record");
            }
        }

        self.id = Some(generate_id());
    }
}

/// Cryptographically random 32-char hex session id.
fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Decode a stored payload into a top-level mapping.
///
/// Anything that is not a JSON object (a parse failure, or a payload whose
/// top level is an array/scalar, the non-string-key corruption case) is
/// discarded wholesale rather than partially applied.
fn decode_payload(id: &str, bytes: &[u8]) -> Map<String, Value> {
    if bytes.is_empty() {
        return Map::new();
    }

    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            warn!(
                id,
                kind = value_kind(&other),
                "discarding non-mapping session payload"
            );
            Map::new()
        }
        Err(err) => {
            warn!(id, error = %err, "discarding malformed session payload");
            Map::new()
        }
    }
}

fn object_section(snapshot: &Map<String, Value>, key: &str) -> Map<String, Value> {
    match snapshot.get(key) {
        Some(Value::Object(section)) => section.clone(),
        _ => Map::new(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satchel_store::{
        RecordStore, Result as StoreResult, SqliteRecordStore, StoreConfig,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory store that counts writes, for dirty-check assertions.
    #[derive(Default)]
    struct CountingStore {
        rows: Mutex<std::collections::HashMap<String, Vec<u8>>>,
        writes: AtomicUsize,
    }

    impl CountingStore {
        fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    impl RecordStore for CountingStore {
        fn read(&self, id: &str) -> StoreResult<Vec<u8>> {
            Ok(self.rows.lock().unwrap().get(id).cloned().unwrap_or_default())
        }
        fn write(&self, id: &str, data: &[u8]) -> StoreResult<()> {
            if !id.is_empty() {
                self.writes.fetch_add(1, Ordering::SeqCst);
                self.rows.lock().unwrap().insert(id.to_string(), data.to_vec());
            }
            Ok(())
        }
        fn destroy(&self, id: &str) -> StoreResult<()> {
            self.rows.lock().unwrap().remove(id);
            Ok(())
        }
        fn exists(&self, id: &str) -> StoreResult<bool> {
            Ok(self.rows.lock().unwrap().contains_key(id))
        }
        fn last_modified(&self, _id: &str) -> StoreResult<Option<i64>> {
            Ok(None)
        }
        fn touch(&self, _id: &str) -> StoreResult<()> {
            Ok(())
        }
        fn gc(&self, _max_lifetime_secs: i64) -> StoreResult<u64> {
            Ok(0)
        }
    }

    fn counting_repo() -> (Arc<SessionRepository>, Arc<CountingStore>) {
        let store = Arc::new(CountingStore::default());
        let repo = Arc::new(SessionRepository::new(
            store.clone(),
            StoreConfig::default(),
        ));
        (repo, store)
    }

    fn sqlite_repo() -> Arc<SessionRepository> {
        let store =
            Arc::new(SqliteRecordStore::open_in_memory(StoreConfig::default()).unwrap());
        Arc::new(SessionRepository::new(store, StoreConfig::default()))
    }

    fn session_for(repo: &Arc<SessionRepository>, id: &str) -> Session {
        let mut session = Session::new(repo.clone(), SessionConfig::default(), None);
        session.set_id(id);
        session
    }

    #[test]
    fn test_start_is_idempotent() {
        let repo = sqlite_repo();
        let mut session = session_for(&repo, "s1");

        session.start();
        session.set("k", 1);
        session.start();

        // The second start did not reload and wipe the mutation.
        assert_eq!(session.get("k"), Some(json!(1)));
    }

    #[test]
    fn test_unchanged_session_skips_write() {
        let (repo, store) = counting_repo();
        let mut session = session_for(&repo, "s1");

        session.start();
        session.save();

        assert_eq!(store.write_count(), 0);
        assert!(session.is_closed());
        assert!(!session.is_started());
    }

    #[test]
    fn test_mutated_session_writes_exactly_once() {
        let (repo, store) = counting_repo();
        let mut session = session_for(&repo, "s1");

        session.start();
        session.set("user_id", 42);
        session.save();

        assert_eq!(store.write_count(), 1);

        let payload: Value = serde_json::from_slice(&repo.read("s1")).unwrap();
        assert_eq!(payload["attributes"]["user_id"], json!(42));
        assert!(payload["_meta"]["created"].is_i64());
    }

    #[test]
    fn test_reload_round_trip_is_clean() {
        let (repo, store) = counting_repo();

        let mut first = session_for(&repo, "s1");
        first.start();
        first.set("user_id", 42);
        first.save();
        assert_eq!(store.write_count(), 1);

        // A second use that only reads must not write again.
        let mut second = session_for(&repo, "s1");
        second.start();
        assert_eq!(second.get("user_id"), Some(json!(42)));
        second.save();
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn test_register_bag_after_start_fails() {
        let repo = sqlite_repo();
        let mut session = session_for(&repo, "s1");

        session.start();
        let err = session
            .register_bag(Box::new(AttributeBag::with_name("flash")))
            .unwrap_err();
        assert!(matches!(err, SessionError::RegisterAfterStart(_)));
    }

    #[test]
    fn test_registered_bag_is_retrievable() {
        let repo = sqlite_repo();
        let mut session = session_for(&repo, "s1");

        session
            .register_bag(Box::new(AttributeBag::with_name("flash")))
            .unwrap();

        // Fetching the bag auto-starts the session.
        assert!(session.bag("flash").is_ok());
        assert!(session.is_started());
    }

    #[test]
    fn test_unknown_bag_is_an_error() {
        let repo = sqlite_repo();
        let mut session = session_for(&repo, "s1");

        assert!(matches!(
            session.bag("nope"),
            Err(SessionError::UnknownBag(_))
        ));
    }

    #[test]
    fn test_metadata_bag_name_is_reserved() {
        let repo = sqlite_repo();
        let mut session = session_for(&repo, "s1");

        let err = session
            .register_bag(Box::new(AttributeBag::with_name(METADATA_BAG)))
            .unwrap_err();
        assert!(matches!(err, SessionError::ReservedBagName(_)));
    }

    #[test]
    fn test_same_name_registration_replaces() {
        let repo = sqlite_repo();
        let mut session = session_for(&repo, "s1");

        let mut bag = AttributeBag::with_name("flash");
        bag.set("old", true);
        session.register_bag(Box::new(bag)).unwrap();
        session
            .register_bag(Box::new(AttributeBag::with_name("flash")))
            .unwrap();

        let flash = session.bag("flash").unwrap();
        assert!(flash.to_map().is_empty());
    }

    #[test]
    fn test_malformed_payload_starts_empty() {
        let repo = sqlite_repo();
        repo.write("s1", b"definitely not json");

        let mut session = session_for(&repo, "s1");
        session.start();
        assert_eq!(session.get("anything"), None);
    }

    #[test]
    fn test_non_mapping_payload_is_discarded_wholesale() {
        let repo = sqlite_repo();
        repo.write("s1", b"[1,2,3]");

        let mut session = session_for(&repo, "s1");
        session.start();
        assert!(session.attributes().unwrap().is_empty());
    }

    #[test]
    fn test_non_mapping_bag_section_defaults_empty() {
        let repo = sqlite_repo();
        repo.write("s1", br#"{"attributes": "corrupt", "flash": {"ok": 1}}"#);

        let mut session = session_for(&repo, "s1");
        session
            .register_bag(Box::new(AttributeBag::with_name("flash")))
            .unwrap();
        session.start();

        assert!(session.attributes().unwrap().is_empty());
        assert_eq!(session.bag("flash").unwrap().to_map()["ok"], json!(1));
    }

    #[test]
    fn test_cookie_id_is_used_when_present() {
        let repo = sqlite_repo();
        let mut session = Session::new(
            repo,
            SessionConfig::default(),
            Some("cookie-id".to_string()),
        );
        assert_eq!(session.id(), "cookie-id");
    }

    #[test]
    fn test_empty_cookie_id_generates_fresh() {
        let repo = sqlite_repo();
        let mut session =
            Session::new(repo, SessionConfig::default(), Some(String::new()));

        let id = session.id().to_string();
        assert_eq!(id.len(), 32);
        // Resolved once, stable afterwards.
        assert_eq!(session.id(), id);
    }

    #[test]
    fn test_regenerate_with_destroy() {
        let repo = sqlite_repo();
        let mut session = session_for(&repo, "old-id");

        session.start();
        session.set("k", 1);
        session.save();
        assert!(!repo.read("old-id").is_empty());

        let mut session = session_for(&repo, "old-id");
        session.start();
        session.regenerate(true, Some(600));

        assert!(repo.read("old-id").is_empty());
        assert_ne!(session.id(), "old-id");
        assert!(session.metadata().is_fresh());
        assert_eq!(session.metadata().lifetime(), 600);
    }

    #[test]
    fn test_regenerate_without_destroy_keeps_record() {
        let repo = sqlite_repo();
        let mut session = session_for(&repo, "old-id");
        session.start();
        session.set("k", 1);
        session.save();

        let mut session = session_for(&repo, "old-id");
        session.regenerate(false, None);

        assert!(!repo.read("old-id").is_empty());
        assert_ne!(session.id(), "old-id");
    }

    #[test]
    fn test_clear_keeps_started_and_dirties() {
        let (repo, store) = counting_repo();

        let mut first = session_for(&repo, "s1");
        first.start();
        first.set("k", 1);
        first.save();
        assert_eq!(store.write_count(), 1);

        let mut second = session_for(&repo, "s1");
        second.start();
        second.clear();
        assert!(second.is_started());
        assert!(second.attributes().unwrap().is_empty());

        // Clearing loaded data is a mutation and must persist.
        second.save();
        assert_eq!(store.write_count(), 2);

        let mut third = session_for(&repo, "s1");
        third.start();
        assert_eq!(third.get("k"), None);
    }

    #[test]
    fn test_destroy_removes_record_and_terminates() {
        let repo = sqlite_repo();
        let mut session = session_for(&repo, "s1");
        session.start();
        session.set("k", 1);
        session.save();

        let mut session = session_for(&repo, "s1");
        session.start();
        session.destroy();

        assert!(repo.read("s1").is_empty());
        assert!(!session.is_started());
        assert!(session.is_closed());

        // Terminal: further saves are no-ops.
        session.set("ghost", 1);
        session.save();
        assert!(repo.read("s1").is_empty());
    }

    #[test]
    fn test_save_on_a_closed_instance_is_a_noop() {
        let (repo, store) = counting_repo();
        let mut session = session_for(&repo, "s1");

        session.start();
        session.set("k", 1);
        session.save();
        assert_eq!(store.write_count(), 1);

        // Closed is terminal: a stray late mutation plus a second save must
        // not reach the store.
        session.set("k", 2);
        session.save();
        assert_eq!(store.write_count(), 1);
        assert!(session.is_closed());
    }

    #[test]
    fn test_save_transitions_to_closed_even_when_clean() {
        let repo = sqlite_repo();
        let mut session = session_for(&repo, "s1");

        session.start();
        session.save();
        assert!(session.is_closed());

        // Closed is terminal for this instance; start does not reload.
        session.start();
        assert!(!session.is_started());
    }
}
