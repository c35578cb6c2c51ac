//! End-to-end flow: factory -> lifecycle -> repository -> store, with the
//! in-memory cache in front.

use std::sync::Arc;

use serde_json::json;

use satchel_session::{AttributeBag, MockRequest, SessionConfig, SessionFactory, SessionRequest};
use satchel_store::{MemoryCache, RecordStore, SessionRepository, SqliteRecordStore, StoreConfig};

fn build() -> (SessionFactory, Arc<SqliteRecordStore>) {
    let store = Arc::new(SqliteRecordStore::open_in_memory(StoreConfig::default()).unwrap());
    let cache = Arc::new(MemoryCache::default());
    let repo = Arc::new(SessionRepository::with_cache(
        store.clone(),
        cache,
        StoreConfig::default(),
    ));
    (
        SessionFactory::new(repo, SessionConfig::default()),
        store,
    )
}

#[test]
fn login_then_revisit_flow() {
    let (factory, store) = build();

    // First request: anonymous visitor logs in.
    let first = MockRequest::new();
    let issued_id = {
        let handle = factory.for_request(&first);
        let mut session = handle.lock();
        session.start();
        session.set("user_id", 42);
        session.set("theme", "dark");
        let id = session.id().to_string();
        session.save();
        id
    };
    factory.release(first.token());

    // The durable row exists under the issued id.
    assert!(store.exists(&issued_id).unwrap());

    // Second request: the browser presents the id in the session cookie.
    let second = MockRequest::with_cookie("satchel_session", issued_id.clone());
    {
        let handle = factory.for_request(&second);
        let mut session = handle.lock();
        assert_eq!(session.get("user_id"), Some(json!(42)));
        assert_eq!(session.get("theme"), Some(json!("dark")));

        // Pure read: the unchanged session is not rewritten.
        let before = store.last_modified(&issued_id).unwrap();
        session.save();
        assert_eq!(store.last_modified(&issued_id).unwrap(), before);
    }
    factory.release(second.token());
}

#[test]
fn logout_regenerates_and_destroys_the_old_record() {
    let (factory, store) = build();

    let login = MockRequest::new();
    let old_id = {
        let handle = factory.for_request(&login);
        let mut session = handle.lock();
        session.start();
        session.set("user_id", 7);
        let id = session.id().to_string();
        session.save();
        id
    };
    factory.release(login.token());

    let logout = MockRequest::with_cookie("satchel_session", old_id.clone());
    let new_id = {
        let handle = factory.for_request(&logout);
        let mut session = handle.lock();
        session.start();
        session.regenerate(true, None);
        session.id().to_string()
    };
    factory.release(logout.token());

    assert_ne!(new_id, old_id);
    assert!(!store.exists(&old_id).unwrap());
}

#[test]
fn custom_bags_partition_the_payload() {
    let (factory, store) = build();

    let request = MockRequest::new();
    let id = {
        let handle = factory.for_request(&request);
        let mut session = handle.lock();
        session
            .register_bag(Box::new(AttributeBag::with_name("flash")))
            .unwrap();
        session.start();
        session.set("user_id", 1);

        let flash = session.bag_mut("flash").unwrap();
        flash
            .as_any_mut()
            .downcast_mut::<AttributeBag>()
            .unwrap()
            .set("notice", "saved");

        let id = session.id().to_string();
        session.save();
        id
    };
    factory.release(request.token());

    let payload: serde_json::Value = serde_json::from_slice(&store.read(&id).unwrap()).unwrap();
    assert_eq!(payload["attributes"]["user_id"], json!(1));
    assert_eq!(payload["flash"]["notice"], json!("saved"));
    assert!(payload["_meta"]["created"].is_i64());
}
