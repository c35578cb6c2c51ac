//! Durable session record store with a cache-aside fast path.
//!
//! This crate owns the persistence half of Satchel:
//! - A durable, authoritative [`RecordStore`] keyed by session id, with
//!   server-side expiry filtering and batch purge ([`SqliteRecordStore`]).
//! - Dialect-specific single-statement upserts ([`UpsertDialect`]) so
//!   concurrent writers to the same id never duplicate rows.
//! - A minimal external cache contract ([`CacheClient`]) with a bundled
//!   in-memory LRU implementation ([`MemoryCache`]).
//! - The [`SessionRepository`] facade that composes both and downgrades
//!   storage faults to empty results so a flaky store never aborts a request.
//!
//! # Example
//!
//! ```rust,ignore
//! use satchel_store::{SessionRepository, SqliteRecordStore, StoreConfig};
//!
//! let store = SqliteRecordStore::open_in_memory(StoreConfig::default())?;
//! let repo = SessionRepository::new(Arc::new(store), StoreConfig::default());
//! repo.write("sid", b"payload");
//! ```

mod cache;
mod config;
mod dialect;
mod error;
mod gc;
mod record;
mod repository;
mod schema;
mod sqlite;
mod store;

pub use cache::{CacheClient, MemoryCache};
pub use config::StoreConfig;
pub use dialect::UpsertDialect;
pub use error::{Result, StoreError};
pub use gc::GcSignal;
pub use record::{SessionRecord, MAX_ID_LEN};
pub use repository::SessionRepository;
pub use schema::{Column, ColumnKind, TableSpec};
pub use sqlite::SqliteRecordStore;
pub use store::RecordStore;
