//! SQLite-backed record store.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{named_params, params, Connection, OptionalExtension};
use tracing::debug;

use crate::config::StoreConfig;
use crate::dialect::UpsertDialect;
use crate::error::{Result, StoreError};
use crate::record::{SessionRecord, MAX_ID_LEN};
use crate::schema::TableSpec;
use crate::store::RecordStore;

/// Durable session store over SQLite.
///
/// Thread-safe via internal `Mutex<Connection>`. The table is auto-created
/// from the [`TableSpec`] description if absent.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
    config: StoreConfig,
    upsert_sql: String,
}

impl SqliteRecordStore {
    /// Open (or create) the database at `path` and ensure the session table
    /// exists.
    pub fn open(path: &Path, config: StoreConfig) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn, config)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory(config: StoreConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, config)
    }

    fn with_connection(conn: Connection, config: StoreConfig) -> Result<Self> {
        let spec = TableSpec::new(&config.table);
        conn.execute_batch(&spec.create_table_sql(UpsertDialect::Sqlite))?;

        let upsert_sql = UpsertDialect::Sqlite.upsert_sql(&config.table);
        Ok(Self {
            conn: Mutex::new(conn),
            config,
            upsert_sql,
        })
    }

    /// Lock the connection for use. Panics if poisoned.
    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    /// Fetch the raw record for `id`, expired or not.
    pub fn record(&self, id: &str) -> Result<Option<SessionRecord>> {
        if id.is_empty() {
            return Ok(None);
        }

        Ok(self
            .conn()
            .query_row(
                &format!(
                    "SELECT id, data, written_at, lifetime_secs FROM {} WHERE id = ?1",
                    self.config.table
                ),
                params![id],
                row_to_record,
            )
            .optional()?)
    }

    /// The record for `id` if it is live under the store-wide lifetime.
    fn live_record(&self, id: &str) -> Result<Option<SessionRecord>> {
        let now = Self::now();
        Ok(self
            .record(id)?
            .filter(|rec| rec.is_live(self.config.max_lifetime_secs, now)))
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.get(0)?,
        data: row.get(1)?,
        written_at: row.get(2)?,
        lifetime_secs: row.get(3)?,
    })
}

impl RecordStore for SqliteRecordStore {
    fn read(&self, id: &str) -> Result<Vec<u8>> {
        // Liveness is decided by the store-wide lifetime, not the row's own
        // lifetime_secs column.
        Ok(self
            .live_record(id)?
            .map(|rec| rec.data)
            .unwrap_or_default())
    }

    fn write(&self, id: &str, data: &[u8]) -> Result<()> {
        // A session with no identity has nowhere to go; succeed cheaply.
        if id.is_empty() {
            return Ok(());
        }
        if id.len() > MAX_ID_LEN {
            return Err(StoreError::IdTooLong(id.len(), MAX_ID_LEN));
        }

        self.conn().execute(
            &self.upsert_sql,
            named_params! {
                ":id": id,
                ":data": data,
                ":written_at": Self::now(),
                ":lifetime": self.config.max_lifetime_secs,
            },
        )?;

        Ok(())
    }

    fn destroy(&self, id: &str) -> Result<()> {
        if id.is_empty() {
            return Ok(());
        }

        // Deleting an absent row is success; ignore the affected count.
        self.conn().execute(
            &format!("DELETE FROM {} WHERE id = ?1", self.config.table),
            params![id],
        )?;

        Ok(())
    }

    fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.live_record(id)?.is_some())
    }

    fn last_modified(&self, id: &str) -> Result<Option<i64>> {
        Ok(self.record(id)?.map(|rec| rec.written_at))
    }

    fn touch(&self, id: &str) -> Result<()> {
        if id.is_empty() {
            return Ok(());
        }

        // Only live rows are refreshed; an expired row stays expired until
        // the next write or gc sweep.
        let now = Self::now();
        self.conn().execute(
            &format!(
                "UPDATE {} SET written_at = ?1 WHERE id = ?2 AND written_at + ?3 >= ?1",
                self.config.table
            ),
            params![now, id, self.config.max_lifetime_secs],
        )?;

        Ok(())
    }

    fn gc(&self, max_lifetime_secs: i64) -> Result<u64> {
        let deleted = self.conn().execute(
            &format!("DELETE FROM {} WHERE written_at < ?1", self.config.table),
            params![Self::now() - max_lifetime_secs],
        )?;

        if deleted > 0 {
            debug!(deleted, "purged expired session records");
        }

        Ok(deleted as u64)
    }
}
