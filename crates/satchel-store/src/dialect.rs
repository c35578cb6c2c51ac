//! Backend-specific upsert statement shapes.
//!
//! A session write must be a single atomic insert-or-update so that
//! concurrent writers to the same id never produce duplicate rows and the
//! last writer wins. Every supported backend expresses that differently;
//! this module renders the native statement for each.
//!
//! All templates use the named parameters `:id`, `:data`, `:written_at` and
//! `:lifetime`.

/// The upsert statement family for a storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertDialect {
    /// SQLite `INSERT OR REPLACE`.
    Sqlite,
    /// MySQL / MariaDB `ON DUPLICATE KEY UPDATE`.
    MySql,
    /// PostgreSQL `ON CONFLICT (id) DO UPDATE`.
    Postgres,
    /// SQL Server `MERGE WITH (HOLDLOCK)`.
    SqlServer,
    /// Oracle `MERGE INTO .. USING DUAL`.
    Oracle,
}

impl UpsertDialect {
    /// Map a driver/platform name (as reported by the connection layer) to a
    /// dialect.
    ///
    /// Unrecognized platforms fall back to the `ON CONFLICT DO UPDATE`
    /// shape, which both PostgreSQL and SQLite (>= 3.24) accept, rather than
    /// failing closed.
    pub fn from_driver_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Self::Sqlite,
            "mysql" | "mariadb" => Self::MySql,
            "postgres" | "postgresql" | "pgsql" => Self::Postgres,
            "mssql" | "sqlsrv" | "sqlserver" => Self::SqlServer,
            "oci" | "oci8" | "oracle" => Self::Oracle,
            _ => Self::Postgres,
        }
    }

    /// Render the single-statement upsert for `table`.
    pub fn upsert_sql(&self, table: &str) -> String {
        match self {
            Self::Sqlite => format!(
                "INSERT OR REPLACE INTO {table} (id, data, written_at, lifetime_secs) \
                 VALUES (:id, :data, :written_at, :lifetime)"
            ),
            Self::MySql => format!(
                "INSERT INTO {table} (id, data, written_at, lifetime_secs) \
                 VALUES (:id, :data, :written_at, :lifetime) \
                 ON DUPLICATE KEY UPDATE data = VALUES(data), \
                 written_at = VALUES(written_at), lifetime_secs = VALUES(lifetime_secs)"
            ),
            Self::Postgres => format!(
                "INSERT INTO {table} (id, data, written_at, lifetime_secs) \
                 VALUES (:id, :data, :written_at, :lifetime) \
                 ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data, \
                 written_at = EXCLUDED.written_at, lifetime_secs = EXCLUDED.lifetime_secs"
            ),
            Self::SqlServer => format!(
                "MERGE INTO {table} WITH (HOLDLOCK) USING (SELECT :id AS id) AS src \
                 ON ({table}.id = src.id) \
                 WHEN NOT MATCHED THEN \
                 INSERT (id, data, written_at, lifetime_secs) \
                 VALUES (:id, :data, :written_at, :lifetime) \
                 WHEN MATCHED THEN \
                 UPDATE SET data = :data, written_at = :written_at, lifetime_secs = :lifetime;"
            ),
            Self::Oracle => format!(
                "MERGE INTO {table} USING DUAL ON ({table}.id = :id) \
                 WHEN NOT MATCHED THEN \
                 INSERT (id, data, written_at, lifetime_secs) \
                 VALUES (:id, :data, :written_at, :lifetime) \
                 WHEN MATCHED THEN \
                 UPDATE SET data = :data, written_at = :written_at, lifetime_secs = :lifetime"
            ),
        }
    }
}
