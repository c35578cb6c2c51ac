//! Declarative description of the session table.
//!
//! Schema migrations belong to an external collaborator; this module only
//! describes the table (columns + primary key) so that collaborator can
//! register it. The SQLite store uses the same description to auto-create
//! the table when it is absent.

use crate::dialect::UpsertDialect;
use crate::record::MAX_ID_LEN;

/// Logical column type, mapped to a concrete type per backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Variable-length string with a byte-length cap.
    Text { max_len: usize },
    /// Binary blob, arbitrary bytes.
    Blob,
    /// Unsigned integer (unix seconds / lifetime).
    UnsignedInt,
}

/// One column of the session table.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub primary_key: bool,
}

/// Description of the durable session table.
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub table: String,
}

impl TableSpec {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    /// The session table's columns, in declaration order.
    pub fn columns(&self) -> [Column; 4] {
        [
            Column {
                name: "id",
                kind: ColumnKind::Text {
                    max_len: MAX_ID_LEN,
                },
                primary_key: true,
            },
            Column {
                name: "data",
                kind: ColumnKind::Blob,
                primary_key: false,
            },
            Column {
                name: "written_at",
                kind: ColumnKind::UnsignedInt,
                primary_key: false,
            },
            Column {
                name: "lifetime_secs",
                kind: ColumnKind::UnsignedInt,
                primary_key: false,
            },
        ]
    }

    /// Render `CREATE TABLE IF NOT EXISTS` DDL for the given backend.
    pub fn create_table_sql(&self, dialect: UpsertDialect) -> String {
        let cols: Vec<String> = self
            .columns()
            .iter()
            .map(|c| {
                let ty = sql_type(c.kind, dialect);
                if c.primary_key {
                    format!("{} {} PRIMARY KEY", c.name, ty)
                } else {
                    format!("{} {} NOT NULL", c.name, ty)
                }
            })
            .collect();

        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table,
            cols.join(", ")
        )
    }
}

fn sql_type(kind: ColumnKind, dialect: UpsertDialect) -> String {
    match (kind, dialect) {
        (ColumnKind::Text { max_len }, UpsertDialect::Oracle) => {
            format!("VARCHAR2({max_len})")
        }
        (ColumnKind::Text { max_len }, _) => format!("VARCHAR({max_len})"),

        (ColumnKind::Blob, UpsertDialect::Postgres) => "BYTEA".to_string(),
        (ColumnKind::Blob, UpsertDialect::SqlServer) => "VARBINARY(MAX)".to_string(),
        (ColumnKind::Blob, _) => "BLOB".to_string(),

        (ColumnKind::UnsignedInt, UpsertDialect::Sqlite) => "INTEGER".to_string(),
        (ColumnKind::UnsignedInt, UpsertDialect::MySql) => "BIGINT UNSIGNED".to_string(),
        (ColumnKind::UnsignedInt, UpsertDialect::Oracle) => "NUMBER(19)".to_string(),
        (ColumnKind::UnsignedInt, _) => "BIGINT".to_string(),
    }
}
