//! The durable session record.

/// Maximum length of a session id, in bytes.
pub const MAX_ID_LEN: usize = 128;

/// A durable session record as stored in the backing table.
///
/// `data` is an opaque serialized payload; this layer never inspects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Opaque session identifier (primary key, at most [`MAX_ID_LEN`] bytes).
    pub id: String,

    /// Serialized session payload. Binary-safe.
    pub data: Vec<u8>,

    /// Unix seconds of the last write to this record.
    pub written_at: i64,

    /// Nominal lifetime recorded at write time. Informational; read-side
    /// liveness uses the store-wide configured lifetime instead.
    pub lifetime_secs: i64,
}

impl SessionRecord {
    /// Whether this record is live under the given store-wide lifetime.
    pub fn is_live(&self, max_lifetime_secs: i64, now: i64) -> bool {
        self.written_at + max_lifetime_secs >= now
    }
}
