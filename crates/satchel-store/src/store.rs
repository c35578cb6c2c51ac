//! The durable record store contract.

use crate::error::Result;

/// Durable, authoritative CRUD for session records.
///
/// Implementations return errors for storage faults; the graceful
/// degradation policy (fault becomes empty bytes / `false`) lives in the
/// [`SessionRepository`](crate::SessionRepository) facade, not here.
///
/// Contract notes:
/// - `read`/`write`/`destroy` on an empty id are successful no-ops.
/// - `write` must be a single atomic upsert; concurrent writers to the same
///   id never duplicate rows and the last writer wins.
/// - `destroy` of an absent row is success, not an error.
pub trait RecordStore: Send + Sync {
    /// Read the payload for `id`. Returns an empty vec for an empty id, a
    /// missing id, or an expired record.
    fn read(&self, id: &str) -> Result<Vec<u8>>;

    /// Upsert the payload for `id`, refreshing `written_at` and
    /// `lifetime_secs`.
    fn write(&self, id: &str, data: &[u8]) -> Result<()>;

    /// Delete the record for `id` if present. Idempotent.
    fn destroy(&self, id: &str) -> Result<()>;

    /// Whether a live (non-expired) record exists for `id`.
    fn exists(&self, id: &str) -> Result<bool>;

    /// Raw `written_at` for `id`, independent of liveness filtering.
    fn last_modified(&self, id: &str) -> Result<Option<i64>>;

    /// Refresh `written_at` for a live row without rewriting its payload.
    fn touch(&self, id: &str) -> Result<()>;

    /// Delete all records older than `max_lifetime_secs`. Returns the number
    /// of deleted rows.
    fn gc(&self, max_lifetime_secs: i64) -> Result<u64>;
}
