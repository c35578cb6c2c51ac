//! Deferred garbage-collection trigger.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::error::Result;
use crate::repository::SessionRepository;

/// Two-phase garbage-collection signal.
///
/// `mark` records that a sweep is due without doing any I/O; `sweep` runs
/// the purge at a less latency-sensitive point (typically end of a unit of
/// work). Both are safe to call redundantly and from multiple threads.
#[derive(Debug, Default)]
pub struct GcSignal {
    due: AtomicBool,
}

impl GcSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a sweep is due. No I/O.
    pub fn mark(&self) {
        self.due.store(true, Ordering::Relaxed);
    }

    /// Whether a sweep is currently due.
    pub fn is_due(&self) -> bool {
        self.due.load(Ordering::Relaxed)
    }

    /// Run the sweep if one is due, consuming the flag.
    ///
    /// Returns `Ok(None)` when no sweep was due, otherwise the deleted
    /// count. The flag is re-armed if the sweep itself fails so a later
    /// close retries it.
    pub fn sweep(&self, repo: &SessionRepository) -> Result<Option<u64>> {
        if !self.due.swap(false, Ordering::Relaxed) {
            return Ok(None);
        }

        match repo.gc(repo.max_lifetime_secs()) {
            Ok(deleted) => {
                debug!(deleted, "deferred gc sweep ran");
                Ok(Some(deleted))
            }
            Err(err) => {
                self.due.store(true, Ordering::Relaxed);
                Err(err)
            }
        }
    }
}
