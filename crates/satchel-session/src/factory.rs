//! Per-request session factory.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use satchel_store::{GcSignal, SessionRepository};

use crate::config::SessionConfig;
use crate::request::{RequestToken, SessionRequest};
use crate::session::Session;

/// Shared handle to one request's session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Maps each request scope to exactly one [`Session`] instance.
///
/// Repeated [`for_request`](Self::for_request) calls for the same request
/// return the identical handle; distinct requests always get distinct
/// instances. Associations are keyed by the request's scope token and are
/// dropped by [`release`](Self::release) when the scope ends (or wholesale
/// by [`reset`](Self::reset) between isolated units).
pub struct SessionFactory {
    repo: Arc<SessionRepository>,
    config: SessionConfig,
    gc: GcSignal,
    live: Mutex<HashMap<RequestToken, SessionHandle>>,
}

impl SessionFactory {
    pub fn new(repo: Arc<SessionRepository>, config: SessionConfig) -> Self {
        Self {
            repo,
            config,
            gc: GcSignal::new(),
            live: Mutex::new(HashMap::new()),
        }
    }

    /// The deferred garbage-collection signal. Mark it on the hot path;
    /// [`release`](Self::release) runs the sweep once the request is done.
    pub fn gc_signal(&self) -> &GcSignal {
        &self.gc
    }

    /// The session for this request, constructing it on first call.
    pub fn for_request<R: SessionRequest + ?Sized>(&self, request: &R) -> SessionHandle {
        let token = request.token();
        let mut live = self.live.lock();

        if let Some(handle) = live.get(&token) {
            return handle.clone();
        }

        let cookie_id = request.cookie(&self.config.cookie_name);
        let handle = Arc::new(Mutex::new(Session::new(
            self.repo.clone(),
            self.config.clone(),
            cookie_id,
        )));
        live.insert(token, handle.clone());

        debug!(token = token.0, "session created for request");
        handle
    }

    /// A brand-new session for an explicit id, bypassing the per-request
    /// arena. An absent or empty id means a fresh one is generated on first
    /// use.
    pub fn for_id(&self, id: Option<&str>) -> SessionHandle {
        let mut session = Session::new(self.repo.clone(), self.config.clone(), None);
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            session.set_id(id);
        }

        Arc::new(Mutex::new(session))
    }

    /// Drop the association for a finished request scope and run the
    /// deferred gc sweep if one is due.
    pub fn release(&self, token: RequestToken) {
        self.live.lock().remove(&token);

        if let Err(err) = self.gc.sweep(&self.repo) {
            warn!(error = %err, "deferred gc sweep failed");
        }
    }

    /// Drop all request associations (used between isolated test/batch
    /// units).
    pub fn reset(&self) {
        self.live.lock().clear();
    }

    /// Number of currently associated request scopes.
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }
}
