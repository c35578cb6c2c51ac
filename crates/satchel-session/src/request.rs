//! The inbound request boundary.
//!
//! The session layer never parses HTTP. It consumes an opaque request
//! abstraction that can surface one named cookie value and a stable
//! request-scope token. The token keys the factory's per-request arena; the
//! surrounding glue releases it when the request scope ends.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable identity of one request scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(pub u64);

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

impl RequestToken {
    /// Mint a process-unique token for a new request scope.
    pub fn next() -> Self {
        Self(NEXT_TOKEN.fetch_add(1, Ordering::Relaxed))
    }
}

/// What the session layer needs from an inbound request.
pub trait SessionRequest {
    /// The value of the named cookie, if the request carries it.
    fn cookie(&self, name: &str) -> Option<String>;

    /// Stable token identifying this request's scope.
    fn token(&self) -> RequestToken;
}

/// In-memory request double for tests and non-HTTP callers.
#[derive(Debug)]
pub struct MockRequest {
    token: RequestToken,
    cookies: HashMap<String, String>,
}

impl MockRequest {
    /// A request with no cookies.
    pub fn new() -> Self {
        Self {
            token: RequestToken::next(),
            cookies: HashMap::new(),
        }
    }

    /// A request carrying one cookie.
    pub fn with_cookie(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut req = Self::new();
        req.cookies.insert(name.into(), value.into());
        req
    }

    pub fn set_cookie(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }
}

impl Default for MockRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRequest for MockRequest {
    fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }

    fn token(&self) -> RequestToken {
        self.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        let a = MockRequest::new();
        let b = MockRequest::new();
        assert_ne!(a.token(), b.token());

        // A request's token is stable across calls.
        assert_eq!(a.token(), a.token());
    }

    #[test]
    fn test_cookie_lookup() {
        let req = MockRequest::with_cookie("satchel_session", "abc123");
        assert_eq!(req.cookie("satchel_session").as_deref(), Some("abc123"));
        assert_eq!(req.cookie("other"), None);
    }
}
