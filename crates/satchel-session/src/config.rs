//! Session-level configuration.

/// Default name of the session cookie.
pub const DEFAULT_COOKIE_NAME: &str = "satchel_session";

/// Default session lifetime in seconds (one day).
pub const DEFAULT_MAX_LIFETIME_SECS: i64 = 86_400;

/// Configuration for sessions and the factory.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session id.
    pub cookie_name: String,

    /// Nominal session lifetime in seconds, recorded in session metadata.
    pub max_lifetime_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            max_lifetime_secs: DEFAULT_MAX_LIFETIME_SECS,
        }
    }
}

impl SessionConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session cookie name.
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the nominal session lifetime in seconds.
    pub fn with_max_lifetime(mut self, secs: i64) -> Self {
        self.max_lifetime_secs = secs;
        self
    }
}
