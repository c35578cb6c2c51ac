use thiserror::Error;

/// Errors surfaced by the session lifecycle.
///
/// These are caller-side protocol violations and configuration faults only;
/// storage faults and corrupt payloads are downgraded to an empty session
/// and never appear here.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Cannot register bag '{0}' after the session has started")]
    RegisterAfterStart(String),

    #[error("Unknown session bag: {0}")]
    UnknownBag(String),

    #[error("Bag name '{0}' is reserved")]
    ReservedBagName(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;
