use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Session id too long: {0} bytes (max {1})")]
    IdTooLong(usize, usize),
}

pub type Result<T> = std::result::Result<T, StoreError>;
