use thiserror::Error;

/// Errors that can occur within the persistence subsystem.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The record fails month/day/year/timezone validation.
    #[error("Invalid record: {0}")]
    InvalidRecord(#[from] cakeday_core::CakedayError),

    /// No record exists for the given user.
    #[error("Record not found: {user_id}")]
    NotFound { user_id: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;
