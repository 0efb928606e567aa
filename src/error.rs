// src/error.rs

use std::fmt;

/// Core error taxonomy.
///
/// The transport layer that embeds this crate maps each variant to its own
/// response format; this core never swallows or retries any of them.
#[derive(Debug)]
pub enum CoreError {
    /// Session, question, or result missing for the given key.
    NotFound(String),

    /// Operation disallowed in the session's current state. No state
    /// mutation has occurred when this is raised.
    Conflict(String),

    /// Numeric input outside its domain, rejected before any store access.
    Validation(String),

    /// A round with zero recorded answers cannot be scored.
    EmptyRound(String),

    /// Storage-level failure.
    Database(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::NotFound(msg) => write!(f, "not found: {}", msg),
            CoreError::Conflict(msg) => write!(f, "conflict: {}", msg),
            CoreError::Validation(msg) => write!(f, "validation: {}", msg),
            CoreError::EmptyRound(msg) => write!(f, "empty round: {}", msg),
            CoreError::Database(msg) => write!(f, "database: {}", msg),
        }
    }
}

impl std::error::Error for CoreError {}

/// Converts `sqlx::Error` into `CoreError::Database`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        CoreError::Database(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for CoreError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        CoreError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Validation(err.to_string())
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        CoreError::Validation(err.to_string())
    }
}
