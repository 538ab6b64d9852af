use thiserror::Error;

#[derive(Error, Debug)]
pub enum MovieError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A bounded optimistic retry loop gave up. Safe to retry from the caller.
    #[error("{operation} did not settle after {attempts} attempts")]
    RetriesExhausted {
        operation: &'static str,
        attempts: u16,
    },

    #[error("Invalid box office feed: {0}")]
    InvalidFeed(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MovieError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        MovieError::NotFound(what.to_string())
    }

    /// Whether the failure came from contention rather than from the request
    /// itself; callers may repeat the operation.
    pub fn is_transient(&self) -> bool {
        matches!(self, MovieError::RetriesExhausted { .. })
    }
}

pub type Result<T> = std::result::Result<T, MovieError>;
