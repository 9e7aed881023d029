//! Common error types for the dispatch workers.
//!
//! The workers talk to an SMTP relay or the SES HTTP API, a SQLite database
//! and ZeroMQ sockets. Failures from all of them are folded into a single
//! [`Error`] enum so callers can use `Result<T, Error>` and `?` throughout.

use thiserror::Error;

/// Errors that can occur while running the workers.
#[derive(Debug, Error)]
pub enum Error {
    /// Errors originating from SMTP operations.
    #[error("smtp error: {0}")]
    Smtp(#[from] mail_send::Error),

    /// Transport failures while calling an HTTP gateway.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Errors originating from ZeroMQ operations.
    #[error("zmq error: {0}")]
    Zmq(#[from] zmq::Error),

    /// Persistence layer failures.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Errors while constructing the database pool.
    #[error("database pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    /// Settings could not be loaded or deserialised.
    #[error("settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// Malformed JSON in a queue message or notification.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Problems with environment or configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A worker task panicked or was aborted.
    #[error("worker error: {0}")]
    Worker(#[from] tokio::task::JoinError),

    /// The campaign cannot be sent in its current state.
    #[error("campaign error: {0}")]
    Campaign(String),
}

/// Errors returned by repository implementations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("entity not found")]
    NotFound,

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
