//! Error types for shelf-core

use thiserror::Error;

/// Result type alias using shelf-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in shelf-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Asset not found
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local tier storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Remote byte fetch failed (network or non-2xx)
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Remote mutation replay failed
    #[error("Remote sync error: {0}")]
    RemoteSync(String),
}
