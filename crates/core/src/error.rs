//! Error types for the snapshot pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (bad season, duplicate slug, bad time, ...).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// Data error (unexpected shape or value).
    #[error("data error: {0}")]
    Data(String),

    /// An essential table came back empty.
    #[error("essential table '{0}' is empty or could not be fetched")]
    EmptyTable(String),

    /// Referential integrity violated under the `fail` policy.
    #[error("integrity check failed: {0}")]
    Integrity(String),

    /// I/O error on a known path.
    #[error("{}: {source}", path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::ConfigValidation(msg.into())
    }

    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Error::Integrity(msg.into())
    }

    /// Wrap an I/O error with the path it happened on.
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::IoAt { path: path.into(), source }
    }
}
