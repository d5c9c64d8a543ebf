use std::path::PathBuf;

use thiserror::Error;

/// Error type for source operations.
#[derive(Debug, Error)]
pub enum SourceError {
    /// No credential supplied by flag, environment or config.
    #[error("missing {what} (use {flag} or set {env_var})")]
    NotAuthenticated {
        what: String,
        flag: String,
        env_var: String,
    },

    /// Upstream rejected the credentials (401/403).
    #[error("{source_name} auth failed ({status}): {message}")]
    Auth {
        source_name: String,
        status: u16,
        message: String,
    },

    /// Upstream rejected the request (400).
    #[error("{source_name} request rejected ({status}): {message}")]
    Validation {
        source_name: String,
        status: u16,
        message: String,
    },

    /// Still rate limited (429) after all retries.
    #[error("{source_name} rate limited after {attempts} attempts")]
    RateLimited { source_name: String, attempts: u32 },

    /// 5xx, network failure, or a malformed response.
    #[error("{source_name} upstream error: {message}")]
    Upstream { source_name: String, message: String },

    /// Local dump could not be read.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Local dump could not be parsed.
    #[error("cannot parse {context}: {message}")]
    Parse { context: String, message: String },
}

impl SourceError {
    pub(crate) fn upstream(source_name: &str, message: impl Into<String>) -> Self {
        SourceError::Upstream {
            source_name: source_name.to_string(),
            message: message.into(),
        }
    }
}
