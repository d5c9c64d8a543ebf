use fplsnap_source::SourceError;
use thiserror::Error;

/// Error type for a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Fetching an essential table failed.
    #[error("fetching '{table}': {source}")]
    Fetch {
        table: String,
        #[source]
        source: SourceError,
    },

    #[error(transparent)]
    Core(#[from] fplsnap_core::Error),
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        PipelineError::Core(e.into())
    }
}
