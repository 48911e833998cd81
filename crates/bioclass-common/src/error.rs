use std::path::PathBuf;

use thiserror::Error;

/// Run-level failures. Bad individual assay rows are never reported here;
/// they are excluded by the pipeline and counted instead.
#[derive(Debug, Error)]
pub enum BioclassError {
    #[error("Upstream service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Target search for '{query}' returned no candidates")]
    EmptyResult { query: String },

    #[error("Target index {index} out of range ({len} candidates)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Network capabilities capped: domain not in allowlist for URL {0}")]
    DomainNotAllowed(String),

    #[error("Failed to persist table to {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for BioclassError {
    fn from(e: reqwest::Error) -> Self {
        BioclassError::UpstreamUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BioclassError>;
