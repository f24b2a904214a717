//! Error taxonomy shared by connectors, stores and the scan pipeline.

use thiserror::Error;

/// Failure of a single source connector.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Transport unreachable, non-2xx on every sub-query, or missing credential.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("parse failure: {0}")]
    Parse(String),

    #[error("source timed out after {0}s")]
    Timeout(u64),
}

/// The request URL is dropped: some sources carry the API key in the query.
impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Unavailable(err.without_url().to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(err.to_string())
    }
}

/// Failure of a persistence or cache backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failure of a whole scan pass. Partial source failures never end up here.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("persisting scan failed: {0}")]
    Persistence(#[source] StoreError),
}
