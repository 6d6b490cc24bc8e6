//! Error types for the searsia client.

use searsia_search::SearchError;

/// Top-level error type for the command-line client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Configuration file could not be parsed or is invalid.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Search session could not run.
    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ClientError>;
