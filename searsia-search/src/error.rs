//! Error types for the searsia-search crate.
//!
//! Session-level errors ([`SearchError`]) are reported once through the
//! event stream. Per-resource errors ([`FetchError`]) never leave the
//! aggregator; they only degrade a resource to cached data. Storage errors
//! ([`StoreError`]) never leave the resource cache.

/// Errors that end a search session before any sub-request is made.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The query was empty after trimming.
    #[error("empty query")]
    EmptyQuery,

    /// The query exceeded the configured maximum length.
    #[error("query too long: {len} characters (max {max})")]
    QueryTooLong {
        /// Length of the rejected query in characters.
        len: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Invalid configuration, e.g. no API endpoint.
    #[error("config error: {0}")]
    Config(String),

    /// The mother endpoint could not be queried.
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),
}

/// Failure of a single fetch through the [`Fetcher`](crate::fetch::Fetcher) capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The server answered with a non-success HTTP status.
    #[error("HTTP status {code}: {message}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Reason phrase or body excerpt.
        message: String,
    },

    /// The connection could not be established or was interrupted.
    #[error("connection error: {0}")]
    Connection(String),

    /// No response arrived within the per-request timeout.
    #[error("request timed out after {0}ms")]
    Timeout(u64),

    /// The body was empty or not the expected JSON.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Whether the failure says the resource is permanently gone (HTTP 410).
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::Status { code: 410, .. })
    }
}

/// Failure of the persistent key-value store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Storage is denied or disabled.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Storage quota exceeded.
    #[error("store full")]
    Full,

    /// A stored value could not be (de)serialised.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Backing file could not be read or written.
    #[error("store I/O error: {0}")]
    Io(String),
}

/// Convenience type alias for searsia-search results.
pub type Result<T> = std::result::Result<T, SearchError>;
