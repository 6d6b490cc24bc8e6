//! Trait definition for the fetch capability.
//!
//! The aggregator never talks HTTP itself; it asks a [`Fetcher`] for the
//! JSON document behind a URL. [`HttpFetcher`](crate::http::HttpFetcher)
//! is the production implementation; tests script their own.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchError;

/// Retrieves a JSON document.
///
/// All implementations must be `Send + Sync`; one fetcher serves every
/// concurrent sub-request of a session.
pub trait Fetcher: Send + Sync {
    /// GET `url` and parse the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Status`] for a non-success HTTP status,
    /// [`FetchError::Connection`] when no response arrives,
    /// [`FetchError::Timeout`] after `timeout`, and
    /// [`FetchError::Malformed`] for an empty or non-JSON body.
    fn fetch(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<serde_json::Value, FetchError>> + Send;
}

impl<T: Fetcher> Fetcher for Arc<T> {
    fn fetch(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<serde_json::Value, FetchError>> + Send {
        (**self).fetch(url, timeout)
    }
}

impl<T: Fetcher> Fetcher for &T {
    fn fetch(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<serde_json::Value, FetchError>> + Send {
        (**self).fetch(url, timeout)
    }
}

/// Milliseconds of `timeout`, saturating.
pub(crate) fn millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}
