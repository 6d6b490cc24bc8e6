//! HTTP implementation of the fetch capability.
//!
//! Provides a configured [`reqwest::Client`] and [`HttpFetcher`], which
//! maps transport outcomes onto [`FetchError`] variants.

use std::time::Duration;

use reqwest::header::ACCEPT;

use crate::error::FetchError;
use crate::fetch::{millis, Fetcher};

/// User-Agent sent with every request.
pub const USER_AGENT: &str = concat!("searsia-client/", env!("CARGO_PKG_VERSION"));

/// Build a [`reqwest::Client`] for federated search requests.
///
/// The client has:
/// - A fixed client User-Agent
/// - Up to 10 redirects
/// - Brotli and gzip decompression
///
/// Timeouts are set per request.
///
/// # Errors
///
/// Returns [`FetchError::Connection`] if the client cannot be constructed.
pub fn build_client() -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| FetchError::Connection(format!("failed to build HTTP client: {e}")))
}

/// [`Fetcher`] over HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Fetcher with a client from [`build_client`].
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Connection`] if the client cannot be constructed.
    pub fn new() -> Result<Self, FetchError> {
        Ok(Self::with_client(build_client()?))
    }

    /// Fetcher over an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<serde_json::Value, FetchError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(&e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                code: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown status").to_owned(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport_error(&e, timeout))?;
        parse_body(&body)
    }
}

fn transport_error(error: &reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(millis(timeout))
    } else {
        FetchError::Connection(error.to_string())
    }
}

/// Parse a response body. Empty bodies and JSON `null` are failures.
fn parse_body(body: &[u8]) -> Result<serde_json::Value, FetchError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(FetchError::Malformed("empty body".into()));
    }
    match serde_json::from_slice(body) {
        Ok(serde_json::Value::Null) => Err(FetchError::Malformed("null document".into())),
        Ok(value) => Ok(value),
        Err(e) => Err(FetchError::Malformed(e.to_string())),
    }
}
