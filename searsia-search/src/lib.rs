//! # searsia-search
//!
//! Federated search aggregation for Searsia clients.
//!
//! A Searsia federation is a "mother" search endpoint that answers a query
//! with its own hits plus references to other resources. This crate
//! queries the mother, fans out to the referenced resources, scores and
//! merges whatever answers arrive, and falls back to cached resource data
//! when a resource is slow, failing or gone.
//!
//! ## Design
//!
//! - One session per query, exposed as a stream of [`SearchEvent`]s
//! - Sub-requests run concurrently; ranks follow mother-response order
//! - Term-overlap relevance scoring and query-anchored description snippets
//! - Resource metadata persisted through a pluggable [`KeyValueStore`]
//! - Fetching through a pluggable [`Fetcher`]; [`HttpFetcher`] uses `reqwest`
//! - Graceful degradation: a failing resource never ends the session
//!
//! ## Security
//!
//! - Hit text is HTML-escaped exactly once, by the normaliser
//! - Search queries are logged only at trace level

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod error;
pub mod escape;
pub mod fetch;
pub mod http;
pub mod normalize;
pub mod query;
pub mod scoring;
pub mod snippet;
pub mod store;
pub mod template;
pub mod topk;
pub mod types;

pub use aggregator::Aggregator;
pub use cache::ResourceCache;
pub use config::AggregatorConfig;
pub use error::{FetchError, Result, SearchError, StoreError};
pub use fetch::Fetcher;
pub use http::HttpFetcher;
pub use query::Query;
pub use store::{KeyValueStore, MemoryStore};
pub use topk::TopHits;
pub use types::{DisplayType, Hit, Resource, ResourceBatch, SearchEvent, SearchResponse};

/// Run one federated search over HTTP with an in-memory resource cache.
///
/// Convenience wrapper for one-off searches; long-lived clients should
/// keep an [`Aggregator`] so cached resources survive between queries.
///
/// # Errors
///
/// Returns [`SearchError::Config`] if `config` is invalid, or
/// [`SearchError::Fetch`] if the HTTP client cannot be built. Query and
/// transport failures are reported as events.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> searsia_search::Result<()> {
/// let config = searsia_search::AggregatorConfig::default();
/// for event in searsia_search::search("rust programming", &config).await? {
///     println!("{}", serde_json::to_string(&event).unwrap_or_default());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search(query: &str, config: &AggregatorConfig) -> Result<Vec<SearchEvent>> {
    config.validate()?;
    let fetcher = HttpFetcher::new()?;
    let aggregator = Aggregator::new(
        fetcher,
        ResourceCache::new(MemoryStore::new()),
        config.clone(),
    );
    Ok(aggregator.search_collect(query).await)
}
