//! Searsia: command-line client for Searsia federated search.
//!
//! The search itself lives in the `searsia-search` crate. This crate adds
//! what a long-lived client needs around it:
//!
//! # Architecture
//!
//! - **Config**: TOML file with aggregator and store settings ([`config`])
//! - **Store**: JSON file that keeps resource metadata between runs ([`store`])
//! - **Output**: plain-text and JSON-lines rendering of events ([`output`])

pub mod config;
pub mod error;
pub mod output;
pub mod paths;
pub mod store;

use std::sync::Arc;

use searsia_search::{Aggregator, HttpFetcher, KeyValueStore, MemoryStore, ResourceCache};

pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use store::FileStore;

/// Aggregator type used by the command-line client.
pub type ClientAggregator = Aggregator<HttpFetcher, Arc<dyn KeyValueStore>>;

/// Open the resource store described by `config`.
///
/// A persisted store is a [`FileStore`]; otherwise resources are kept in
/// memory for the lifetime of the process. An unusable store file never
/// prevents a search, it only loses the cached resources.
pub fn open_store(config: &ClientConfig) -> Arc<dyn KeyValueStore> {
    if config.store.persist {
        Arc::new(FileStore::open(config.store.resolved_path()))
    } else {
        Arc::new(MemoryStore::new())
    }
}

/// Build an HTTP aggregator over the configured store.
pub fn build_aggregator(config: &ClientConfig) -> Result<ClientAggregator> {
    config.validate()?;
    let store = open_store(config);
    let cache = ResourceCache::with_prefix(store, config.store.namespace_prefix.clone());
    let fetcher = HttpFetcher::new().map_err(searsia_search::SearchError::from)?;
    Ok(Aggregator::new(fetcher, cache, config.aggregator.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_when_not_persisting() {
        let mut config = ClientConfig::default();
        config.store.persist = false;
        let store = open_store(&config);
        store.set("k", "v").expect("set");
        assert_eq!(store.get("k").expect("get").as_deref(), Some("v"));
    }

    #[test]
    fn invalid_config_is_rejected_before_building() {
        let mut config = ClientConfig::default();
        config.store.persist = false;
        config.aggregator.mother_timeout_ms = 0;
        assert!(build_aggregator(&config).is_err());
    }

    #[test]
    fn builds_with_file_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = ClientConfig::default();
        config.store.path = Some(dir.path().join("resources.json"));
        let aggregator = build_aggregator(&config).expect("aggregator");
        assert!(aggregator.cache().federation_id().is_none());
    }
}
