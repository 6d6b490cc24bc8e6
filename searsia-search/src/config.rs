//! Aggregator configuration with sensible defaults.
//!
//! [`AggregatorConfig`] controls the federation endpoint, timeouts, result
//! caps and the freshness policy used when a resource's fresh answer
//! competes with previously cached hits.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::SearchError;

/// Default Searsia endpoint template.
pub const DEFAULT_API_TEMPLATE: &str = "https://search.utwente.nl/searsia/search?q={q?}&r={r?}";

/// Two weeks in milliseconds: cached hits older than this are not reused.
pub const TWO_WEEKS_MS: i64 = 1_209_600_000;

/// Configuration for a federated search session.
///
/// Use [`Default::default()`] for the values the Searsia client has always
/// used, or override individual fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// URL template of the mother endpoint. `{q}` is the query, `{r}` the
    /// resource id.
    pub api_template: String,
    /// Timeout for the mother query in milliseconds.
    pub mother_timeout_ms: u64,
    /// Timeout for each resource sub-query in milliseconds.
    pub resource_timeout_ms: u64,
    /// Maximum query length in characters.
    pub max_query_len: usize,
    /// Capacity of re-ranked and overflow hit collections.
    pub max_hits: usize,
    /// Maximum number of hits taken from a single resource.
    pub max_hits_per_resource: usize,
    /// Hits shown per resource; the rest go to the overflow store.
    pub display_hits_per_resource: usize,
    /// Hits shown per resource classified as `images`.
    pub display_image_hits_per_resource: usize,
    /// Cached hits win over fresh ones when their top score is higher by
    /// more than this margin.
    pub freshness_threshold: f64,
    /// Cached hits whose `foundBefore` is older than this are dropped.
    pub stale_after_ms: i64,
    /// Optional result type filter passed as `{resultType}`.
    pub result_type: Option<String>,
    /// Result page passed as `{startPage}`.
    pub start_page: u32,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            api_template: DEFAULT_API_TEMPLATE.to_owned(),
            mother_timeout_ms: 10_000,
            resource_timeout_ms: 12_000,
            max_query_len: 150,
            max_hits: 100,
            max_hits_per_resource: 15,
            display_hits_per_resource: 4,
            display_image_hits_per_resource: 7,
            freshness_threshold: 0.5,
            stale_after_ms: TWO_WEEKS_MS,
            result_type: None,
            start_page: 1,
        }
    }
}

impl AggregatorConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `api_template` must not be empty (no endpoint configured)
    /// - both timeouts must be greater than 0
    /// - `max_hits` and `max_hits_per_resource` must be greater than 0
    /// - display counts must not exceed `max_hits_per_resource`
    /// - `freshness_threshold` must be a non-negative number
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.api_template.trim().is_empty() {
            return Err(SearchError::Config("no API endpoint configured".into()));
        }
        if self.mother_timeout_ms == 0 || self.resource_timeout_ms == 0 {
            return Err(SearchError::Config(
                "timeouts must be greater than 0".into(),
            ));
        }
        if self.max_hits == 0 || self.max_hits_per_resource == 0 {
            return Err(SearchError::Config(
                "max_hits and max_hits_per_resource must be greater than 0".into(),
            ));
        }
        if self.display_hits_per_resource > self.max_hits_per_resource
            || self.display_image_hits_per_resource > self.max_hits_per_resource
        {
            return Err(SearchError::Config(
                "display counts must not exceed max_hits_per_resource".into(),
            ));
        }
        if self.freshness_threshold.is_nan() || self.freshness_threshold < 0.0 {
            return Err(SearchError::Config(
                "freshness_threshold must be >= 0".into(),
            ));
        }
        Ok(())
    }

    /// Mother query timeout.
    pub fn mother_timeout(&self) -> Duration {
        Duration::from_millis(self.mother_timeout_ms)
    }

    /// Resource sub-query timeout.
    pub fn resource_timeout(&self) -> Duration {
        Duration::from_millis(self.resource_timeout_ms)
    }
}
