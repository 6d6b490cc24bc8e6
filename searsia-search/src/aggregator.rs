//! Federated search sessions.
//!
//! A session queries the mother, emits its native hits, dispatches one
//! sub-request per distinct resource and settles each sub-request as it
//! completes, choosing between the fresh answer and cached data.
//!
//! # Pipeline
//!
//! 1. Validate configuration and query; a failure is a single `error` event
//! 2. Emit `start` with the cached mother
//! 3. Query the mother; record it as the federation
//! 4. Emit native hits (re-ranked when the mother asks), one rank each
//! 5. Dispatch resource groups concurrently, one rank per distinct id
//! 6. Settle completions in arrival order: fresh vs. cached, gone-eviction
//! 7. Emit `done` exactly once, after the last sub-request settled
//!
//! All sub-requests of a session run in the session's own task; processing
//! of one completion never interleaves with another.

use std::collections::HashSet;

use async_stream::stream;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures::stream::{FuturesUnordered, Stream, StreamExt};

use crate::cache::ResourceCache;
use crate::config::AggregatorConfig;
use crate::error::{FetchError, Result, SearchError};
use crate::escape::escape_element;
use crate::fetch::{millis, Fetcher};
use crate::normalize::{annotate_hit, infer_missing_data};
use crate::query::Query;
use crate::snippet::matching_snippets;
use crate::store::KeyValueStore;
use crate::template::{fill_url_template, TemplateParams};
use crate::topk::TopHits;
use crate::types::{DisplayType, Hit, Resource, ResourceBatch, SearchEvent, SearchResponse};

/// Resources whose metadata is fetched ahead of the first search.
pub const PREFETCH_LIMIT: usize = 15;

/// Per-query bookkeeping. Never shared between sessions.
#[derive(Debug)]
struct Session {
    query: String,
    pending: usize,
    next_rank: usize,
    seen: HashSet<String>,
    total_hits: usize,
    more: TopHits,
    done: bool,
}

impl Session {
    fn new(query: &str, more_capacity: usize) -> Self {
        Self {
            query: query.to_owned(),
            pending: 0,
            next_rank: 1,
            seen: HashSet::new(),
            total_hits: 0,
            more: TopHits::with_capacity(more_capacity),
            done: false,
        }
    }

    fn take_rank(&mut self) -> usize {
        let rank = self.next_rank;
        self.next_rank += 1;
        rank
    }

    /// The `done` event, once, when nothing is pending.
    fn try_finish(&mut self) -> Option<SearchEvent> {
        if self.pending > 0 || self.done {
            return None;
        }
        self.done = true;
        let more = std::mem::take(&mut self.more);
        Some(SearchEvent::Done {
            query: self.query.clone(),
            total_hits: self.total_hits,
            more: more.into_vec(),
        })
    }
}

/// One sub-request: a resource group of the mother response.
#[derive(Debug)]
struct Dispatch {
    resource_id: String,
    rank: usize,
    url: String,
    fallback: ResourceBatch,
}

/// Federated search over a [`Fetcher`] and a [`ResourceCache`].
#[derive(Debug)]
pub struct Aggregator<F, S> {
    fetcher: F,
    cache: ResourceCache<S>,
    config: AggregatorConfig,
}

impl<F: Fetcher, S: KeyValueStore> Aggregator<F, S> {
    /// Create an aggregator.
    pub fn new(fetcher: F, cache: ResourceCache<S>, config: AggregatorConfig) -> Self {
        Self {
            fetcher,
            cache,
            config,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// The fetcher used for every request.
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// The resource cache shared by all sessions.
    pub fn cache(&self) -> &ResourceCache<S> {
        &self.cache
    }

    /// Run a search session for `query`, yielding its events.
    ///
    /// The stream yields `start`, then `hits` events, then exactly one
    /// `done`; or a single `error` when the session cannot start. Ranks
    /// are assigned in mother-response order, so `hits` events may
    /// arrive out of rank order.
    pub fn search<'a>(&'a self, query: &str) -> impl Stream<Item = SearchEvent> + 'a {
        let typed = query.to_owned();
        stream! {
            let query = match self.prepare(&typed) {
                Ok(query) => query,
                Err(e) => {
                    tracing::debug!(error = %e, "search rejected");
                    yield SearchEvent::Error { query: typed, error: e.to_string() };
                    return;
                }
            };
            tracing::trace!(query = %typed, "search started");
            yield SearchEvent::Start { query: typed.clone(), resource: self.cache.mother() };

            let url = self.api_url(query.raw(), None);
            let response = match self.fetch_response(&url, self.config.mother_timeout()).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(error = %e, "mother query failed");
                    let error = SearchError::from(e);
                    yield SearchEvent::Error { query: typed, error: error.to_string() };
                    return;
                }
            };

            let mut session = Session::new(&typed, self.config.max_hits);
            let (native, dispatches) = self.plan(&query, response, &mut session);
            for event in native {
                yield event;
            }

            let mut in_flight = FuturesUnordered::new();
            for dispatch in dispatches {
                tracing::debug!(resource = %dispatch.resource_id, rank = dispatch.rank, "dispatching");
                session.pending += 1;
                in_flight.push(self.run(dispatch));
            }
            if let Some(done) = session.try_finish() {
                yield done;
            }

            while let Some((dispatch, outcome)) = in_flight.next().await {
                if let Some(event) = self.settle(&query, &mut session, dispatch, outcome) {
                    yield event;
                }
                if let Some(done) = session.try_finish() {
                    yield done;
                }
            }
        }
    }

    /// Run a session to completion and return all of its events.
    pub async fn search_collect(&self, query: &str) -> Vec<SearchEvent> {
        self.search(query).collect().await
    }

    /// Fetch the mother's description (empty query), record it as the
    /// federation and prefetch the metadata of the resources it lists.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] for an invalid configuration and
    /// [`SearchError::Fetch`] when the mother cannot be queried.
    pub async fn connect(&self) -> Result<Option<Resource>> {
        self.config.validate()?;
        let url = self.api_url("", None);
        let response = self
            .fetch_response(&url, self.config.mother_timeout())
            .await?;
        match response.resource.as_ref() {
            Some(mother) => self.cache.store_mother(mother),
            None => tracing::warn!("mother response carries no resource"),
        }
        let stored = self.prefetch_resources(&response, PREFETCH_LIMIT).await;
        tracing::info!(stored, "connected to federation");
        Ok(self.cache.mother())
    }

    /// Fetch and cache metadata for up to `limit` distinct resources
    /// referenced by `response` that are not cached yet. Returns how many
    /// were stored; failures are logged and skipped.
    pub async fn prefetch_resources(&self, response: &SearchResponse, limit: usize) -> usize {
        let mut seen = HashSet::new();
        let ids: Vec<&str> = response
            .hits
            .iter()
            .filter_map(|hit| hit.resource_id.as_deref())
            .filter(|rid| seen.insert(*rid) && !self.cache.exists(rid))
            .take(limit)
            .collect();

        let fetches = ids.iter().copied().map(|rid| async move {
            let url = self.api_url("", Some(rid));
            let outcome = self
                .fetch_response(&url, self.config.mother_timeout())
                .await;
            (rid, outcome)
        });
        let outcomes = futures::future::join_all(fetches).await;

        let mut stored = 0;
        for (rid, outcome) in outcomes {
            match outcome {
                Ok(SearchResponse {
                    resource: Some(resource),
                    ..
                }) if !resource.id.is_empty() => {
                    self.cache.put(&resource);
                    stored += 1;
                }
                Ok(_) => tracing::debug!(resource = rid, "no resource metadata returned"),
                Err(e) => tracing::debug!(resource = rid, error = %e, "resource prefetch failed"),
            }
        }
        stored
    }

    fn prepare(&self, typed: &str) -> Result<Query> {
        self.config.validate()?;
        let trimmed = typed.trim();
        if trimmed.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let len = trimmed.chars().count();
        if len > self.config.max_query_len {
            return Err(SearchError::QueryTooLong {
                len,
                max: self.config.max_query_len,
            });
        }
        Ok(Query::new(trimmed).with_result_type(self.config.result_type.clone()))
    }

    fn api_url(&self, query: &str, resource_id: Option<&str>) -> String {
        let params = TemplateParams {
            query: Some(query),
            resource_id,
            start_page: Some(self.config.start_page),
            result_type: self.config.result_type.as_deref(),
        };
        fill_url_template(&self.config.api_template, &params)
    }

    async fn fetch_response(
        &self,
        url: &str,
        timeout: std::time::Duration,
    ) -> std::result::Result<SearchResponse, FetchError> {
        // the fetcher is trusted with the timeout, but a session must end
        // even if it ignores it
        let value = match tokio::time::timeout(timeout, self.fetcher.fetch(url, timeout)).await {
            Ok(result) => result?,
            Err(_) => return Err(FetchError::Timeout(millis(timeout))),
        };
        if !value.is_object() {
            return Err(FetchError::Malformed("expected a JSON object".into()));
        }
        serde_json::from_value(value).map_err(|e| FetchError::Malformed(e.to_string()))
    }

    async fn run(
        &self,
        dispatch: Dispatch,
    ) -> (Dispatch, std::result::Result<SearchResponse, FetchError>) {
        let outcome = self
            .fetch_response(&dispatch.url, self.config.resource_timeout())
            .await;
        (dispatch, outcome)
    }

    /// Turn the mother response into native `hits` events and resource
    /// sub-requests, assigning ranks in response order.
    fn plan(
        &self,
        query: &Query,
        response: SearchResponse,
        session: &mut Session,
    ) -> (Vec<SearchEvent>, Vec<Dispatch>) {
        if let Some(resource) = response.resource.as_ref() {
            if !resource.id.is_empty() {
                self.cache.store_mother(resource);
            }
        }
        let mut mother = response
            .resource
            .or_else(|| self.cache.mother())
            .unwrap_or_default();
        mother.display_type = Some(DisplayType::Mother);

        let hits = response.hits;
        let natives = self.native_hits(query, &mother, &hits);
        let mut natives = natives.into_iter();

        let mut events = Vec::new();
        let mut dispatches = Vec::new();
        let mut i = 0;
        while i < hits.len() {
            let Some(rid) = hits[i].resource_id.as_deref() else {
                // a native slot; with re-ranking it takes the next best hit
                if let Some(hit) = natives.next() {
                    session.total_hits += 1;
                    events.push(SearchEvent::Hits {
                        query: session.query.clone(),
                        rank: session.take_rank(),
                        resource: mother.clone(),
                        hits: vec![hit],
                        live: true,
                    });
                }
                i += 1;
                continue;
            };

            let end = i + hits[i..]
                .iter()
                .take_while(|h| h.resource_id.as_deref() == Some(rid))
                .count();
            if session.seen.insert(rid.to_owned()) {
                dispatches.push(Dispatch {
                    resource_id: rid.to_owned(),
                    rank: session.take_rank(),
                    url: self.api_url(query.raw(), Some(rid)),
                    fallback: self.fallback_batch(rid, &hits[i..end]),
                });
            } else {
                tracing::debug!(resource = rid, "resource already dispatched");
            }
            i = end;
        }
        (events, dispatches)
    }

    /// Native hits, annotated, in the order they fill native slots.
    fn native_hits(&self, query: &Query, mother: &Resource, hits: &[Hit]) -> Vec<Hit> {
        let terms = query.terms_by_length();
        let annotated = hits
            .iter()
            .filter(|hit| hit.resource_id.is_none())
            .cloned()
            .map(|mut hit| {
                annotate_hit(&mut hit, mother, &terms, 0);
                hit
            });
        if !mother.wants_rerank() {
            return annotated.collect();
        }
        let mut top = TopHits::with_capacity(self.config.max_hits);
        top.extend(annotated.filter(|hit| hit.score > 0.0));
        top.into_vec()
    }

    /// Cached data for a resource group: the cached resource plus the
    /// group's usable, recent hits. Without a cached resource there are
    /// no fallback hits.
    fn fallback_batch(&self, rid: &str, group: &[Hit]) -> ResourceBatch {
        let Some(resource) = self.cache.get(rid) else {
            return ResourceBatch::new(Resource::new(rid), Vec::new());
        };
        let now = Utc::now();
        let hits = group
            .iter()
            .filter(|hit| {
                !hit.title.trim().is_empty()
                    && (hit.url.is_some() || resource.url_template.is_some())
            })
            .take(self.config.max_hits_per_resource)
            .filter(|hit| is_recent(hit.found_before.as_deref(), now, self.config.stale_after_ms))
            .cloned()
            .collect();
        ResourceBatch::new(resource, hits)
    }

    /// Process one completed sub-request. Returns the `hits` event to
    /// emit, if the chosen batch has any hits.
    fn settle(
        &self,
        query: &Query,
        session: &mut Session,
        dispatch: Dispatch,
        outcome: std::result::Result<SearchResponse, FetchError>,
    ) -> Option<SearchEvent> {
        session.pending = session.pending.saturating_sub(1);
        let Dispatch {
            resource_id,
            rank,
            fallback: mut cached,
            ..
        } = dispatch;
        let terms = query.terms_by_length();

        let (batch, live) = match outcome {
            Ok(response) => {
                let described = response.resource.is_some();
                let resource = response
                    .resource
                    .unwrap_or_else(|| cached.resource.clone());
                // scored and sorted in full; `deliver` applies the cap
                let mut fresh = ResourceBatch::new(resource, response.hits);
                infer_missing_data(&mut fresh, query);
                if described && !fresh.resource.id.is_empty() {
                    self.cache.put(&fresh.resource);
                }

                infer_missing_data(&mut cached, query);
                matching_snippets(&mut cached.hits, &terms);

                if self.prefers_cached(&fresh, &cached) {
                    tracing::debug!(resource = %resource_id, "cached hits preferred");
                    (cached, false)
                } else {
                    (fresh, true)
                }
            }
            Err(e) => {
                tracing::warn!(resource = %resource_id, error = %e, "resource query failed, using cached data");
                if e.is_gone() {
                    self.cache.delete(&resource_id);
                } else {
                    self.cache.record_error(&resource_id, &e.to_string());
                }
                infer_missing_data(&mut cached, query);
                matching_snippets(&mut cached.hits, &terms);
                (cached, false)
            }
        };

        self.deliver(session, rank, batch, live)
    }

    fn prefers_cached(&self, fresh: &ResourceBatch, cached: &ResourceBatch) -> bool {
        fresh.hits.is_empty()
            || cached.top_score() - fresh.top_score() > self.config.freshness_threshold
    }

    /// Split a chosen batch into its displayed hits and the overflow
    /// store.
    fn deliver(
        &self,
        session: &mut Session,
        rank: usize,
        batch: ResourceBatch,
        live: bool,
    ) -> Option<SearchEvent> {
        let ResourceBatch {
            resource,
            mut hits,
        } = batch;
        if hits.is_empty() {
            tracing::debug!(resource = %resource.id, rank, "no hits to show");
            return None;
        }
        hits.truncate(self.config.max_hits_per_resource);
        let shown = if resource.display_type == Some(DisplayType::Images) {
            self.config.display_image_hits_per_resource
        } else {
            self.config.display_hits_per_resource
        };
        let overflow = hits.split_off(shown.min(hits.len()));
        session.total_hits += hits.len() + overflow.len();

        let fallback_description = resource
            .summary
            .as_deref()
            .or(resource.name.as_deref())
            .map(escape_element);
        for mut hit in overflow {
            if hit.description.is_none() {
                hit.description.clone_from(&fallback_description);
            }
            session.more.insert(hit);
        }

        Some(SearchEvent::Hits {
            query: session.query.clone(),
            rank,
            resource,
            hits,
            live,
        })
    }
}

/// Whether a hit last seen at `found_before` is younger than `max_age_ms`.
/// Hits without a date are recent; unreadable dates are not.
fn is_recent(found_before: Option<&str>, now: DateTime<Utc>, max_age_ms: i64) -> bool {
    let Some(text) = found_before else {
        return true;
    };
    match parse_found_before(text) {
        Some(seen) => (now - seen).num_milliseconds() < max_age_ms,
        None => false,
    }
}

/// RFC 3339 timestamps, `YYYY-MM-DDTHH:MM:SS` or plain dates (as UTC).
fn parse_found_before(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(stamp) = DateTime::parse_from_rfc3339(text) {
        return Some(stamp.with_timezone(&Utc));
    }
    if let Ok(stamp) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(stamp.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|stamp| stamp.and_utc())
}
