//! End-to-end aggregation sessions against a scripted fetcher.
//!
//! The fetcher answers by resource id, optionally after a delay, and
//! records every URL it was asked for. No network calls are made.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{json, Value};

use searsia_search::{
    Aggregator, AggregatorConfig, FetchError, Fetcher, MemoryStore, Resource, ResourceCache,
    SearchEvent,
};

struct Script {
    delay: Duration,
    outcome: Result<Value, FetchError>,
}

struct ScriptedFetcher {
    mother: Value,
    resources: HashMap<String, Script>,
    requested: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    fn new(mother: Value) -> Self {
        Self {
            mother,
            resources: HashMap::new(),
            requested: Mutex::new(Vec::new()),
        }
    }

    fn answer(mut self, rid: &str, delay_ms: u64, outcome: Result<Value, FetchError>) -> Self {
        self.resources.insert(
            rid.to_owned(),
            Script {
                delay: Duration::from_millis(delay_ms),
                outcome,
            },
        );
        self
    }

    fn requests_for(&self, rid: &str) -> usize {
        let needle = format!("r={rid}");
        self.requested
            .lock()
            .expect("lock")
            .iter()
            .filter(|url| url.ends_with(&needle))
            .count()
    }
}

impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<Value, FetchError> {
        self.requested.lock().expect("lock").push(url.to_owned());
        let rid = url.rsplit("r=").next().unwrap_or_default();
        if rid.is_empty() || !url.contains("r=") {
            return Ok(self.mother.clone());
        }
        match self.resources.get(rid) {
            Some(script) => {
                tokio::time::sleep(script.delay).await;
                script.outcome.clone()
            }
            None => Err(FetchError::Connection("unscripted resource".into())),
        }
    }
}

fn config() -> AggregatorConfig {
    AggregatorConfig {
        api_template: "https://mother.test/search?q={q?}&r={r?}".into(),
        resource_timeout_ms: 200,
        ..Default::default()
    }
}

fn fresh_cache() -> ResourceCache<MemoryStore> {
    ResourceCache::new(MemoryStore::new())
}

/// Three native hits followed by two hits of resource R1.
fn mother_with_r1() -> Value {
    json!({
        "resource": {"id": "mother", "name": "Mother"},
        "hits": [
            {"title": "first native", "url": "https://n.test/1"},
            {"title": "second native", "url": "https://n.test/2"},
            {"title": "third native", "url": "https://n.test/3"},
            {"title": "rust cached one", "url": "https://r1.test/a", "rid": "R1",
             "description": long_description()},
            {"title": "rust cached two", "url": "https://r1.test/b", "rid": "R1"}
        ]
    })
}

fn long_description() -> String {
    let mut text = "intro ".repeat(10);
    text.push_str("rust ");
    text.push_str(&"filler ".repeat(40));
    text.push_str("language ");
    text.push_str(&"tail ".repeat(40));
    text
}

fn ranks_of(events: &[SearchEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|event| match event {
            SearchEvent::Hits { rank, .. } => Some(*rank),
            _ => None,
        })
        .collect()
}

fn done_count(events: &[SearchEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, SearchEvent::Done { .. }))
        .count()
}

#[tokio::test]
async fn one_dispatch_per_resource_and_ranks_in_response_order() {
    let fetcher = ScriptedFetcher::new(mother_with_r1()).answer(
        "R1",
        30,
        Ok(json!({"hits": [{"title": "rust fresh", "url": "https://r1.test/fresh"}]})),
    );
    let agg = Aggregator::new(fetcher, fresh_cache(), config());
    let events = agg.search_collect("rust").await;

    assert!(matches!(events.first(), Some(SearchEvent::Start { .. })));
    assert_eq!(ranks_of(&events), vec![1, 2, 3, 4]);
    assert_eq!(agg.fetcher().requests_for("R1"), 1);

    // done only after R1 settled: R1's hits precede it
    assert_eq!(done_count(&events), 1);
    assert!(matches!(events.last(), Some(SearchEvent::Done { .. })));
    match &events[events.len() - 2] {
        SearchEvent::Hits {
            rank, live, hits, ..
        } => {
            assert_eq!(*rank, 4);
            assert!(*live);
            assert_eq!(hits[0].title, "rust fresh");
        }
        other => panic!("expected R1 hits before done, got {other:?}"),
    }
}

#[tokio::test]
async fn timeout_without_cache_emits_no_hits_but_completes() {
    let fetcher = ScriptedFetcher::new(mother_with_r1()).answer(
        "R1",
        10_000,
        Ok(json!({"hits": [{"title": "too late"}]})),
    );
    let agg = Aggregator::new(fetcher, fresh_cache(), config());
    let events = agg.search_collect("rust").await;

    assert_eq!(ranks_of(&events), vec![1, 2, 3]);
    assert_eq!(done_count(&events), 1);
    match events.last() {
        Some(SearchEvent::Done { total_hits, .. }) => assert_eq!(*total_hits, 3),
        other => panic!("expected done, got {other:?}"),
    }
}

#[tokio::test]
async fn failure_with_cache_emits_cached_snippets() {
    let cache = fresh_cache();
    cache.store_mother(&Resource::new("mother"));
    cache.put(&Resource {
        name: Some("Resource One".into()),
        url_template: Some("https://r1.test/?q={q}".into()),
        ..Resource::new("R1")
    });

    let fetcher = ScriptedFetcher::new(mother_with_r1()).answer(
        "R1",
        5,
        Err(FetchError::Status {
            code: 500,
            message: "Internal Server Error".into(),
        }),
    );
    let agg = Aggregator::new(fetcher, cache, config());
    let events = agg.search_collect("rust language").await;

    let r1 = events
        .iter()
        .find_map(|event| match event {
            SearchEvent::Hits {
                rank: 4,
                hits,
                live,
                resource,
                ..
            } => Some((hits, *live, resource)),
            _ => None,
        })
        .expect("cached hits for R1");
    let (hits, live, resource) = r1;
    assert!(!live);
    assert_eq!(resource.id, "R1");
    assert_eq!(hits.len(), 2);

    let described = hits
        .iter()
        .find(|hit| hit.title == "rust cached one")
        .expect("described hit");
    let snippet = described.description.as_deref().expect("description");
    assert!(snippet.len() < long_description().len());
    assert!(snippet.contains("rust"), "{snippet}");
    assert!(snippet.contains("language"), "{snippet}");
    assert!(snippet.contains("..."), "{snippet}");

    // a transient failure keeps the resource, annotated
    let stored = agg.cache().get("R1").expect("still cached");
    assert!(stored.error.is_some());
    assert_eq!(done_count(&events), 1);
}

#[tokio::test]
async fn repeated_query_terms_rank_matching_title_first() {
    let mother = json!({
        "resource": {"id": "mother"},
        "hits": [{"title": "group", "rid": "R1"}]
    });
    let fetcher = ScriptedFetcher::new(mother).answer(
        "R1",
        0,
        Ok(json!({
            "resource": {"id": "R1", "urltemplate": "https://r1.test/?q={q}"},
            "hits": [
                {"title": "xyz", "description": "nothing here"},
                {"title": "abc", "description": "first abc"},
                {"title": "abc", "description": "second abc"},
                {"title": "qrs", "description": "nothing either"}
            ]
        })),
    );
    let agg = Aggregator::new(fetcher, fresh_cache(), config());
    let events = agg.search_collect("abc abc").await;

    let hits = events
        .iter()
        .find_map(|event| match event {
            SearchEvent::Hits { hits, .. } => Some(hits),
            _ => None,
        })
        .expect("hits");
    let order: Vec<&str> = hits
        .iter()
        .map(|hit| hit.description.as_deref().unwrap_or_default())
        .collect();
    assert_eq!(order, vec!["first abc", "second abc", "nothing here", "nothing either"]);
    assert!(hits[0].score > hits[2].score);
}

#[tokio::test]
async fn slow_resource_keeps_its_rank() {
    let mother = json!({
        "resource": {"id": "mother"},
        "hits": [
            {"title": "a", "rid": "SLOW"},
            {"title": "b", "rid": "FAST"}
        ]
    });
    let fetcher = ScriptedFetcher::new(mother)
        .answer(
            "SLOW",
            80,
            Ok(json!({"hits": [{"title": "slow", "url": "https://s.test/"}]})),
        )
        .answer(
            "FAST",
            0,
            Ok(json!({"hits": [{"title": "fast", "url": "https://f.test/"}]})),
        );
    let agg = Aggregator::new(fetcher, fresh_cache(), config());
    let events = agg.search_collect("x").await;

    // completion order, not rank order
    assert_eq!(ranks_of(&events), vec![2, 1]);
    assert_eq!(done_count(&events), 1);
}

#[tokio::test]
async fn every_session_ends_with_exactly_one_terminal_event() {
    let fetcher = ScriptedFetcher::new(mother_with_r1())
        .answer("R1", 0, Err(FetchError::Malformed("empty body".into())));
    let agg = Aggregator::new(fetcher, fresh_cache(), config());
    let too_long = "q".repeat(200);
    for query in ["rust", "", "other query", too_long.as_str()] {
        let events = agg.search_collect(query).await;
        let terminal = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminal, 1, "query {query:?}");
        assert!(events.last().is_some_and(SearchEvent::is_terminal));
    }
}
