//! Terminal rendering of search events.

use std::fmt::Write;

use searsia_search::{Hit, SearchEvent};

/// How many overflow titles the done line lists.
const MORE_PREVIEW: usize = 5;

/// Render an event as human-readable text, or `None` when the event has
/// nothing worth printing.
pub fn format_event(event: &SearchEvent) -> Option<String> {
    match event {
        SearchEvent::Start { resource, .. } => resource
            .as_ref()
            .map(|mother| format!("Searching {}...", plain(mother.display_name()))),
        SearchEvent::Hits {
            rank,
            resource,
            hits,
            live,
            ..
        } => {
            let mut out = format!("[{rank}] {}", plain(resource.display_name()));
            if !live {
                out.push_str(" (cached)");
            }
            for hit in hits {
                write_hit(&mut out, hit);
            }
            Some(out)
        }
        SearchEvent::Done {
            total_hits, more, ..
        } => {
            if *total_hits == 0 {
                return Some("No results.".to_owned());
            }
            let mut out = format!("{total_hits} results");
            if !more.is_empty() {
                let _ = write!(out, ", {} more:", more.len());
                for hit in more.iter().take(MORE_PREVIEW) {
                    let _ = write!(out, "\n  - {}", plain(&hit.title));
                }
            }
            Some(out)
        }
        SearchEvent::Error { error, .. } => Some(format!("error: {error}")),
    }
}

/// Render an event as one line of JSON.
pub fn format_event_json(event: &SearchEvent) -> serde_json::Result<String> {
    serde_json::to_string(event)
}

fn write_hit(out: &mut String, hit: &Hit) {
    let _ = write!(out, "\n  {}", plain(&hit.title));
    if let Some(url) = &hit.url {
        let _ = write!(out, "\n    {}", plain(url));
    }
    if let Some(description) = hit.description.as_deref().filter(|d| !d.is_empty()) {
        let _ = write!(out, "\n    {}", plain(description));
    }
}

fn plain(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}
