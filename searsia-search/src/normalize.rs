//! Fill in missing hit data, escape it, score it and classify the batch.
//!
//! Normalisation runs in two steps: every hit is annotated, then the batch
//! is stably sorted by descending score so ties keep response order.

use std::cmp::Ordering;

use crate::escape::{escape_attribute, escape_element};
use crate::query::Query;
use crate::scoring::score_hit;
use crate::template::{correct_url, fill_url_template, host_of, TemplateParams};
use crate::types::{
    DisplayType, Hit, Resource, ResourceBatch, TAG_ADVERTISEMENT, TAG_IMAGE, TAG_SMALL,
};

/// Title given to hits that arrive without one.
pub const PLACEHOLDER_TITLE: &str = "title";

/// Template used to synthesise a URL when the resource has none.
const FALLBACK_URL_TEMPLATE: &str = "?q={q}";

/// Normalise `batch` in place for `query`.
///
/// The resource gets a default favicon (`/favicon.ico` next to its URL
/// template) and, unless it is the mother, a display type inferred from
/// its hits. An empty batch keeps its display type.
pub fn infer_missing_data(batch: &mut ResourceBatch, query: &Query) {
    let terms = query.terms_by_length();
    let ResourceBatch { resource, hits } = batch;

    if resource.favicon.is_none() {
        resource.favicon = resource
            .url_template
            .as_deref()
            .and_then(|template| correct_url(Some(template), "/favicon.ico"));
    }

    let mut any_foreign = false;
    for (position, hit) in hits.iter_mut().enumerate() {
        any_foreign |= annotate_hit(hit, resource, &terms, position);
    }
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    if resource.display_type != Some(DisplayType::Mother) {
        if let Some(display_type) = classify(hits, any_foreign) {
            resource.display_type = Some(display_type);
        }
    }
}

/// Annotate a single hit owned by `resource`; `position` is its 0-based
/// index in the batch and `terms` the query terms, longest first.
///
/// Returns whether the hit links away from the resource's own host.
/// A hit that was escaped before is only re-scored.
pub fn annotate_hit(hit: &mut Hit, resource: &Resource, terms: &[String], position: usize) -> bool {
    let template = resource.url_template.as_deref();
    let resource_host = template.and_then(host_of);

    if hit.escaped {
        hit.score = score_hit(hit, terms, position, resource.prior);
        return hit
            .url
            .as_deref()
            .is_some_and(|url| is_foreign(url, resource_host.as_deref()));
    }

    if hit.title.trim().is_empty() {
        tracing::warn!(resource = %resource.id, "hit without title");
        hit.title = PLACEHOLDER_TITLE.to_owned();
    }

    let mut foreign = false;
    match hit.url.take() {
        Some(url) => {
            let url = correct_url(template, &url).unwrap_or(url);
            foreign = is_foreign(&url, resource_host.as_deref());
            hit.url = Some(url);
        }
        None => {
            let template = template.unwrap_or(FALLBACK_URL_TEMPLATE);
            hit.url = Some(fill_url_template(template, &TemplateParams::query(&hit.title)));
        }
    }

    hit.score = score_hit(hit, terms, position, resource.prior);

    hit.title = escape_element(&hit.title);
    hit.description = hit.description.as_deref().map(escape_element);
    hit.url = hit.url.as_deref().map(escape_element);
    hit.image = hit.image.take().map(|image| {
        let image = correct_url(template, &image).unwrap_or(image);
        escape_attribute(&image)
    });
    if hit.favicon.is_none() {
        hit.favicon.clone_from(&resource.favicon);
    }
    hit.favicon = hit.favicon.as_deref().map(escape_attribute);
    hit.escaped = true;

    foreign
}

/// Display type of a hit set, or `None` when there are no hits.
///
/// Precedence: any advertisement, then all images, then all small or
/// title-only, then any foreign link, then web.
pub fn classify(hits: &[Hit], any_foreign: bool) -> Option<DisplayType> {
    if hits.is_empty() {
        return None;
    }
    let display_type = if hits.iter().any(|h| h.has_tag(TAG_ADVERTISEMENT)) {
        DisplayType::Advertisement
    } else if hits.iter().all(|h| h.has_tag(TAG_IMAGE)) {
        DisplayType::Images
    } else if hits.iter().all(|h| h.has_tag(TAG_SMALL) || h.is_title_only()) {
        DisplayType::Small
    } else if any_foreign {
        DisplayType::Full
    } else {
        DisplayType::Web
    };
    Some(display_type)
}

fn is_foreign(url: &str, resource_host: Option<&str>) -> bool {
    match resource_host {
        Some(own) => host_of(url).as_deref() != Some(own),
        None => true,
    }
}
