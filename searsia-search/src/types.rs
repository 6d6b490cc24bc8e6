//! Core types: hits, resources, federated responses and session events.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Tag marking a hit as a query suggestion.
pub const TAG_SUGGESTION: &str = "suggestion";
/// Tag marking a hit rendered in the compact layout.
pub const TAG_SMALL: &str = "small";
/// Tag marking an image hit.
pub const TAG_IMAGE: &str = "image";
/// Tag marking a sponsored hit.
pub const TAG_ADVERTISEMENT: &str = "advertisement";

/// One retrievable item returned by the mother or one of its resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hit {
    /// Title; empty until the normalizer substitutes a placeholder.
    #[serde(default)]
    pub title: String,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Target URL, synthesised from the resource template when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Thumbnail URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Icon URL, inherited from the resource when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    /// Labels such as `small`, `image` or `suggestion`. Accepts either a
    /// JSON array or a space-separated string.
    #[serde(
        default,
        deserialize_with = "deserialize_tags",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tags: Vec<String>,
    /// Owning resource; absent for hits native to the mother.
    #[serde(
        default,
        rename = "rid",
        alias = "resourceId",
        skip_serializing_if = "Option::is_none"
    )]
    pub resource_id: Option<String>,
    /// Relevance score assigned by the scorer.
    #[serde(default)]
    pub score: f64,
    /// When the mother last saw this hit (RFC 3339 or `YYYY-MM-DD`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub found_before: Option<String>,
    /// Set once the normalizer has escaped this hit.
    #[serde(skip)]
    pub escaped: bool,
}

impl Hit {
    /// Create a hit with just a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Builder method to add a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder method to add a URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Builder method to attach the hit to a resource.
    pub fn with_resource(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Builder method to add a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Whether this hit carries `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// A hit with neither description nor image.
    pub fn is_title_only(&self) -> bool {
        self.description.is_none() && self.image.is_none()
    }
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tags {
        List(Vec<String>),
        Text(String),
    }

    Ok(match Option::<Tags>::deserialize(deserializer)? {
        Some(Tags::List(list)) => list,
        Some(Tags::Text(text)) => text.split_whitespace().map(str::to_owned).collect(),
        None => Vec::new(),
    })
}

/// Rendering classification of a resource's hit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayType {
    /// Ordinary web results.
    Web,
    /// Compact, title-only results.
    Small,
    /// Image thumbnails.
    Images,
    /// Results pointing away from the resource's own host.
    Full,
    /// Sponsored results.
    Advertisement,
    /// The federation's own endpoint.
    Mother,
}

impl DisplayType {
    /// Returns the wire name of this display type.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Small => "small",
            Self::Images => "images",
            Self::Full => "full",
            Self::Advertisement => "advertisement",
            Self::Mother => "mother",
        }
    }
}

impl fmt::Display for DisplayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Metadata about the mother or one of its federated resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique key within the federation.
    pub id: String,
    /// Human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Template of the resource's own search page.
    #[serde(
        default,
        rename = "urltemplate",
        alias = "urlTemplate",
        skip_serializing_if = "Option::is_none"
    )]
    pub url_template: Option<String>,
    /// Template of the federated API, when the resource describes itself.
    #[serde(
        default,
        rename = "apitemplate",
        alias = "apiTemplate",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_template: Option<String>,
    /// Template of the typeahead endpoint.
    #[serde(
        default,
        rename = "suggesttemplate",
        alias = "suggestTemplate",
        skip_serializing_if = "Option::is_none"
    )]
    pub suggest_template: Option<String>,
    /// Icon URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    /// Banner image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    /// Short description of the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Static ranking boost.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior: Option<f64>,
    /// Any non-null value asks the client to re-score native hits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerank: Option<serde_json::Value>,
    /// Inferred display type.
    #[serde(
        default,
        rename = "type",
        alias = "displayType",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_type: Option<DisplayType>,
    /// Last transport error seen for this resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Resource {
    /// Create a resource that only carries an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Whether the resource asks for client-side re-ranking.
    pub fn wants_rerank(&self) -> bool {
        match &self.rerank {
            None | Some(serde_json::Value::Null) | Some(serde_json::Value::Bool(false)) => false,
            Some(_) => true,
        }
    }

    /// Name to show for this resource, falling back to its id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Envelope of a federated query response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// The answering resource (the mother for top-level queries).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,
    /// Hits in response order.
    #[serde(default)]
    pub hits: Vec<Hit>,
}

/// A resource together with a batch of its hits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceBatch {
    /// The owning resource.
    pub resource: Resource,
    /// Hits of this batch.
    pub hits: Vec<Hit>,
}

impl ResourceBatch {
    /// Create a batch.
    pub fn new(resource: Resource, hits: Vec<Hit>) -> Self {
        Self { resource, hits }
    }

    /// Highest score in the batch, or 0 when empty.
    pub fn top_score(&self) -> f64 {
        self.hits.iter().map(|h| h.score).fold(0.0, f64::max)
    }
}

/// Status events emitted by an aggregation session, in emission order.
///
/// Serialises as `{"status": "start" | "hits" | "done" | "error", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SearchEvent {
    /// The session started; carries the best-known mother resource.
    Start {
        /// Query as typed by the user.
        query: String,
        /// Cached mother resource, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        resource: Option<Resource>,
    },
    /// Hits for one rank slot.
    Hits {
        /// Query as typed by the user.
        query: String,
        /// Position assigned at dispatch time, starting at 1.
        rank: usize,
        /// Resource owning the hits.
        resource: Resource,
        /// Hits in display order.
        hits: Vec<Hit>,
        /// `false` when the hits came from cached data.
        live: bool,
    },
    /// Every sub-request settled. Emitted exactly once per session.
    Done {
        /// Query as typed by the user.
        query: String,
        /// Number of hits found: displayed hits plus overflow hits,
        /// counted before the overflow store's cap applies.
        #[serde(rename = "totalHits")]
        total_hits: usize,
        /// Hits that did not fit a resource's display slot, best first.
        more: Vec<Hit>,
    },
    /// The session could not start.
    Error {
        /// Query as typed by the user.
        query: String,
        /// Human-readable description.
        error: String,
    },
}

impl SearchEvent {
    /// Whether this event ends the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hit_deserialises_wire_names() {
        let hit: Hit = serde_json::from_value(json!({
            "title": "Rust",
            "url": "https://rust-lang.org",
            "rid": "wikipedia",
            "foundBefore": "2016-05-01",
            "tags": "small image"
        }))
        .expect("deserialize");
        assert_eq!(hit.resource_id.as_deref(), Some("wikipedia"));
        assert_eq!(hit.found_before.as_deref(), Some("2016-05-01"));
        assert!(hit.has_tag("small"));
        assert!(hit.has_tag("image"));
        assert!(!hit.escaped);
    }

    #[test]
    fn hit_tags_accept_array_and_null() {
        let list: Hit = serde_json::from_value(json!({"title": "a", "tags": ["suggestion"]}))
            .expect("deserialize");
        assert!(list.has_tag(TAG_SUGGESTION));

        let null: Hit =
            serde_json::from_value(json!({"title": "a", "tags": null})).expect("deserialize");
        assert!(null.tags.is_empty());
    }

    #[test]
    fn hit_without_title_deserialises_empty() {
        let hit: Hit = serde_json::from_value(json!({"url": "x"})).expect("deserialize");
        assert!(hit.title.is_empty());
    }

    #[test]
    fn title_only_detection() {
        assert!(Hit::new("a").is_title_only());
        assert!(!Hit::new("a").with_description("b").is_title_only());
    }

    #[test]
    fn resource_wire_names() {
        let resource: Resource = serde_json::from_value(json!({
            "id": "wiki",
            "urltemplate": "https://en.wikipedia.org/?search={q}",
            "apitemplate": "https://x/searsia/wiki?q={q}",
            "type": "small",
            "prior": 0.5
        }))
        .expect("deserialize");
        assert_eq!(resource.display_type, Some(DisplayType::Small));
        assert!(resource.url_template.is_some());
        assert!(resource.api_template.is_some());

        let back = serde_json::to_value(&resource).expect("serialize");
        assert_eq!(back["type"], "small");
        assert_eq!(back["urltemplate"], "https://en.wikipedia.org/?search={q}");
    }

    #[test]
    fn rerank_flag_semantics() {
        let mut resource = Resource::new("mother");
        assert!(!resource.wants_rerank());
        resource.rerank = Some(json!("lm"));
        assert!(resource.wants_rerank());
        resource.rerank = Some(json!(false));
        assert!(!resource.wants_rerank());
    }

    #[test]
    fn response_without_hits_defaults_empty() {
        let response: SearchResponse =
            serde_json::from_value(json!({"resource": {"id": "m"}})).expect("deserialize");
        assert!(response.hits.is_empty());
        assert_eq!(response.resource.map(|r| r.id), Some("m".to_owned()));
    }

    #[test]
    fn event_serialises_with_status_tag() {
        let event = SearchEvent::Done {
            query: "rust".into(),
            total_hits: 3,
            more: vec![],
        };
        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["status"], "done");
        assert_eq!(value["totalHits"], 3);
        assert!(event.is_terminal());
    }

    #[test]
    fn batch_top_score() {
        let mut a = Hit::new("a");
        a.score = 1.5;
        let mut b = Hit::new("b");
        b.score = 2.5;
        let batch = ResourceBatch::new(Resource::new("r"), vec![a, b]);
        assert!((batch.top_score() - 2.5).abs() < f64::EPSILON);
        assert!(ResourceBatch::default().top_score().abs() < f64::EPSILON);
    }

    #[test]
    fn display_type_names() {
        assert_eq!(DisplayType::Advertisement.to_string(), "advertisement");
        assert_eq!(DisplayType::Mother.name(), "mother");
    }
}
