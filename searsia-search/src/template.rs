//! URL template expansion and relative URL resolution.
//!
//! Templates use OpenSearch-style tokens: `{q}` and `{searchTerms}` for the
//! query, `{r}` for a resource id, `{startPage}` and `{resultType}`. A
//! token with a trailing `?` is optional and removed when no value is
//! available; a required token without a value stays as literal text.

use url::Url;

use crate::escape::encoded_query;

/// Values substituted into a URL template.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateParams<'a> {
    /// Query text, encoded with spaces as `+`.
    pub query: Option<&'a str>,
    /// Resource id.
    pub resource_id: Option<&'a str>,
    /// Result page number.
    pub start_page: Option<u32>,
    /// Result type filter.
    pub result_type: Option<&'a str>,
}

impl<'a> TemplateParams<'a> {
    /// Parameters carrying only a query.
    pub fn query(query: &'a str) -> Self {
        Self {
            query: Some(query),
            ..Default::default()
        }
    }

    fn value(&self, name: &str) -> Option<String> {
        match name {
            "q" | "searchTerms" => self.query.map(encoded_query),
            "r" => self.resource_id.map(|r| urlencoding::encode(r).into_owned()),
            "startPage" => self.start_page.map(|p| p.to_string()),
            "resultType" => self.result_type.map(|t| urlencoding::encode(t).into_owned()),
            _ => None,
        }
    }
}

/// Expand `template` with `params`.
///
/// # Examples
///
/// ```
/// use searsia_search::template::{fill_url_template, TemplateParams};
///
/// let url = fill_url_template(
///     "https://x.org/search?q={q?}&r={r?}&page={startPage?}",
///     &TemplateParams::query("rust lang"),
/// );
/// assert_eq!(url, "https://x.org/search?q=rust+lang&r=&page=");
/// ```
pub fn fill_url_template(template: &str, params: &TemplateParams<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open..];
        let Some(close) = after.find('}') else {
            out.push_str(after);
            return out;
        };
        let token = &after[1..close];
        let (name, optional) = match token.strip_suffix('?') {
            Some(name) => (name, true),
            None => (token, false),
        };
        let is_token = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphabetic());
        match (is_token, params.value(name)) {
            (true, Some(value)) => out.push_str(&value),
            (true, None) if optional => {}
            _ => out.push_str(&after[..=close]),
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

/// Resolve `relative` against `base`.
///
/// Absolute (`http://`, `https://`) and protocol-relative (`//`) URLs are
/// returned unchanged. Otherwise `None` when there is no usable base.
pub fn correct_url(base: Option<&str>, relative: &str) -> Option<String> {
    if is_absolute(relative) {
        return Some(relative.to_owned());
    }
    let base = parse_lenient(base?)?;
    base.join(relative).ok().map(String::from)
}

/// Host of `url` without a leading `www.`, if it has one.
pub fn host_of(url: &str) -> Option<String> {
    let parsed = parse_lenient(url)?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_owned())
}

fn is_absolute(url: &str) -> bool {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || url.starts_with("//")
}

fn parse_lenient(url: &str) -> Option<Url> {
    if let Some(rest) = url.strip_prefix("//") {
        return Url::parse(&format!("https://{rest}")).ok();
    }
    Url::parse(url).ok()
}
