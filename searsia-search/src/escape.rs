//! HTML escaping and query encoding helpers.
//!
//! Escaping is a data-integrity step applied once per hit by the
//! normalizer; these functions themselves are not idempotent.

/// Escape text destined for an HTML element body: `&`, `<` and `>`.
pub fn escape_element(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape text destined for a quoted HTML attribute: `&` and `"`.
pub fn escape_attribute(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&#34;"),
            _ => out.push(c),
        }
    }
    out
}

/// URL-encode a query, spaces as `+`.
pub fn encoded_query(text: &str) -> String {
    urlencoding::encode(text).replace("%20", "+")
}
