//! The user's query and its derived term list.

use crate::scoring::tokens;

/// Query context shared by scoring, snippets and URL expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    raw: String,
    terms: Vec<String>,
    result_type: Option<String>,
}

impl Query {
    /// Build a query context from the text as typed.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let terms = tokens(&raw);
        Self {
            raw,
            terms,
            result_type: None,
        }
    }

    /// Builder method to set a result type filter.
    pub fn with_result_type(mut self, result_type: Option<String>) -> Self {
        self.result_type = result_type;
        self
    }

    /// The query as typed.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Normalised terms in query order, duplicates allowed.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Terms sorted by descending length, longest (most specific) first.
    /// Equal lengths keep query order.
    pub fn terms_by_length(&self) -> Vec<String> {
        let mut sorted = self.terms.clone();
        sorted.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
        sorted
    }

    /// Optional result type filter.
    pub fn result_type(&self) -> Option<&str> {
        self.result_type.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_are_normalised() {
        let query = Query::new("  Rust, the Language! ");
        assert_eq!(query.terms(), ["rust", "the", "language"]);
        assert_eq!(query.raw(), "  Rust, the Language! ");
    }

    #[test]
    fn terms_by_length_is_stable() {
        let query = Query::new("ab cd efgh ij");
        assert_eq!(query.terms_by_length(), ["efgh", "ab", "cd", "ij"]);
    }

    #[test]
    fn punctuation_only_query_has_no_terms() {
        assert!(Query::new("?!").terms().is_empty());
    }

    #[test]
    fn result_type_builder() {
        let query = Query::new("cats").with_result_type(Some("images".into()));
        assert_eq!(query.result_type(), Some("images"));
    }
}
