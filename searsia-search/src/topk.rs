//! Bounded, score-descending hit collection.
//!
//! Used to cap re-ranked native hits and the overflow ("more results")
//! store of a session.

use crate::types::Hit;

/// Default number of hits kept.
pub const DEFAULT_CAPACITY: usize = 100;

/// Hits sorted by descending score, never more than `capacity` of them.
/// Equal scores keep insertion order.
#[derive(Debug, Clone)]
pub struct TopHits {
    hits: Vec<Hit>,
    capacity: usize,
}

impl Default for TopHits {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl TopHits {
    /// Empty collection holding at most [`DEFAULT_CAPACITY`] hits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty collection holding at most `capacity` hits.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            hits: Vec::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
        }
    }

    /// Insert `hit` at its score position.
    ///
    /// When full, the hit is only taken if it scores strictly higher than
    /// the current last entry, which is then dropped. Returns whether the
    /// hit was kept.
    pub fn insert(&mut self, hit: Hit) -> bool {
        if self.hits.len() >= self.capacity {
            match self.hits.last() {
                Some(last) if hit.score > last.score => {
                    self.hits.pop();
                }
                _ => return false,
            }
        }
        let position = self.hits.partition_point(|h| h.score >= hit.score);
        self.hits.insert(position, hit);
        true
    }

    /// Number of hits held.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Whether no hit is held.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Maximum number of hits held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Hits, best first.
    pub fn as_slice(&self) -> &[Hit] {
        &self.hits
    }

    /// Consume into a vector, best first.
    pub fn into_vec(self) -> Vec<Hit> {
        self.hits
    }
}

impl Extend<Hit> for TopHits {
    fn extend<I: IntoIterator<Item = Hit>>(&mut self, iter: I) {
        for hit in iter {
            self.insert(hit);
        }
    }
}
