use std::collections::HashSet;
use std::hash::Hash;

/// Collapses a sequence into its distinct elements
///
/// Output order is unspecified. Used before fetching to avoid redundant
/// requests and after extraction to avoid duplicate output rows.
pub fn dedupe<T, I>(items: I) -> Vec<T>
where
    T: Eq + Hash,
    I: IntoIterator<Item = T>,
{
    items
        .into_iter()
        .collect::<HashSet<T>>()
        .into_iter()
        .collect()
}

/// Streaming identity filter
///
/// Remembers every key it has seen; `insert` reports whether a key is new.
/// Owned by a single collector, so it needs no locking.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time `key` is offered
    pub fn insert(&mut self, key: &str) -> bool {
        if self.seen.contains(key) {
            return false;
        }
        self.seen.insert(key.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
