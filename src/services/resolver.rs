//! Fuzzy resolver: free-text floor/process names to reference-data ids.
//!
//! Resolution order: normalize, synonym substitution, exact match,
//! substring match in either direction. Substring ties break on table
//! order (first match wins), preserving the behavior downstream
//! consumers rely on.

use std::collections::HashMap;

use uuid::Uuid;

use crate::types::RefItem;

/// Lowercases, trims, strips non-word characters and collapses
/// internal whitespace.
pub fn normalize_key(input: &str) -> String {
    let lowered = input.to_lowercase();
    let cleaned: String = lowered
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolves free text against one reference table using an injected
/// synonym map.
pub struct FuzzyResolver {
    synonyms: HashMap<String, String>,
}

impl FuzzyResolver {
    pub fn new(synonyms: HashMap<String, String>) -> Self {
        Self { synonyms }
    }

    /// Resolve `input` to a reference id, or `None` if unresolvable.
    pub fn resolve(&self, input: &str, items: &[RefItem]) -> Option<Uuid> {
        let mut key = normalize_key(input);
        if key.is_empty() {
            return None;
        }

        // Synonym substitution happens before any matching
        if let Some(canonical) = self.synonyms.get(&key) {
            key = normalize_key(canonical);
        }

        // Exact match
        for item in items {
            if normalize_key(&item.name) == key {
                return Some(item.id);
            }
        }

        // Substring match, either direction, table order
        for item in items {
            let name = normalize_key(&item.name);
            if name.contains(&key) || key.contains(&name) {
                return Some(item.id);
            }
        }

        None
    }
}
