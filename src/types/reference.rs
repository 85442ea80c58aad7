//! Reference data loaded from the backend

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One reference row: a floor, a process, or a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefItem {
    pub id: Uuid,
    pub name: String,
}

impl RefItem {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Reference data for one import session.
///
/// Loaded once before parsing and read-only for the session's duration;
/// staleness within a session is accepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceSet {
    pub floors: Vec<RefItem>,
    pub processes: Vec<RefItem>,
    pub categories: Vec<RefItem>,
}

impl ReferenceSet {
    /// Find a category id by exact (case-insensitive) name.
    pub fn category_by_name(&self, name: &str) -> Option<Uuid> {
        self.categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .map(|c| c.id)
    }
}

/// Joins reference names for use in unresolved-reference error messages.
pub fn name_list(items: &[RefItem]) -> String {
    items
        .iter()
        .map(|i| i.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_by_name_is_case_insensitive() {
        let refs = ReferenceSet {
            categories: vec![RefItem::new(Uuid::new_v4(), "Electrical")],
            ..Default::default()
        };
        assert!(refs.category_by_name("electrical").is_some());
        assert!(refs.category_by_name("Plumbing").is_none());
    }

    #[test]
    fn test_name_list_joins_with_commas() {
        let items = vec![
            RefItem::new(Uuid::new_v4(), "Ground Floor"),
            RefItem::new(Uuid::new_v4(), "1st Floor"),
        ];
        assert_eq!(name_list(&items), "Ground Floor, 1st Floor");
    }
}
