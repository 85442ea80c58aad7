//! Keyword classifier: infers category and priority from free-text
//! issue descriptions. Deterministic, no feedback loop.

use uuid::Uuid;

use crate::services::rules::ImportRules;
use crate::types::{Priority, ReferenceSet};

/// Returns true if `keyword` occurs in `text` on word boundaries.
///
/// Boundary checking keeps short keywords like "ac" from firing inside
/// unrelated words ("crack", "black").
fn contains_keyword(text: &str, keyword: &str) -> bool {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return false;
    }
    let mut start = 0;
    while let Some(pos) = text[start..].find(keyword) {
        let abs = start + pos;
        let before_ok = abs == 0
            || !text[..abs]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric());
        let end = abs + keyword.len();
        let after_ok = end >= text.len()
            || !text[end..].chars().next().is_some_and(|c| c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        start = abs + keyword.len().max(1);
    }
    false
}

pub struct Classifier<'a> {
    rules: &'a ImportRules,
}

impl<'a> Classifier<'a> {
    pub fn new(rules: &'a ImportRules) -> Self {
        Self { rules }
    }

    /// First category whose keyword list has any match; the fallback
    /// category otherwise. Returns `None` only when the fallback is
    /// absent from the reference data.
    pub fn classify_category(&self, description: &str, refs: &ReferenceSet) -> Option<Uuid> {
        let text = description.to_lowercase();
        for rule in &self.rules.categories {
            if rule.keywords.iter().any(|kw| contains_keyword(&text, kw)) {
                if let Some(id) = refs.category_by_name(&rule.category) {
                    return Some(id);
                }
            }
        }
        refs.category_by_name(&self.rules.fallback_category)
    }

    /// Urgent beats high beats the medium default.
    pub fn classify_priority(&self, description: &str) -> Priority {
        let text = description.to_lowercase();
        if self
            .rules
            .urgent_keywords
            .iter()
            .any(|kw| contains_keyword(&text, kw))
        {
            Priority::Urgent
        } else if self
            .rules
            .high_keywords
            .iter()
            .any(|kw| contains_keyword(&text, kw))
        {
            Priority::High
        } else {
            Priority::Medium
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RefItem;

    fn refs() -> ReferenceSet {
        ReferenceSet {
            categories: vec![
                RefItem::new(Uuid::new_v4(), "Fire Safety"),
                RefItem::new(Uuid::new_v4(), "Electrical"),
                RefItem::new(Uuid::new_v4(), "HVAC"),
                RefItem::new(Uuid::new_v4(), "Civil"),
                RefItem::new(Uuid::new_v4(), "Other"),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_keyword_matching_respects_word_boundaries() {
        assert!(contains_keyword("the ac is broken", "ac"));
        assert!(!contains_keyword("crack in the wall", "ac"));
        assert!(contains_keyword("fire extinguisher missing", "fire"));
    }

    #[test]
    fn test_first_matching_category_wins() {
        let rules = ImportRules::default();
        let refs = refs();
        let classifier = Classifier::new(&rules);
        // "fire" hits Fire Safety before anything else
        let id = classifier.classify_category("No fire extinguisher", &refs);
        assert_eq!(id, refs.category_by_name("Fire Safety"));
    }

    #[test]
    fn test_switch_classifies_as_electrical() {
        let rules = ImportRules::default();
        let refs = refs();
        let classifier = Classifier::new(&rules);
        let id = classifier.classify_category("Electrical Switch box top", &refs);
        assert_eq!(id, refs.category_by_name("Electrical"));
    }

    #[test]
    fn test_unmatched_description_falls_back_to_other() {
        let rules = ImportRules::default();
        let refs = refs();
        let classifier = Classifier::new(&rules);
        let id = classifier.classify_category("Something unusual happened", &refs);
        assert_eq!(id, refs.category_by_name("Other"));
    }

    #[test]
    fn test_priority_defaults_to_medium() {
        let rules = ImportRules::default();
        let classifier = Classifier::new(&rules);
        assert_eq!(
            classifier.classify_priority("Electrical Switch box top"),
            Priority::Medium
        );
    }

    #[test]
    fn test_fire_keywords_classify_as_urgent() {
        let rules = ImportRules::default();
        let classifier = Classifier::new(&rules);
        assert_eq!(
            classifier.classify_priority("No fire extinguisher"),
            Priority::Urgent
        );
    }

    #[test]
    fn test_high_severity_keywords_classify_as_high() {
        let rules = ImportRules::default();
        let classifier = Classifier::new(&rules);
        assert_eq!(classifier.classify_priority("Water leak near lift"), Priority::High);
    }
}
