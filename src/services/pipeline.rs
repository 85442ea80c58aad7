//! Import pipeline: raw rows through normalization, resolution,
//! classification and validation into a submission set plus errors.

use crate::services::normalizer::normalize_row;
use crate::services::rules::ImportRules;
use crate::services::validator::RowValidator;
use crate::types::{ParsedRequest, RawRow, ReferenceSet, ValidationError};

/// Outcome of the pure data-transform half of an import: every input
/// row is accounted for exactly once, either as a parsed request or as
/// a row with errors.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub total_rows: u32,
    pub requests: Vec<ParsedRequest>,
    pub errors: Vec<ValidationError>,
}

impl ParseOutcome {
    /// Number of distinct rows carrying at least one error.
    pub fn error_row_count(&self) -> u32 {
        let mut rows: Vec<i32> = self.errors.iter().map(|e| e.row_number).collect();
        rows.sort_unstable();
        rows.dedup();
        rows.len() as u32
    }
}

/// Runs the full row transform over parsed spreadsheet rows.
pub fn process_rows(
    raw_rows: &[RawRow],
    rules: &ImportRules,
    refs: &ReferenceSet,
) -> ParseOutcome {
    let validator = RowValidator::new(rules, refs);
    let mut outcome = ParseOutcome {
        total_rows: raw_rows.len() as u32,
        ..Default::default()
    };

    for raw in raw_rows {
        let normalized = normalize_row(raw, &rules.aliases);
        match validator.validate(&normalized) {
            Ok(request) => outcome.requests.push(request),
            Err(mut errors) => outcome.errors.append(&mut errors),
        }
    }

    debug_assert_eq!(
        outcome.requests.len() as u32 + outcome.error_row_count(),
        outcome.total_rows
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::spreadsheet::{parse_spreadsheet, template_csv};
    use crate::types::{Priority, RefItem};
    use uuid::Uuid;

    fn refs() -> ReferenceSet {
        ReferenceSet {
            floors: vec![
                RefItem::new(Uuid::new_v4(), "Ground Floor"),
                RefItem::new(Uuid::new_v4(), "Cafeteria"),
            ],
            processes: vec![RefItem::new(Uuid::new_v4(), "Meesho")],
            categories: vec![
                RefItem::new(Uuid::new_v4(), "Fire Safety"),
                RefItem::new(Uuid::new_v4(), "Electrical"),
                RefItem::new(Uuid::new_v4(), "Other"),
            ],
        }
    }

    #[test]
    fn test_template_rows_import_cleanly_end_to_end() {
        let refs = refs();
        let rules = ImportRules::default();
        let raw = parse_spreadsheet("template.csv", &template_csv().unwrap()).unwrap();
        let outcome = process_rows(&raw, &rules, &refs);

        assert_eq!(outcome.total_rows, 2);
        assert!(outcome.errors.is_empty(), "errors: {:?}", outcome.errors);
        assert_eq!(outcome.requests.len(), 2);

        let first = &outcome.requests[0];
        assert_eq!(first.location, "Right wing - Gents rest room");
        assert_eq!(first.priority, Priority::Medium);
        assert_eq!(first.floor_id, Some(refs.floors[0].id));
        assert_eq!(first.process_id, Some(refs.processes[0].id));

        let second = &outcome.requests[1];
        // Whole floor wing collapses to the location alone
        assert_eq!(second.location, "Eating area");
        // "NA" process is intentionally unset
        assert_eq!(second.process_id, None);
        assert_eq!(second.priority, Priority::Urgent);
        assert_eq!(second.category_id, refs.category_by_name("Fire Safety"));
    }

    #[test]
    fn test_every_row_is_accounted_for_exactly_once() {
        let refs = refs();
        let rules = ImportRules::default();
        let csv = "\
Date,Floor,Wing,Process,Location,Issue Description
10.10.25,Ground Floor,Right wing,NA,Lobby,Broken light
bad-date,Ground Floor,,,,Leaking tap
10.10.25,Nowhere,,,,Leaking tap
,,,,,
10.10.25,Cafeteria,,,,No fire extinguisher
";
        let raw = parse_spreadsheet("a.csv", csv.as_bytes()).unwrap();
        let outcome = process_rows(&raw, &rules, &refs);

        assert_eq!(outcome.total_rows, 4); // blank line skipped at parse
        assert_eq!(
            outcome.requests.len() as u32 + outcome.error_row_count(),
            outcome.total_rows
        );
        assert_eq!(outcome.requests.len(), 2);
        assert_eq!(outcome.error_row_count(), 2);
    }

    #[test]
    fn test_multiple_errors_on_one_row_count_that_row_once() {
        let refs = refs();
        let rules = ImportRules::default();
        // One row that fails several validations at once
        let csv = "Date,Floor,Issue Description\nbad,Nowhere,\n";
        let raw = parse_spreadsheet("a.csv", csv.as_bytes()).unwrap();
        let outcome = process_rows(&raw, &rules, &refs);

        assert_eq!(outcome.total_rows, 1);
        assert!(outcome.errors.len() >= 2);
        assert_eq!(outcome.error_row_count(), 1);
        assert!(outcome.requests.is_empty());
    }
}
