//! Row validator: required fields, date format, reference resolution,
//! and location synthesis. A zero-error row becomes exactly one
//! `ParsedRequest`; any error excludes the row from submission.

use chrono::{NaiveDate, TimeZone, Utc};

use crate::services::classifier::Classifier;
use crate::services::resolver::{normalize_key, FuzzyResolver};
use crate::services::rules::ImportRules;
use crate::types::{
    name_list, NormalizedRow, ParsedRequest, ReferenceSet, ValidationError,
};

/// Template and upload date format: day.month.2-digit-year
pub const DATE_FORMAT: &str = "%d.%m.%y";

/// Process value meaning "intentionally unset"
const PROCESS_UNSET: &str = "na";

/// Titles are the description truncated to this many characters
const TITLE_MAX_CHARS: usize = 100;

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

fn truncate_title(description: &str) -> String {
    if description.chars().count() <= TITLE_MAX_CHARS {
        description.to_string()
    } else {
        description.chars().take(TITLE_MAX_CHARS).collect()
    }
}

/// Synthesizes the location field from wing and location.
///
/// "Whole floor" wings collapse to the location alone; this is a
/// business rule, not a bug.
fn synthesize_location(wing: Option<&str>, location: Option<&str>) -> String {
    let location_text = match location {
        Some(l) if !l.trim().is_empty() => l.trim().to_string(),
        _ => "Not Specified".to_string(),
    };
    match wing {
        Some(w) if !w.trim().is_empty() && !w.trim().eq_ignore_ascii_case("whole floor") => {
            format!("{} - {}", w.trim(), location_text)
        }
        _ => location_text,
    }
}

pub struct RowValidator<'a> {
    rules: &'a ImportRules,
    refs: &'a ReferenceSet,
    floor_resolver: FuzzyResolver,
    process_resolver: FuzzyResolver,
}

impl<'a> RowValidator<'a> {
    pub fn new(rules: &'a ImportRules, refs: &'a ReferenceSet) -> Self {
        Self {
            rules,
            refs,
            floor_resolver: FuzzyResolver::new(rules.floor_synonyms.clone()),
            process_resolver: FuzzyResolver::new(rules.process_synonyms.clone()),
        }
    }

    /// Validates one normalized row. `Ok` carries the parsed request;
    /// `Err` carries every error found on the row.
    pub fn validate(&self, row: &NormalizedRow) -> Result<ParsedRequest, Vec<ValidationError>> {
        let mut errors = Vec::new();

        let date = match &row.date {
            None => {
                errors.push(ValidationError::new(
                    row.row_number,
                    "date",
                    "Date is required",
                    None,
                ));
                None
            }
            Some(raw) => match parse_date(raw) {
                Some(d) => Some(d),
                None => {
                    errors.push(ValidationError::new(
                        row.row_number,
                        "date",
                        format!("Invalid date '{}': expected DD.MM.YY", raw),
                        Some(raw.clone()),
                    ));
                    None
                }
            },
        };

        let floor_id = match &row.floor {
            None => {
                errors.push(ValidationError::new(
                    row.row_number,
                    "floor",
                    "Floor is required",
                    None,
                ));
                None
            }
            Some(raw) => match self.floor_resolver.resolve(raw, &self.refs.floors) {
                Some(id) => Some(id),
                None => {
                    errors.push(ValidationError::new(
                        row.row_number,
                        "floor",
                        format!(
                            "Unknown floor '{}'. Valid floors: {}",
                            raw,
                            name_list(&self.refs.floors)
                        ),
                        Some(raw.clone()),
                    ));
                    None
                }
            },
        };

        // "NA" (any case) means intentionally unset, never an error
        let process_id = match &row.process {
            None => None,
            Some(raw) if normalize_key(raw) == PROCESS_UNSET => None,
            Some(raw) => match self.process_resolver.resolve(raw, &self.refs.processes) {
                Some(id) => Some(id),
                None => {
                    errors.push(ValidationError::new(
                        row.row_number,
                        "process",
                        format!(
                            "Unknown process '{}'. Valid processes: {}",
                            raw,
                            name_list(&self.refs.processes)
                        ),
                        Some(raw.clone()),
                    ));
                    None
                }
            },
        };

        let description = match &row.issue_description {
            Some(d) if !d.trim().is_empty() => d.trim().to_string(),
            _ => {
                errors.push(ValidationError::new(
                    row.row_number,
                    "issueDescription",
                    "Issue description is required",
                    None,
                ));
                String::new()
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        let classifier = Classifier::new(self.rules);
        let category_id = classifier.classify_category(&description, self.refs);
        let priority = classifier.classify_priority(&description);
        let created_at = date.map(|d| {
            Utc.from_utc_datetime(&d.and_hms_opt(0, 0, 0).unwrap_or_default())
        });

        Ok(ParsedRequest {
            row_number: row.row_number,
            title: truncate_title(&description),
            description,
            location: synthesize_location(row.wing.as_deref(), row.location.as_deref()),
            priority,
            floor_id,
            process_id,
            category_id,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RefItem;
    use uuid::Uuid;

    fn refs() -> ReferenceSet {
        ReferenceSet {
            floors: vec![
                RefItem::new(Uuid::new_v4(), "Ground Floor"),
                RefItem::new(Uuid::new_v4(), "Cafeteria"),
            ],
            processes: vec![RefItem::new(Uuid::new_v4(), "Meesho")],
            categories: vec![
                RefItem::new(Uuid::new_v4(), "Electrical"),
                RefItem::new(Uuid::new_v4(), "Other"),
            ],
        }
    }

    fn row(
        date: Option<&str>,
        floor: Option<&str>,
        wing: Option<&str>,
        process: Option<&str>,
        location: Option<&str>,
        issue: Option<&str>,
    ) -> NormalizedRow {
        NormalizedRow {
            row_number: 2,
            date: date.map(String::from),
            floor: floor.map(String::from),
            wing: wing.map(String::from),
            process: process.map(String::from),
            location: location.map(String::from),
            issue_description: issue.map(String::from),
        }
    }

    #[test]
    fn test_two_digit_date_parses_and_wrong_format_fails() {
        assert_eq!(
            parse_date("10.10.25"),
            NaiveDate::from_ymd_opt(2025, 10, 10)
        );
        assert_eq!(parse_date("2025-10-10"), None);
    }

    #[test]
    fn test_valid_row_produces_parsed_request() {
        let refs = refs();
        let rules = ImportRules::default();
        let validator = RowValidator::new(&rules, &refs);
        let parsed = validator
            .validate(&row(
                Some("10.10.25"),
                Some("Ground Floor"),
                Some("Right wing"),
                Some("Meesho"),
                Some("Gents rest room"),
                Some("Electrical Switch box top"),
            ))
            .unwrap();
        assert_eq!(parsed.floor_id, Some(refs.floors[0].id));
        assert_eq!(parsed.process_id, Some(refs.processes[0].id));
        assert_eq!(parsed.location, "Right wing - Gents rest room");
        assert_eq!(parsed.priority, crate::types::Priority::Medium);
        assert_eq!(parsed.category_id, refs.category_by_name("Electrical"));
        assert!(parsed.created_at.is_some());
    }

    #[test]
    fn test_missing_required_fields_each_produce_an_error() {
        let refs = refs();
        let rules = ImportRules::default();
        let validator = RowValidator::new(&rules, &refs);
        let errors = validator
            .validate(&row(None, None, None, None, None, None))
            .unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"date"));
        assert!(fields.contains(&"floor"));
        assert!(fields.contains(&"issueDescription"));
    }

    #[test]
    fn test_bad_date_format_is_a_format_error() {
        let refs = refs();
        let rules = ImportRules::default();
        let validator = RowValidator::new(&rules, &refs);
        let errors = validator
            .validate(&row(
                Some("2025-10-10"),
                Some("Ground Floor"),
                None,
                None,
                None,
                Some("Broken light"),
            ))
            .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "date");
        assert!(errors[0].message.contains("DD.MM.YY"));
        assert_eq!(errors[0].value.as_deref(), Some("2025-10-10"));
    }

    #[test]
    fn test_unresolved_floor_lists_valid_names() {
        let refs = refs();
        let rules = ImportRules::default();
        let validator = RowValidator::new(&rules, &refs);
        let errors = validator
            .validate(&row(
                Some("10.10.25"),
                Some("Mezzanine"),
                None,
                None,
                None,
                Some("Broken light"),
            ))
            .unwrap_err();
        assert_eq!(errors[0].field, "floor");
        assert!(errors[0].message.contains("Ground Floor"));
        assert!(errors[0].message.contains("Cafeteria"));
    }

    #[test]
    fn test_na_process_is_unset_not_an_error() {
        let refs = refs();
        let rules = ImportRules::default();
        let validator = RowValidator::new(&rules, &refs);
        for spelling in ["NA", "na", "Na", " nA "] {
            let parsed = validator
                .validate(&row(
                    Some("10.10.25"),
                    Some("Cafeteria"),
                    None,
                    Some(spelling),
                    Some("Eating area"),
                    Some("No fire extinguisher"),
                ))
                .unwrap();
            assert_eq!(parsed.process_id, None, "spelling {:?}", spelling);
        }
    }

    #[test]
    fn test_whole_floor_wing_uses_location_alone() {
        assert_eq!(
            synthesize_location(Some("Whole Floor"), Some("Eating area")),
            "Eating area"
        );
        assert_eq!(
            synthesize_location(Some("whole floor"), None),
            "Not Specified"
        );
        assert_eq!(
            synthesize_location(Some("Right wing"), Some("Gents rest room")),
            "Right wing - Gents rest room"
        );
        assert_eq!(
            synthesize_location(Some("Right wing"), None),
            "Right wing - Not Specified"
        );
        assert_eq!(synthesize_location(None, Some("Lobby")), "Lobby");
    }

    #[test]
    fn test_title_truncates_on_char_boundary() {
        let long = "x".repeat(150);
        assert_eq!(truncate_title(&long).chars().count(), 100);
        assert_eq!(truncate_title("short"), "short");
    }
}
