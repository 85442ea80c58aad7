//! Row normalizer: maps free-text spreadsheet headers onto the
//! canonical field set via alias tables.

use std::collections::HashMap;

use crate::services::rules::ColumnAliases;
use crate::types::{NormalizedRow, RawRow};

/// Looks up the first alias present in the row's headers.
///
/// Header comparison is case-insensitive and trimmed. Empty cells count
/// as missing; validation is deferred to the validator.
fn lookup<'a>(cells: &'a HashMap<String, String>, aliases: &[String]) -> Option<&'a str> {
    for alias in aliases {
        let hit = cells.iter().find_map(|(header, value)| {
            if header.trim().eq_ignore_ascii_case(alias.trim()) {
                Some(value.trim())
            } else {
                None
            }
        });
        match hit {
            Some(value) if !value.is_empty() => return Some(value),
            _ => continue,
        }
    }
    None
}

/// Maps one raw spreadsheet row to canonical fields. Pure function.
pub fn normalize_row(row: &RawRow, aliases: &ColumnAliases) -> NormalizedRow {
    let field = |names: &[String]| lookup(&row.cells, names).map(str::to_string);

    NormalizedRow {
        row_number: row.row_number,
        date: field(&aliases.date),
        floor: field(&aliases.floor),
        wing: field(&aliases.wing),
        process: field(&aliases.process),
        location: field(&aliases.location),
        issue_description: field(&aliases.issue_description),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::rules::ImportRules;

    fn raw(cells: &[(&str, &str)]) -> RawRow {
        RawRow {
            row_number: 2,
            cells: cells
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_normalize_matches_headers_case_insensitively() {
        let rules = ImportRules::default();
        let row = raw(&[
            ("  FLOOR ", "Ground Floor"),
            ("Issue Description", "Broken tap"),
            ("DATE", "10.10.25"),
        ]);
        let normalized = normalize_row(&row, &rules.aliases);
        assert_eq!(normalized.floor.as_deref(), Some("Ground Floor"));
        assert_eq!(normalized.issue_description.as_deref(), Some("Broken tap"));
        assert_eq!(normalized.date.as_deref(), Some("10.10.25"));
    }

    #[test]
    fn test_normalize_resolves_header_aliases() {
        let rules = ImportRules::default();
        let row = raw(&[("Complaint", "AC not cooling"), ("Brand", "Meesho")]);
        let normalized = normalize_row(&row, &rules.aliases);
        assert_eq!(normalized.issue_description.as_deref(), Some("AC not cooling"));
        assert_eq!(normalized.process.as_deref(), Some("Meesho"));
    }

    #[test]
    fn test_normalize_treats_empty_cells_as_missing() {
        let rules = ImportRules::default();
        let row = raw(&[("Floor", "  "), ("Wing", "")]);
        let normalized = normalize_row(&row, &rules.aliases);
        assert_eq!(normalized.floor, None);
        assert_eq!(normalized.wing, None);
    }

    #[test]
    fn test_normalize_never_errors_on_unknown_headers() {
        let rules = ImportRules::default();
        let row = raw(&[("Sl.No.", "1"), ("Mystery", "x")]);
        let normalized = normalize_row(&row, &rules.aliases);
        assert_eq!(normalized, NormalizedRow { row_number: 2, ..Default::default() });
    }

    #[test]
    fn test_normalize_prefers_first_matching_alias() {
        let rules = ImportRules::default();
        // "issue description" is listed before "description"
        let row = raw(&[
            ("Description", "from fallback header"),
            ("Issue Description", "from primary header"),
        ]);
        let normalized = normalize_row(&row, &rules.aliases);
        assert_eq!(
            normalized.issue_description.as_deref(),
            Some("from primary header")
        );
    }
}
