//! Downloadable CSV exports: validation errors for offline correction,
//! and the merged per-row result of a finished import.

use std::collections::HashMap;

use crate::services::spreadsheet::ImportError;
use crate::types::{ImportResult, ParsedRequest, ValidationError};

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, ImportError> {
    writer
        .into_inner()
        .map_err(|e| ImportError::Csv(csv::Error::from(e.into_error())))
}

/// Validation errors as a spreadsheet (`row, field, message, value`).
pub fn errors_csv(errors: &[ValidationError]) -> Result<Vec<u8>, ImportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Row", "Field", "Message", "Value"])?;
    for error in errors {
        writer.write_record([
            error.row_number.to_string().as_str(),
            &error.field,
            &error.message,
            error.value.as_deref().unwrap_or_default(),
        ])?;
    }
    finish(writer)
}

/// Merged success/error records for every submitted row.
pub fn results_csv(
    requests: &[ParsedRequest],
    result: &ImportResult,
) -> Result<Vec<u8>, ImportError> {
    let failures: HashMap<i32, &str> = result
        .error_details
        .iter()
        .map(|f| (f.row, f.error.as_str()))
        .collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Row", "Title", "Location", "Priority", "Status", "Error"])?;
    for request in requests {
        let error = failures.get(&request.row_number).copied().unwrap_or_default();
        let status = if error.is_empty() { "imported" } else { "failed" };
        writer.write_record([
            request.row_number.to_string().as_str(),
            &request.title,
            &request.location,
            request.priority.as_str(),
            status,
            error,
        ])?;
    }
    finish(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Priority, RowFailure};

    fn request(row_number: i32) -> ParsedRequest {
        ParsedRequest {
            row_number,
            title: format!("Issue {}", row_number),
            description: format!("Issue {}", row_number),
            location: "Lobby".into(),
            priority: Priority::Medium,
            floor_id: None,
            process_id: None,
            category_id: None,
            created_at: None,
        }
    }

    #[test]
    fn test_errors_csv_has_one_line_per_error() {
        let errors = vec![
            ValidationError::new(2, "date", "Date is required", None),
            ValidationError::new(3, "floor", "Unknown floor 'x'", Some("x".into())),
        ];
        let bytes = errors_csv(&errors).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Row,Field,Message,Value");
        assert!(lines[2].contains("Unknown floor 'x'"));
    }

    #[test]
    fn test_results_csv_merges_success_and_failure_records() {
        let requests = vec![request(2), request(3)];
        let result = ImportResult {
            success_count: 1,
            error_count: 1,
            error_details: vec![RowFailure {
                row: 3,
                error: "duplicate".into(),
            }],
        };
        let bytes = results_csv(&requests, &result).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("2,Issue 2,Lobby,medium,imported,"));
        assert!(text.contains("3,Issue 3,Lobby,medium,failed,duplicate"));
    }
}
