//! Spreadsheet parsing: uploaded CSV or XLSX bytes into raw rows,
//! plus the downloadable upload template.

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use thiserror::Error;

use crate::services::validator::DATE_FORMAT;
use crate::types::RawRow;

/// Columns of the upload template, in order
pub const TEMPLATE_HEADERS: [&str; 7] = [
    "Sl.No.",
    "Date",
    "Floor",
    "Wing",
    "Process",
    "Location",
    "Issue Description",
];

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("unsupported file type '{0}': expected .csv or .xlsx")]
    UnsupportedFormat(String),
    #[error("spreadsheet has no data rows")]
    EmptyFile,
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to read workbook: {0}")]
    Excel(#[from] calamine::Error),
    #[error("workbook has no worksheets")]
    NoWorksheet,
}

/// Parses uploaded spreadsheet bytes into raw rows.
///
/// Dispatches on the file extension. Row numbers are 1-based
/// spreadsheet rows (the header is row 1), so the first data row
/// reports as row 2.
pub fn parse_spreadsheet(file_name: &str, bytes: &[u8]) -> Result<Vec<RawRow>, ImportError> {
    let extension = file_name
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    match extension.as_str() {
        "csv" => parse_csv(bytes),
        "xlsx" | "xls" | "xlsm" => parse_workbook(bytes),
        other => Err(ImportError::UnsupportedFormat(other.to_string())),
    }
}

fn parse_csv(bytes: &[u8]) -> Result<Vec<RawRow>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let mut cells = HashMap::new();
        for (col, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let value = record.get(col).unwrap_or_default().trim();
            cells.insert(header.clone(), value.to_string());
        }
        if cells.values().all(|v| v.is_empty()) {
            continue; // skip fully blank lines
        }
        rows.push(RawRow {
            row_number: (idx + 2) as i32,
            cells,
        });
    }

    if rows.is_empty() {
        return Err(ImportError::EmptyFile);
    }
    Ok(rows)
}

/// Converts a calamine cell to a trimmed string; whole floats render
/// without a trailing ".0" so numeric serials read naturally.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            if *f == f.floor() && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        // Date-formatted cells arrive as Excel serials; render them in
        // the upload date format so the validator accepts them.
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}

fn parse_workbook(bytes: &[u8]) -> Result<Vec<RawRow>, ImportError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(ImportError::NoWorksheet)?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(calamine::Error::from)?;

    let mut row_iter = range.rows();
    let headers: Vec<String> = row_iter
        .next()
        .ok_or(ImportError::EmptyFile)?
        .iter()
        .map(cell_to_string)
        .collect();

    let mut rows = Vec::new();
    for (idx, row) in row_iter.enumerate() {
        let mut cells = HashMap::new();
        for (col, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let value = row.get(col).map(cell_to_string).unwrap_or_default();
            cells.insert(header.clone(), value);
        }
        if cells.values().all(|v| v.is_empty()) {
            continue;
        }
        rows.push(RawRow {
            row_number: (idx + 2) as i32,
            cells,
        });
    }

    if rows.is_empty() {
        return Err(ImportError::EmptyFile);
    }
    Ok(rows)
}

/// Builds the downloadable upload template with two example rows.
pub fn template_csv() -> Result<Vec<u8>, ImportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(TEMPLATE_HEADERS)?;
    writer.write_record([
        "1",
        "10.10.25",
        "Ground Floor",
        "Right wing",
        "Meesho",
        "Gents rest room",
        "Electrical Switch box top",
    ])?;
    writer.write_record([
        "2",
        "10.10.25",
        "Cafeteria",
        "Whole floor",
        "NA",
        "Eating area",
        "No fire extinguisher",
    ])?;
    writer
        .into_inner()
        .map_err(|e| ImportError::Csv(csv::Error::from(e.into_error())))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
Sl.No.,Date,Floor,Wing,Process,Location,Issue Description
1,10.10.25,Ground Floor,Right wing,Meesho,Gents rest room,Electrical Switch box top
2,10.10.25,Cafeteria,Whole floor,NA,Eating area,No fire extinguisher
";

    #[test]
    fn test_parse_csv_yields_one_raw_row_per_data_line() {
        let rows = parse_spreadsheet("upload.csv", SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_number, 2);
        assert_eq!(rows[1].row_number, 3);
        assert_eq!(
            rows[0].cells.get("Floor").map(String::as_str),
            Some("Ground Floor")
        );
        assert_eq!(rows[1].cells.get("Process").map(String::as_str), Some("NA"));
    }

    #[test]
    fn test_parse_csv_skips_fully_blank_lines() {
        let csv = "Date,Floor,Issue Description\n10.10.25,GF,Broken light\n,,\n11.10.25,GF,Leak\n";
        let rows = parse_spreadsheet("a.csv", csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        // Row numbers still count the blank line
        assert_eq!(rows[1].row_number, 4);
    }

    #[test]
    fn test_unsupported_extension_is_rejected() {
        let err = parse_spreadsheet("upload.pdf", b"whatever").unwrap_err();
        assert!(matches!(err, ImportError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_header_only_file_is_empty() {
        let err =
            parse_spreadsheet("a.csv", b"Date,Floor,Issue Description\n").unwrap_err();
        assert!(matches!(err, ImportError::EmptyFile));
    }

    #[test]
    fn test_template_round_trips_through_the_parser() {
        let template = template_csv().unwrap();
        let rows = parse_spreadsheet("template.csv", &template).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].cells.get("Issue Description").map(String::as_str),
            Some("Electrical Switch box top")
        );
        assert_eq!(
            rows[1].cells.get("Wing").map(String::as_str),
            Some("Whole floor")
        );
    }

    #[test]
    fn test_cell_to_string_renders_whole_floats_as_integers() {
        assert_eq!(cell_to_string(&Data::Float(3.0)), "3");
        assert_eq!(cell_to_string(&Data::Float(3.5)), "3.5");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }

    #[test]
    fn test_excel_date_cells_render_in_the_upload_date_format() {
        use calamine::{ExcelDateTime, ExcelDateTimeType};

        // Serial 45940 is 2025-10-10
        let cell = Data::DateTime(ExcelDateTime::new(
            45940.0,
            ExcelDateTimeType::DateTime,
            false,
        ));
        assert_eq!(cell_to_string(&cell), "10.10.25");
        assert!(chrono::NaiveDate::parse_from_str(&cell_to_string(&cell), DATE_FORMAT).is_ok());
    }
}
