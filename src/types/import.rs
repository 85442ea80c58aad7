//! Import pipeline types for bulk maintenance-request uploads

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Inferred priority of a maintenance request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

/// One raw spreadsheet row: free-text headers mapped to string cells.
///
/// `row_number` is the 1-based spreadsheet row (header row is 1, so the
/// first data row is 2), which keeps error reports meaningful to the
/// person who uploaded the file.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub row_number: i32,
    pub cells: HashMap<String, String>,
}

/// A spreadsheet row mapped to canonical field names.
///
/// Missing or empty cells become `None`; validation is deferred.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRow {
    pub row_number: i32,
    pub date: Option<String>,
    pub floor: Option<String>,
    pub wing: Option<String>,
    pub process: Option<String>,
    pub location: Option<String>,
    pub issue_description: Option<String>,
}

/// A row-scoped validation error, retained for the user's error export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub row_number: i32,
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ValidationError {
    pub fn new(
        row_number: i32,
        field: impl Into<String>,
        message: impl Into<String>,
        value: Option<String>,
    ) -> Self {
        Self {
            row_number,
            field: field.into(),
            message: message.into(),
            value,
        }
    }
}

/// A resolved, validated row ready for submission.
///
/// One `ParsedRequest` maps to exactly one eventual backend record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedRequest {
    pub row_number: i32,
    pub title: String,
    pub description: String,
    pub location: String,
    pub priority: Priority,
    pub floor_id: Option<Uuid>,
    pub process_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
}

/// A single row the backend failed to insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowFailure {
    pub row: i32,
    pub error: String,
}

/// Running aggregate over batch submissions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success_count: u32,
    pub error_count: u32,
    pub error_details: Vec<RowFailure>,
}

impl ImportResult {
    /// Fold one batch's counts into the running aggregate.
    pub fn absorb(&mut self, inserted: u32, failed: u32, mut failures: Vec<RowFailure>) {
        self.success_count += inserted;
        self.error_count += failed;
        self.error_details.append(&mut failures);
    }
}

/// Wizard phase for one import session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportPhase {
    Upload,
    Preview,
    Processing,
    Complete,
}

/// Status published to `upkeep.import.status.{sessionId}` while a
/// session is being processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SessionStatus {
    #[serde(rename_all = "camelCase")]
    Processing {
        batches_done: u32,
        batch_total: u32,
        percent: u8,
        success_count: u32,
        error_count: u32,
    },
    #[serde(rename_all = "camelCase")]
    Completed { result: ImportResult },
    /// All batches ran but nothing was inserted.
    #[serde(rename_all = "camelCase")]
    AllFailed {
        result: ImportResult,
        first_error: String,
    },
    /// A batch call failed; the session returned to preview.
    #[serde(rename_all = "camelCase")]
    Aborted {
        error: String,
        partial: ImportResult,
    },
}

/// Status update envelope with session id and timestamp
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusUpdate {
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub status: SessionStatus,
}

impl SessionStatusUpdate {
    pub fn new(session_id: Uuid, status: SessionStatus) -> Self {
        Self {
            session_id,
            timestamp: Utc::now(),
            status,
        }
    }
}

// =============================================================================
// Wizard request/response payloads
// =============================================================================

/// Payload for `upkeep.import.parse`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseFileRequest {
    pub file_name: String,
    /// Raw spreadsheet bytes, base64-encoded
    pub content_base64: String,
}

/// Preview summary returned after a successful parse
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsePreviewResponse {
    pub session_id: Uuid,
    pub file_name: String,
    pub phase: ImportPhase,
    pub total_rows: u32,
    pub valid_count: u32,
    pub error_count: u32,
    pub errors: Vec<ValidationError>,
}

/// Payload addressing an existing session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub session_id: Uuid,
}

/// Acknowledgement returned by `upkeep.import.confirm`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResponse {
    pub session_id: Uuid,
    pub batch_total: u32,
    pub message: String,
}

/// Current state of a session, returned by `upkeep.import.session`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStateResponse {
    pub session_id: Uuid,
    pub file_name: String,
    pub phase: ImportPhase,
    pub total_rows: u32,
    pub valid_count: u32,
    pub error_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ImportResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// A downloadable file (template or export), base64-encoded
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDownloadResponse {
    pub file_name: String,
    pub content_base64: String,
}
