//! Import wizard sessions: upload → preview → processing → complete,
//! with the failure path back to preview.
//!
//! Sessions are pure data; transport handlers drive them. Guards live
//! here so they are unit-testable without NATS.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::services::pipeline::ParseOutcome;
use crate::types::{
    ImportPhase, ImportResult, ParsedRequest, SessionStateResponse, ValidationError,
};

/// Idle sessions older than this are evicted when new ones arrive
const SESSION_TTL_MINUTES: i64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session is in phase {0:?}, expected {1:?}")]
    WrongPhase(ImportPhase, ImportPhase),
    #[error("cannot start import: {0} validation errors outstanding")]
    ErrorsOutstanding(usize),
    #[error("cannot start import: no valid rows")]
    NoValidRows,
}

/// One import wizard session
#[derive(Debug, Clone)]
pub struct ImportSession {
    pub id: Uuid,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
    pub phase: ImportPhase,
    pub total_rows: u32,
    pub requests: Vec<ParsedRequest>,
    pub errors: Vec<ValidationError>,
    pub result: Option<ImportResult>,
    pub last_error: Option<String>,
}

impl ImportSession {
    /// A successful parse lands the session in preview, even when the
    /// parse produced validation errors; the user reviews first.
    pub fn from_parse(file_name: impl Into<String>, outcome: ParseOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            created_at: Utc::now(),
            phase: ImportPhase::Preview,
            total_rows: outcome.total_rows,
            requests: outcome.requests,
            errors: outcome.errors,
            result: None,
            last_error: None,
        }
    }

    /// Guarded `preview → processing` transition. Returns the rows to
    /// submit; outstanding errors or an empty submission set refuse the
    /// transition.
    pub fn begin_processing(&mut self) -> Result<Vec<ParsedRequest>, SessionError> {
        if self.phase != ImportPhase::Preview {
            return Err(SessionError::WrongPhase(self.phase, ImportPhase::Preview));
        }
        if !self.errors.is_empty() {
            return Err(SessionError::ErrorsOutstanding(self.errors.len()));
        }
        if self.requests.is_empty() {
            return Err(SessionError::NoValidRows);
        }
        self.phase = ImportPhase::Processing;
        self.last_error = None;
        Ok(self.requests.clone())
    }

    /// `processing → complete`, after the last batch resolves.
    pub fn complete(&mut self, result: ImportResult) {
        self.phase = ImportPhase::Complete;
        self.result = Some(result);
    }

    /// Failure path: `processing → preview`, keeping whatever had
    /// already accumulated.
    pub fn fail_back_to_preview(&mut self, error: impl Into<String>, partial: ImportResult) {
        self.phase = ImportPhase::Preview;
        self.last_error = Some(error.into());
        self.result = Some(partial);
    }

    /// Whether the session is old enough to evict. Sessions that are
    /// mid-processing never expire.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.phase != ImportPhase::Processing
            && now - self.created_at > Duration::minutes(SESSION_TTL_MINUTES)
    }

    pub fn state_response(&self) -> SessionStateResponse {
        SessionStateResponse {
            session_id: self.id,
            file_name: self.file_name.clone(),
            phase: self.phase,
            total_rows: self.total_rows,
            valid_count: self.requests.len() as u32,
            error_count: self.errors.len() as u32,
            result: self.result.clone(),
            last_error: self.last_error.clone(),
        }
    }
}
