//! Batch submitter: partitions the submission set into fixed-size
//! batches and drives them through the backend strictly sequentially.
//!
//! The transport sits behind the `BatchSubmitter` trait so the runner's
//! control flow never changes when the submission strategy does
//! (HTTP RPC in production, mocks in tests).

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::types::{ImportResult, ParsedRequest, RowFailure};

/// Default rows per backend call
pub const DEFAULT_BATCH_SIZE: usize = 50;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The backend answered `success: false`; treated as a hard failure
    /// for the whole batch even if some rows nominally succeeded.
    #[error("backend rejected batch: {0}")]
    Rejected(String),
}

/// Per-batch counts returned by the backend
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub inserted_count: u32,
    pub failed_count: u32,
    pub error_details: Vec<RowFailure>,
}

/// Strategy object for one remote "bulk create" call
#[async_trait]
pub trait BatchSubmitter: Send + Sync {
    async fn submit_batch(
        &self,
        upload_batch_id: Uuid,
        rows: &[ParsedRequest],
    ) -> Result<BatchOutcome, SubmitError>;

    fn name(&self) -> &'static str;
}

/// Progress snapshot emitted after each batch completes
#[derive(Debug, Clone, Copy)]
pub struct BatchProgress {
    pub batches_done: u32,
    pub batch_total: u32,
    pub percent: u8,
    pub success_count: u32,
    pub error_count: u32,
}

/// Final account of one submission run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub result: ImportResult,
    /// Set when a batch call failed and remaining batches were skipped
    pub abort_error: Option<String>,
}

impl RunReport {
    pub fn is_aborted(&self) -> bool {
        self.abort_error.is_some()
    }

    /// All batches ran but the backend inserted nothing.
    pub fn all_rows_failed(&self) -> bool {
        self.abort_error.is_none() && self.result.success_count == 0
    }

    pub fn first_error(&self) -> Option<&str> {
        self.result
            .error_details
            .first()
            .map(|f| f.error.as_str())
    }
}

/// Number of batches a submission set partitions into.
pub fn batch_count(rows: usize, batch_size: usize) -> u32 {
    let batch_size = batch_size.max(1);
    rows.div_ceil(batch_size) as u32
}

/// Submits every batch in row order, one at a time.
///
/// A batch failure aborts the remaining batches; counts accumulated up
/// to that point survive in the report. There is no retry and no
/// partial-batch rollback.
pub async fn run_batches(
    submitter: &dyn BatchSubmitter,
    upload_batch_id: Uuid,
    requests: &[ParsedRequest],
    batch_size: usize,
    mut on_progress: impl FnMut(BatchProgress) + Send,
) -> RunReport {
    let batch_size = batch_size.max(1);
    let batch_total = batch_count(requests.len(), batch_size);
    let mut result = ImportResult::default();

    info!(
        "Submitting {} rows in {} batches via {}",
        requests.len(),
        batch_total,
        submitter.name()
    );

    for (idx, batch) in requests.chunks(batch_size).enumerate() {
        match submitter.submit_batch(upload_batch_id, batch).await {
            Ok(outcome) => {
                result.absorb(
                    outcome.inserted_count,
                    outcome.failed_count,
                    outcome.error_details,
                );
                let batches_done = (idx + 1) as u32;
                on_progress(BatchProgress {
                    batches_done,
                    batch_total,
                    percent: ((batches_done * 100) / batch_total.max(1)) as u8,
                    success_count: result.success_count,
                    error_count: result.error_count,
                });
            }
            Err(e) => {
                warn!(
                    "Batch {}/{} failed, aborting remaining batches: {}",
                    idx + 1,
                    batch_total,
                    e
                );
                return RunReport {
                    result,
                    abort_error: Some(e.to_string()),
                };
            }
        }
    }

    RunReport {
        result,
        abort_error: None,
    }
}
