//! Import wizard handlers.
//!
//! One NATS request/reply subject per wizard operation. Session state
//! lives in the worker keyed by session id; progress during processing
//! is published to `upkeep.import.status.{sessionId}`.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::StreamExt;
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backend::{BackendClient, HttpBatchSubmitter};
use crate::services::export::{errors_csv, results_csv};
use crate::services::pipeline::process_rows;
use crate::services::rules::DEFAULT_RULES;
use crate::services::session::ImportSession;
use crate::services::spreadsheet::{parse_spreadsheet, template_csv};
use crate::services::submitter::{batch_count, run_batches, BatchSubmitter};
use crate::types::{
    ConfirmResponse, ErrorResponse, FileDownloadResponse, ParseFileRequest,
    ParsePreviewResponse, Request, SessionRequest, SessionStatus, SessionStatusUpdate,
    SuccessResponse,
};

const STATUS_PREFIX: &str = "upkeep.import.status";

/// Shared state for all import handlers
pub struct ImportService {
    client: Client,
    backend: Arc<BackendClient>,
    sessions: RwLock<HashMap<Uuid, ImportSession>>,
    batch_size: usize,
}

impl ImportService {
    pub fn new(client: Client, backend: Arc<BackendClient>, batch_size: usize) -> Self {
        Self {
            client,
            backend,
            sessions: RwLock::new(HashMap::new()),
            batch_size,
        }
    }

    /// Stores a new session, evicting expired ones so the map does not
    /// grow without bound across uploads.
    fn insert_session(&self, session: ImportSession) {
        let now = chrono::Utc::now();
        let mut sessions = self.sessions.write();
        sessions.retain(|_, s| !s.is_expired(now));
        sessions.insert(session.id, session);
    }

    async fn publish_status(&self, session_id: Uuid, status: SessionStatus) -> Result<()> {
        let update = SessionStatusUpdate::new(session_id, status);
        let subject = format!("{}.{}", STATUS_PREFIX, session_id);
        let payload = serde_json::to_vec(&update)?;
        self.client.publish(subject, payload.into()).await?;
        Ok(())
    }
}

async fn reply_error(client: &Client, reply: async_nats::Subject, error: ErrorResponse) {
    match serde_json::to_vec(&error) {
        Ok(bytes) => {
            let _ = client.publish(reply, bytes.into()).await;
        }
        Err(e) => error!("Failed to serialize error response: {}", e),
    }
}

// =============================================================================
// PARSE (upload -> preview)
// =============================================================================

pub async fn handle_parse(
    client: Client,
    mut subscriber: Subscriber,
    service: Arc<ImportService>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received import.parse message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Parse message without reply subject");
                continue;
            }
        };

        let request: Request<ParseFileRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse import.parse request: {}", e);
                reply_error(
                    &client,
                    reply,
                    ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string()),
                )
                .await;
                continue;
            }
        };

        let bytes = match BASE64.decode(&request.payload.content_base64) {
            Ok(bytes) => bytes,
            Err(e) => {
                reply_error(
                    &client,
                    reply,
                    ErrorResponse::new(request.id, "INVALID_FILE", format!("Bad base64: {}", e)),
                )
                .await;
                continue;
            }
        };

        // Reference data is loaded once per session and read-only after
        let refs = match service.backend.fetch_reference_data().await {
            Ok(refs) => refs,
            Err(e) => {
                error!("Reference data load failed: {}", e);
                reply_error(
                    &client,
                    reply,
                    ErrorResponse::new(request.id, "REFERENCE_LOAD_FAILED", e.to_string()),
                )
                .await;
                continue;
            }
        };

        let raw_rows = match parse_spreadsheet(&request.payload.file_name, &bytes) {
            Ok(rows) => rows,
            Err(e) => {
                reply_error(
                    &client,
                    reply,
                    ErrorResponse::new(request.id, "PARSE_FAILED", e.to_string()),
                )
                .await;
                continue;
            }
        };

        let outcome = process_rows(&raw_rows, &DEFAULT_RULES, &refs);
        let session = ImportSession::from_parse(&request.payload.file_name, outcome);
        let response = ParsePreviewResponse {
            session_id: session.id,
            file_name: session.file_name.clone(),
            phase: session.phase,
            total_rows: session.total_rows,
            valid_count: session.requests.len() as u32,
            error_count: session.errors.len() as u32,
            errors: session.errors.clone(),
        };

        info!(
            "Parsed '{}': {} rows, {} valid, {} errors (session {})",
            session.file_name,
            session.total_rows,
            response.valid_count,
            response.error_count,
            session.id
        );
        service.insert_session(session);

        let success = SuccessResponse::new(request.id, response);
        let _ = client
            .publish(reply, serde_json::to_vec(&success)?.into())
            .await;
    }

    Ok(())
}

// =============================================================================
// CONFIRM (preview -> processing -> complete | preview)
// =============================================================================

pub async fn handle_confirm(
    client: Client,
    mut subscriber: Subscriber,
    service: Arc<ImportService>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        debug!("Received import.confirm message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!("Confirm message without reply subject");
                continue;
            }
        };

        let request: Request<SessionRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                reply_error(
                    &client,
                    reply,
                    ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string()),
                )
                .await;
                continue;
            }
        };

        let session_id = request.payload.session_id;

        // Guarded preview -> processing transition. The session-map
        // guard must be released before any reply is awaited, or the
        // handler future stops being Send.
        let begun = {
            let mut sessions = service.sessions.write();
            sessions
                .get_mut(&session_id)
                .map(|session| session.begin_processing())
        };
        let rows = match begun {
            None => {
                reply_error(
                    &client,
                    reply,
                    ErrorResponse::new(request.id, "SESSION_NOT_FOUND", session_id.to_string()),
                )
                .await;
                continue;
            }
            Some(Err(e)) => {
                reply_error(
                    &client,
                    reply,
                    ErrorResponse::new(request.id, "IMPORT_BLOCKED", e.to_string()),
                )
                .await;
                continue;
            }
            Some(Ok(rows)) => rows,
        };

        let batch_total = batch_count(rows.len(), service.batch_size);
        let ack = SuccessResponse::new(
            request.id,
            ConfirmResponse {
                session_id,
                batch_total,
                message: format!("Importing {} rows in {} batches", rows.len(), batch_total),
            },
        );
        let _ = client.publish(reply, serde_json::to_vec(&ack)?.into()).await;

        // Forward per-batch progress to the status subject as it happens
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<SessionStatusUpdate>();
        let status_client = client.clone();
        let publisher = tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                let subject = format!("{}.{}", STATUS_PREFIX, update.session_id);
                match serde_json::to_vec(&update) {
                    Ok(bytes) => {
                        let _ = status_client.publish(subject, bytes.into()).await;
                    }
                    Err(e) => error!("Failed to serialize status update: {}", e),
                }
            }
        });

        // Strictly sequential; no cancellation once processing starts
        let submitter = HttpBatchSubmitter::new(Arc::clone(&service.backend));
        let report = run_batches(
            &submitter as &dyn BatchSubmitter,
            session_id,
            &rows,
            service.batch_size,
            |progress| {
                let _ = tx.send(SessionStatusUpdate::new(
                    session_id,
                    SessionStatus::Processing {
                        batches_done: progress.batches_done,
                        batch_total: progress.batch_total,
                        percent: progress.percent,
                        success_count: progress.success_count,
                        error_count: progress.error_count,
                    },
                ));
            },
        )
        .await;
        drop(tx);
        let _ = publisher.await;

        let final_status = {
            let mut sessions = service.sessions.write();
            let Some(session) = sessions.get_mut(&session_id) else {
                continue;
            };
            if let Some(ref abort_error) = report.abort_error {
                session.fail_back_to_preview(abort_error.clone(), report.result.clone());
                SessionStatus::Aborted {
                    error: abort_error.clone(),
                    partial: report.result.clone(),
                }
            } else if report.all_rows_failed() {
                let first_error = report
                    .first_error()
                    .unwrap_or("no error detail returned")
                    .to_string();
                session.complete(report.result.clone());
                SessionStatus::AllFailed {
                    result: report.result.clone(),
                    first_error,
                }
            } else {
                session.complete(report.result.clone());
                SessionStatus::Completed {
                    result: report.result.clone(),
                }
            }
        };

        info!(
            "Import session {} finished: {} inserted, {} failed{}",
            session_id,
            report.result.success_count,
            report.result.error_count,
            report
                .abort_error
                .as_deref()
                .map(|e| format!(" (aborted: {})", e))
                .unwrap_or_default()
        );
        if let Err(e) = service.publish_status(session_id, final_status).await {
            error!("Failed to publish final status for {}: {}", session_id, e);
        }
    }

    Ok(())
}

// =============================================================================
// SESSION STATE
// =============================================================================

pub async fn handle_session(
    client: Client,
    mut subscriber: Subscriber,
    service: Arc<ImportService>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => continue,
        };

        let request: Request<SessionRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                reply_error(
                    &client,
                    reply,
                    ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string()),
                )
                .await;
                continue;
            }
        };

        let state = service
            .sessions
            .read()
            .get(&request.payload.session_id)
            .map(|s| s.state_response());

        match state {
            Some(state) => {
                let success = SuccessResponse::new(request.id, state);
                let _ = client
                    .publish(reply, serde_json::to_vec(&success)?.into())
                    .await;
            }
            None => {
                reply_error(
                    &client,
                    reply,
                    ErrorResponse::new(
                        request.id,
                        "SESSION_NOT_FOUND",
                        request.payload.session_id.to_string(),
                    ),
                )
                .await;
            }
        }
    }

    Ok(())
}

// =============================================================================
// TEMPLATE AND EXPORTS
// =============================================================================

pub async fn handle_template(
    client: Client,
    mut subscriber: Subscriber,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => continue,
        };

        let request_id = serde_json::from_slice::<Request<serde_json::Value>>(&msg.payload)
            .map(|r| r.id)
            .unwrap_or_else(|_| Uuid::nil());

        match template_csv() {
            Ok(bytes) => {
                let response = FileDownloadResponse {
                    file_name: "import_template.csv".to_string(),
                    content_base64: BASE64.encode(bytes),
                };
                let success = SuccessResponse::new(request_id, response);
                let _ = client
                    .publish(reply, serde_json::to_vec(&success)?.into())
                    .await;
            }
            Err(e) => {
                reply_error(
                    &client,
                    reply,
                    ErrorResponse::new(request_id, "TEMPLATE_FAILED", e.to_string()),
                )
                .await;
            }
        }
    }

    Ok(())
}

pub async fn handle_errors_export(
    client: Client,
    mut subscriber: Subscriber,
    service: Arc<ImportService>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => continue,
        };

        let request: Request<SessionRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                reply_error(
                    &client,
                    reply,
                    ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string()),
                )
                .await;
                continue;
            }
        };

        let errors = service
            .sessions
            .read()
            .get(&request.payload.session_id)
            .map(|s| s.errors.clone());

        let Some(errors) = errors else {
            reply_error(
                &client,
                reply,
                ErrorResponse::new(
                    request.id,
                    "SESSION_NOT_FOUND",
                    request.payload.session_id.to_string(),
                ),
            )
            .await;
            continue;
        };

        match errors_csv(&errors) {
            Ok(bytes) => {
                let response = FileDownloadResponse {
                    file_name: "validation_errors.csv".to_string(),
                    content_base64: BASE64.encode(bytes),
                };
                let success = SuccessResponse::new(request.id, response);
                let _ = client
                    .publish(reply, serde_json::to_vec(&success)?.into())
                    .await;
            }
            Err(e) => {
                reply_error(
                    &client,
                    reply,
                    ErrorResponse::new(request.id, "EXPORT_FAILED", e.to_string()),
                )
                .await;
            }
        }
    }

    Ok(())
}

pub async fn handle_result_export(
    client: Client,
    mut subscriber: Subscriber,
    service: Arc<ImportService>,
) -> Result<()> {
    while let Some(msg) = subscriber.next().await {
        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => continue,
        };

        let request: Request<SessionRequest> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                reply_error(
                    &client,
                    reply,
                    ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string()),
                )
                .await;
                continue;
            }
        };

        let data = service
            .sessions
            .read()
            .get(&request.payload.session_id)
            .map(|s| (s.requests.clone(), s.result.clone()));

        let csv = match data {
            None => {
                reply_error(
                    &client,
                    reply,
                    ErrorResponse::new(
                        request.id,
                        "SESSION_NOT_FOUND",
                        request.payload.session_id.to_string(),
                    ),
                )
                .await;
                continue;
            }
            Some((_, None)) => {
                reply_error(
                    &client,
                    reply,
                    ErrorResponse::new(request.id, "NO_RESULT", "import has not run"),
                )
                .await;
                continue;
            }
            Some((requests, Some(result))) => results_csv(&requests, &result),
        };

        match csv {
            Ok(bytes) => {
                let response = FileDownloadResponse {
                    file_name: "import_results.csv".to_string(),
                    content_base64: BASE64.encode(bytes),
                };
                let success = SuccessResponse::new(request.id, response);
                let _ = client
                    .publish(reply, serde_json::to_vec(&success)?.into())
                    .await;
            }
            Err(e) => {
                reply_error(
                    &client,
                    reply,
                    ErrorResponse::new(request.id, "EXPORT_FAILED", e.to_string()),
                )
                .await;
            }
        }
    }

    Ok(())
}
