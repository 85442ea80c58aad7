//! Hosted backend client.
//!
//! The relational backend is an external collaborator reached over
//! HTTPS: read-only reference-data queries plus one bulk-create RPC.
//! Schema and stored procedures are a black box on the other side.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::services::submitter::{BatchOutcome, BatchSubmitter, SubmitError};
use crate::types::{ParsedRequest, RefItem, ReferenceSet, RowFailure};

/// Row shape accepted by the bulk-create procedure
#[derive(Debug, Clone, Serialize)]
pub struct WireRow<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub location: &'a str,
    pub priority: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building_floor_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_category_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl<'a> From<&'a ParsedRequest> for WireRow<'a> {
    fn from(request: &'a ParsedRequest) -> Self {
        Self {
            title: &request.title,
            description: &request.description,
            location: &request.location,
            priority: request.priority.as_str(),
            building_floor_id: request.floor_id,
            process_id: request.process_id,
            main_category_id: request.category_id,
            created_at: request.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct BulkCreateCall<'a> {
    p_upload_batch_id: Uuid,
    p_rows: Vec<WireRow<'a>>,
}

/// Response of the bulk-create procedure
#[derive(Debug, Clone, Deserialize)]
pub struct BulkCreateResponse {
    pub success: bool,
    #[serde(default)]
    pub inserted_count: u32,
    #[serde(default)]
    pub failed_count: u32,
    #[serde(default)]
    pub error_details: Vec<RowFailure>,
}

/// HTTP client for the hosted backend
pub struct BackendClient {
    base_url: String,
    api_key: String,
    property_id: Option<Uuid>,
    client: reqwest::Client,
}

impl BackendClient {
    pub fn new(base_url: &str, api_key: &str, property_id: Option<Uuid>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("upkeep-worker/0.2")
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            property_id,
            client,
        })
    }

    fn get(&self, path_and_query: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, path_and_query))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn fetch_items(&self, path_and_query: &str) -> Result<Vec<RefItem>> {
        let response = self
            .get(path_and_query)
            .send()
            .await
            .with_context(|| format!("Reference query failed: {}", path_and_query))?
            .error_for_status()
            .with_context(|| format!("Reference query rejected: {}", path_and_query))?;
        let items: Vec<RefItem> = response
            .json()
            .await
            .context("Failed to parse reference data")?;
        Ok(items)
    }

    /// Loads floors, processes and categories once per import session.
    pub async fn fetch_reference_data(&self) -> Result<ReferenceSet> {
        let floors = self
            .fetch_items("/rest/v1/building_floors?select=id,name&is_active=eq.true")
            .await?;

        let process_query = match self.property_id {
            Some(id) => format!(
                "/rest/v1/processes?select=id,name&is_active=eq.true&property_id=eq.{}",
                urlencoding::encode(&id.to_string())
            ),
            None => "/rest/v1/processes?select=id,name&is_active=eq.true".to_string(),
        };
        let processes = self.fetch_items(&process_query).await?;

        let categories = self
            .fetch_items("/rest/v1/main_categories?select=id,name")
            .await?;

        debug!(
            "Reference data loaded: {} floors, {} processes, {} categories",
            floors.len(),
            processes.len(),
            categories.len()
        );

        Ok(ReferenceSet {
            floors,
            processes,
            categories,
        })
    }

    /// Invokes the bulk-create procedure for one batch.
    pub async fn bulk_create(
        &self,
        upload_batch_id: Uuid,
        rows: &[ParsedRequest],
    ) -> Result<BulkCreateResponse, SubmitError> {
        let call = BulkCreateCall {
            p_upload_batch_id: upload_batch_id,
            p_rows: rows.iter().map(WireRow::from).collect(),
        };
        let response = self
            .client
            .post(format!(
                "{}/rest/v1/rpc/bulk_create_maintenance_requests",
                self.base_url
            ))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .json(&call)
            .send()
            .await?
            .error_for_status()?;
        let body: BulkCreateResponse = response.json().await?;
        Ok(body)
    }
}

/// Production submitter: one bulk-create RPC per batch
pub struct HttpBatchSubmitter {
    backend: std::sync::Arc<BackendClient>,
}

impl HttpBatchSubmitter {
    pub fn new(backend: std::sync::Arc<BackendClient>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl BatchSubmitter for HttpBatchSubmitter {
    async fn submit_batch(
        &self,
        upload_batch_id: Uuid,
        rows: &[ParsedRequest],
    ) -> Result<BatchOutcome, SubmitError> {
        let response = self.backend.bulk_create(upload_batch_id, rows).await?;
        if !response.success {
            // Hard failure for the whole batch even if some rows
            // nominally succeeded.
            let detail = response
                .error_details
                .first()
                .map(|f| f.error.clone())
                .unwrap_or_else(|| "no error detail returned".to_string());
            return Err(SubmitError::Rejected(detail));
        }
        Ok(BatchOutcome {
            inserted_count: response.inserted_count,
            failed_count: response.failed_count,
            error_details: response.error_details,
        })
    }

    fn name(&self) -> &'static str {
        "http-bulk-create"
    }
}
