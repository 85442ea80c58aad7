//! Configuration management

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::services::submitter::DEFAULT_BATCH_SIZE;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// NATS server URL
    pub nats_url: String,

    /// Hosted backend base URL
    pub backend_url: String,

    /// Service-role key for the hosted backend
    pub backend_api_key: String,

    /// Property whose processes are imported (optional filter)
    pub property_id: Option<Uuid>,

    /// Rows per bulk-create call
    pub batch_size: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let nats_url = std::env::var("NATS_URL")
            .unwrap_or_else(|_| "nats://localhost:4222".to_string());

        let backend_url = std::env::var("BACKEND_URL")
            .context("BACKEND_URL must be set")?;

        let backend_api_key = std::env::var("BACKEND_API_KEY")
            .context("BACKEND_API_KEY must be set")?;

        let property_id = match std::env::var("PROPERTY_ID") {
            Ok(raw) if !raw.is_empty() => Some(
                raw.parse::<Uuid>()
                    .context("PROPERTY_ID must be a UUID")?,
            ),
            _ => None,
        };

        let batch_size = match std::env::var("IMPORT_BATCH_SIZE") {
            Ok(raw) => {
                let size: usize = raw
                    .parse()
                    .context("IMPORT_BATCH_SIZE must be a positive integer")?;
                if size == 0 {
                    anyhow::bail!("IMPORT_BATCH_SIZE must be at least 1");
                }
                size
            }
            Err(_) => DEFAULT_BATCH_SIZE,
        };

        Ok(Self {
            nats_url,
            backend_url,
            backend_api_key,
            property_id,
            batch_size,
        })
    }
}
