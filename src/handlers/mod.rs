//! NATS message handlers

pub mod import;
pub mod ping;

use std::sync::Arc;

use anyhow::Result;
use async_nats::Client;
use tokio::select;
use tracing::{error, info};

use crate::backend::BackendClient;
use crate::config::Config;
use import::ImportService;

/// Start all message handlers
pub async fn start_handlers(client: Client, backend: Arc<BackendClient>, config: &Config) -> Result<()> {
    info!("Starting message handlers...");

    let service = Arc::new(ImportService::new(
        client.clone(),
        backend,
        config.batch_size,
    ));

    // Subscribe to all subjects
    let ping_sub = client.subscribe("upkeep.ping").await?;
    let parse_sub = client.subscribe("upkeep.import.parse").await?;
    let confirm_sub = client.subscribe("upkeep.import.confirm").await?;
    let session_sub = client.subscribe("upkeep.import.session").await?;
    let template_sub = client.subscribe("upkeep.import.template").await?;
    let errors_export_sub = client.subscribe("upkeep.import.errors.export").await?;
    let result_export_sub = client.subscribe("upkeep.import.result.export").await?;

    info!("Subscribed to NATS subjects");

    // Clone for each handler
    let client_ping = client.clone();
    let client_parse = client.clone();
    let client_confirm = client.clone();
    let client_session = client.clone();
    let client_template = client.clone();
    let client_errors_export = client.clone();
    let client_result_export = client.clone();

    let service_parse = Arc::clone(&service);
    let service_confirm = Arc::clone(&service);
    let service_session = Arc::clone(&service);
    let service_errors_export = Arc::clone(&service);
    let service_result_export = Arc::clone(&service);

    // Spawn handlers
    let ping_handle = tokio::spawn(async move {
        ping::handle_ping(client_ping, ping_sub).await
    });

    let parse_handle = tokio::spawn(async move {
        import::handle_parse(client_parse, parse_sub, service_parse).await
    });

    let confirm_handle = tokio::spawn(async move {
        import::handle_confirm(client_confirm, confirm_sub, service_confirm).await
    });

    let session_handle = tokio::spawn(async move {
        import::handle_session(client_session, session_sub, service_session).await
    });

    let template_handle = tokio::spawn(async move {
        import::handle_template(client_template, template_sub).await
    });

    let errors_export_handle = tokio::spawn(async move {
        import::handle_errors_export(client_errors_export, errors_export_sub, service_errors_export)
            .await
    });

    let result_export_handle = tokio::spawn(async move {
        import::handle_result_export(client_result_export, result_export_sub, service_result_export)
            .await
    });

    info!("All handlers started, waiting for messages...");

    // Wait for any handler to finish (which means an error occurred)
    select! {
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = parse_handle => {
            error!("Import parse handler finished: {:?}", result);
        }
        result = confirm_handle => {
            error!("Import confirm handler finished: {:?}", result);
        }
        result = session_handle => {
            error!("Import session handler finished: {:?}", result);
        }
        result = template_handle => {
            error!("Template handler finished: {:?}", result);
        }
        result = errors_export_handle => {
            error!("Errors export handler finished: {:?}", result);
        }
        result = result_export_handle => {
            error!("Result export handler finished: {:?}", result);
        }
    }

    Ok(())
}
