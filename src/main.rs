//! Upkeep Worker - Backend import service for the Upkeep
//! facilities-management platform.
//!
//! Connects to NATS and drives bulk maintenance-request imports:
//! spreadsheet parsing, validation against backend reference data, and
//! batched submission through the backend's bulk-create procedure.

mod backend;
mod cli;
mod config;
mod handlers;
mod services;
mod types;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use backend::{BackendClient, HttpBatchSubmitter};
use cli::{Cli, Command};
use config::Config;
use services::pipeline::process_rows;
use services::rules::DEFAULT_RULES;
use services::spreadsheet::{parse_spreadsheet, template_csv};
use services::submitter::run_batches;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs directory - use LOGS_DIR env var or default to ./logs
    let logs_dir = std::env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(Rotation::DAILY, &logs_dir, "worker.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging - both stdout and file
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,upkeep_worker=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer()) // stdout
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        ) // file
        .init();

    let args = Cli::parse();
    match args.command {
        None | Some(Command::Serve) => serve().await,
        Some(Command::Template { output }) => write_template(&output),
        Some(Command::Preview { file }) => preview_file(&file).await,
        Some(Command::Import { file }) => import_file(&file).await,
    }
}

async fn serve() -> Result<()> {
    info!("Starting Upkeep Worker...");

    let config = Config::from_env()?;
    info!("Configuration loaded");

    let backend = Arc::new(BackendClient::new(
        &config.backend_url,
        &config.backend_api_key,
        config.property_id,
    )?);
    info!("Backend client initialized for {}", config.backend_url);

    // Connect to NATS (supports optional NATS_USER/NATS_PASSWORD auth).
    let nats_client = match (std::env::var("NATS_USER"), std::env::var("NATS_PASSWORD")) {
        (Ok(user), Ok(password)) if !user.is_empty() => {
            async_nats::ConnectOptions::new()
                .user_and_password(user, password)
                .connect(&config.nats_url)
                .await?
        }
        _ => async_nats::connect(&config.nats_url).await?,
    };
    info!("Connected to NATS at {}", config.nats_url);

    let handler_result = handlers::start_handlers(nats_client, backend, &config).await;

    if let Err(e) = handler_result {
        error!("Handler error: {}", e);
        return Err(e);
    }

    Ok(())
}

fn write_template(output: &Path) -> Result<()> {
    let bytes = template_csv()?;
    std::fs::write(output, bytes)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Template written to {}", output.display());
    Ok(())
}

async fn preview_file(file: &Path) -> Result<()> {
    let config = Config::from_env()?;
    let backend = BackendClient::new(
        &config.backend_url,
        &config.backend_api_key,
        config.property_id,
    )?;

    let outcome = parse_file(file, &backend).await?;

    println!(
        "{}: {} rows, {} valid, {} with errors",
        file.display(),
        outcome.total_rows,
        outcome.requests.len(),
        outcome.error_row_count()
    );
    for err in &outcome.errors {
        println!(
            "  row {}: [{}] {}",
            err.row_number, err.field, err.message
        );
    }
    Ok(())
}

async fn import_file(file: &Path) -> Result<()> {
    let config = Config::from_env()?;
    let backend = Arc::new(BackendClient::new(
        &config.backend_url,
        &config.backend_api_key,
        config.property_id,
    )?);

    let outcome = parse_file(file, &backend).await?;
    if !outcome.errors.is_empty() {
        for err in &outcome.errors {
            println!(
                "  row {}: [{}] {}",
                err.row_number, err.field, err.message
            );
        }
        anyhow::bail!(
            "{} rows have validation errors; fix the file and retry",
            outcome.error_row_count()
        );
    }
    if outcome.requests.is_empty() {
        anyhow::bail!("no valid rows to import");
    }

    let submitter = HttpBatchSubmitter::new(Arc::clone(&backend));
    let report = run_batches(
        &submitter,
        Uuid::new_v4(),
        &outcome.requests,
        config.batch_size,
        |p| {
            println!(
                "  batch {}/{} ({}%): {} created, {} failed",
                p.batches_done, p.batch_total, p.percent, p.success_count, p.error_count
            );
        },
    )
    .await;

    println!(
        "Done: {} created, {} failed",
        report.result.success_count, report.result.error_count
    );
    for failure in &report.result.error_details {
        println!("  row {}: {}", failure.row, failure.error);
    }
    if let Some(e) = report.abort_error {
        anyhow::bail!("import aborted: {}", e);
    }
    Ok(())
}

async fn parse_file(file: &Path, backend: &BackendClient) -> Result<services::pipeline::ParseOutcome> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let refs = backend.fetch_reference_data().await?;
    let raw_rows = parse_spreadsheet(&file_name, &bytes)?;
    Ok(process_rows(&raw_rows, &DEFAULT_RULES, &refs))
}
