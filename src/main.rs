//! MeshHub: CAD to OBJ LOD conversion service.
//!
//! Main entry point that wires the crates together and runs one command.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;
use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use meshhub_converter::ConversionOrchestrator;
use meshhub_converter::executor::ToolStatus;
use meshhub_core::config::AppConfig;
use meshhub_core::error::AppError;
use meshhub_core::traits::metadata::MetadataService;
use meshhub_core::traits::store::ArtifactStore;
use meshhub_core::types::{ArtifactKey, BinaryResource, ConversionJob};
use meshhub_storage::{InMemoryMetadataService, LocalArtifactStore};
use meshhub_worker::jobs::{CONVERSION_JOB_TYPE, ConversionJobHandler};
use meshhub_worker::{JobExecutor, WorkerPool};

/// MeshHub command-line interface
#[derive(Debug, Parser)]
#[command(name = "meshhub", version, about = "CAD to OBJ LOD conversion")]
struct Cli {
    /// Explicit configuration file, layered over config/default.toml
    #[arg(long, global = true)]
    config: Option<String>,

    /// Environment overlay name (config/<env>.toml)
    #[arg(long, global = true, default_value = "development")]
    env: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert one stored CAD file into OBJ levels of detail
    Convert {
        /// Artifact key the geometries are attached to
        #[arg(long)]
        key: String,
        /// Source file path relative to the store root
        #[arg(long)]
        source: String,
    },
    /// Report availability of the external conversion tools
    Tools,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref(), &cli.env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(cli.command, config).await {
        tracing::error!("MeshHub error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

async fn run(command: Command, config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting MeshHub v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(LocalArtifactStore::from_config(&config.storage).await?);
    tracing::info!(
        provider = store.provider_type(),
        root = %store.root().display(),
        "Artifact store ready"
    );
    let metadata = Arc::new(InMemoryMetadataService::new());
    let orchestrator = Arc::new(ConversionOrchestrator::new(
        &config.conversion,
        store.clone(),
        metadata.clone(),
    ));

    let tools = orchestrator.check_tools();
    for tool in &tools {
        match tool.status {
            ToolStatus::Available => tracing::info!(
                component = %tool.component,
                path = %tool.configured.display(),
                "Tool available"
            ),
            _ => tracing::warn!(
                component = %tool.component,
                path = %tool.configured.display(),
                status = ?tool.status,
                "Tool not usable"
            ),
        }
    }

    match command {
        Command::Tools => print_json(&json!({ "tools": tools })),
        Command::Convert { key, source } => {
            let path = store.resolve(&source)?;
            let size = tokio::fs::metadata(&path)
                .await
                .map_err(|e| AppError::not_found(format!("Source '{}': {}", source, e)))?
                .len();
            let key = ArtifactKey::new(key);
            let job = ConversionJob::new(key.clone(), BinaryResource::new(source, size));

            if config.worker.enabled {
                let mut executor = JobExecutor::new();
                executor.register(Arc::new(ConversionJobHandler::new(orchestrator.clone())));
                let pool = WorkerPool::start(Arc::new(executor), config.worker.clone());

                let ack = pool
                    .submit(CONVERSION_JOB_TYPE, ConversionJobHandler::payload(&job)?)
                    .await?;
                tracing::info!(job_id = %ack.job_id, "Conversion job submitted");

                if !pool.shutdown().await {
                    return Err(AppError::service_unavailable(
                        "Conversion did not finish within the shutdown grace period",
                    ));
                }
            } else {
                orchestrator.convert(job).await;
            }

            let record = metadata.get_conversion(&key).await?;
            print_json(&json!({
                "record": record,
                "lods": metadata.geometries(&key),
                "materials": metadata.attached_files(&key),
                "metrics": orchestrator.metrics_snapshot(),
            }))
        }
    }
}

fn print_json(value: &serde_json::Value) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
