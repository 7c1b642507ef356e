//! sima-import - Bulk member import CLI
//!
//! Drives the two-phase import workflow from the command line: preview an
//! upload, commit a previewed batch, inspect a batch.

use anyhow::Result;
use clap::{Parser, Subcommand};
use sima_common::config;
use sima_import::ImportPipeline;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "sima-import", about = "SIMANGGOTA bulk member import")]
struct Cli {
    /// Data directory (overrides SIMA_DATA_DIR and the config file)
    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store and validate an upload without touching any member
    Preview {
        /// Spreadsheet file to import
        file: PathBuf,
        /// Scope the batch to one organization unit; omit for a
        /// multi-unit upload where each row names its own unit
        #[arg(long)]
        unit: Option<i64>,
        /// Who submitted the upload
        #[arg(long, default_value = "cli")]
        submitted_by: String,
    },
    /// Commit a previewed batch
    Commit {
        /// Batch id printed by preview
        batch_id: Uuid,
    },
    /// Show a batch's status and stored row errors
    Status {
        batch_id: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    let data_dir = config::resolve_data_dir(cli.data_dir.as_deref());
    config::ensure_data_dir(&data_dir)?;
    info!("Data directory: {}", data_dir.display());

    let pool = sima_common::db::init_database(&config::database_path(&data_dir)).await?;
    let pipeline = ImportPipeline::new(pool, data_dir);

    let report = match cli.command {
        Command::Preview {
            file,
            unit,
            submitted_by,
        } => {
            let bytes = std::fs::read(&file)?;
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload.csv");
            pipeline.preview(&submitted_by, unit, filename, &bytes).await?
        }
        Command::Commit { batch_id } => pipeline.commit(batch_id).await?,
        Command::Status { batch_id } => pipeline.status(batch_id).await?,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
