//! paperflow CLI — operator interface to the dispatch pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use secrecy::ExposeSecret;

use paperflow_rs::artifact::ArtifactIndex;
use paperflow_rs::catalog::CatalogReader;
use paperflow_rs::config::Config;
use paperflow_rs::db::Db;
use paperflow_rs::dispatch::DispatchConfig;
use paperflow_rs::remote::HttpTaskClient;
use paperflow_rs::run::{RunConfig, RunCoordinator};
use paperflow_rs::sink::{FsResultSink, PayloadStore};
use paperflow_rs::telemetry::{TelemetryConfig, init_telemetry};

#[derive(Parser)]
#[command(name = "paperflow", about = "Document dispatch-and-reconciliation pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline over the unprocessed backlog
    Run {
        /// Directory scanned for input artifacts
        #[arg(long, default_value = "docs/input")]
        input_dir: PathBuf,
        /// Directory result payloads are written to
        #[arg(long, default_value = "docs/processed")]
        output_dir: PathBuf,
        /// Append-only JSONL log of terminal failures
        #[arg(long, default_value = "failures.jsonl")]
        failure_log: PathBuf,
        /// Checkpoint file; enables crash-resumable runs
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },
    /// Report backlog counts without submitting anything
    Scan {
        /// Directory scanned for input artifacts
        #[arg(long, default_value = "docs/input")]
        input_dir: PathBuf,
        /// Output directory checked for already-written payloads
        #[arg(long, default_value = "docs/processed")]
        output_dir: PathBuf,
    },
    /// Issue completion markers for payloads already on disk
    Repair {
        /// Directory holding persisted payloads
        #[arg(long, default_value = "docs/processed")]
        output_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = Config::from_env()?;
    let _guard = init_telemetry(TelemetryConfig {
        endpoint: config.otel_endpoint.clone(),
        service_name: "paperflow".to_string(),
    })?;

    let db = Arc::new(
        Db::connect(
            config.database_url.expose_secret(),
            config.max_db_connections,
        )
        .await?,
    );
    db.migrate().await?;
    db.health_check().await?;

    match cli.command {
        Command::Run {
            input_dir,
            output_dir,
            failure_log,
            checkpoint,
        } => cmd_run(db, &config, input_dir, output_dir, failure_log, checkpoint).await,
        Command::Scan {
            input_dir,
            output_dir,
        } => cmd_scan(db, &config, input_dir, output_dir).await,
        Command::Repair { output_dir } => cmd_repair(db, output_dir).await,
    }
}

async fn cmd_run(
    db: Arc<Db>,
    config: &Config,
    input_dir: PathBuf,
    output_dir: PathBuf,
    failure_log: PathBuf,
    checkpoint: Option<PathBuf>,
) -> anyhow::Result<()> {
    let client = HttpTaskClient::from_config(config)?;
    let sink = FsResultSink::new(PayloadStore::new(&output_dir), Arc::clone(&db));

    let coordinator = RunCoordinator::new(
        db,
        &client,
        &sink,
        DispatchConfig::from_config(config),
        RunConfig {
            input_dir,
            output_dir,
            failure_log: failure_log.clone(),
            checkpoint_path: checkpoint,
            batch_size: config.batch_size,
            page_size: config.page_size,
            batch_interval: config.batch_interval,
        },
    );

    let summary = coordinator.run().await?;

    println!("Dispatched:   {}", summary.dispatched);
    println!("Succeeded:    {}", summary.successes);
    println!("Failed:       {}", summary.failures);
    println!("DB failures:  {}", summary.db_failures);
    println!(
        "Skipped:      {} missing artifact, {} missing DOI, {} already persisted",
        summary.skipped.missing_artifact, summary.skipped.missing_doi, summary.skipped.already_persisted
    );
    if summary.failures > 0 || summary.db_failures > 0 {
        println!("Failure log:  {}", failure_log.display());
    }
    Ok(())
}

async fn cmd_scan(
    db: Arc<Db>,
    config: &Config,
    input_dir: PathBuf,
    output_dir: PathBuf,
) -> anyhow::Result<()> {
    let unprocessed = db.count_unprocessed().await?;
    let index = ArtifactIndex::build(&input_dir);
    println!("Unprocessed rows:  {unprocessed}");
    println!("Artifacts on disk: {}", index.len());

    let mut reader = CatalogReader::new(db, index, &output_dir, config.page_size, None);
    let mut ready: u64 = 0;
    while reader.next().await?.is_some() {
        ready += 1;
    }
    let skips = reader.skip_stats();
    println!("Ready to submit:   {ready}");
    println!(
        "Skipped:           {} missing artifact, {} missing DOI, {} already persisted",
        skips.missing_artifact, skips.missing_doi, skips.already_persisted
    );
    Ok(())
}

async fn cmd_repair(db: Arc<Db>, output_dir: PathBuf) -> anyhow::Result<()> {
    let store = PayloadStore::new(&output_dir);
    let ids = store.persisted_ids()?;
    if ids.is_empty() {
        println!("No persisted payloads found under {}", output_dir.display());
        return Ok(());
    }
    let updated = db.mark_processed_many(&ids).await?;
    println!("Payloads on disk:  {}", ids.len());
    println!("Markers issued:    {updated}");
    Ok(())
}
