use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use canstat_core::catalog::CatalogEntry;
use canstat_core::pipelines::{run_ingest, run_insights};
use canstat_core::store::{self, DbPool};
use canstat_core::workbook::FileWorkbooks;
use canstat_core::PipelineConfig;
use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "CAN survey table normalization and insight pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Normalize every registered workbook into the canonical store
    Ingest(IngestArgs),
    /// Recompute insight tables from the canonical store
    Insights(StoreArgs),
    /// Ingest, then recompute insights
    Run(IngestArgs),
    /// Print the table catalog of the canonical store
    Catalog(CatalogArgs),
}

#[derive(Args, Debug)]
struct StoreArgs {
    /// Source registry and insight thresholds
    #[arg(long, default_value = "config/sources.toml")]
    config: PathBuf,
    /// Store location; falls back to CANSTAT_DATABASE_URL, then DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,
}

#[derive(Args, Debug)]
struct IngestArgs {
    #[command(flatten)]
    store: StoreArgs,
    /// Directory holding the workbooks, overriding the config file
    #[arg(long)]
    publications_dir: Option<PathBuf>,
    /// Also write the canonical frame to this Parquet file
    #[arg(long)]
    parquet: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CatalogArgs {
    #[arg(long)]
    database_url: Option<String>,
    /// Only list tables from this source
    #[arg(long)]
    source: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Ingest(args) => {
            let config = load_config(&args.store.config, args.publications_dir.as_deref())?;
            let pool = connect_pool(args.store.database_url).await?;
            ingest(&pool, &config, args.parquet.as_deref()).await
        }
        Command::Insights(args) => {
            let config = load_config(&args.config, None)?;
            let pool = connect_pool(args.database_url).await?;
            insights(&pool, &config).await
        }
        Command::Run(args) => {
            let config = load_config(&args.store.config, args.publications_dir.as_deref())?;
            let pool = connect_pool(args.store.database_url).await?;
            ingest(&pool, &config, args.parquet.as_deref()).await?;
            insights(&pool, &config).await
        }
        Command::Catalog(args) => {
            let pool = connect_pool(args.database_url).await?;
            let entries = store::load_catalog(&pool)
                .await
                .context("failed to read catalog; has `ingest` been run?")?;
            let entries: Vec<CatalogEntry> = entries
                .into_iter()
                .filter(|entry| args.source.as_ref().map_or(true, |id| &entry.source_id == id))
                .collect();
            println!("{}", catalog_table(&entries));
            Ok(())
        }
    }
}

async fn ingest(pool: &DbPool, config: &PipelineConfig, parquet: Option<&Path>) -> Result<()> {
    let workbooks = FileWorkbooks::new(&config.publications_dir);
    let outcome = run_ingest(pool, config, &workbooks, parquet)
        .await
        .context("ingestion failed")?;
    println!("{}", serde_json::to_string_pretty(&outcome.batch.summary)?);
    Ok(())
}

async fn insights(pool: &DbPool, config: &PipelineConfig) -> Result<()> {
    let outcome = run_insights(pool, &config.insights)
        .await
        .context("insight scan failed; has `ingest` been run?")?;
    println!("{}", serde_json::to_string_pretty(&outcome.receipt)?);
    Ok(())
}

fn load_config(path: &Path, publications_dir: Option<&Path>) -> Result<PipelineConfig> {
    let mut config = PipelineConfig::load(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    if let Some(dir) = publications_dir {
        config.publications_dir = dir.to_path_buf();
    }
    info!(
        sources = config.sources.len(),
        publications_dir = %config.publications_dir.display(),
        "configuration loaded"
    );
    Ok(config)
}

async fn connect_pool(explicit: Option<String>) -> Result<DbPool> {
    dotenvy::dotenv().ok();
    let database_url = explicit
        .or_else(|| std::env::var("CANSTAT_DATABASE_URL").ok())
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| store::DEFAULT_DATABASE_URL.to_string());
    store::connect(&database_url)
        .await
        .with_context(|| format!("failed to open store at {database_url}"))
}

fn catalog_table(entries: &[CatalogEntry]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Source", "Table", "Title", "Topic", "Variables", "Years", "Records",
        ]);
    for entry in entries {
        table.add_row(vec![
            entry.source_id.clone(),
            entry.table_id.clone(),
            entry.table_title.clone().unwrap_or_default(),
            entry.topic.clone(),
            entry.variables.to_string(),
            format!("{}–{}", entry.year_min, entry.year_max),
            entry.records.to_string(),
        ]);
    }
    table
}
