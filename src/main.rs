use anyhow::Context;
use clap::{Parser, Subcommand};
use seattle_events::app::ports::{CheckpointPort, HttpClientPort};
use seattle_events::config::Config;
use seattle_events::infra::{FsCheckpoint, ReqwestHttp};
use seattle_events::observability::{init_logging, init_metrics};
use seattle_events::pipeline::{Pipeline, PipelineResult};
use seattle_events::storage::EventStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "seattle_events")]
#[command(about = "Visit Seattle event scraper with geocoding and weather enrichment")]
#[command(version)]
struct Cli {
    /// TOML configuration file; defaults apply when it does not exist
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Directory for the rolling JSON log
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the paginated index and checkpoint the event links
    Crawl,
    /// Enrich every checkpointed link and checkpoint the records
    Enrich,
    /// Insert the checkpointed records into the events table
    Store,
    /// Crawl, enrich and store in one go
    Run,
}

fn open_store(config: &Config) -> anyhow::Result<EventStore> {
    EventStore::open(&config.storage.database_path).with_context(|| {
        format!(
            "opening event database at {}",
            config.storage.database_path.display()
        )
    })
}

fn print_summary(result: &PipelineResult) {
    println!("\n📊 Run summary:");
    println!("   Links discovered: {}", result.links_discovered);
    println!("   Records enriched: {}", result.records_enriched);
    println!("   Rows inserted:    {}", result.rows_inserted);
    println!("   Already stored:   {}", result.rows_already_present);
    if result.geocode_fallbacks > 0 {
        println!("   Geocode fallbacks: {}", result.geocode_fallbacks);
    }
    if result.forecasts_missing > 0 {
        println!("   Without forecast:  {}", result.forecasts_missing);
    }
    if !result.failed_index_pages.is_empty() {
        println!("   ⚠️  Index pages skipped: {:?}", result.failed_index_pages);
    }
    if !result.skipped.is_empty() {
        println!("\n⚠️  Skipped {} item(s):", result.skipped.len());
        for item in &result.skipped {
            let stage = item
                .stage
                .map(|s| s.to_string())
                .unwrap_or_else(|| "task".to_string());
            println!("   - [{}] {}: {}", stage, item.link, item.reason);
        }
    }
}

async fn execute(
    command: Commands,
    config: &Config,
    pipeline: &Pipeline,
) -> anyhow::Result<PipelineResult> {
    let result = match command {
        Commands::Crawl => {
            println!("🔎 Crawling index pages...");
            pipeline.crawl_only().await?
        }
        Commands::Enrich => {
            println!("🔧 Enriching checkpointed links...");
            pipeline.enrich_from_checkpoint().await?
        }
        Commands::Store => {
            println!("💾 Storing checkpointed records...");
            let mut store = open_store(config)?;
            pipeline.store_from_checkpoint(&mut store).await?
        }
        Commands::Run => {
            println!("🚀 Running full pipeline...");
            let mut store = open_store(config)?;
            pipeline.run(&mut store).await?
        }
    };
    Ok(result)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = init_logging(&cli.log_dir);
    init_metrics();

    let config = Config::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    info!(data_dir = %config.storage.data_dir.display(), "Configuration loaded");

    let http: Arc<dyn HttpClientPort> = Arc::new(ReqwestHttp::new(&config.http)?);
    let checkpoint: Arc<dyn CheckpointPort> =
        Arc::new(FsCheckpoint::new(config.storage.data_dir.clone()));
    let pipeline = Pipeline::new(&config, http, checkpoint)?;

    match execute(cli.command, &config, &pipeline).await {
        Ok(result) => {
            print_summary(&result);
            println!("\n✅ Done");
            Ok(())
        }
        Err(e) => {
            error!("Run aborted: {:#}", e);
            println!("❌ Run aborted: {:#}", e);
            Err(e)
        }
    }
}
