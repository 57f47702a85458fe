//! Vessel crawler utility

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use vessel_crawler::{
    config::AppConfig,
    crawler::{Crawler, CrawlerBuilder},
    database::{PostgresStore, SqliteStore},
    errors::CrawlerError,
    fetch::PageFetcher,
    output::{CsvLog, PageCache},
    page::{PageOutcome, VesselPage},
};

#[derive(Parser)]
#[command(version, about = "Scrape vessel detail pages into a registry and position log")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Sweep the configured vessels forever (default)
    Run,
    /// Sweep the configured vessels once and exit
    Once,
    /// Extract a saved vessel page and print the result as JSON
    Inspect {
        /// HTML file, e.g. the page cache
        path: PathBuf,
        /// URL recorded in the output
        #[arg(long, default_value = "")]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), CrawlerError> {
    #[cfg(feature = "dotenvy")]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Run) {
        Command::Inspect { path, url } => inspect(&path, &url).await,
        Command::Once => {
            let crawler = build_crawler().await?;
            crawler.sweep().await;
            Ok(())
        }
        Command::Run => {
            let crawler = build_crawler().await?;

            tokio::select! {
                _ = crawler.run() => {}
                _ = signal::ctrl_c() => {
                    info!("Received shutdown signal");
                }
            }

            // Store pools are closed when the crawler is dropped
            Ok(())
        }
    }
}

/// Load configuration and open every configured store
async fn build_crawler() -> Result<Crawler, CrawlerError> {
    let config = AppConfig::load()?;
    config.validate()?;

    let mut builder = CrawlerBuilder::new(PageFetcher::new(&config.crawler)?)
        .urls(config.crawler.urls.clone())
        .sweep_interval(config.crawler.sweep_interval);

    if let Some(sqlite) = &config.stores.sqlite {
        builder = builder.store(Box::new(SqliteStore::connect(sqlite).await?));
    }
    if let Some(postgres) = &config.stores.postgres {
        builder = builder.store(Box::new(PostgresStore::connect(postgres).await?));
    }
    if let Some(path) = config.output.cache_path {
        builder = builder.cache(PageCache::new(path));
    }
    if let Some(path) = config.output.csv_path {
        builder = builder.csv(CsvLog::new(path));
    }

    Ok(builder.build())
}

async fn inspect(path: &Path, url: &str) -> Result<(), CrawlerError> {
    let html = tokio::fs::read_to_string(path).await?;
    match VesselPage::parse(&html).extract(url) {
        PageOutcome::Report(report) => println!("{}", serde_json::to_string_pretty(&report)?),
        PageOutcome::Unavailable => println!("Vessel temporarily not in source database"),
    }
    Ok(())
}
