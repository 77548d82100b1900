mod aggregator;
mod browser;
mod buffer;
mod config;
mod error;
mod models;
mod normalizer;
mod orchestrator;
mod pagination;
mod report;
mod scrapers;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use aggregator::aggregate_store;
use browser::ChromeSession;
use buffer::{BufferStore, FsBufferStore};
use config::Config;
use models::Origin;
use orchestrator::Orchestrator;
use report::{write_outputs, HtmlTableRenderer, DEFAULT_ROWS_PER_PAGE};

/// Rental listing aggregator for OLX, Viva Real, Zap Imóveis and NetImoveis
#[derive(Parser, Debug)]
#[command(name = "rental-scout", version, about)]
struct Args {
    /// Path to the JSON config with start URLs per source
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Directory holding per-source listing batches
    #[arg(long, default_value = "buffer")]
    buffer_dir: PathBuf,

    /// Directory for the aggregated JSON and HTML report
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Empty the buffer before crawling
    #[arg(long)]
    clear_buffer: bool,

    /// Skip crawling and aggregate whatever the buffer already holds
    #[arg(long)]
    aggregate_only: bool,

    /// Table rows per page in the HTML report
    #[arg(long, default_value_t = DEFAULT_ROWS_PER_PAGE)]
    rows_per_page: usize,

    /// Show the browser window
    #[arg(long)]
    headful: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    info!("🏠 Rental Scout");
    info!("===============");

    let config = Config::from_file(&args.config)
        .await
        .with_context(|| format!("loading {}", args.config.display()))?;
    info!(
        "Loaded {} start URLs across {} sources",
        config.start_url_count(),
        config.sources.len()
    );

    let store = Arc::new(FsBufferStore::new(&args.buffer_dir));
    if args.clear_buffer {
        store
            .clear()
            .await
            .with_context(|| format!("clearing {}", args.buffer_dir.display()))?;
        info!("🧹 Cleared buffer at {}", store.root().display());
    }

    if args.aggregate_only {
        info!("Skipping crawl, aggregating buffered batches only");
        for origin in Origin::ALL {
            match store.list(origin).await {
                Ok(batches) => info!("{}: {} buffered batches", origin, batches.len()),
                Err(e) => warn!("{}: could not list buffered batches: {}", origin, e),
            }
        }
    } else {
        let mut chrome_options = config.crawl.chrome_options();
        if args.headful {
            chrome_options.headless = false;
        }
        let browser = tokio::task::spawn_blocking(move || ChromeSession::launch(chrome_options))
            .await
            .context("browser launch task")??;

        let orchestrator = Orchestrator::new(Arc::new(browser), store.clone(), config.crawl.pagination_limits());
        let summary = orchestrator.run(config.jobs()).await;

        for report in summary.sources.iter().filter(|report| !report.is_clean()) {
            for failure in &report.failures {
                warn!("{}: {}", report.origin, failure);
            }
        }
    }

    let listings = match aggregate_store(store.as_ref(), &config.filter).await {
        Ok((listings, _)) => listings,
        Err(e) => {
            error!("Aggregation failed: {}", e);
            return Ok(());
        }
    };

    match write_outputs(&args.output_dir, &listings, &HtmlTableRenderer::new(args.rows_per_page)).await {
        Ok(paths) => info!(
            "✅ {} listings written to {} and {}",
            listings.len(),
            paths.json.display(),
            paths.html.display()
        ),
        Err(e) => error!("Could not write outputs: {}", e),
    }

    Ok(())
}
