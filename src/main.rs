//! Discogs-Chain main entry point
//!
//! This is the command-line interface for the catalog crawler.

use anyhow::Context;
use clap::Parser;
use discogs_chain::config::{load_config_with_hash, Config};
use discogs_chain::crawler::{run_crawl, starting_cursor};
use discogs_chain::storage::{JsonlLinkQueue, JsonlRecordSink, LinkQueue};
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Discogs-Chain: a resumable catalog crawler
///
/// Walks search-results pages, and for every entry fetches its detail page
/// and its artist page before appending one record. Pending links survive
/// restarts.
#[derive(Parser, Debug)]
#[command(name = "discogs-chain")]
#[command(version)]
#[command(about = "A resumable catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Discard pending links and the cursor checkpoint before crawling
    #[arg(long)]
    fresh: bool,

    /// Validate config and show where the crawl would start without crawling
    #[arg(long, conflicts_with_all = ["stats", "fresh"])]
    dry_run: bool,

    /// Show statistics from the queue and record files and exit
    #[arg(long, conflicts_with_all = ["dry_run", "fresh"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("discogs_chain=info,warn"),
            1 => EnvFilter::new("discogs_chain=debug,info"),
            2 => EnvFilter::new("discogs_chain=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the resolved configuration and start point
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Discogs-Chain Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Category: {}", config.site.category_filter);
    println!("  Page size: {}", config.site.page_size);
    println!("  Start page: {}", config.site.start_page);

    println!("\nFetch:");
    println!("  Wait for load: {}", config.fetch.wait_for_load);
    println!("  Settle delay: {}ms", config.fetch.settle_delay_ms);
    println!("  Timeout: {}ms", config.fetch.timeout_ms);
    println!(
        "  Retries: {} (base delay {}ms)",
        config.fetch.max_retries, config.fetch.retry_base_delay_ms
    );

    println!("\nOutput:");
    println!("  Link queue: {}", config.output.queue_path);
    println!("  Records: {}", config.output.records_path);
    if let Some(cursor_path) = &config.output.cursor_path {
        println!("  Cursor checkpoint: {}", cursor_path);
    }

    println!("\nTermination:");
    match config.crawl.max_empty_pages {
        Some(max) => println!("  After {} consecutive empty pages", max),
        None => println!("  Never on empty pages"),
    }
    if let Some(max) = config.crawl.max_records {
        println!("  After {} records", max);
    }

    let queue = JsonlLinkQueue::open(Path::new(&config.output.queue_path))?;
    let sink = JsonlRecordSink::open(Path::new(&config.output.records_path))?;
    let cursor = starting_cursor(config, &queue, &sink)?;

    println!("\n✓ Configuration is valid");
    println!("✓ First search page: {}", cursor.next_search_url());
    println!("✓ Next record id: {}", cursor.sequence_counter() + 1);
    println!("✓ Pending links: {}", queue.len());
    if !queue.is_empty() {
        println!("  (a crawl would drain these before searching)");
    }

    Ok(())
}

/// Handles the --stats mode: summarizes the queue and record files
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use discogs_chain::output::{load_statistics, print_statistics};

    println!("Records: {}", config.output.records_path);
    println!("Link queue: {}\n", config.output.queue_path);

    let queue = JsonlLinkQueue::open(Path::new(&config.output.queue_path))?;
    let sink = JsonlRecordSink::open(Path::new(&config.output.records_path))?;

    let stats = load_statistics(&queue, &sink)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, fresh: bool) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh crawl (discarding pending links)");
    } else {
        tracing::info!("Starting crawl (will resume pending links if any)");
    }

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, finishing the current entry");
            let _ = stop_tx.send(true);
        }
    });

    match run_crawl(&config, fresh, Some(stop_rx)).await {
        Ok(report) => {
            tracing::info!(
                "Crawl finished ({:?}): {} records, last id {}",
                report.outcome,
                report.records_emitted,
                report.last_sequence_id
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
