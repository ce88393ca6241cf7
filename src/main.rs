//! site-sync main entry point
//!
//! This is the command-line interface that crawls a site and keeps a search
//! index in step with it.

use clap::Parser;
use site_sync::config::{load_config_with_hash, Config};
use site_sync::{SyncOptions, SyncReport, Syncer};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// site-sync: crawl a website into records and sync them into a search index
///
/// site-sync extracts one or more records from every page it visits using
/// CSS selectors, stores them in a local dataset and applies the minimal
/// add/update/remove diff to the search index.
#[derive(Parser, Debug)]
#[command(name = "site-sync")]
#[command(version = "1.0.0")]
#[command(about = "Crawl a website and sync its records into a search index", long_about = None)]
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

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "crawl_only", "diff_only"])]
    dry_run: bool,

    /// Show statistics of the latest run from the dataset and exit
    #[arg(long, conflicts_with_all = ["dry_run", "crawl_only", "diff_only"])]
    stats: bool,

    /// Crawl into the dataset without touching the index
    #[arg(long, conflicts_with = "diff_only")]
    crawl_only: bool,

    /// Crawl and compute the index diff without writing it
    #[arg(long)]
    diff_only: bool,

    /// Reconcile the index even if the crawl was interrupted
    #[arg(long)]
    accept_partial: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        let options = SyncOptions {
            crawl_only: cli.crawl_only,
            accept_partial: cli.accept_partial || config.accept_partial,
            dry_run: cli.diff_only,
        };
        handle_sync(config, config_hash, options).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_sync=info,warn"),
            1 => EnvFilter::new("site_sync=debug,info"),
            2 => EnvFilter::new("site_sync=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== site-sync Dry Run ===\n");

    println!("Crawler: {}", config.crawler_name);
    println!(
        "  Page function: {}",
        config.page_function.as_deref().unwrap_or("default")
    );
    println!("  Max concurrency: {}", config.crawler.max_concurrency);
    println!("  Max request retries: {}", config.crawler.max_request_retries);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!("  User agent: {}", config.crawler.user_agent);
    println!(
        "  Link discovery: {}",
        if config.disable_crawler_cascade {
            "disabled".to_string()
        } else {
            format!("enabled ('{}')", config.link_selector())
        }
    );

    let seeds = config.seed_urls();
    println!("\nSeeds ({}):", seeds.len());
    for seed in seeds {
        println!("  - {}", seed);
    }

    let pseudo_urls = config.effective_pseudo_urls();
    println!("\nPseudo-URLs ({}):", pseudo_urls.len());
    for pattern in &pseudo_urls {
        println!("  - {}", pattern);
    }

    println!("\nSelectors ({}):", config.selectors.len());
    for entry in &config.selectors {
        println!("  - {}: {}", entry.key, entry.value);
    }
    println!(
        "  Required attributes: {}",
        config.effective_required_attributes().join(", ")
    );

    println!("\nIndex:");
    println!("  Base URL: {}", config.index.base_url);
    println!("  Index name: {}", config.index.index_name);
    println!("  Browse batch size: {}", config.index.browse_batch_size);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling with {} seed URLs", seeds.len());

    Ok(())
}

/// Handles the --stats mode: shows statistics from the dataset
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use site_sync::output::{load_statistics, print_statistics};
    use site_sync::storage::open_dataset;
    use std::path::Path;

    println!("Database: {}\n", config.output.database_path);

    let dataset = open_dataset(Path::new(&config.output.database_path))?;

    match load_statistics(&dataset)? {
        Some(stats) => print_statistics(&stats),
        None => println!("No runs recorded yet"),
    }

    Ok(())
}

/// Handles the main sync operation
async fn handle_sync(
    config: Config,
    config_hash: String,
    options: SyncOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let syncer = Syncer::from_config(config, config_hash, options)?;

    let abort = syncer.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing pages in flight");
            abort.abort();
        }
    });

    match syncer.run().await {
        Ok(report) => {
            log_report(&report);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Sync failed: {}", e);
            Err(e.into())
        }
    }
}

fn log_report(report: &SyncReport) {
    tracing::info!(
        "Run {}: {} page(s) done, {} failed, {} record(s)",
        report.run_id,
        report.crawl.pages_done,
        report.crawl.pages_failed,
        report.crawl.records_persisted
    );

    if let Some(reconcile) = &report.reconcile {
        tracing::info!(
            "Index: {} added, {} updated, {} removed",
            reconcile.write.added,
            reconcile.write.updated,
            reconcile.write.removed
        );
    }
}
