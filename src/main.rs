//! Calendar Harvest main entry point
//!
//! This is the command-line interface for the course calendar harvester.

use anyhow::Context;
use calendar_harvest::config::{load_config_with_hash, Config};
use calendar_harvest::crawler::harvest;
use calendar_harvest::output::{load_statistics, print_run_summary, print_statistics};
use calendar_harvest::storage::{open_storage, PoolLimits};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Calendar Harvest: a polite course-calendar harvester
///
/// Crawls the course and program listings of a course calendar, one
/// request at a time, and loads the records into SQLite as one batch.
#[derive(Parser, Debug)]
#[command(name = "calendar-harvest")]
#[command(version)]
#[command(about = "A polite course-calendar harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Override the database path from the configuration
    #[arg(long, env = "HARVEST_DATABASE", value_name = "PATH")]
    database: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be harvested without fetching anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("couldn't load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if let Some(path) = cli.database {
        tracing::info!("Using database override: {}", path);
        config.database.path = path;
    }

    if cli.dry_run {
        handle_dry_run(&config);
        Ok(())
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_harvest(&config, &config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("calendar_harvest=info,warn"),
            1 => EnvFilter::new("calendar_harvest=debug,info"),
            2 => EnvFilter::new("calendar_harvest=trace,debug"),
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

/// Handles the --dry-run mode: shows what a harvest would do
fn handle_dry_run(config: &Config) {
    println!("=== Calendar Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Allowed domain: {}", config.site.allowed_domain);
    println!("  Course seed: {}", config.site.course_seed);
    println!("  Subject area seed: {}", config.site.subject_area_seed);

    println!("\nFetcher:");
    println!("  Base delay: {}ms", config.fetcher.base_delay_ms);
    println!("  Jitter: up to {}ms", config.fetcher.jitter_ms);
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    println!("  User agent: {}", config.fetcher.user_agent);
    if config.fetcher.proxies.is_empty() {
        println!("  Proxies: none (direct connections)");
    } else {
        println!("  Proxies ({}):", config.fetcher.proxies.len());
        for proxy in &config.fetcher.proxies {
            println!("    - {}", proxy);
        }
    }

    let limits = PoolLimits::from_config(&config.database);
    println!("\nDatabase:");
    println!("  Path: {}", config.database.path);
    println!("  Course table: {}", config.database.course_table);
    println!("  Program table: {}", config.database.program_table);
    println!(
        "  Pool: max open {}, max idle {}, max lifetime {:?}",
        limits.max_open, limits.max_idle, limits.max_lifetime
    );

    println!("\n✓ Configuration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.database.path);

    let storage = open_storage(&config.database)?;
    let stats = load_statistics(&storage).context("couldn't read statistics")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest operation
async fn handle_harvest(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    match harvest(config, config_hash).await {
        Ok(summary) => {
            if summary.report.is_complete() {
                tracing::info!("Harvest completed successfully");
            } else {
                tracing::warn!("Harvest completed with failed sequences");
            }
            print_run_summary(&summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e).context("couldn't complete harvest")
        }
    }
}
