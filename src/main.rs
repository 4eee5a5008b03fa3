//! Title-Trawler main entry point
//!
//! This is the command-line interface for the Title-Trawler page harvester.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use title_trawler::cache::{open_cache, CacheStore};
use title_trawler::config::{load_config_with_hash, Config, OutputFormat};
use title_trawler::crawler::run_crawl;
use title_trawler::output::{print_cache_statistics, scan_cache};
use title_trawler::ShardAddressor;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Title-Trawler: a resumable movie-page harvester
///
/// Title-Trawler walks a catalog of title identifiers, fetches each title's
/// page, extracts structured records and archives the raw page in a sharded
/// cache. Interrupted runs resume by skipping titles already archived.
#[derive(Parser, Debug)]
#[command(name = "title-trawler")]
#[command(version)]
#[command(about = "A resumable movie-page harvester", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "inspect"])]
    dry_run: bool,

    /// Show cache statistics and exit
    #[arg(long, conflicts_with_all = ["dry_run", "inspect"])]
    stats: bool,

    /// Print the cached page for an identifier (or identifier-bearing URL) and exit
    #[arg(long, value_name = "KEY", conflicts_with_all = ["dry_run", "stats"])]
    inspect: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
    } else if cli.stats {
        handle_stats(&config)?;
    } else if let Some(key) = &cli.inspect {
        handle_inspect(&config, key)?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("title_trawler=info,warn"),
            1 => EnvFilter::new("title_trawler=debug,info"),
            2 => EnvFilter::new("title_trawler=trace,debug"),
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

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Title-Trawler Dry Run ===\n");

    println!("Crawler:");
    println!("  Profile: {:?}", config.crawler.profile);
    println!("  URL template: {}", config.crawler.url_template);
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    println!("  Drain interval: {}", config.crawler.drain_interval);
    match config.crawler.max_rows {
        Some(max) => println!("  Row cap: {}", max),
        None => println!("  Row cap: none"),
    }

    println!("\nCatalog:");
    println!("  Path: {}", config.catalog.path);
    println!("  Delimiter: {:?}", config.catalog.delimiter);
    println!("  Header row: {}", config.catalog.has_header);
    println!("  Key column: {}", config.catalog.key_column);

    println!("\nCache:");
    if config.cache.enabled {
        println!("  Prefix: {}", config.cache.prefix);
        println!("  Shard size: {}", config.cache.shard_size);
        println!("  Naming: {:?}", config.cache.naming);
        println!("  Archive member: {}", config.cache.member_name);
    } else {
        println!("  Disabled (every row is fetched)");
    }

    println!("\nFetch:");
    println!("  User agent: {}", config.fetch.user_agent);
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!(
        "  Retries: {} ({}ms apart)",
        config.fetch.max_retries, config.fetch.retry_delay_ms
    );
    match &config.fetch.proxies_path {
        Some(path) => println!("  Proxies: {}", path),
        None => println!("  Proxies: none (direct)"),
    }

    println!("\nOutput:");
    match config.output.format {
        OutputFormat::Json => println!(
            "  JSON documents under: {}",
            config.output.json_prefix.as_deref().unwrap_or_default()
        ),
        OutputFormat::Csv => println!(
            "  CSV rows appended to: {}",
            config.output.csv_path.as_deref().unwrap_or_default()
        ),
    }
    if let Some(log) = &config.output.process_log {
        println!("  Process log: {}", log);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would fetch {}",
        config.crawler.target_url("tt0000001")
    );
}

/// Handles the --stats mode: scans the cache prefix
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let prefix = Path::new(&config.cache.prefix);
    let stats = scan_cache(prefix)
        .with_context(|| format!("Failed to scan cache {}", prefix.display()))?;

    print_cache_statistics(&stats, config.cache.shard_size);
    Ok(())
}

/// Handles the --inspect mode: prints one cached page
fn handle_inspect(config: &Config, key: &str) -> anyhow::Result<()> {
    let addressor = ShardAddressor::new(&config.cache.prefix, config.cache.shard_size);
    let address = addressor.address(key)?;
    let cache = open_cache(&config.cache);

    if !cache.exists(&address) {
        anyhow::bail!(
            "No cached page for {} (expected {})",
            key,
            cache.entry_path(&address).display()
        );
    }

    let payload = cache.read(&address)?;
    println!("{}", String::from_utf8_lossy(&payload));
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();

    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight fetches");
            signal.cancel();
        }
    });

    let summary = run_crawl(config, cancel).await.context("Crawl failed")?;

    if summary.interrupted {
        tracing::info!("Crawl interrupted; rerun to resume");
    } else {
        tracing::info!("Crawl completed successfully");
    }

    Ok(())
}
