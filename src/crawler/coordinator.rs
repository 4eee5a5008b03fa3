//! Crawl driver - main crawl orchestration logic
//!
//! This module contains the main crawl loop, including:
//! - Streaming catalog rows and resolving them to identifiers
//! - Skipping identifiers whose cache archive already exists
//! - Dispatching fetches with bounded concurrency and periodic drains
//! - Handling interrupts and fatal output errors
//! - Tallying the run summary

use crate::cache::{open_cache, CacheStore};
use crate::config::Config;
use crate::crawler::catalog::{CatalogReader, CatalogRow};
use crate::crawler::fetcher::{load_proxies, Fetcher, HttpFetcher};
use crate::crawler::pipeline::{ItemReport, Pipeline, WorkItem};
use crate::crawler::scheduler::{Dispatcher, Finished};
use crate::extract::Extractor;
use crate::identifier::{Identifier, ShardAddressor};
use crate::output::{open_process_log, open_sink, CrawlSummary, OutputResult, OutputSink, ProcessLog};
use crate::HarvestError;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Rows between progress log lines
const PROGRESS_INTERVAL: u64 = 10_000;

/// Main crawl driver structure
pub struct Coordinator {
    config: Arc<Config>,
    cache: Option<Arc<dyn CacheStore>>,
    addressor: ShardAddressor,
    pipeline: Arc<Pipeline>,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a driver from explicit collaborators
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `fetcher` - Source of page bodies
    /// * `cache` - Page cache, or `None` to disable resume and archiving
    /// * `sink` - Destination for extracted records
    /// * `process_log` - Optional log of processed identifiers
    pub fn new(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
        cache: Option<Arc<dyn CacheStore>>,
        sink: Arc<dyn OutputSink>,
        process_log: Option<Arc<ProcessLog>>,
    ) -> Result<Self, HarvestError> {
        let extractor = Extractor::for_profile(config.crawler.profile)?;
        let addressor = ShardAddressor::new(&config.cache.prefix, config.cache.shard_size);
        let pipeline = Pipeline::new(fetcher, extractor, cache.clone(), sink, process_log);

        Ok(Self {
            config: Arc::new(config),
            cache,
            addressor,
            pipeline: Arc::new(pipeline),
            cancel: CancellationToken::new(),
        })
    }

    /// Creates a driver wired to the production fetcher, cache and sinks
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - A proxy list, client, sink or log could not be set up
    pub fn from_config(config: Config) -> Result<Self, HarvestError> {
        let proxies = match &config.fetch.proxies_path {
            Some(path) => load_proxies(Path::new(path))?,
            None => Vec::new(),
        };
        let fetcher = HttpFetcher::new(&config.fetch, &proxies)?;
        tracing::info!("Fetching through {} rotation slot(s)", fetcher.rotation_size());

        let cache: Option<Arc<dyn CacheStore>> = if config.cache.enabled {
            Some(Arc::new(open_cache(&config.cache)))
        } else {
            None
        };
        let sink = open_sink(&config)?;
        let process_log = open_process_log(&config)?;

        tracing::info!("Writing records to {}", sink.describe());

        Self::new(config, Arc::new(fetcher), cache, sink, process_log)
    }

    /// Replaces the cancellation token observed by the run
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs the crawl over the configured catalog file
    pub async fn run(&self) -> Result<CrawlSummary, HarvestError> {
        let catalog = CatalogReader::open(&self.config.catalog, self.config.crawler.max_rows)?;
        tracing::info!("Reading catalog {}", self.config.catalog.path);
        self.run_catalog(catalog).await
    }

    /// Runs the crawl over an already opened catalog
    ///
    /// This method:
    /// 1. Reads catalog rows in order
    /// 2. Skips malformed keys and cached identifiers
    /// 3. Dispatches the rest, at most `max-concurrent-fetches` at a time
    /// 4. Drains in-flight work on completion, cancellation or a fatal error
    ///
    /// A catalog read error or an output write error stops dispatch and is
    /// returned after in-flight work has drained.
    pub async fn run_catalog<R: Read>(
        &self,
        catalog: CatalogReader<R>,
    ) -> Result<CrawlSummary, HarvestError> {
        let crawler = &self.config.crawler;
        let mut dispatcher = Dispatcher::new(
            crawler.max_concurrent_fetches as usize,
            crawler.drain_interval,
        );
        let mut summary = CrawlSummary::new();
        let mut fatal: Option<HarvestError> = None;

        tracing::info!(
            "Starting crawl: {} concurrent fetches, drain every {}",
            dispatcher.max_in_flight(),
            crawler.drain_interval
        );

        for row in catalog {
            if self.cancel.is_cancelled() {
                break;
            }

            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    tracing::error!("{}", e);
                    fatal = Some(e.into());
                    break;
                }
            };

            summary.rows_read += 1;
            if summary.rows_read % PROGRESS_INTERVAL == 0 {
                tracing::info!(
                    "Progress: {} rows read, {} cached, {} dispatched, {} in flight",
                    summary.rows_read,
                    summary.cache_hits,
                    summary.dispatched,
                    dispatcher.in_flight()
                );
            }

            let Some(item) = self.plan(&row, &mut summary) else {
                continue;
            };

            let pipeline = Arc::clone(&self.pipeline);
            let job = async move { pipeline.run(item).await };

            let submitted = tokio::select! {
                result = dispatcher.dispatch(job) => {
                    result?;
                    true
                }
                _ = self.cancel.cancelled() => false,
            };
            if submitted {
                summary.dispatched += 1;
            }

            // Outcomes joined by an interrupted drain are still collected here
            if let Err(e) = absorb(dispatcher.take_finished(), &mut summary) {
                fatal = Some(e);
                break;
            }
            if !submitted {
                break;
            }
        }

        let interrupted = self.cancel.is_cancelled() && fatal.is_none();
        if interrupted {
            tracing::warn!(
                "Cancellation requested, waiting for {} in-flight fetches",
                dispatcher.in_flight()
            );
        }

        if let Err(e) = absorb(dispatcher.drain().await, &mut summary) {
            fatal.get_or_insert(e);
        }

        summary.finish(interrupted);
        summary.log();

        match fatal {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    /// Resolves a row to a work item, or `None` if it should be skipped
    fn plan(&self, row: &CatalogRow, summary: &mut CrawlSummary) -> Option<WorkItem> {
        let key = row.key().unwrap_or_default();
        let id = match Identifier::parse(key) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("Skipping catalog row {}: {}", row.index, e);
                summary.malformed += 1;
                return None;
            }
        };

        let address = self.addressor.address_of(&id);
        if let Some(cache) = &self.cache {
            if cache.exists(&address) {
                tracing::debug!("For movie {} cache exists", id);
                summary.cache_hits += 1;
                return None;
            }
        }

        Some(WorkItem {
            url: self.config.crawler.target_url(id.as_str()),
            address,
            id,
        })
    }
}

/// Folds finished task outcomes into the summary
///
/// Returns the first output error seen. A panicked task is logged and
/// otherwise ignored.
fn absorb(
    finished: Vec<Finished<OutputResult<ItemReport>>>,
    summary: &mut CrawlSummary,
) -> Result<(), HarvestError> {
    let mut fatal = None;

    for outcome in finished {
        match outcome {
            Ok(Ok(report)) => summary.record(&report),
            Ok(Err(e)) => {
                tracing::error!("Failed to persist records: {}", e);
                fatal.get_or_insert(HarvestError::from(e));
            }
            Err(e) => tracing::error!("Worker task failed: {}", e),
        }
    }

    match fatal {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Runs a complete crawl operation
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `cancel` - Token that stops the crawl gracefully when cancelled
///
/// # Returns
///
/// * `Ok(CrawlSummary)` - Crawl finished or was interrupted
/// * `Err(HarvestError)` - Startup failed or a fatal error stopped the crawl
///
/// # Example
///
/// ```no_run
/// use title_trawler::config::load_config;
/// use title_trawler::crawler::run_crawl;
/// use tokio_util::sync::CancellationToken;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let summary = run_crawl(config, CancellationToken::new()).await?;
/// println!("{} items persisted", summary.persisted);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: Config,
    cancel: CancellationToken,
) -> Result<CrawlSummary, HarvestError> {
    Coordinator::from_config(config)?
        .with_cancellation(cancel)
        .run()
        .await
}
