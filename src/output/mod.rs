//! Output module for persisting extracted records
//!
//! This module handles:
//! - Appending flattened records to a CSV file
//! - Writing one JSON document per title into a sharded tree
//! - The append-only log of processed identifiers
//! - Run summaries and cache statistics

mod csv_sink;
mod json_sink;
mod process_log;
pub mod stats;
mod traits;

pub use csv_sink::CsvSink;
pub use json_sink::{to_pretty_json, JsonSink};
pub use process_log::ProcessLog;
pub use stats::{print_cache_statistics, scan_cache, CacheStatistics, CrawlSummary};
pub use traits::{OutputError, OutputResult, OutputSink};

use crate::config::{Config, OutputFormat};
use crate::identifier::ShardAddressor;
use crate::ConfigError;
use std::sync::Arc;

/// Builds the output sink described by the configuration
///
/// # Returns
///
/// * `Ok(Arc<dyn OutputSink>)` - The configured sink
/// * `Err(ConfigError)` - The target for the chosen format is missing
pub fn open_sink(config: &Config) -> Result<Arc<dyn OutputSink>, ConfigError> {
    let output = &config.output;

    match output.format {
        OutputFormat::Json => {
            let prefix = output.json_prefix.as_deref().ok_or_else(|| {
                ConfigError::Validation("json_prefix is required for json output".to_string())
            })?;
            let addressor = ShardAddressor::new(prefix, config.cache.shard_size);
            Ok(Arc::new(JsonSink::new(addressor, config.cache.naming)))
        }
        OutputFormat::Csv => {
            let path = output.csv_path.as_deref().ok_or_else(|| {
                ConfigError::Validation("csv_path is required for csv output".to_string())
            })?;
            Ok(Arc::new(CsvSink::new(path)))
        }
    }
}

/// Opens the process log if one is configured
pub fn open_process_log(config: &Config) -> OutputResult<Option<Arc<ProcessLog>>> {
    config
        .output
        .process_log
        .as_deref()
        .map(|path| ProcessLog::open(path).map(Arc::new))
        .transpose()
}
