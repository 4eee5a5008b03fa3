use crate::identifier::{FileNaming, DEFAULT_SHARD_SIZE};
use serde::Deserialize;

/// Placeholder replaced by the title identifier in `url-template`
pub const ID_PLACEHOLDER: &str = "{id}";

/// Main configuration structure for Title-Trawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub catalog: CatalogConfig,
    pub cache: CacheConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    pub output: OutputConfig,
}

/// Which page type is crawled and what gets extracted from it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Profile {
    /// Movie-connections pages, extracting the "References" group
    References,

    /// Title main pages, extracting rating, runtime, box office and reviews
    Details,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Extraction profile
    pub profile: Profile,

    /// Target URL with an `{id}` placeholder
    #[serde(rename = "url-template")]
    pub url_template: String,

    /// Maximum number of fetches in flight
    #[serde(rename = "max-concurrent-fetches")]
    pub max_concurrent_fetches: u32,

    /// Every this many dispatched fetches, wait for all in-flight work
    #[serde(rename = "drain-interval")]
    pub drain_interval: u64,

    /// Stop after this many catalog data rows
    #[serde(rename = "max-rows", default)]
    pub max_rows: Option<u64>,
}

impl CrawlerConfig {
    /// Substitutes an identifier into the URL template
    pub fn target_url(&self, id: &str) -> String {
        self.url_template.replace(ID_PLACEHOLDER, id)
    }
}

/// Input catalog configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Path to the CSV/TSV catalog
    pub path: String,

    /// Field delimiter, a single ASCII character
    #[serde(default = "default_delimiter")]
    pub delimiter: String,

    /// Whether the first row is a header to skip
    #[serde(rename = "has-header", default)]
    pub has_header: bool,

    /// Zero-based column holding the identifier or identifier-bearing key
    #[serde(rename = "key-column", default)]
    pub key_column: usize,
}

impl CatalogConfig {
    /// The delimiter as a byte, if it is a single ASCII character
    pub fn delimiter_byte(&self) -> Option<u8> {
        match self.delimiter.as_bytes() {
            [b] if b.is_ascii() => Some(*b),
            _ => None,
        }
    }
}

/// Page cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Whether fetched pages are archived and used for resume
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Root directory of the sharded cache
    pub prefix: String,

    /// Identifiers per shard directory
    #[serde(rename = "shard-size", default = "default_shard_size")]
    pub shard_size: u64,

    /// File naming inside shard directories
    #[serde(default)]
    pub naming: FileNaming,

    /// Name of the payload member inside each archive
    #[serde(rename = "member-name", default = "default_member_name")]
    pub member_name: String,
}

/// HTTP fetch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Newline-delimited list of proxy URLs to rotate through
    #[serde(rename = "proxies-path", default)]
    pub proxies_path: Option<String>,

    /// User agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for server errors and timeouts
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retries (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            proxies_path: None,
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Output record format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// One pretty-printed JSON document per title, in a sharded tree
    Json,

    /// Rows appended to a single CSV file
    Csv,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub format: OutputFormat,

    /// Root directory of the sharded JSON tree
    #[serde(rename = "json-prefix", default)]
    pub json_prefix: Option<String>,

    /// CSV file receiving appended rows
    #[serde(rename = "csv-path", default)]
    pub csv_path: Option<String>,

    /// Append-only log of processed identifiers
    #[serde(rename = "process-log", default)]
    pub process_log: Option<String>,
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_true() -> bool {
    true
}

fn default_shard_size() -> u64 {
    DEFAULT_SHARD_SIZE
}

fn default_member_name() -> String {
    crate::cache::DEFAULT_MEMBER_NAME.to_string()
}

fn default_user_agent() -> String {
    format!("title-trawler/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    5000
}
