//! Title-Trawler: a resumable movie-page harvester
//!
//! This crate crawls a fixed catalog of title pages, extracts structured
//! records from their markup, and persists results incrementally into a
//! sharded on-disk cache so that very long crawls can be interrupted and
//! resumed without re-fetching completed work.

pub mod cache;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod identifier;
pub mod output;

use thiserror::Error;

/// Main error type for Title-Trawler operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Identifier error: {0}")]
    Identifier(#[from] IdentifierError),

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] crawler::CatalogError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Extraction error: {0}")]
    Extract(#[from] extract::ExtractError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Dispatcher closed: {0}")]
    Dispatch(#[from] tokio::sync::AcquireError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Identifier-specific errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Malformed title identifier: '{0}'")]
    Malformed(String),
}

/// Result type alias for Title-Trawler operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for identifier operations
pub type IdentifierResult<T> = std::result::Result<T, IdentifierError>;

// Re-export commonly used types
pub use config::Config;
pub use identifier::{FileNaming, Identifier, ShardAddress, ShardAddressor};
