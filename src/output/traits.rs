//! Output sink traits and error types
//!
//! This module defines the trait interface for output sinks and the errors
//! they report.

use crate::extract::Extraction;
use crate::identifier::Identifier;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write CSV output {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("Failed to serialize record for {id}: {source}")]
    Serialize {
        id: String,
        source: serde_json::Error,
    },

    #[error("Output lock poisoned for {0}")]
    Poisoned(PathBuf),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Trait for output sinks
///
/// Sinks are shared between worker tasks; implementations serialize access
/// to any file that several items write to.
pub trait OutputSink: Send + Sync {
    /// Persists the records extracted for one identifier
    ///
    /// The call returns only after the data has been flushed.
    fn persist(&self, id: &Identifier, extraction: &Extraction) -> OutputResult<()>;

    /// Human-readable description of where records go
    fn describe(&self) -> String;
}
