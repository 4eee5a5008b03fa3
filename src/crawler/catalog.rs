//! Catalog reader
//!
//! Streams rows from the delimited catalog that seeds a crawl. Rows may carry
//! any number of fields; only the key column is consulted. A read or decode
//! error ends the stream.

use crate::config::CatalogConfig;
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading the catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to open catalog {path}: {source}")]
    Open { path: PathBuf, source: csv::Error },

    #[error("Failed to read catalog {path} after row {row}: {source}")]
    Read {
        path: PathBuf,
        row: u64,
        source: csv::Error,
    },

    #[error("Catalog delimiter '{0}' is not a single ASCII character")]
    Delimiter(String),
}

/// One data row of the catalog
#[derive(Debug, Clone)]
pub struct CatalogRow {
    /// Zero-based position among data rows (the header is not counted)
    pub index: u64,
    pub record: StringRecord,
    key_column: usize,
}

impl CatalogRow {
    /// The key field, if the row is long enough to have one
    pub fn key(&self) -> Option<&str> {
        self.record.get(self.key_column)
    }
}

/// Streaming reader over catalog rows
pub struct CatalogReader<R: Read> {
    reader: csv::Reader<R>,
    path: PathBuf,
    key_column: usize,
    max_rows: Option<u64>,
    rows_read: u64,
    done: bool,
}

impl CatalogReader<File> {
    /// Opens the catalog file named in the configuration
    pub fn open(config: &CatalogConfig, max_rows: Option<u64>) -> Result<Self, CatalogError> {
        let path = PathBuf::from(&config.path);
        let reader = builder(config)?
            .from_path(&path)
            .map_err(|source| CatalogError::Open {
                path: path.clone(),
                source,
            })?;

        Ok(Self::with_reader(reader, path, config.key_column, max_rows))
    }
}

impl<R: Read> CatalogReader<R> {
    /// Reads the catalog from any byte source
    pub fn from_reader(
        source: R,
        config: &CatalogConfig,
        max_rows: Option<u64>,
    ) -> Result<Self, CatalogError> {
        let reader = builder(config)?.from_reader(source);
        Ok(Self::with_reader(
            reader,
            PathBuf::from(&config.path),
            config.key_column,
            max_rows,
        ))
    }

    fn with_reader(
        reader: csv::Reader<R>,
        path: PathBuf,
        key_column: usize,
        max_rows: Option<u64>,
    ) -> Self {
        Self {
            reader,
            path,
            key_column,
            max_rows,
            rows_read: 0,
            done: false,
        }
    }

    /// Data rows yielded so far
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }
}

fn builder(config: &CatalogConfig) -> Result<ReaderBuilder, CatalogError> {
    let delimiter = config
        .delimiter_byte()
        .ok_or_else(|| CatalogError::Delimiter(config.delimiter.clone()))?;

    let mut builder = ReaderBuilder::new();
    builder
        .delimiter(delimiter)
        .has_headers(config.has_header)
        .flexible(true);
    Ok(builder)
}

impl<R: Read> Iterator for CatalogReader<R> {
    type Item = Result<CatalogRow, CatalogError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.max_rows.is_some_and(|max| self.rows_read >= max) {
            return None;
        }

        let mut record = StringRecord::new();
        match self.reader.read_record(&mut record) {
            Ok(true) => {
                let index = self.rows_read;
                self.rows_read += 1;
                Some(Ok(CatalogRow {
                    index,
                    record,
                    key_column: self.key_column,
                }))
            }
            Ok(false) => {
                self.done = true;
                None
            }
            Err(source) => {
                self.done = true;
                Some(Err(CatalogError::Read {
                    path: self.path.clone(),
                    row: self.rows_read,
                    source,
                }))
            }
        }
    }
}
