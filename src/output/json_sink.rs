//! JSON output sink
//!
//! Writes one pretty-printed document per title into a sharded directory
//! tree mirroring the cache layout. Writing the same identifier twice
//! replaces the earlier document.

use crate::extract::Extraction;
use crate::identifier::{FileNaming, Identifier, ShardAddressor};
use crate::output::traits::{OutputError, OutputResult, OutputSink};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

const JSON_EXTENSION: &str = "json";
const JSON_INDENT: &[u8] = b" ";

/// Sink writing one JSON document per identifier
#[derive(Debug, Clone)]
pub struct JsonSink {
    addressor: ShardAddressor,
    naming: FileNaming,
}

impl JsonSink {
    pub fn new(addressor: ShardAddressor, naming: FileNaming) -> Self {
        Self { addressor, naming }
    }

    /// Path of the document for `id`
    pub fn document_path(&self, id: &Identifier) -> PathBuf {
        self.addressor
            .address_of(id)
            .file_path(self.naming, JSON_EXTENSION)
    }
}

/// Serializes a value with the document indent
pub fn to_pretty_json<T: Serialize>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(JSON_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    Ok(buffer)
}

impl OutputSink for JsonSink {
    fn persist(&self, id: &Identifier, extraction: &Extraction) -> OutputResult<()> {
        let address = self.addressor.address_of(id);
        let path = address.file_path(self.naming, JSON_EXTENSION);
        let write_error = |source| OutputError::Write {
            path: path.clone(),
            source,
        };

        let document = to_pretty_json(extraction).map_err(|source| OutputError::Serialize {
            id: id.to_string(),
            source,
        })?;

        fs::create_dir_all(&address.directory).map_err(write_error)?;

        let mut staging = NamedTempFile::new_in(&address.directory).map_err(write_error)?;
        staging.write_all(&document).map_err(write_error)?;
        staging.flush().map_err(write_error)?;
        staging.persist(&path).map_err(|e| write_error(e.error))?;

        tracing::debug!(
            "Wrote {} records for {} to {}",
            extraction.record_count(),
            id,
            path.display()
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.addressor.prefix().display())
    }
}
