//! JSON file I/O for vocabularies and mappings.

use std::path::Path;

use oncomap_common::{OncomapError, Result};
use serde::Serialize;
use tracing::info;

use crate::models::TermFrequencyTable;

/// Read a mention → count object. Missing files, invalid JSON, non-object
/// documents and non-integer counts are all input errors.
pub fn read_frequency_table(path: &Path) -> Result<TermFrequencyTable> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        OncomapError::Input(format!("cannot read vocabulary {}: {}", path.display(), e))
    })?;
    parse_frequency_table(&content)
        .map_err(|e| OncomapError::Input(format!("invalid vocabulary {}: {}", path.display(), e)))
}

pub fn parse_frequency_table(json: &str) -> serde_json::Result<TermFrequencyTable> {
    serde_json::from_str(json)
}

/// Write `value` as pretty JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(value)?;
    std::fs::write(path, body)?;
    info!("Saved {}", path.display());
    Ok(())
}
