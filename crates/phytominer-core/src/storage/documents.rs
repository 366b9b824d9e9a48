use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};
use crate::models::{ExtractedTaxon, TaxaData};
use crate::normalize::collapse_whitespace;

/// Save a TaxaData document as pretty JSON, creating parent directories.
pub fn save_taxa_data(path: &Path, data: &TaxaData) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(data)?;
    fs::write(path, json)?;
    Ok(path.to_path_buf())
}

/// Load a TaxaData document.
pub fn load_taxa_data(path: &Path) -> Result<TaxaData> {
    if !path.exists() {
        return Err(CoreError::DocumentNotFound(path.display().to_string()));
    }
    let contents = fs::read_to_string(path)?;
    let data: TaxaData = serde_json::from_str(&contents)?;
    Ok(data)
}

/// Load raw extraction output: either a bare JSON array of records or a
/// `{"taxa": [...]}` document.
pub fn load_extracted_taxa(path: &Path) -> Result<Vec<ExtractedTaxon>> {
    if !path.exists() {
        return Err(CoreError::DocumentNotFound(path.display().to_string()));
    }
    let contents = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&contents)?;
    let records = match value {
        serde_json::Value::Array(items) => serde_json::Value::Array(items),
        serde_json::Value::Object(mut map) => map
            .remove("taxa")
            .ok_or_else(|| CoreError::ValidationError("document has no `taxa` field".into()))?,
        _ => {
            return Err(CoreError::ValidationError(
                "expected an array of taxa or a taxa document".into(),
            ));
        }
    };
    if records.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(records)?)
}

/// Read a UTF-8 source text and collapse all whitespace runs to single spaces.
pub fn read_source_text(path: &Path) -> Result<String> {
    let text = fs::read_to_string(path)?;
    Ok(collapse_whitespace(&text))
}
