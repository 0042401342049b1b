use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, Context};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;

use crate::types::ExportMetadata;

/// Subdirectories every run expects to exist.
pub const EXPORT_SUBDIRS: &[&str] = &[
    "families/photos",
    "staff/photos",
    "groups/photos",
    "additional_pages/assets",
];

pub fn create_export_structure(root: &Path) -> Result<()> {
    for sub in EXPORT_SUBDIRS {
        let path = root.join(sub);
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create export directory {:?}", path))?;
    }
    info!("Created export directory structure at {:?}", root);
    Ok(())
}

/// Write `<root>/<category>/<category>.json`.
///
/// A list is stored under the category name; a map has its keys merged into
/// the envelope next to `metadata`.
pub fn export_to_json<T: Serialize + ?Sized>(
    root: &Path,
    category: &str,
    data: &T,
    source: &str,
) -> Result<PathBuf> {
    let path = root.join(category).join(format!("{}.json", category));
    write_envelope(&path, category, data, source)
}

/// Write `<root>/<name>.json` with the same envelope.
pub fn export_combined<T: Serialize + ?Sized>(
    root: &Path,
    name: &str,
    data: &T,
    source: &str,
) -> Result<PathBuf> {
    let path = root.join(format!("{}.json", name));
    write_envelope(&path, name, data, source)
}

fn write_envelope<T: Serialize + ?Sized>(
    path: &Path,
    category: &str,
    data: &T,
    source: &str,
) -> Result<PathBuf> {
    let value = serde_json::to_value(data)
        .with_context(|| format!("Failed to serialize {} records", category))?;
    let (total_records, envelope) = build_envelope(category, value, source)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create export directory {:?}", parent))?;
    }

    let json = serde_json::to_string_pretty(&envelope)?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write export to {:?}", path))?;

    info!("Exported {} records to {:?}", total_records, path);
    Ok(path.to_path_buf())
}

/// List length, or the sum over a map's values (a non-list value counts 1).
pub fn count_records(data: &Value) -> usize {
    match data {
        Value::Array(items) => items.len(),
        Value::Object(map) => map
            .values()
            .map(|v| v.as_array().map(|a| a.len()).unwrap_or(1))
            .sum(),
        Value::Null => 0,
        _ => 1,
    }
}

fn build_envelope(category: &str, data: Value, source: &str) -> Result<(usize, Value)> {
    let total_records = count_records(&data);
    let metadata = ExportMetadata {
        export_date: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        total_records,
        source: source.to_string(),
    };

    let mut envelope = Map::new();
    envelope.insert("metadata".to_string(), serde_json::to_value(metadata)?);
    match data {
        Value::Object(map) => {
            for (key, value) in map {
                if key != "metadata" {
                    envelope.insert(key, value);
                }
            }
        }
        other => {
            envelope.insert(category.to_string(), other);
        }
    }
    Ok((total_records, Value::Object(envelope)))
}
