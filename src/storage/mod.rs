//! JSON output of the learned mapping and the checkmark key list.

use crate::models::{CheckmarkKeySet, PatternMapping};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// Pretty JSON, two-space indent, non-ASCII left as-is.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("Failed to serialize JSON")
}

fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    fs::write(path, to_pretty_json(value)?).with_context(|| format!("Failed to write {:?}", path))
}

/// Save the mapping to `path`, or print it to stdout when no path is given.
pub fn save_mapping(mapping: &PatternMapping, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            write_json(mapping, path)?;
            info!("[saved] mapping written to {:?}", path);
        }
        None => {
            println!("\n[result] mapping JSON:");
            println!("{}", to_pretty_json(mapping)?);
        }
    }
    Ok(())
}

/// Save the checkmark keys as a JSON array in first-seen order.
pub fn save_keys(keys: &CheckmarkKeySet, path: &Path) -> Result<()> {
    write_json(keys, path)?;
    info!("[saved] {} checkmark keys written to {:?}", keys.len(), path);
    Ok(())
}
