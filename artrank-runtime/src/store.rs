//! File persistence
//!
//! All outputs replace their target in one step, so a crashed run leaves
//! either the old file or the new one.

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, warn};

use artrank_core::{parse_collection, SearchHistory};
use artrank_net::write_atomic;

/// Read a JSON array that must exist
pub fn read_collection<T: DeserializeOwned>(
    path: &Path,
    what: &'static str,
) -> anyhow::Result<Vec<T>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Missing required input {}", path.display()))?;
    let items = parse_collection(what, &json).with_context(|| format!("In {}", path.display()))?;
    debug!("Loaded {} {} from {}", items.len(), what, path.display());
    Ok(items)
}

/// Read a JSON array, treating a missing file as empty
pub fn read_optional_collection<T: DeserializeOwned>(
    path: &Path,
    what: &'static str,
) -> anyhow::Result<Vec<T>> {
    if !path.exists() {
        warn!("{} not found, skipping", path.display());
        return Ok(Vec::new());
    }
    read_collection(path, what)
}

/// Write pretty-printed JSON
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    write_atomic(path, json.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Write compact JSON
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string(value)?;
    write_atomic(path, json.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))
}

pub fn write_yaml<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    let yaml = serde_yaml::to_string(value)?;
    write_atomic(path, yaml.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Load search history; missing or corrupt files yield an empty history
pub fn load_history(path: &Path) -> SearchHistory {
    match fs::read_to_string(path) {
        Ok(json) => {
            let history = SearchHistory::from_json(&json);
            info!("Loaded search history ({} authors)", history.len());
            history
        }
        Err(e) if e.kind() == ErrorKind::NotFound => SearchHistory::new(),
        Err(e) => {
            warn!("Cannot read search history {}: {}", path.display(), e);
            SearchHistory::new()
        }
    }
}

pub fn save_history(path: &Path, history: &SearchHistory) -> anyhow::Result<()> {
    let json = history.to_json()?;
    write_atomic(path, json.as_bytes())
        .with_context(|| format!("Failed to save search history {}", path.display()))?;
    info!("Search history saved: {}", path.display());
    Ok(())
}

/// Delete the search history; returns whether a file was removed
pub fn clear_history(path: &Path) -> anyhow::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!("Search history cleared: {}", path.display());
            Ok(true)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
    }
}
