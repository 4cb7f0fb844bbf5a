//! Keyed cache store
//!
//! Entries live under `<root>/<namespace>/<sha256(key)>` as small JSON
//! documents `{"ts": <unix seconds>, "body": "..."}`. Freshness is checked on
//! read only; stale entries are ignored, never deleted.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::NetError;

/// Namespaced key-value store with read-side TTL
pub trait CacheStore: Send + Sync {
    /// Cached body for `key` if it was written less than `ttl` ago
    fn get(&self, namespace: &str, key: &str, ttl: Duration) -> Option<String>;

    /// Store `body` under `key`, stamped with the current time
    fn put(&self, namespace: &str, key: &str, body: &str) -> Result<(), NetError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    ts: f64,
    body: String,
}

/// Current time as fractional unix seconds
pub fn unix_now() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

/// Filesystem-safe digest of a cache key
pub fn hashed_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Replace `path` in one step: write a sibling temp file, then rename it over
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path).inspect_err(|_| {
        let _ = fs::remove_file(&tmp);
    })
}

fn is_fresh(ts: f64, ttl: Duration, now: f64) -> bool {
    now - ts < ttl.as_secs_f64()
}

/// Cache persisted under a root directory
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn entry_path(&self, namespace: &str, key: &str) -> PathBuf {
        self.root.join(namespace).join(hashed_key(key))
    }
}

impl CacheStore for FileCache {
    fn get(&self, namespace: &str, key: &str, ttl: Duration) -> Option<String> {
        let path = self.entry_path(namespace, key);
        let raw = fs::read_to_string(&path).ok()?;

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) if is_fresh(entry.ts, ttl, unix_now()) => Some(entry.body),
            Ok(_) => {
                debug!("Stale cache entry {}/{}", namespace, key);
                None
            }
            Err(e) => {
                debug!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    fn put(&self, namespace: &str, key: &str, body: &str) -> Result<(), NetError> {
        let entry = CacheEntry {
            ts: unix_now(),
            body: body.to_string(),
        };
        let json = serde_json::to_vec(&entry).map_err(|e| NetError::Parse(e.to_string()))?;
        write_atomic(&self.entry_path(namespace, key), &json)?;
        Ok(())
    }
}

/// In-process cache, used for dry runs and tests
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<(String, String), CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry with an explicit timestamp
    pub fn put_at(&self, namespace: &str, key: &str, body: &str, ts: f64) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                (namespace.to_string(), key.to_string()),
                CacheEntry {
                    ts,
                    body: body.to_string(),
                },
            );
        }
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, namespace: &str, key: &str, ttl: Duration) -> Option<String> {
        let entries = self.entries.lock().ok()?;
        entries
            .get(&(namespace.to_string(), key.to_string()))
            .filter(|entry| is_fresh(entry.ts, ttl, unix_now()))
            .map(|entry| entry.body.clone())
    }

    fn put(&self, namespace: &str, key: &str, body: &str) -> Result<(), NetError> {
        self.put_at(namespace, key, body, unix_now());
        Ok(())
    }
}
