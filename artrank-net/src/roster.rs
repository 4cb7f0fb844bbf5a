//! Bulk faculty-affiliation roster
//!
//! Downloads the CSRankings CSV into the local cache directory and reuses it
//! while younger than the freshness window. A failed download falls back to a
//! stale copy when one exists.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

use artrank_core::AffiliationRecord;

use crate::{fetch_text, write_atomic, NetError};

pub const CSRANKINGS_URL: &str =
    "https://raw.githubusercontent.com/emeryberger/CSrankings/gh-pages/csrankings.csv";

/// Roster source configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    pub url: String,
    /// Freshness window of the cached CSV, in days
    pub ttl_days: u64,
    /// Download timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            url: CSRANKINGS_URL.to_string(),
            ttl_days: 30,
            timeout_secs: 60,
        }
    }
}

/// The roster CSV and its local cached copy
#[derive(Debug, Clone)]
pub struct RosterSource {
    config: RosterConfig,
    cache_file: PathBuf,
}

impl RosterSource {
    pub fn new(config: RosterConfig, cache_dir: &Path) -> Self {
        Self {
            config,
            cache_file: cache_dir.join("csrankings").join("csrankings.csv"),
        }
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    fn is_fresh(&self) -> bool {
        file_age(&self.cache_file)
            .is_some_and(|age| age < Duration::from_secs(self.config.ttl_days * 86_400))
    }

    /// Make sure a usable local copy exists and return its path
    pub async fn ensure_local(
        &self,
        client: &Client,
        force_refresh: bool,
    ) -> Result<PathBuf, NetError> {
        if !force_refresh && self.is_fresh() {
            if let Some(age) = file_age(&self.cache_file) {
                info!(
                    "Using cached roster (age: {:.1} days)",
                    age.as_secs_f64() / 86_400.0
                );
            }
            return Ok(self.cache_file.clone());
        }

        info!("Downloading roster from {}", self.config.url);
        let timeout = Duration::from_secs(self.config.timeout_secs);
        match fetch_text(client, &self.config.url, Some(timeout)).await {
            Ok(body) => {
                write_atomic(&self.cache_file, body.as_bytes())?;
                debug!("Downloaded {} bytes to {}", body.len(), self.cache_file.display());
                Ok(self.cache_file.clone())
            }
            Err(e) if self.cache_file.exists() => {
                warn!("Roster download failed ({}), using stale cache", e);
                Ok(self.cache_file.clone())
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch (or reuse) the roster and parse every row
    pub async fn load(
        &self,
        client: &Client,
        force_refresh: bool,
    ) -> Result<Vec<AffiliationRecord>, NetError> {
        let path = self.ensure_local(client, force_refresh).await?;
        let records = parse_roster(File::open(&path)?)?;
        info!("Loaded {} roster rows", records.len());
        Ok(records)
    }
}

fn file_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    SystemTime::now().duration_since(modified).ok()
}

/// Parse roster CSV rows (`name,affiliation,homepage,scholarid,orcid`)
pub fn parse_roster(reader: impl Read) -> Result<Vec<AffiliationRecord>, NetError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in rdr.deserialize::<AffiliationRecord>() {
        match row {
            Ok(record) => records.push(record),
            Err(e) => debug!("Skipping malformed roster row: {}", e),
        }
    }
    Ok(records)
}
