//! Pipeline configuration
//!
//! Loaded from a TOML file. Every section and field is optional:
//!
//! ```toml
//! [cache]
//! dir = ".cache"
//!
//! [http]
//! request_delay_ms = 500
//!
//! [backoff]
//! cap_days = 60
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use artrank_core::{BackoffPolicy, DEFAULT_MIN_SCORE};
use artrank_net::{DblpConfig, HttpConfig, RosterConfig};

/// Config file picked up from the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "artrank.toml";

const SEARCH_HISTORY_FILE: &str = "dblp_search_history.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".cache"),
        }
    }
}

impl CacheConfig {
    /// Persisted search history of the incremental stage
    pub fn history_file(&self) -> PathBuf {
        self.dir.join(SEARCH_HISTORY_FILE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingsConfig {
    /// Entries scoring below this are dropped from the leaderboards
    pub min_score: u32,
}

impl Default for RankingsConfig {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub cache: CacheConfig,
    pub http: HttpConfig,
    pub roster: RosterConfig,
    pub dblp: DblpConfig,
    pub backoff: BackoffPolicy,
    pub rankings: RankingsConfig,
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Invalid pipeline configuration")
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("In {}", path.display()))
    }

    /// Load an explicit config file, else `artrank.toml` if present, else defaults
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.rankings.min_score, 3);
        assert_eq!(config.backoff, BackoffPolicy::default());
        assert_eq!(config.cache.history_file(), Path::new(".cache/dblp_search_history.json"));
    }

    #[test]
    fn test_partial_sections() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [cache]
            dir = "/var/cache/artrank"

            [http]
            request_delay_ms = 500

            [backoff]
            cap_days = 60

            [dblp]
            max_hits = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.dir, PathBuf::from("/var/cache/artrank"));
        assert_eq!(config.http.request_delay_ms, 500);
        assert_eq!(config.http.timeout_secs, 10);
        assert_eq!(config.backoff.cap_days, 60);
        assert_eq!(config.backoff.base_days, 1);
        assert_eq!(config.dblp.max_hits, 10);
        assert_eq!(config.dblp.cache_ttl_days, 90);
        assert_eq!(config.roster.ttl_days, 30);
    }

    #[test]
    fn test_invalid_config_is_error() {
        assert!(PipelineConfig::from_toml_str("[rankings]\nmin_score = \"high\"").is_err());
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PipelineConfig::load(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artrank.toml");
        std::fs::write(&path, "[rankings]\nmin_score = 5\n").unwrap();

        let config = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.rankings.min_score, 5);
    }
}
