//! Common traits for enrichment stages

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use artrank_net::{LookupStats, NetError};

/// Errors from directory lookups
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("Lookup failed: {0}")]
    Lookup(#[from] NetError),

    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

/// Two-step author directory: name search, then identifier to affiliation
#[async_trait]
pub trait AuthorDirectory: Send + Sync {
    /// Search by name; returns a stable identifier for the best hit
    async fn search_author(&self, name: &str) -> Result<Option<String>, EnrichError>;

    /// Current affiliation for an identifier returned by [`Self::search_author`]
    async fn fetch_affiliation(&self, id: &str) -> Result<Option<String>, EnrichError>;

    /// Directory name for logs
    fn name(&self) -> &str;

    /// Request and cache counters accumulated so far
    fn lookup_stats(&self) -> LookupStats {
        LookupStats::default()
    }
}

pub type SharedDirectory = Arc<dyn AuthorDirectory>;
