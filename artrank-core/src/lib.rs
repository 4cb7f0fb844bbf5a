//! ArtRank Core - record linkage and ranking for research-artifact leaderboards
//!
//! This crate provides the pure, I/O-free primitives:
//! - Name normalization into comparable keys
//! - Author / committee / roster record model
//! - Candidate index over a bulk affiliation roster
//! - Conservative fuzzy name matching
//! - Search history with exponential backoff
//! - Merge & disambiguation of authors with AE committee members
//! - Deterministic scoring and dense ranking

pub mod names;
pub mod records;
pub mod index;
pub mod matching;
pub mod history;
pub mod scoring;
pub mod merge;

pub use names::*;
pub use records::*;
pub use index::*;
pub use matching::*;
pub use history::*;
pub use scoring::*;
pub use merge::*;

use thiserror::Error;

/// Affiliation placeholder written by upstream stages when nothing is known
pub const UNKNOWN_AFFILIATION: &str = "Unknown";

/// Errors from decoding record collections
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Malformed {what}: {source}")]
    Malformed {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
