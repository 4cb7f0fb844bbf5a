//! ArtRank Network Layer
//!
//! I/O collaborators of the linkage core:
//! - HTTP client construction with fixed timeouts
//! - Keyed on-disk cache with read-side freshness
//! - Bulk faculty roster download (CSRankings CSV)
//! - DBLP author search and person-page affiliation lookup

pub mod client;
pub mod cache;
pub mod roster;
pub mod dblp;

pub use client::*;
pub use cache::*;
pub use roster::*;
pub use dblp::*;
