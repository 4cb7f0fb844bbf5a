//! ArtRank Enrichment
//!
//! Stages that fill in missing author affiliations:
//! - **Roster**: bulk match against a faculty roster (one pass, no network)
//! - **Incremental**: per-author directory lookups, scheduled by search
//!   history with exponential backoff so rate-limited services are not
//!   hammered for authors who keep coming back empty
//!
//! Directory access goes through [`traits::AuthorDirectory`], so the
//! scheduler can be driven by DBLP or by a test double.

pub mod traits;
pub mod directory;
pub mod roster;
pub mod incremental;

pub use traits::*;
pub use directory::*;
pub use roster::*;
pub use incremental::*;
