//! ArtRank Runtime
//!
//! Wires the enrichment and ranking stages to files:
//! - [`config`]: TOML pipeline configuration with defaults for every field
//! - [`layout`]: where inputs, outputs and the cache live
//! - [`store`]: JSON/YAML persistence with whole-file atomic replacement
//! - [`pipeline`]: the roster, incremental and rankings runners

pub mod config;
pub mod layout;
pub mod store;
pub mod pipeline;

pub use config::*;
pub use layout::*;
pub use store::*;
pub use pipeline::*;
