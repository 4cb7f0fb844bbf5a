//! Data directory layout
//!
//! ```text
//! <data_dir>/
//!   assets/data/   authors, committee members, combined rankings (JSON)
//!   _data/         site summary (YAML)
//! ```

use std::path::{Path, PathBuf};

/// Leaderboard scope; each reads and writes its own files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Systems,
    Security,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::All, Scope::Systems, Scope::Security];

    fn prefix(self) -> &'static str {
        match self {
            Scope::All => "",
            Scope::Systems => "systems_",
            Scope::Security => "security_",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Scope::All => "all",
            Scope::Systems => "systems",
            Scope::Security => "security",
        }
    }

    /// Missing inputs abort the run only for the overall leaderboard
    pub fn inputs_required(self) -> bool {
        self == Scope::All
    }
}

/// Paths inside a website data directory
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn assets_data(&self) -> PathBuf {
        self.root.join("assets").join("data")
    }

    pub fn authors_file(&self) -> PathBuf {
        self.scope_authors(Scope::All)
    }

    pub fn scope_authors(&self, scope: Scope) -> PathBuf {
        self.assets_data()
            .join(format!("{}authors.json", scope.prefix()))
    }

    pub fn scope_members(&self, scope: Scope) -> PathBuf {
        self.assets_data()
            .join(format!("{}ae_members.json", scope.prefix()))
    }

    pub fn scope_rankings(&self, scope: Scope) -> PathBuf {
        self.assets_data()
            .join(format!("{}combined_rankings.json", scope.prefix()))
    }

    pub fn summary_file(&self) -> PathBuf {
        self.root.join("_data").join("combined_summary.yml")
    }
}
