//! Roster enrichment stage
//!
//! Fills missing affiliations from a bulk faculty roster. Authors whose
//! matching roster rows disagree on the institution are left alone.

use serde::Serialize;
use tracing::{debug, info};

use artrank_core::{resolve_affiliation, AuthorEntry, CandidateIndex, RosterMatch};

/// Counters for one roster pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RosterStats {
    pub total: usize,
    pub already_has_affiliation: usize,
    /// Authors lacking an affiliation before the pass
    pub missing: usize,
    pub matched: usize,
    pub no_match: usize,
    /// Matched rows naming more than one institution
    pub ambiguous: usize,
    pub enriched: usize,
}

impl RosterStats {
    /// Percentage of missing authors that found a roster match
    pub fn match_rate(&self) -> f64 {
        percent(self.matched, self.missing)
    }

    /// Percentage of all authors with an affiliation after the pass
    pub fn coverage(&self) -> f64 {
        percent(self.already_has_affiliation + self.enriched, self.total)
    }

    pub fn still_missing(&self) -> usize {
        self.missing - self.enriched
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        100.0 * part as f64 / whole as f64
    }
}

/// Assign roster affiliations to authors that lack one.
///
/// At most `max_authors` candidates are examined, in source order.
pub fn enrich_from_roster(
    authors: &mut [AuthorEntry],
    index: &CandidateIndex,
    max_authors: Option<usize>,
) -> RosterStats {
    let mut stats = RosterStats {
        total: authors.len(),
        ..Default::default()
    };

    let mut candidates: Vec<&mut AuthorEntry> = authors
        .iter_mut()
        .filter(|author| !author.has_known_affiliation())
        .collect();
    stats.missing = candidates.len();
    stats.already_has_affiliation = stats.total - stats.missing;

    if let Some(max) = max_authors {
        candidates.truncate(max);
    }
    info!("Matching {} authors against roster", candidates.len());

    for author in candidates {
        match resolve_affiliation(&author.name, index.lookup(&author.name)) {
            RosterMatch::Found {
                affiliation,
                matched_name,
            } => {
                debug!("{} -> {} (via {})", author.name, affiliation, matched_name);
                stats.matched += 1;
                stats.enriched += 1;
                author.affiliation = Some(affiliation);
            }
            RosterMatch::Ambiguous { affiliations } => {
                debug!(
                    "{} matches {} institutions, skipping",
                    author.name,
                    affiliations.len()
                );
                stats.ambiguous += 1;
            }
            RosterMatch::NotFound => stats.no_match += 1,
        }
    }

    stats
}
