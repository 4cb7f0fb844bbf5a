//! Scoring & ranking
//!
//! Weights are fixed: each badge level adds one point per artifact
//! (available, +functional, +reproducible), each AE membership is worth three
//! points and each chair role two more on top of it. Changing them is a
//! versioned decision, not a runtime option.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::YearActivity;

pub const W_AVAILABLE: u32 = 1;
pub const W_FUNCTIONAL: u32 = 1;
pub const W_REPRODUCIBLE: u32 = 1;
pub const W_AE_MEMBERSHIP: u32 = 3;
pub const W_AE_CHAIR: u32 = 2;

/// Default leaderboard cut-off
pub const DEFAULT_MIN_SCORE: u32 = 3;

/// Weighted scores for one person
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub artifact_score: u32,
    pub ae_score: u32,
    pub combined_score: u32,
}

/// Compute artifact, AE and combined scores
pub fn score(
    artifacts: u32,
    badges_functional: u32,
    badges_reproducible: u32,
    ae_memberships: u32,
    chair_count: u32,
) -> Score {
    // Counts come from upstream JSON; clamp instead of overflowing
    let artifact_score = artifacts
        .saturating_mul(W_AVAILABLE)
        .saturating_add(badges_functional.saturating_mul(W_FUNCTIONAL))
        .saturating_add(badges_reproducible.saturating_mul(W_REPRODUCIBLE));
    let ae_score = ae_memberships
        .saturating_mul(W_AE_MEMBERSHIP)
        .saturating_add(chair_count.saturating_mul(W_AE_CHAIR));

    Score {
        artifact_score,
        ae_score,
        combined_score: artifact_score.saturating_add(ae_score),
    }
}

/// One row of the combined leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedEntry {
    pub name: String,
    pub affiliation: String,
    pub artifacts: u32,
    pub artifact_score: u32,
    pub total_papers: u32,
    pub artifact_rate: f64,
    pub ae_memberships: u32,
    pub chair_count: u32,
    pub ae_score: u32,
    pub combined_score: u32,
    pub badges_available: u32,
    pub badges_functional: u32,
    pub badges_reproducible: u32,
    pub conferences: Vec<String>,
    pub years: YearActivity,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    #[serde(default)]
    pub rank: u32,
}

/// Raw facts about a person before scoring
#[derive(Debug, Clone, Default)]
pub struct EntryFacts {
    pub name: String,
    pub affiliation: String,
    pub artifacts: u32,
    pub total_papers: u32,
    pub artifact_rate: f64,
    pub ae_memberships: u32,
    pub chair_count: u32,
    pub badges_available: u32,
    pub badges_functional: u32,
    pub badges_reproducible: u32,
    pub conferences: Vec<String>,
    pub years: YearActivity,
}

impl CombinedEntry {
    /// Score the facts and build an unranked entry
    pub fn from_facts(facts: EntryFacts) -> Self {
        let Score {
            artifact_score,
            ae_score,
            combined_score,
        } = score(
            facts.artifacts,
            facts.badges_functional,
            facts.badges_reproducible,
            facts.ae_memberships,
            facts.chair_count,
        );

        let mut conferences = facts.conferences;
        conferences.sort();
        conferences.dedup();

        Self {
            first_year: facts.years.first_year(),
            last_year: facts.years.last_year(),
            name: facts.name,
            affiliation: facts.affiliation,
            artifacts: facts.artifacts,
            artifact_score,
            total_papers: facts.total_papers,
            artifact_rate: facts.artifact_rate,
            ae_memberships: facts.ae_memberships,
            chair_count: facts.chair_count,
            ae_score,
            combined_score,
            badges_available: facts.badges_available,
            badges_functional: facts.badges_functional,
            badges_reproducible: facts.badges_reproducible,
            conferences,
            years: facts.years,
            rank: 0,
        }
    }

    /// Has both artifact authorship and committee service
    pub fn has_both(&self) -> bool {
        self.artifacts > 0 && self.ae_memberships > 0
    }
}

/// Leaderboard order: combined score desc, artifacts desc, name asc
fn leaderboard_order(a: &CombinedEntry, b: &CombinedEntry) -> Ordering {
    b.combined_score
        .cmp(&a.combined_score)
        .then_with(|| b.artifacts.cmp(&a.artifacts))
        .then_with(|| a.name.cmp(&b.name))
}

/// Assign dense, tie-aware ranks to entries already in leaderboard order.
///
/// An entry whose score equals its predecessor's shares that rank; a strictly
/// lower score starts a new bucket at its 1-based position.
pub fn assign_ranks(entries: &mut [CombinedEntry]) {
    let mut rank = 1;
    for i in 0..entries.len() {
        if i > 0 && entries[i].combined_score < entries[i - 1].combined_score {
            rank = i as u32 + 1;
        }
        entries[i].rank = rank;
    }
}

/// Sort into leaderboard order and assign ranks
pub fn rank_entries(entries: &mut [CombinedEntry]) {
    entries.sort_by(leaderboard_order);
    assign_ranks(entries);
}

/// Keep entries scoring at least `min_score`, then re-rank
pub fn filter_and_rerank(mut entries: Vec<CombinedEntry>, min_score: u32) -> Vec<CombinedEntry> {
    entries.retain(|entry| entry.combined_score >= min_score);
    rank_entries(&mut entries);
    entries
}
