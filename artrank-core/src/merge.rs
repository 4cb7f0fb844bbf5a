//! Merge & disambiguation of artifact authors with AE committee members
//!
//! Authors and committee members are joined on normalized name keys. When
//! several authors collapse onto a key that also names a committee member,
//! conference overlap decides which one (if any) absorbs the committee data.
//! Ties are never broken arbitrarily: the member is then left unlinked and
//! appears as a standalone entry.

use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{info, warn};

use crate::{
    normalize, rank_entries, AuthorRecord, CombinedEntry, CommitteeMemberRecord, EntryFacts,
};

/// How one shared key was resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disambiguation {
    /// Normalized key shared by the authors and the member
    pub key: String,
    /// Candidate author names with their conference overlap, best first
    pub candidates: Vec<(String, usize)>,
    /// Winning author name, `None` when ambiguous
    pub winner: Option<String>,
}

/// Visibility into the linkage decisions of one merge
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    /// Keys with several authors where a unique best overlap picked a winner
    pub disambiguated: Vec<Disambiguation>,
    /// Keys where no author could be safely linked
    pub ambiguous: Vec<Disambiguation>,
    /// Authors that absorbed committee data
    pub linked: usize,
    /// Committee members emitted as standalone entries
    pub standalone_members: usize,
}

/// Ranked entries plus the linkage report
#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub entries: Vec<CombinedEntry>,
    pub report: MergeReport,
}

/// Merge authors and committee members into one ranked collection
pub fn merge(authors: &[AuthorRecord], members: &[CommitteeMemberRecord]) -> MergeOutcome {
    let (member_keys, member_by_key) = index_members(members);
    let (group_keys, groups) = group_authors(authors);

    let mut report = MergeReport::default();
    // author index -> member that author absorbs
    let mut winners: HashMap<usize, &CommitteeMemberRecord> = HashMap::new();

    for key in &group_keys {
        let Some(&member) = member_by_key.get(key.as_str()) else {
            continue;
        };
        let group = &groups[key.as_str()];

        if let [only] = group.as_slice() {
            winners.insert(*only, member);
            continue;
        }

        let member_confs: HashSet<&str> = member.conferences.iter().map(String::as_str).collect();
        let mut scored: Vec<(usize, usize)> = group
            .iter()
            .map(|&i| {
                let author_confs: HashSet<&str> =
                    authors[i].conferences.iter().map(String::as_str).collect();
                (author_confs.intersection(&member_confs).count(), i)
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let top = scored[0].0;
        let clear_winner = top > 0 && scored.get(1).map_or(true, |second| top > second.0);

        let candidates: Vec<(String, usize)> = scored
            .iter()
            .map(|&(overlap, i)| (authors[i].name.clone(), overlap))
            .collect();

        if clear_winner {
            let winner = scored[0].1;
            winners.insert(winner, member);
            info!(
                "Disambiguated '{}': {} (conference overlap {}) over {} other author(s)",
                key,
                authors[winner].name,
                top,
                scored.len() - 1
            );
            report.disambiguated.push(Disambiguation {
                key: key.clone(),
                candidates,
                winner: Some(authors[winner].name.clone()),
            });
        } else {
            warn!(
                "Ambiguous '{}': {:?} - committee member left unlinked",
                key, candidates
            );
            report.ambiguous.push(Disambiguation {
                key: key.clone(),
                candidates,
                winner: None,
            });
        }
    }

    if !report.ambiguous.is_empty() {
        warn!(
            "{} committee member(s) could not be unambiguously linked to an author",
            report.ambiguous.len()
        );
    }

    let mut linked_keys: HashSet<String> = HashSet::new();
    let mut entries = Vec::with_capacity(authors.len() + members.len());

    for (i, author) in authors.iter().enumerate() {
        let member = winners.get(&i).copied();
        if member.is_some() {
            linked_keys.insert(normalize(&author.name));
            report.linked += 1;
        }
        entries.push(CombinedEntry::from_facts(author_facts(author, member)));
    }

    for key in &member_keys {
        if linked_keys.contains(key) {
            continue;
        }
        if let Some(&member) = member_by_key.get(key.as_str()) {
            entries.push(CombinedEntry::from_facts(member_facts(member)));
            report.standalone_members += 1;
        }
    }
    for member in members.iter().filter(|m| normalize(&m.name).is_empty()) {
        entries.push(CombinedEntry::from_facts(member_facts(member)));
        report.standalone_members += 1;
    }

    rank_entries(&mut entries);

    MergeOutcome { entries, report }
}

/// Index members by key in first-seen order; on collision the member with
/// more memberships wins. Members whose key is empty are never linked.
fn index_members(
    members: &[CommitteeMemberRecord],
) -> (Vec<String>, HashMap<String, &CommitteeMemberRecord>) {
    let mut order = Vec::new();
    let mut by_key: HashMap<String, &CommitteeMemberRecord> = HashMap::new();

    for member in members {
        let key = normalize(&member.name);
        if key.is_empty() {
            continue;
        }
        match by_key.get(&key) {
            Some(existing) if member.total_memberships <= existing.total_memberships => {}
            Some(_) => {
                by_key.insert(key, member);
            }
            None => {
                order.push(key.clone());
                by_key.insert(key, member);
            }
        }
    }

    (order, by_key)
}

/// Group author indices by key in first-seen order
fn group_authors(authors: &[AuthorRecord]) -> (Vec<String>, HashMap<String, Vec<usize>>) {
    let mut order = Vec::new();
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();

    for (i, author) in authors.iter().enumerate() {
        let key = normalize(&author.name);
        if key.is_empty() {
            continue;
        }
        let group = groups.entry(key.clone()).or_default();
        if group.is_empty() {
            order.push(key);
        }
        group.push(i);
    }

    (order, groups)
}

fn author_facts(author: &AuthorRecord, member: Option<&CommitteeMemberRecord>) -> EntryFacts {
    let mut years = author.years.clone();
    let mut conferences: BTreeSet<String> = author.conferences.iter().cloned().collect();
    let author_affiliation = author.affiliation.clone().unwrap_or_default();

    let (affiliation, ae_memberships, chair_count) = match member {
        Some(m) => {
            years.merge_max(&m.years);
            conferences.extend(m.conferences.iter().cloned());
            let affiliation = m
                .affiliation
                .clone()
                .filter(|a| !a.is_empty())
                .unwrap_or(author_affiliation);
            (affiliation, m.total_memberships, m.chair_count)
        }
        None => (author_affiliation, 0, 0),
    };

    EntryFacts {
        name: author.name.clone(),
        affiliation,
        artifacts: author.artifacts(),
        total_papers: author.total_papers.unwrap_or(0),
        artifact_rate: author.artifact_rate.unwrap_or(0.0),
        ae_memberships,
        chair_count,
        badges_available: author.badges_available.unwrap_or(0),
        badges_functional: author.badges_functional.unwrap_or(0),
        badges_reproducible: author.badges_reproducible.unwrap_or(0),
        conferences: conferences.into_iter().collect(),
        years,
    }
}

fn member_facts(member: &CommitteeMemberRecord) -> EntryFacts {
    EntryFacts {
        name: member.name.clone(),
        affiliation: member.affiliation.clone().unwrap_or_default(),
        ae_memberships: member.total_memberships,
        chair_count: member.chair_count,
        conferences: member.conferences.clone(),
        years: member.years.clone(),
        ..Default::default()
    }
}
