//! Fuzzy name matching
//!
//! The strict matcher links roster records to authors and accepts false
//! negatives rather than risk linking two distinct people. The search-result
//! matcher is looser: its candidate pool has already been narrowed by a remote
//! search engine.

use crate::{normalize, search_key, AffiliationRecord};

/// Strict match: surname must be equal, given names equal or initial-compatible
pub fn matches(query_name: &str, candidate_name: &str) -> bool {
    let query = normalize(query_name);
    let candidate = normalize(candidate_name);

    if query == candidate {
        return true;
    }

    let query_parts: Vec<&str> = query.split_whitespace().collect();
    let candidate_parts: Vec<&str> = candidate.split_whitespace().collect();

    let (Some(query_last), Some(candidate_last)) = (query_parts.last(), candidate_parts.last())
    else {
        return false;
    };
    if query_last != candidate_last {
        return false;
    }

    given_names_compatible(query_parts[0], candidate_parts[0])
}

/// Exact, initial-of, in either direction
fn given_names_compatible(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    is_initial_of(a, b) || is_initial_of(b, a)
}

fn is_initial_of(initial: &str, full: &str) -> bool {
    initial.chars().count() == 1 && full.starts_with(initial)
}

/// Loose match used to validate hits returned by a name-search provider
pub fn matches_search_result(query_name: &str, result_name: &str) -> bool {
    let query = search_key(query_name);
    let result = search_key(result_name);

    if query.is_empty() || result.is_empty() {
        return false;
    }
    if query == result || query.contains(&result) || result.contains(&query) {
        return true;
    }

    match (query.split_whitespace().last(), result.split_whitespace().last()) {
        (Some(q), Some(r)) => q == r,
        _ => false,
    }
}

/// Outcome of resolving an author against roster candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterMatch {
    /// All matching records agree on this affiliation
    Found { affiliation: String, matched_name: String },
    /// Matching records disagree; declined to link
    Ambiguous { affiliations: Vec<String> },
    NotFound,
}

/// Resolve an author name against candidate records.
///
/// Every candidate passing [`matches`] is considered. When they name more than
/// one distinct affiliation the author is left unlinked.
pub fn resolve_affiliation(name: &str, candidates: &[AffiliationRecord]) -> RosterMatch {
    let matched: Vec<&AffiliationRecord> = candidates
        .iter()
        .filter(|record| matches(name, &record.name))
        .collect();

    let Some(first) = matched.first() else {
        return RosterMatch::NotFound;
    };

    let mut affiliations: Vec<String> = matched
        .iter()
        .map(|record| record.affiliation.trim().to_string())
        .collect();
    affiliations.sort();
    affiliations.dedup();

    if affiliations.len() == 1 {
        RosterMatch::Found {
            affiliation: first.affiliation.trim().to_string(),
            matched_name: first.name.clone(),
        }
    } else {
        RosterMatch::Ambiguous { affiliations }
    }
}
