//! Candidate index over a bulk affiliation roster
//!
//! Records are indexed under their normalized full-name key and, for names
//! with at least two tokens, under a `lastname:<surname>` fallback key.

use std::collections::HashMap;

use crate::{normalize, surname_key, AffiliationRecord};

const LASTNAME_PREFIX: &str = "lastname:";

/// Mapping from name keys to roster records
#[derive(Debug, Clone, Default)]
pub struct CandidateIndex {
    entries: HashMap<String, Vec<AffiliationRecord>>,
    record_count: usize,
    skipped: usize,
}

impl CandidateIndex {
    /// Build an index, excluding records that lack a name or affiliation
    pub fn build(records: impl IntoIterator<Item = AffiliationRecord>) -> Self {
        let mut index = Self::default();
        for record in records {
            index.insert(record);
        }
        index
    }

    fn insert(&mut self, record: AffiliationRecord) {
        if !record.is_usable() {
            self.skipped += 1;
            return;
        }

        let key = normalize(&record.name);
        if key.is_empty() {
            self.skipped += 1;
            return;
        }

        if let Some(surname) = surname_key(&record.name) {
            self.entries
                .entry(lastname_key(&surname))
                .or_default()
                .push(record.clone());
        }
        self.entries.entry(key).or_default().push(record);
        self.record_count += 1;
    }

    /// Records filed under the full key, falling back to the surname key
    pub fn lookup(&self, name: &str) -> &[AffiliationRecord] {
        let exact = self.entries.get(&normalize(name)).map(Vec::as_slice);
        match exact {
            Some(records) if !records.is_empty() => records,
            _ => surname_key(name)
                .and_then(|surname| self.entries.get(&lastname_key(&surname)))
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        }
    }

    /// Number of distinct records indexed
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Number of rows excluded at build time
    pub fn skipped_count(&self) -> usize {
        self.skipped
    }
}

fn lastname_key(surname: &str) -> String {
    format!("{LASTNAME_PREFIX}{surname}")
}
