//! Search history and exponential backoff
//!
//! Each author ever looked up in the remote directory has one history entry,
//! keyed by raw display name. An author moves from never-searched to either
//! `found` (terminal) or `unsuccessful(n)`; unsuccessful authors become
//! eligible again once `min(base * multiplier^n, cap)` has elapsed since the
//! last attempt.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::warn;

const SECS_PER_DAY: u64 = 86_400;
const SECS_PER_HOUR: f64 = 3_600.0;

/// Backoff parameters, in whole days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffPolicy {
    pub base_days: u64,
    pub multiplier: u64,
    pub cap_days: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_days: 1,
            multiplier: 2,
            cap_days: 30,
        }
    }
}

impl BackoffPolicy {
    /// Backoff in days after `attempt_count` unsuccessful attempts
    pub fn backoff_days(&self, attempt_count: u32) -> u64 {
        self.multiplier
            .checked_pow(attempt_count)
            .and_then(|factor| self.base_days.checked_mul(factor))
            .map_or(self.cap_days, |days| days.min(self.cap_days))
    }

    /// Required wait before the next attempt
    pub fn wait_for(&self, attempt_count: u32) -> Duration {
        Duration::from_secs(self.backoff_days(attempt_count).saturating_mul(SECS_PER_DAY))
    }
}

/// Persisted outcome of past lookups for one author
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
    #[serde(default)]
    pub found: bool,
    /// Unix timestamp (seconds) of the most recent attempt
    #[serde(default, rename = "last_search_ts")]
    pub last_search_timestamp: f64,
    #[serde(default)]
    pub attempt_count: u32,
}

/// Lifecycle state derived from a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    NeverSearched,
    Found,
    Unsuccessful { attempts: u32 },
}

/// Why an author is or is not eligible for a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchReason {
    NewAuthor,
    AlreadyFound,
    BackoffExpired { backoff_days: u64 },
    BackoffActive { hours_left: u64 },
}

impl fmt::Display for SearchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchReason::NewAuthor => write!(f, "new_author"),
            SearchReason::AlreadyFound => write!(f, "already_found"),
            SearchReason::BackoffExpired { backoff_days } => {
                write!(f, "backoff_expired_{backoff_days}d")
            }
            SearchReason::BackoffActive { hours_left } => {
                write!(f, "backoff_active_{hours_left}h_left")
            }
        }
    }
}

/// Eligibility verdict for one author
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchDecision {
    pub eligible: bool,
    pub reason: SearchReason,
}

impl SearchDecision {
    /// A retry, as opposed to a first-time search
    pub fn is_retry(&self) -> bool {
        matches!(self.reason, SearchReason::BackoffExpired { .. })
    }
}

/// All history entries, keyed by raw author name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchHistory {
    entries: BTreeMap<String, SearchHistoryEntry>,
}

impl SearchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a persisted history document; malformed input yields an empty history
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(history) => history,
            Err(e) => {
                warn!("Ignoring malformed search history: {}", e);
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn get(&self, author: &str) -> Option<&SearchHistoryEntry> {
        self.entries.get(author)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn state(&self, author: &str) -> SearchState {
        match self.entries.get(author) {
            None => SearchState::NeverSearched,
            Some(entry) if entry.found => SearchState::Found,
            Some(entry) => SearchState::Unsuccessful {
                attempts: entry.attempt_count,
            },
        }
    }

    /// Record the outcome of one lookup attempt made at `now`
    pub fn record_attempt(&mut self, author: &str, found: bool, now: f64) {
        let entry = self.entries.entry(author.to_string()).or_default();
        entry.found = found;
        entry.last_search_timestamp = now;
        entry.attempt_count = entry.attempt_count.saturating_add(1);
    }

    /// Decide whether `author` should be looked up at time `now`
    pub fn should_search(&self, author: &str, now: f64, policy: &BackoffPolicy) -> SearchDecision {
        let Some(entry) = self.entries.get(author) else {
            return SearchDecision {
                eligible: true,
                reason: SearchReason::NewAuthor,
            };
        };

        if entry.found {
            return SearchDecision {
                eligible: false,
                reason: SearchReason::AlreadyFound,
            };
        }

        let backoff_days = policy.backoff_days(entry.attempt_count);
        let backoff_secs = policy.wait_for(entry.attempt_count).as_secs_f64();
        let elapsed = now - entry.last_search_timestamp;

        if elapsed >= backoff_secs {
            SearchDecision {
                eligible: true,
                reason: SearchReason::BackoffExpired { backoff_days },
            }
        } else {
            SearchDecision {
                eligible: false,
                reason: SearchReason::BackoffActive {
                    hours_left: ((backoff_secs - elapsed) / SECS_PER_HOUR) as u64,
                },
            }
        }
    }
}
