//! Incremental directory enrichment
//!
//! Each run searches only the authors whose history makes them eligible:
//! never-searched authors first, then unsuccessful authors whose backoff has
//! expired. Authors that already have an affiliation, are in backoff, or fall
//! beyond the run cap pass through unchanged.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use artrank_core::{AuthorEntry, BackoffPolicy, SearchHistory};
use artrank_net::unix_now;

use crate::{EnrichError, SharedDirectory};

/// Counters for one incremental run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IncrementalStats {
    pub total_authors: usize,
    pub already_has_affiliation: usize,
    pub new_authors_to_search: usize,
    pub authors_ready_for_retry: usize,
    pub authors_in_backoff: usize,
    pub searches_performed: usize,
    pub affiliations_found: usize,
    /// Eligible authors left for a later run by the search cap
    pub deferred_by_cap: usize,
    pub lookup_failures: usize,
    pub network_requests: usize,
    pub cache_hits: usize,
}

impl IncrementalStats {
    pub fn success_rate(&self) -> f64 {
        if self.searches_performed == 0 {
            0.0
        } else {
            100.0 * self.affiliations_found as f64 / self.searches_performed as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Priority {
    New,
    Retry,
}

type Clock = Arc<dyn Fn() -> f64 + Send + Sync>;

/// Search scheduler driving an [`AuthorDirectory`](crate::AuthorDirectory)
pub struct IncrementalEnricher {
    directory: SharedDirectory,
    policy: BackoffPolicy,
    max_searches: Option<usize>,
    clock: Clock,
}

impl IncrementalEnricher {
    pub fn new(directory: SharedDirectory) -> Self {
        Self {
            directory,
            policy: BackoffPolicy::default(),
            max_searches: None,
            clock: Arc::new(unix_now),
        }
    }

    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cap the number of search attempts in one run
    pub fn with_max_searches(mut self, max_searches: Option<usize>) -> Self {
        self.max_searches = max_searches;
        self
    }

    /// Replace the wall clock (unix seconds)
    pub fn with_clock(mut self, clock: impl Fn() -> f64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Look up affiliations for eligible authors, updating `history` after
    /// every attempt. Authors are modified in place; order is preserved.
    pub async fn run(
        &self,
        authors: &mut [AuthorEntry],
        history: &mut SearchHistory,
    ) -> IncrementalStats {
        let mut stats = IncrementalStats {
            total_authors: authors.len(),
            ..Default::default()
        };

        let now = (self.clock)();
        let mut queue: Vec<(Priority, usize)> = Vec::new();

        for (i, author) in authors.iter().enumerate() {
            if author.has_known_affiliation() {
                stats.already_has_affiliation += 1;
                continue;
            }

            let decision = history.should_search(&author.name, now, &self.policy);
            if !decision.eligible {
                debug!("Skipping {}: {}", author.name, decision.reason);
                stats.authors_in_backoff += 1;
            } else if decision.is_retry() {
                stats.authors_ready_for_retry += 1;
                queue.push((Priority::Retry, i));
            } else {
                stats.new_authors_to_search += 1;
                queue.push((Priority::New, i));
            }
        }

        // Stable: source order is kept within each priority
        queue.sort_by_key(|(priority, _)| *priority);

        info!(
            "{} new, {} ready for retry, {} in backoff, {} already known",
            stats.new_authors_to_search,
            stats.authors_ready_for_retry,
            stats.authors_in_backoff,
            stats.already_has_affiliation
        );

        for (_, i) in queue {
            if self
                .max_searches
                .is_some_and(|max| stats.searches_performed >= max)
            {
                stats.deferred_by_cap += 1;
                continue;
            }
            stats.searches_performed += 1;

            let author = &mut authors[i];
            let found = match self.lookup(&author.name).await {
                Ok(Some(affiliation)) => {
                    info!("{} -> {}", author.name, affiliation);
                    author.affiliation = Some(affiliation);
                    stats.affiliations_found += 1;
                    true
                }
                Ok(None) => {
                    debug!("No affiliation for {}", author.name);
                    false
                }
                Err(e) => {
                    warn!("Lookup failed for {}: {}", author.name, e);
                    stats.lookup_failures += 1;
                    false
                }
            };
            history.record_attempt(&author.name, found, (self.clock)());

            if stats.searches_performed % 10 == 0 {
                info!(
                    "[{}] found {} ({:.1}%)",
                    stats.searches_performed,
                    stats.affiliations_found,
                    stats.success_rate()
                );
            }
        }

        if stats.deferred_by_cap > 0 {
            info!(
                "Search cap reached, {} authors deferred to a later run",
                stats.deferred_by_cap
            );
        }

        let lookups = self.directory.lookup_stats();
        stats.network_requests = lookups.network_requests;
        stats.cache_hits = lookups.cache_hits;
        stats
    }

    async fn lookup(&self, name: &str) -> Result<Option<String>, EnrichError> {
        let Some(id) = self.directory.search_author(name).await? else {
            return Ok(None);
        };
        debug!("{}: {} id {}", name, self.directory.name(), id);

        Ok(self
            .directory
            .fetch_affiliation(&id)
            .await?
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthorDirectory;
    use artrank_core::{SearchReason, SearchState};
    use artrank_net::LookupStats;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const DAY: f64 = 86_400.0;
    const NOW: f64 = 1_700_000_000.0;

    #[derive(Default)]
    struct MockDirectory {
        affiliations: HashMap<String, String>,
        failing: Vec<String>,
        searched: Mutex<Vec<String>>,
    }

    impl MockDirectory {
        fn with(mut self, name: &str, affiliation: &str) -> Self {
            self.affiliations
                .insert(name.to_string(), affiliation.to_string());
            self
        }

        fn failing(mut self, name: &str) -> Self {
            self.failing.push(name.to_string());
            self
        }

        fn searched(&self) -> Vec<String> {
            self.searched.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AuthorDirectory for MockDirectory {
        async fn search_author(&self, name: &str) -> Result<Option<String>, EnrichError> {
            self.searched.lock().unwrap().push(name.to_string());
            if self.failing.iter().any(|n| n == name) {
                return Err(EnrichError::Unavailable("connection reset".to_string()));
            }
            Ok(self
                .affiliations
                .contains_key(name)
                .then(|| format!("pid/{name}")))
        }

        async fn fetch_affiliation(&self, id: &str) -> Result<Option<String>, EnrichError> {
            let name = id.trim_start_matches("pid/");
            Ok(self.affiliations.get(name).cloned())
        }

        fn name(&self) -> &str {
            "mock"
        }

        fn lookup_stats(&self) -> LookupStats {
            LookupStats {
                network_requests: self.searched().len(),
                cache_hits: 0,
            }
        }
    }

    fn enricher(directory: Arc<MockDirectory>) -> IncrementalEnricher {
        IncrementalEnricher::new(directory).with_clock(|| NOW)
    }

    #[tokio::test]
    async fn test_new_authors_searched_before_retries() {
        let directory = Arc::new(MockDirectory::default().with("Carol", "MIT"));
        let mut history = SearchHistory::new();
        // Retry-eligible: one failed attempt three days ago
        history.record_attempt("Alice", false, NOW - 3.0 * DAY);

        let mut authors = vec![
            AuthorEntry::new("Alice"),
            AuthorEntry::new("Bob"),
            AuthorEntry::new("Carol"),
        ];

        let stats = enricher(directory.clone())
            .run(&mut authors, &mut history)
            .await;

        assert_eq!(directory.searched(), vec!["Bob", "Carol", "Alice"]);
        assert_eq!(stats.new_authors_to_search, 2);
        assert_eq!(stats.authors_ready_for_retry, 1);
        assert_eq!(stats.searches_performed, 3);
        assert_eq!(stats.affiliations_found, 1);
        assert_eq!(stats.network_requests, 3);
        // Output keeps source order
        assert_eq!(authors[2].name, "Carol");
        assert_eq!(authors[2].affiliation.as_deref(), Some("MIT"));

        assert_eq!(history.state("Carol"), SearchState::Found);
        assert_eq!(history.state("Bob"), SearchState::Unsuccessful { attempts: 1 });
        assert_eq!(history.state("Alice"), SearchState::Unsuccessful { attempts: 2 });
    }

    #[tokio::test]
    async fn test_known_and_backoff_authors_are_skipped() {
        let directory = Arc::new(MockDirectory::default().with("Dave", "ETH Zurich"));
        let mut history = SearchHistory::new();
        // Two attempts: backoff is 4 days, only 1 has passed
        history.record_attempt("Dave", false, NOW - 10.0 * DAY);
        history.record_attempt("Dave", false, NOW - DAY);
        history.record_attempt("Erin", true, NOW - 100.0 * DAY);

        let mut authors = vec![
            AuthorEntry::new("Dave").with_affiliation("Unknown"),
            AuthorEntry::new("Erin"),
            AuthorEntry::new("Frank").with_affiliation("EPFL"),
        ];

        let stats = enricher(directory.clone())
            .run(&mut authors, &mut history)
            .await;

        assert!(directory.searched().is_empty());
        assert_eq!(stats.already_has_affiliation, 1);
        assert_eq!(stats.authors_in_backoff, 2);
        assert_eq!(stats.searches_performed, 0);
        assert_eq!(authors[0].affiliation.as_deref(), Some("Unknown"));
        assert_eq!(history.state("Dave"), SearchState::Unsuccessful { attempts: 2 });
        assert_eq!(
            history.should_search("Erin", NOW, &BackoffPolicy::default()).reason,
            SearchReason::AlreadyFound
        );
    }

    #[tokio::test]
    async fn test_cap_defers_without_penalty() {
        let directory = Arc::new(
            MockDirectory::default()
                .with("Gina", "UCSD")
                .with("Hank", "UW"),
        );
        let mut history = SearchHistory::new();
        let mut authors = vec![AuthorEntry::new("Gina"), AuthorEntry::new("Hank")];

        let stats = enricher(directory.clone())
            .with_max_searches(Some(1))
            .run(&mut authors, &mut history)
            .await;

        assert_eq!(stats.searches_performed, 1);
        assert_eq!(stats.deferred_by_cap, 1);
        assert_eq!(authors[0].affiliation.as_deref(), Some("UCSD"));
        assert_eq!(authors[1].affiliation, None);
        // Deferred author has no history entry and stays a new author
        assert_eq!(history.state("Hank"), SearchState::NeverSearched);
    }

    #[tokio::test]
    async fn test_lookup_failure_counts_as_attempt() {
        let directory = Arc::new(
            MockDirectory::default()
                .with("Ivy", "Cornell")
                .failing("Jack"),
        );
        let mut history = SearchHistory::new();
        let mut authors = vec![AuthorEntry::new("Jack"), AuthorEntry::new("Ivy")];

        let stats = enricher(directory)
            .run(&mut authors, &mut history)
            .await;

        assert_eq!(stats.lookup_failures, 1);
        assert_eq!(stats.affiliations_found, 1);
        assert_eq!(authors[0].affiliation, None);
        assert_eq!(authors[1].affiliation.as_deref(), Some("Cornell"));
        assert_eq!(history.state("Jack"), SearchState::Unsuccessful { attempts: 1 });
        assert_eq!(history.get("Jack").unwrap().last_search_timestamp, NOW);
    }

    #[tokio::test]
    async fn test_blank_affiliation_is_not_found() {
        let directory = Arc::new(MockDirectory::default().with("Kim", "   "));
        let mut history = SearchHistory::new();
        let mut authors = vec![AuthorEntry::new("Kim")];

        let stats = enricher(directory)
            .run(&mut authors, &mut history)
            .await;

        assert_eq!(stats.affiliations_found, 0);
        assert_eq!(authors[0].affiliation, None);
        assert_eq!(history.state("Kim"), SearchState::Unsuccessful { attempts: 1 });
    }
}
