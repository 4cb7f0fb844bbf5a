//! Stage runners
//!
//! Each runner loads its inputs, runs one stage and persists the result.
//! Required inputs are read before anything is written, so a missing file
//! aborts the run without partial output.

use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use artrank_core::{
    filter_and_rerank, merge, AuthorEntry, AuthorRecord, CandidateIndex, CombinedEntry,
    CommitteeMemberRecord, MergeReport, SearchHistory,
};
use artrank_enrich::{
    dblp_directory, enrich_from_roster, IncrementalEnricher, IncrementalStats, RosterStats,
    SharedDirectory,
};
use artrank_net::{create_client, CacheStore, DblpClient, FileCache, MemoryCache, RosterSource};

use crate::{
    load_history, read_collection, read_optional_collection, save_history, write_json,
    write_json_pretty, write_yaml, DataLayout, PipelineConfig, Scope,
};

/// Options of a roster enrichment run
#[derive(Debug, Clone, Default)]
pub struct RosterOptions {
    pub authors_file: PathBuf,
    /// Defaults to `authors_file`
    pub output_file: Option<PathBuf>,
    pub max_authors: Option<usize>,
    pub force_refresh: bool,
    pub dry_run: bool,
}

/// Outcome of a roster run
#[derive(Debug, Clone, Copy)]
pub struct RosterReport {
    pub stats: RosterStats,
    pub roster_records: usize,
    pub roster_skipped: usize,
}

/// Download (or reuse) the roster and enrich an authors file from it
pub async fn run_roster_enrichment(
    config: &PipelineConfig,
    options: &RosterOptions,
) -> anyhow::Result<RosterReport> {
    // Fail on a missing input before touching the network
    let authors: Vec<AuthorEntry> = read_collection(&options.authors_file, "authors")?;

    let client = create_client(&config.http)?;
    let source = RosterSource::new(config.roster.clone(), &config.cache.dir);
    let records = source
        .load(&client, options.force_refresh)
        .await
        .context("Roster unavailable")?;

    let index = CandidateIndex::build(records);
    info!(
        "Indexed {} roster records ({} skipped)",
        index.record_count(),
        index.skipped_count()
    );

    let stats = enrich_authors(authors, &index, options)?;
    Ok(RosterReport {
        stats,
        roster_records: index.record_count(),
        roster_skipped: index.skipped_count(),
    })
}

fn enrich_authors(
    mut authors: Vec<AuthorEntry>,
    index: &CandidateIndex,
    options: &RosterOptions,
) -> anyhow::Result<RosterStats> {
    let stats = enrich_from_roster(&mut authors, index, options.max_authors);
    info!(
        "Roster enrichment: {} of {} missing matched ({:.1}%), coverage {:.1}%",
        stats.matched,
        stats.missing,
        stats.match_rate(),
        stats.coverage()
    );

    if options.dry_run {
        info!("Dry run, not writing output");
    } else {
        let output = options
            .output_file
            .as_deref()
            .unwrap_or(&options.authors_file);
        write_json_pretty(output, &authors)?;
        info!("Enriched data saved to {}", output.display());
    }
    Ok(stats)
}

/// Run the incremental DBLP stage over `<data_dir>/assets/data/authors.json`
pub async fn run_incremental_enrichment(
    config: &PipelineConfig,
    layout: &DataLayout,
    max_searches: Option<usize>,
    dry_run: bool,
) -> anyhow::Result<IncrementalStats> {
    let client = create_client(&config.http)?;
    let cache: Arc<dyn CacheStore> = if dry_run {
        Arc::new(MemoryCache::new())
    } else {
        Arc::new(FileCache::new(&config.cache.dir))
    };
    let dblp = DblpClient::new(
        client,
        cache,
        config.dblp.clone(),
        config.http.request_delay(),
    );

    let enricher = incremental_enricher(config, dblp_directory(dblp), max_searches);
    enrich_incremental_file(
        &enricher,
        &layout.authors_file(),
        &config.cache.history_file(),
        dry_run,
    )
    .await
}

/// Incremental enrichment of one authors file against a history file
pub async fn enrich_incremental_file(
    enricher: &IncrementalEnricher,
    authors_file: &Path,
    history_file: &Path,
    dry_run: bool,
) -> anyhow::Result<IncrementalStats> {
    let mut authors: Vec<AuthorEntry> = read_collection(authors_file, "authors")?;
    let mut history = load_history(history_file);

    let stats = enricher.run(&mut authors, &mut history).await;
    info!(
        "Searches performed: {}, new affiliations: {} ({:.1}%)",
        stats.searches_performed,
        stats.affiliations_found,
        stats.success_rate()
    );

    if dry_run {
        info!("Dry run, not writing authors or history");
        return Ok(stats);
    }

    persist_incremental(
        authors_file,
        &authors,
        history_file,
        &history,
        stats.affiliations_found > 0,
    )?;
    Ok(stats)
}

/// Write enriched authors, then the history.
///
/// A `found` history entry is terminal, so it must never reach disk unless
/// the affiliation it stands for did.
fn persist_incremental(
    authors_file: &Path,
    authors: &[AuthorEntry],
    history_file: &Path,
    history: &SearchHistory,
    authors_changed: bool,
) -> anyhow::Result<()> {
    if authors_changed {
        write_json_pretty(authors_file, authors)?;
        info!("Enriched data saved to {}", authors_file.display());
    }
    save_history(history_file, history)
}

/// Build an incremental enricher over an arbitrary directory
pub fn incremental_enricher(
    config: &PipelineConfig,
    directory: SharedDirectory,
    max_searches: Option<usize>,
) -> IncrementalEnricher {
    IncrementalEnricher::new(directory)
        .with_policy(config.backoff)
        .with_max_searches(max_searches)
}

/// Site summary, written as YAML in this key order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CombinedSummary {
    pub combined_total: usize,
    pub combined_systems: usize,
    pub combined_security: usize,
    pub both_artifacts_and_ae: usize,
    pub both_artifacts_and_ae_systems: usize,
    pub both_artifacts_and_ae_security: usize,
    pub top_combined_score: u32,
}

/// Leaderboard of one scope together with its merge report
#[derive(Debug, Clone)]
pub struct ScopeRanking {
    pub scope: Scope,
    pub entries: Vec<CombinedEntry>,
    pub report: MergeReport,
}

impl ScopeRanking {
    fn both_count(&self) -> usize {
        self.entries.iter().filter(|e| e.has_both()).count()
    }
}

/// Outcome of a rankings run
#[derive(Debug, Clone)]
pub struct RankingsReport {
    pub scopes: Vec<ScopeRanking>,
    pub summary: CombinedSummary,
}

/// Merge authors with committee members for every scope and write the
/// leaderboards plus the site summary
pub fn run_rankings(layout: &DataLayout, min_score: u32) -> anyhow::Result<RankingsReport> {
    let mut inputs = Vec::with_capacity(Scope::ALL.len());
    for scope in Scope::ALL {
        inputs.push((scope, load_scope(layout, scope)?));
    }

    let scopes: Vec<ScopeRanking> = inputs
        .into_iter()
        .map(|(scope, (authors, members))| rank_scope(scope, &authors, &members, min_score))
        .collect();

    for ranking in &scopes {
        let path = layout.scope_rankings(ranking.scope);
        write_json(&path, &ranking.entries)?;
        info!("Wrote {} ({} entries)", path.display(), ranking.entries.len());
    }

    let summary = summarize(&scopes);
    let summary_path = layout.summary_file();
    write_yaml(&summary_path, &summary)?;
    info!("Wrote {}", summary_path.display());
    info!(
        "Combined rankings: {} total, {} systems, {} security; {} with both artifacts and AE service",
        summary.combined_total,
        summary.combined_systems,
        summary.combined_security,
        summary.both_artifacts_and_ae
    );

    Ok(RankingsReport { scopes, summary })
}

fn load_scope(
    layout: &DataLayout,
    scope: Scope,
) -> anyhow::Result<(Vec<AuthorRecord>, Vec<CommitteeMemberRecord>)> {
    let authors_path = layout.scope_authors(scope);
    let members_path = layout.scope_members(scope);

    if scope.inputs_required() {
        Ok((
            read_collection(&authors_path, "authors")?,
            read_collection(&members_path, "committee members")?,
        ))
    } else {
        Ok((
            read_optional_collection(&authors_path, "authors")?,
            read_optional_collection(&members_path, "committee members")?,
        ))
    }
}

/// Merge, filter by `min_score` and re-rank one scope
pub fn rank_scope(
    scope: Scope,
    authors: &[AuthorRecord],
    members: &[CommitteeMemberRecord],
    min_score: u32,
) -> ScopeRanking {
    let outcome = merge(authors, members);
    info!(
        "[{}] merged {} authors and {} members: {} linked, {} disambiguated, {} ambiguous",
        scope.name(),
        authors.len(),
        members.len(),
        outcome.report.linked,
        outcome.report.disambiguated.len(),
        outcome.report.ambiguous.len()
    );

    ScopeRanking {
        scope,
        entries: filter_and_rerank(outcome.entries, min_score),
        report: outcome.report,
    }
}

fn summarize(scopes: &[ScopeRanking]) -> CombinedSummary {
    let get = |scope: Scope| scopes.iter().find(|r| r.scope == scope);
    let len = |scope: Scope| get(scope).map_or(0, |r| r.entries.len());
    let both = |scope: Scope| get(scope).map_or(0, ScopeRanking::both_count);

    CombinedSummary {
        combined_total: len(Scope::All),
        combined_systems: len(Scope::Systems),
        combined_security: len(Scope::Security),
        both_artifacts_and_ae: both(Scope::All),
        both_artifacts_and_ae_systems: both(Scope::Systems),
        both_artifacts_and_ae_security: both(Scope::Security),
        top_combined_score: get(Scope::All)
            .and_then(|r| r.entries.first())
            .map_or(0, |e| e.combined_score),
    }
}

/// Reset the incremental search history
pub fn reset_history(config: &PipelineConfig) -> anyhow::Result<bool> {
    crate::clear_history(&config.cache.history_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use artrank_core::{AffiliationRecord, SearchState};
    use artrank_enrich::{AuthorDirectory, EnrichError};
    use async_trait::async_trait;
    use std::fs;

    const AUTHORS: &str = r#"[
        {"name": "Wei Zhang", "affiliation": "Unknown", "conferences": ["OSDI", "SOSP"],
         "years": {"2021": 1, "2022": 1}, "total": 2,
         "badges_functional": 1, "badges_reproducible": 1},
        {"name": "Wei Zhang 0002", "conferences": ["CCS"], "years": [2020], "total": 1,
         "badges_available": 1},
        {"name": "Ada Lovelace", "affiliation": "University of London", "conferences": ["EuroSys"],
         "total": 1}
    ]"#;

    const MEMBERS: &str = r#"[
        {"name": "Wei Zhang", "affiliation": "Tsinghua University", "conferences": ["OSDI"],
         "years": {"2023": 1}, "total_memberships": 1, "chair_count": 1},
        {"name": "Grace Hopper", "conferences": ["SOSP"], "total_memberships": 2}
    ]"#;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_rankings_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        write(&layout.scope_authors(Scope::All), AUTHORS);
        write(&layout.scope_members(Scope::All), MEMBERS);

        let report = run_rankings(&layout, 3).unwrap();
        let all = &report.scopes[0];

        // Wei Zhang (OSDI overlap) gets the committee data: 4 + 5
        assert_eq!(all.entries[0].name, "Wei Zhang");
        assert_eq!(all.entries[0].combined_score, 9);
        assert_eq!(all.entries[0].affiliation, "Tsinghua University");
        assert_eq!(all.entries[0].rank, 1);
        // Grace Hopper is standalone with 2 memberships
        assert_eq!(all.entries[1].name, "Grace Hopper");
        assert_eq!(all.entries[1].combined_score, 6);
        assert_eq!(all.entries[1].rank, 2);
        // Scores below 3 are dropped
        assert_eq!(all.entries.len(), 2);

        assert_eq!(
            report.summary,
            CombinedSummary {
                combined_total: 2,
                combined_systems: 0,
                combined_security: 0,
                both_artifacts_and_ae: 1,
                both_artifacts_and_ae_systems: 0,
                both_artifacts_and_ae_security: 0,
                top_combined_score: 9,
            }
        );

        let written: Vec<serde_json::Value> = serde_json::from_str(
            &fs::read_to_string(layout.scope_rankings(Scope::All)).unwrap(),
        )
        .unwrap();
        assert_eq!(written.len(), 2);
        assert!(layout.scope_rankings(Scope::Systems).exists());

        let yaml = fs::read_to_string(layout.summary_file()).unwrap();
        let keys: Vec<&str> = yaml
            .lines()
            .filter_map(|line| line.split(':').next())
            .collect();
        assert_eq!(
            keys,
            vec![
                "combined_total",
                "combined_systems",
                "combined_security",
                "both_artifacts_and_ae",
                "both_artifacts_and_ae_systems",
                "both_artifacts_and_ae_security",
                "top_combined_score",
            ]
        );
    }

    #[test]
    fn test_rankings_missing_required_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let layout = DataLayout::new(dir.path());
        write(&layout.scope_authors(Scope::All), AUTHORS);

        assert!(run_rankings(&layout, 3).is_err());
        assert!(!layout.scope_rankings(Scope::All).exists());
        assert!(!layout.summary_file().exists());
    }

    #[test]
    fn test_roster_enrichment_writes_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let authors_file = dir.path().join("authors.json");
        write(
            &authors_file,
            r#"[{"name": "Haibo Chen", "total": 3}, {"name": "Ada Lovelace", "affiliation": "University of London"}]"#,
        );
        let index = CandidateIndex::build(vec![AffiliationRecord::new(
            "Haibo Chen",
            "Shanghai Jiao Tong University",
        )]);
        let options = RosterOptions {
            authors_file: authors_file.clone(),
            ..Default::default()
        };

        let authors = read_collection(&authors_file, "authors").unwrap();
        let stats = enrich_authors(authors, &index, &options).unwrap();
        assert_eq!(stats.enriched, 1);

        let written: Vec<serde_json::Value> =
            serde_json::from_str(&fs::read_to_string(&authors_file).unwrap()).unwrap();
        assert_eq!(written[0]["affiliation"], "Shanghai Jiao Tong University");
        // Unknown fields survive
        assert_eq!(written[0]["total"], 3);
        assert_eq!(written[1]["name"], "Ada Lovelace");
    }

    #[test]
    fn test_roster_dry_run_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        let authors_file = dir.path().join("authors.json");
        let original = r#"[{"name": "Haibo Chen"}]"#;
        write(&authors_file, original);
        let index = CandidateIndex::build(vec![AffiliationRecord::new("Haibo Chen", "SJTU")]);
        let options = RosterOptions {
            authors_file: authors_file.clone(),
            output_file: Some(dir.path().join("out.json")),
            dry_run: true,
            ..Default::default()
        };

        let authors = read_collection(&authors_file, "authors").unwrap();
        let stats = enrich_authors(authors, &index, &options).unwrap();
        assert_eq!(stats.enriched, 1);
        assert_eq!(fs::read_to_string(&authors_file).unwrap(), original);
        assert!(!dir.path().join("out.json").exists());
    }

    #[tokio::test]
    async fn test_roster_missing_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let options = RosterOptions {
            authors_file: dir.path().join("authors.json"),
            ..Default::default()
        };
        assert!(run_roster_enrichment(&PipelineConfig::default(), &options)
            .await
            .is_err());
    }

    struct FixedDirectory;

    #[async_trait]
    impl AuthorDirectory for FixedDirectory {
        async fn search_author(&self, name: &str) -> Result<Option<String>, EnrichError> {
            Ok((name == "Haibo Chen").then(|| "c/HaiboChen".to_string()))
        }

        async fn fetch_affiliation(&self, _id: &str) -> Result<Option<String>, EnrichError> {
            Ok(Some("Shanghai Jiao Tong University".to_string()))
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    #[tokio::test]
    async fn test_incremental_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let authors_file = dir.path().join("authors.json");
        let history_file = dir.path().join("cache").join("dblp_search_history.json");
        write(
            &authors_file,
            r#"[{"name": "Nobody Known"}, {"name": "Haibo Chen", "affiliation": "_stub"}]"#,
        );

        let config = PipelineConfig::default();
        let enricher = incremental_enricher(&config, Arc::new(FixedDirectory), None);
        let stats = enrich_incremental_file(&enricher, &authors_file, &history_file, false)
            .await
            .unwrap();

        assert_eq!(stats.searches_performed, 2);
        assert_eq!(stats.affiliations_found, 1);

        let written: Vec<serde_json::Value> =
            serde_json::from_str(&fs::read_to_string(&authors_file).unwrap()).unwrap();
        assert_eq!(written[0]["name"], "Nobody Known");
        assert_eq!(written[1]["affiliation"], "Shanghai Jiao Tong University");

        let history = load_history(&history_file);
        assert_eq!(history.state("Haibo Chen"), SearchState::Found);
        assert_eq!(
            history.state("Nobody Known"),
            SearchState::Unsuccessful { attempts: 1 }
        );

        // Second run: one author found, the other in backoff
        let stats = enrich_incremental_file(&enricher, &authors_file, &history_file, false)
            .await
            .unwrap();
        assert_eq!(stats.searches_performed, 0);
        assert_eq!(stats.already_has_affiliation, 1);
        assert_eq!(stats.authors_in_backoff, 1);
    }

    #[tokio::test]
    async fn test_incremental_dry_run_persists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let authors_file = dir.path().join("authors.json");
        let history_file = dir.path().join("dblp_search_history.json");
        let original = r#"[{"name": "Haibo Chen"}]"#;
        write(&authors_file, original);

        let enricher =
            incremental_enricher(&PipelineConfig::default(), Arc::new(FixedDirectory), None);
        let stats = enrich_incremental_file(&enricher, &authors_file, &history_file, true)
            .await
            .unwrap();

        assert_eq!(stats.affiliations_found, 1);
        assert_eq!(fs::read_to_string(&authors_file).unwrap(), original);
        assert!(!history_file.exists());
    }

    #[test]
    fn test_failed_authors_write_keeps_history_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the authors file should be makes the write fail
        let authors_file = dir.path().join("authors.json");
        fs::create_dir_all(&authors_file).unwrap();
        let history_file = dir.path().join("dblp_search_history.json");

        let authors = vec![AuthorEntry::new("Haibo Chen").with_affiliation("SJTU")];
        let mut history = SearchHistory::new();
        history.record_attempt("Haibo Chen", true, 1_700_000_000.0);

        let result = persist_incremental(&authors_file, &authors, &history_file, &history, true);
        assert!(result.is_err());
        assert!(!history_file.exists());
        assert_eq!(
            load_history(&history_file).state("Haibo Chen"),
            SearchState::NeverSearched
        );
    }

    #[test]
    fn test_reset_history() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::default();
        config.cache.dir = dir.path().to_path_buf();
        write(&config.cache.history_file(), "{}");

        assert!(reset_history(&config).unwrap());
        assert!(!config.cache.history_file().exists());
    }
}
