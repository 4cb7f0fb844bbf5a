//! ArtRank CLI
//!
//! Affiliation enrichment and combined artifact/AE leaderboards for a
//! research-artifacts website data directory.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use artrank_enrich::{IncrementalStats, RosterStats};
use artrank_runtime::{
    reset_history, run_incremental_enrichment, run_rankings, run_roster_enrichment,
    CombinedSummary, DataLayout, PipelineConfig, RosterOptions, RosterReport,
};

#[derive(Parser)]
#[command(name = "artrank")]
#[command(author, version, long_about = None)]
#[command(about = "ArtRank: author affiliations and combined artifact/AE rankings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Pipeline config file (default: ./artrank.toml if present)
    #[arg(short, long, env = "ARTRANK_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Website data directory (contains assets/data and _data)
    #[arg(short, long, env = "ARTRANK_DATA_DIR", default_value = ".", global = true)]
    data_dir: PathBuf,

    /// Cache directory (overrides [cache] dir)
    #[arg(long, env = "ARTRANK_CACHE_DIR", global = true)]
    cache_dir: Option<PathBuf>,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1", global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill missing affiliations from the CSRankings faculty roster
    Roster {
        /// Authors JSON file (default: <data_dir>/assets/data/authors.json)
        #[arg(long)]
        authors_file: Option<PathBuf>,

        /// Output file (default: overwrite the authors file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum authors to process
        #[arg(long)]
        max_authors: Option<usize>,

        /// Download the roster even if the cached copy is fresh
        #[arg(long)]
        force_refresh: bool,

        /// Do not write any output
        #[arg(long)]
        dry_run: bool,
    },

    /// Look up missing affiliations on DBLP, with per-author backoff
    Dblp {
        /// Maximum searches in this run
        #[arg(long, env = "ARTRANK_MAX_SEARCHES")]
        max_searches: Option<usize>,

        /// Do not write authors, history or cache
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate combined artifact + AE committee rankings
    Rank {
        /// Minimum combined score (overrides [rankings] min_score)
        #[arg(long)]
        min_score: Option<u32>,
    },

    /// Delete the DBLP search history so every author is searched again
    ClearHistory,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let mut config = PipelineConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.cache_dir {
        config.cache.dir = dir;
    }
    let layout = DataLayout::new(cli.data_dir);

    match cli.command {
        Commands::Roster {
            authors_file,
            output,
            max_authors,
            force_refresh,
            dry_run,
        } => {
            let options = RosterOptions {
                authors_file: authors_file.unwrap_or_else(|| layout.authors_file()),
                output_file: output,
                max_authors,
                force_refresh,
                dry_run,
            };
            let report = run_roster_enrichment(&config, &options).await?;
            print_roster_summary(&report);
        }
        Commands::Dblp {
            max_searches,
            dry_run,
        } => {
            let stats = run_incremental_enrichment(&config, &layout, max_searches, dry_run).await?;
            print_incremental_summary(&stats, &config);
        }
        Commands::Rank { min_score } => {
            let min_score = min_score.unwrap_or(config.rankings.min_score);
            let report = run_rankings(&layout, min_score)?;
            print_rankings_summary(&report.summary, min_score);
        }
        Commands::ClearHistory => {
            let path = config.cache.history_file();
            if reset_history(&config)? {
                println!("Search history cleared: {}", path.display());
            } else {
                println!("No search history at {}", path.display());
            }
        }
    }

    Ok(())
}

fn print_roster_summary(report: &RosterReport) {
    let stats: &RosterStats = &report.stats;

    println!("\n{}", "=".repeat(60));
    println!("CSRankings Enrichment Summary");
    println!("{}", "=".repeat(60));
    println!(
        "Roster records:             {} ({} skipped)",
        report.roster_records, report.roster_skipped
    );
    println!("Total authors:              {}", stats.total);
    println!("Already have affiliation:   {}", stats.already_has_affiliation);
    println!("Missing affiliation:        {}", stats.missing);
    println!("Roster matches:             {}", stats.matched);
    println!("Ambiguous (skipped):        {}", stats.ambiguous);
    println!("No match found:             {}", stats.no_match);
    println!("Total enriched:             {}", stats.enriched);
    if stats.missing > 0 {
        println!("Match rate:                 {:.1}%", stats.match_rate());
    }
    println!("Still missing:              {}", stats.still_missing());
    println!("Final coverage:             {:.1}%", stats.coverage());
}

fn print_incremental_summary(stats: &IncrementalStats, config: &PipelineConfig) {
    println!("\n📊 Summary:");
    println!("   Total authors:            {}", stats.total_authors);
    println!("   Already have affiliation: {}", stats.already_has_affiliation);
    println!("   New authors to search:    {}", stats.new_authors_to_search);
    println!("   Ready for retry:          {}", stats.authors_ready_for_retry);
    println!("   In backoff period:        {}", stats.authors_in_backoff);
    println!("   Searches performed:       {}", stats.searches_performed);
    println!(
        "   New affiliations found:   {} ({:.1}%)",
        stats.affiliations_found,
        stats.success_rate()
    );
    if stats.deferred_by_cap > 0 {
        println!("   Deferred by search cap:   {}", stats.deferred_by_cap);
    }
    if stats.lookup_failures > 0 {
        println!("   Lookup failures:          {}", stats.lookup_failures);
    }
    println!(
        "   Network requests:         {} ({} cache hits)",
        stats.network_requests, stats.cache_hits
    );
    println!(
        "   Search history:           {}",
        config.cache.history_file().display()
    );
}

fn print_rankings_summary(summary: &CombinedSummary, min_score: u32) {
    println!(
        "\nCombined rankings (score >= {}): {} total, {} systems, {} security",
        min_score, summary.combined_total, summary.combined_systems, summary.combined_security
    );
    println!(
        "People with both artifacts and AE service: {}",
        summary.both_artifacts_and_ae
    );
    println!("Top combined score: {}", summary.top_combined_score);
}
