// src/bin/run_clustering.rs
//
// Offline clustering from precomputed neighbor results; no embedding provider or
// vector store is contacted.
use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::time::Instant;

use dedupe_lib::candidate_generation::build_pairs;
use dedupe_lib::pipeline::{cluster_records, finish_run, log_phase_times, PipelinePaths, StepLogger};
use dedupe_lib::utils::config::AppConfig;
use dedupe_lib::utils::env::load_env;
use dedupe_lib::utils::healthchecks::ensure_data_files;
use dedupe_lib::utils::loaders::{load_companies, load_neighbor_results};

#[derive(Parser)]
#[command(author, version, about = "Cluster company records from precomputed neighbor scores", long_about = None)]
struct Args {
    /// Company records CSV (id, company_name)
    #[arg(long, default_value = "data/companies_raw.csv")]
    data: PathBuf,

    /// Neighbor results CSV (id, neighbor_id, score)
    #[arg(long)]
    neighbors: PathBuf,

    /// Gold grouping CSV (id, group_id)
    #[arg(long)]
    gold: Option<PathBuf>,

    /// Similarity threshold override
    #[arg(long)]
    threshold: Option<f64>,

    /// Where to write the JSON report
    #[arg(long, default_value = "report.json")]
    report: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let args = Args::parse();
    load_env();

    let start_time = Instant::now();
    let config = AppConfig::from_env()?.with_overrides(args.threshold, None, None)?;
    info!("Offline clustering with threshold {:.2}", config.sim_threshold);

    let mut steps = StepLogger::new();
    steps.step("Loading data");
    ensure_data_files(&[args.data.as_path(), args.neighbors.as_path()])?;
    let records = load_companies(&args.data)?;
    let neighbor_results = load_neighbor_results(&args.neighbors)?;

    steps.step("Building candidate pairs");
    let pairs = build_pairs(&neighbor_results);
    info!("Built {} candidate pairs.", pairs.len());

    steps.step("Clustering candidates");
    let mapping = cluster_records(&records, &pairs, config.sim_threshold);

    let paths = PipelinePaths {
        data: args.data,
        report: args.report,
        gold: args.gold,
        master: None,
    };
    let outcome = finish_run(&config, &paths, steps, records, pairs, mapping)?;

    info!(
        "Clustering completed in {:.2?}: {} records into {} clusters ({} non-trivial)",
        start_time.elapsed(),
        outcome.records.len(),
        outcome.summary.total_clusters,
        outcome.summary.non_trivial_clusters
    );
    log_phase_times(&outcome.phase_times);
    Ok(())
}
