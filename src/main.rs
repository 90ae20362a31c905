// src/main.rs
use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::time::Instant;

use dedupe_lib::pipeline::{log_phase_times, run_pipeline, PipelinePaths};
use dedupe_lib::utils::config::AppConfig;
use dedupe_lib::utils::env::load_env;
use dedupe_lib::utils::progress_config::ProgressConfig;

#[derive(Parser)]
#[command(author, version, about = "Embedding-backed company name deduplication", long_about = None)]
struct Args {
    /// Similarity threshold override
    #[arg(long)]
    threshold: Option<f64>,

    /// Top-K neighbors override
    #[arg(long)]
    top_k: Option<usize>,

    /// Qdrant collection name override
    #[arg(long)]
    collection: Option<String>,

    /// Company records CSV (id, company_name)
    #[arg(long, default_value = "data/companies_raw.csv")]
    data: PathBuf,

    /// Gold grouping CSV (id, group_id); evaluation is skipped when the file is absent
    #[arg(long, default_value = "data/companies_gold.csv")]
    gold: PathBuf,

    /// Master registry CSV (id, company_name) used for canonical names
    #[arg(long)]
    master: Option<PathBuf>,

    /// Where to write the JSON report
    #[arg(long, default_value = "report.json")]
    report: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let args = Args::parse();
    load_env();

    info!("Starting company deduplication pipeline");
    let start_time = Instant::now();

    let config = AppConfig::from_env()?.with_overrides(args.threshold, args.top_k, args.collection)?;
    config.log_config();
    let progress = ProgressConfig::from_env();

    let paths = PipelinePaths {
        data: args.data,
        report: args.report,
        gold: Some(args.gold),
        master: args.master,
    };

    let outcome = run_pipeline(&config, &paths, &progress).await?;

    info!(
        "Pipeline completed in {:.2?}. Processed: {} records, {} candidate pairs, {} clusters ({} non-trivial, largest {})",
        start_time.elapsed(),
        outcome.records.len(),
        outcome.pairs.len(),
        outcome.summary.total_clusters,
        outcome.summary.non_trivial_clusters,
        outcome.summary.largest_cluster
    );
    if let Some(metrics) = outcome.metrics {
        info!(
            "Precision {:.3}, recall {:.3}, F1 {:.3}",
            metrics.precision, metrics.recall, metrics.f1
        );
    }
    log_phase_times(&outcome.phase_times);
    Ok(())
}
