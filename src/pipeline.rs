// src/pipeline.rs

use anyhow::{Context, Result};
use log::info;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::candidate_generation::{build_pairs, top_pairs};
use crate::clustering::{
    apply_master_canonicals, calculate_cluster_coherence, cluster_candidates, dedupe_mapping,
    log_coherence_statistics,
};
use crate::embedding::EmbeddingProvider;
use crate::evaluation::evaluate_if_available;
use crate::matching::normalize_name;
use crate::models::core::{Record, RecordId};
use crate::models::matching::{CandidatePair, ClusterMapping};
use crate::models::stats_models::{ClusterSummary, Metrics};
use crate::report::{write_report, RunReport};
use crate::utils::config::AppConfig;
use crate::utils::get_memory_usage;
use crate::utils::healthchecks::{check_embedding_provider, check_qdrant, ensure_data_files};
use crate::utils::loaders::load_companies;
use crate::utils::progress_config::ProgressConfig;
use crate::vector_store::{QdrantMasterIndex, QdrantStore};

/// Input and output locations of a run.
#[derive(Debug, Clone)]
pub struct PipelinePaths {
    pub data: PathBuf,
    pub report: PathBuf,
    pub gold: Option<PathBuf>,
    pub master: Option<PathBuf>,
}

impl Default for PipelinePaths {
    fn default() -> Self {
        Self {
            data: PathBuf::from("data/companies_raw.csv"),
            report: PathBuf::from("report.json"),
            gold: Some(PathBuf::from("data/companies_gold.csv")),
            master: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub records: Vec<Record>,
    pub pairs: Vec<CandidatePair>,
    pub mapping: ClusterMapping,
    pub metrics: Option<Metrics>,
    pub summary: ClusterSummary,
    /// Wall time per step, in execution order.
    pub phase_times: Vec<(String, Duration)>,
}

/// Logs `[elapsed]`-prefixed step lines and times each step.
pub struct StepLogger {
    start: Instant,
    current: Option<(String, Instant)>,
    phase_times: Vec<(String, Duration)>,
}

impl Default for StepLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl StepLogger {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            current: None,
            phase_times: Vec::new(),
        }
    }

    /// Closes the running step and starts a new one named `message`.
    pub fn step(&mut self, message: &str) {
        self.close_current();
        info!("[{:6.2}s] {}", self.start.elapsed().as_secs_f64(), message);
        self.current = Some((message.to_string(), Instant::now()));
    }

    pub fn finish(mut self) -> Vec<(String, Duration)> {
        self.close_current();
        self.phase_times
    }

    fn close_current(&mut self) {
        if let Some((name, started)) = self.current.take() {
            self.phase_times.push((name, started.elapsed()));
        }
    }
}

/// Runs the full embedding-backed deduplication.
///
/// Health checks, loading, embedding and upserting the records, optional master
/// registry ingestion, neighbor search, pair building, clustering, optional
/// master reconciliation, coherence diagnostics, evaluation and the report.
///
/// Arguments:
/// * `config` - Effective configuration.
/// * `paths` - Data, gold, master and report locations.
/// * `progress` - Progress bar and memory reporting settings.
///
/// Returns:
/// A `PipelineOutcome` with the loaded records, pairs, mapping and metrics.
pub async fn run_pipeline(
    config: &AppConfig,
    paths: &PipelinePaths,
    progress: &ProgressConfig,
) -> Result<PipelineOutcome> {
    let mut steps = StepLogger::new();
    let multi_progress = progress.create_multi_progress();

    steps.step("Running health checks");
    let mut required: Vec<&Path> = vec![paths.data.as_path()];
    if let Some(master) = &paths.master {
        required.push(master.as_path());
    }
    ensure_data_files(&required)?;
    let provider = EmbeddingProvider::from_config(config)?;
    let provider_name = check_embedding_provider(&provider).await?;
    let store = QdrantStore::new(&config.qdrant_url)?;
    check_qdrant(&store).await?;
    info!("Health checks passed (provider: {})", provider_name);

    steps.step("Loading data");
    let records = load_companies(&paths.data)?;
    for record in records.iter().take(5) {
        info!(
            "  id={} raw='{}' normalized='{}'",
            record.id,
            record.company_name,
            normalize_name(&record.company_name)
        );
    }

    steps.step("Generating embeddings");
    let names: Vec<String> = records.iter().map(|r| r.company_name.clone()).collect();
    let vectors = provider
        .embed(&names)
        .await
        .context("Failed to embed company names")?;
    if progress.should_show_memory() {
        info!("Memory usage after embedding: {} MB", get_memory_usage().await);
    }

    if let Some(first) = vectors.first() {
        steps.step("Upserting vectors into Qdrant");
        store.ensure_collection(&config.collection_name, first.len()).await?;
        store
            .upsert_vectors(&config.collection_name, &records, &vectors)
            .await?;
    }
    let id_to_vector: HashMap<RecordId, Vec<f32>> = records
        .iter()
        .map(|r| r.id.clone())
        .zip(vectors.iter().cloned())
        .collect();

    let mut master_index = None;
    if let Some(master_path) = &paths.master {
        steps.step("Loading master list");
        let master_records = load_companies(master_path)?;

        steps.step("Embedding master list");
        let master_names: Vec<String> = master_records
            .iter()
            .map(|r| r.company_name.clone())
            .collect();
        let master_vectors = provider
            .embed(&master_names)
            .await
            .context("Failed to embed master names")?;
        if let Some(first) = master_vectors.first() {
            let master_collection = config.master_collection_name();
            store.ensure_collection(&master_collection, first.len()).await?;
            store
                .upsert_vectors(&master_collection, &master_records, &master_vectors)
                .await?;
            master_index = Some(QdrantMasterIndex::new(store.clone(), master_collection));
        }
    }

    let mut pairs = Vec::new();
    let mut mapping = ClusterMapping::new();
    if !vectors.is_empty() {
        steps.step("Searching nearest neighbors");
        let pb = progress.progress_bar(multi_progress.as_ref(), 0, "Neighbor search");
        let neighbor_results = store
            .nearest(
                &config.collection_name,
                config.top_k,
                config.neighbor_concurrency,
                &pb,
            )
            .await?;
        pb.finish_with_message(format!("{} neighbor records", neighbor_results.len()));
        info!("Retrieved {} neighbor records.", neighbor_results.len());

        pairs = build_pairs(&neighbor_results);
        info!("Built {} candidate pairs.", pairs.len());
        for pair in top_pairs(&pairs, 5) {
            info!("  pair {} <-> {} score={:.4}", pair.low_id, pair.high_id, pair.score);
        }

        steps.step("Clustering candidates");
        mapping = cluster_records(&records, &pairs, config.sim_threshold);

        if let Some(master) = &master_index {
            steps.step("Reconciling canonical names with master list");
            let overridden = apply_master_canonicals(&mut mapping, &id_to_vector, master).await?;
            info!("{} cluster canonical names taken from the master list", overridden);
        }
        if progress.should_show_memory() {
            info!("Memory usage after clustering: {} MB", get_memory_usage().await);
        }
    }

    finish_run(config, paths, steps, records, pairs, mapping)
}

/// Clusters `records` over the pairs scoring at or above `threshold`.
pub fn cluster_records(
    records: &[Record],
    pairs: &[CandidatePair],
    threshold: f64,
) -> ClusterMapping {
    let clusters = cluster_candidates(pairs, threshold);
    dedupe_mapping(records, &clusters)
}

/// Shared tail of every run: coherence diagnostics, evaluation and the report.
pub fn finish_run(
    config: &AppConfig,
    paths: &PipelinePaths,
    mut steps: StepLogger,
    records: Vec<Record>,
    pairs: Vec<CandidatePair>,
    mapping: ClusterMapping,
) -> Result<PipelineOutcome> {
    let summary = ClusterSummary::from_mapping(&mapping);
    info!(
        "Identified {} clusters; {} non-trivial.",
        summary.total_clusters, summary.non_trivial_clusters
    );

    steps.step("Computing cluster coherence");
    let coherence = calculate_cluster_coherence(&mapping, &pairs, config.sim_threshold);
    log_coherence_statistics(&coherence);

    steps.step("Evaluating against gold (if available)");
    let metrics = evaluate_if_available(paths.gold.as_deref(), &mapping)?;

    steps.step("Writing report");
    let report = RunReport::build(config, &records, &pairs, &mapping, &coherence, metrics);
    write_report(&paths.report, &report)?;

    Ok(PipelineOutcome {
        records,
        pairs,
        mapping,
        metrics,
        summary,
        phase_times: steps.finish(),
    })
}

/// Logs the per-step timing summary of a finished run.
pub fn log_phase_times(phase_times: &[(String, Duration)]) {
    info!("Phase timing summary:");
    for (phase, duration) in phase_times {
        info!("  {:<45} {:.2?}", phase, duration);
    }
}
