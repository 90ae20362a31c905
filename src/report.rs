// src/report.rs

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::candidate_generation::top_pairs;
use crate::clustering::coherence::ClusterCoherence;
use crate::models::core::{Record, RecordId};
use crate::models::matching::{CandidatePair, ClusterMapping, ClusterMember};
use crate::models::stats_models::{ClusterSummary, Metrics};
use crate::utils::config::AppConfig;

pub const REPORT_TOP_PAIRS: usize = 25;

#[derive(Debug, Clone, Serialize)]
pub struct ReportPair {
    pub id_1: RecordId,
    pub name_1: String,
    pub id_2: RecordId,
    pub name_2: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportCluster {
    pub cluster_id: String,
    pub canonical_name: String,
    pub members: Vec<ClusterMember>,
    /// Present for clusters with two or more members.
    pub coherence: Option<ClusterCoherence>,
}

/// Everything written for one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub config: AppConfig,
    pub raw_records: usize,
    /// Number of clusters, or the raw record count when nothing was clustered.
    pub deduped_records: usize,
    pub summary: ClusterSummary,
    pub bridged_clusters: usize,
    pub top_pairs: Vec<ReportPair>,
    pub clusters: Vec<ReportCluster>,
    pub metrics: Option<Metrics>,
}

impl RunReport {
    /// Assembles the report for a finished run.
    ///
    /// Arguments:
    /// * `config` - Effective configuration of the run.
    /// * `records` - Loaded input records, used to resolve pair names.
    /// * `pairs` - Candidate pairs; the highest scoring ones are listed.
    /// * `mapping` - Final cluster mapping.
    /// * `coherence` - Diagnostics for multi-member clusters.
    /// * `metrics` - Evaluation result, if a gold file was available.
    pub fn build(
        config: &AppConfig,
        records: &[Record],
        pairs: &[CandidatePair],
        mapping: &ClusterMapping,
        coherence: &[ClusterCoherence],
        metrics: Option<Metrics>,
    ) -> Self {
        let names: HashMap<&RecordId, &str> = records
            .iter()
            .map(|r| (&r.id, r.company_name.as_str()))
            .collect();
        let name_of = |id: &RecordId| names.get(id).copied().unwrap_or("").to_string();

        let top_pairs = top_pairs(pairs, REPORT_TOP_PAIRS)
            .into_iter()
            .map(|pair| ReportPair {
                name_1: name_of(&pair.low_id),
                name_2: name_of(&pair.high_id),
                id_1: pair.low_id,
                id_2: pair.high_id,
                score: pair.score,
            })
            .collect();

        let coherence_by_cluster: HashMap<&str, &ClusterCoherence> = coherence
            .iter()
            .map(|c| (c.cluster_id.as_str(), c))
            .collect();
        let clusters: Vec<ReportCluster> = mapping
            .clusters()
            .iter()
            .map(|entry| ReportCluster {
                cluster_id: entry.cluster_id.clone(),
                canonical_name: entry.canonical_name.clone(),
                members: entry.members.clone(),
                coherence: coherence_by_cluster
                    .get(entry.cluster_id.as_str())
                    .map(|c| (*c).clone()),
            })
            .collect();

        let deduped_records = if clusters.is_empty() {
            records.len()
        } else {
            clusters.len()
        };

        Self {
            run_id: Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            config: config.clone(),
            raw_records: records.len(),
            deduped_records,
            summary: ClusterSummary::from_mapping(mapping),
            bridged_clusters: coherence.iter().filter(|c| c.is_bridged()).count(),
            top_pairs,
            clusters,
            metrics,
        }
    }
}

/// Writes `report` to `path` as pretty-printed JSON.
pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
    fs::write(path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    info!("Report written to {} (run ID: {})", path.display(), report.run_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::coherence::calculate_cluster_coherence;
    use crate::clustering::create_clusters::{cluster_candidates, dedupe_mapping};

    fn sample_run() -> (Vec<Record>, Vec<CandidatePair>, ClusterMapping) {
        let records = vec![
            Record::new(RecordId::Int(1), "Acme Inc"),
            Record::new(RecordId::Int(2), "Acme, Inc."),
            Record::new(RecordId::Int(3), "Globex"),
        ];
        let pairs = vec![
            CandidatePair::new(RecordId::Int(1), RecordId::Int(2), 0.95).unwrap(),
            CandidatePair::new(RecordId::Int(1), RecordId::Int(3), 0.2).unwrap(),
        ];
        let mapping = dedupe_mapping(&records, &cluster_candidates(&pairs, 0.83));
        (records, pairs, mapping)
    }

    #[test]
    fn test_build_report() {
        let (records, pairs, mapping) = sample_run();
        let coherence = calculate_cluster_coherence(&mapping, &pairs, 0.83);
        let report = RunReport::build(&AppConfig::default(), &records, &pairs, &mapping, &coherence, None);

        assert_eq!(report.raw_records, 3);
        assert_eq!(report.deduped_records, 2);
        assert_eq!(report.top_pairs.len(), 2);
        assert_eq!(report.top_pairs[0].name_1, "Acme Inc");
        assert_eq!(report.top_pairs[0].name_2, "Acme, Inc.");
        assert!(report.clusters[0].coherence.is_some());
        assert!(report.clusters[1].coherence.is_none());
        assert_eq!(report.bridged_clusters, 0);
    }

    #[test]
    fn test_write_report_as_json() {
        let (records, pairs, mapping) = sample_run();
        let report = RunReport::build(&AppConfig::default(), &records, &pairs, &mapping, &[], None);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        write_report(&path, &report).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["run_id"], report.run_id.as_str());
        assert_eq!(written["raw_records"], 3);
        assert!(written["metrics"].is_null());
        assert!(written["config"].get("openai_api_key").is_none());
        assert_eq!(written["clusters"][0]["canonical_name"], "Acme Inc");
    }

    #[test]
    fn test_empty_run_counts_raw_records() {
        let report = RunReport::build(
            &AppConfig::default(),
            &[],
            &[],
            &ClusterMapping::new(),
            &[],
            None,
        );
        assert_eq!(report.deduped_records, 0);
        assert!(report.top_pairs.is_empty());
    }
}
