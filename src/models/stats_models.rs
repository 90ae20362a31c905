// src/models/stats_models.rs

use serde::Serialize;
use std::collections::HashSet;

use crate::models::matching::ClusterMapping;

/// Pair-based agreement between a predicted clustering and a gold grouping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub true_positives: usize,
    pub predicted_pairs: usize,
    pub gold_pairs: usize,
}

/// Shape of a clustering run, used for logging and the report header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ClusterSummary {
    pub total_clusters: usize,
    /// Clusters with more than one member.
    pub non_trivial_clusters: usize,
    pub largest_cluster: usize,
    pub mapped_records: usize,
}

impl ClusterSummary {
    pub fn from_mapping(mapping: &ClusterMapping) -> Self {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut summary = ClusterSummary {
            mapped_records: mapping.len(),
            ..Default::default()
        };

        for (_, entry) in mapping.iter() {
            if !seen.insert(entry.cluster_id.as_str()) {
                continue;
            }
            let size = entry.members.len();
            summary.total_clusters += 1;
            if size > 1 {
                summary.non_trivial_clusters += 1;
            }
            summary.largest_cluster = summary.largest_cluster.max(size);
        }

        summary
    }
}
