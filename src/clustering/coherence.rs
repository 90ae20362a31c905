// src/clustering/coherence.rs

use log::info;
use serde::Serialize;
use std::collections::HashMap;

use crate::models::matching::{CandidatePair, ClusterMapping};

/// Edge statistics for one multi-member cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterCoherence {
    pub cluster_id: String,
    pub cluster_size: usize,
    /// Qualifying pairs with both endpoints inside the cluster.
    pub total_edges: usize,
    /// n * (n - 1) / 2
    pub possible_edges: usize,
    /// Ratio of actual edges to possible edges (0.0 to 1.0)
    pub density: f64,
    pub average_score: f64,
    pub min_score: f64,
}

impl ClusterCoherence {
    /// True when at least one member pair is linked only through other members.
    pub fn is_bridged(&self) -> bool {
        self.total_edges < self.possible_edges
    }
}

/// Measures how tightly each multi-member cluster is held together by direct edges.
///
/// Clustering is a transitive closure, so a chain A–B–C lands in one cluster even
/// when A and C were never matched. Density below 1.0 flags such clusters for
/// review. Membership is never changed here.
///
/// Arguments:
/// * `mapping` - The assembled cluster mapping.
/// * `pairs` - All candidate pairs of the run.
/// * `threshold` - The threshold the mapping was built with.
///
/// Returns:
/// One entry per cluster with two or more ids, in cluster order.
pub fn calculate_cluster_coherence(
    mapping: &ClusterMapping,
    pairs: &[CandidatePair],
    threshold: f64,
) -> Vec<ClusterCoherence> {
    let mut sizes: HashMap<&str, usize> = HashMap::new();
    for (_, entry) in mapping.iter() {
        *sizes.entry(entry.cluster_id.as_str()).or_insert(0) += 1;
    }

    let mut scores: HashMap<&str, Vec<f64>> = HashMap::new();
    for pair in pairs.iter().filter(|p| p.score >= threshold) {
        if let (Some(low), Some(high)) = (mapping.get(&pair.low_id), mapping.get(&pair.high_id)) {
            if low.cluster_id == high.cluster_id {
                scores
                    .entry(low.cluster_id.as_str())
                    .or_default()
                    .push(pair.score);
            }
        }
    }

    mapping
        .clusters()
        .iter()
        .filter_map(|entry| {
            let cluster_size = *sizes.get(entry.cluster_id.as_str())?;
            if cluster_size < 2 {
                return None;
            }
            let edge_scores = scores
                .get(entry.cluster_id.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let possible_edges = cluster_size * (cluster_size - 1) / 2;
            let total_edges = edge_scores.len();
            let average_score = if total_edges > 0 {
                edge_scores.iter().sum::<f64>() / total_edges as f64
            } else {
                0.0
            };
            let min_score = edge_scores.iter().copied().fold(f64::INFINITY, f64::min);

            Some(ClusterCoherence {
                cluster_id: entry.cluster_id.clone(),
                cluster_size,
                total_edges,
                possible_edges,
                density: total_edges as f64 / possible_edges as f64,
                average_score,
                min_score: if min_score.is_finite() { min_score } else { 0.0 },
            })
        })
        .collect()
}

/// Logs summary statistics about cluster density for the run.
pub fn log_coherence_statistics(coherence: &[ClusterCoherence]) {
    if coherence.is_empty() {
        info!("No multi-member clusters to report coherence statistics for.");
        return;
    }

    let densities: Vec<f64> = coherence.iter().map(|c| c.density).collect();
    let avg_density = densities.iter().sum::<f64>() / densities.len() as f64;
    let min_density = densities.iter().fold(1.0f64, |a, &b| a.min(b));
    let bridged = coherence.iter().filter(|c| c.is_bridged()).count();

    info!("Cluster Coherence Statistics:");
    info!("  Multi-member clusters: {}", coherence.len());
    info!("  Average density: {:.3}", avg_density);
    info!("  Minimum density: {:.3}", min_density);
    info!("  Bridged (density < 1.0): {} clusters", bridged);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::create_clusters::{cluster_candidates, dedupe_mapping};
    use crate::models::core::{Record, RecordId};

    fn pair(a: i64, b: i64, score: f64) -> CandidatePair {
        CandidatePair::new(RecordId::Int(a), RecordId::Int(b), score).unwrap()
    }

    #[test]
    fn test_chain_is_reported_as_bridged() {
        let records: Vec<Record> = (1..=4)
            .map(|i| Record::new(RecordId::Int(i), format!("Org {}", i)))
            .collect();
        let pairs = vec![pair(1, 2, 0.9), pair(2, 3, 0.86), pair(1, 3, 0.2)];
        let mapping = dedupe_mapping(&records, &cluster_candidates(&pairs, 0.85));

        let coherence = calculate_cluster_coherence(&mapping, &pairs, 0.85);
        assert_eq!(coherence.len(), 1);
        let chain = &coherence[0];
        assert_eq!(chain.cluster_size, 3);
        assert_eq!(chain.total_edges, 2);
        assert_eq!(chain.possible_edges, 3);
        assert!((chain.density - 2.0 / 3.0).abs() < 1e-9);
        assert!((chain.average_score - 0.88).abs() < 1e-9);
        assert_eq!(chain.min_score, 0.86);
        assert!(chain.is_bridged());
    }

    #[test]
    fn test_fully_connected_cluster_has_density_one() {
        let records: Vec<Record> = (1..=3)
            .map(|i| Record::new(RecordId::Int(i), format!("Org {}", i)))
            .collect();
        let pairs = vec![pair(1, 2, 0.9), pair(2, 3, 0.9), pair(1, 3, 0.95)];
        let mapping = dedupe_mapping(&records, &cluster_candidates(&pairs, 0.85));

        let coherence = calculate_cluster_coherence(&mapping, &pairs, 0.85);
        assert_eq!(coherence[0].density, 1.0);
        assert!(!coherence[0].is_bridged());
    }
}
