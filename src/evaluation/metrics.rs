// src/evaluation/metrics.rs

use anyhow::Result;
use log::info;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use crate::evaluation::gold::{load_gold_groups, GoldGroups};
use crate::models::core::RecordId;
use crate::models::matching::ClusterMapping;
use crate::models::stats_models::Metrics;

pub type PairSet = HashSet<(RecordId, RecordId)>;

/// Scores the mapping against a gold file when one is available.
///
/// No path, or a path that does not exist, means "no evaluation" and returns
/// `Ok(None)`. A gold file that exists but cannot be read or lacks a `group_id`
/// column is an error.
pub fn evaluate_if_available(
    gold_path: Option<&Path>,
    mapping: &ClusterMapping,
) -> Result<Option<Metrics>> {
    let Some(path) = gold_path else {
        info!("No gold file configured; skipping evaluation");
        return Ok(None);
    };
    if !path.exists() {
        info!("No gold file found at {}; skipping evaluation", path.display());
        return Ok(None);
    }

    let gold_groups = load_gold_groups(path)?;
    let metrics = evaluate(&gold_groups, mapping);

    info!(
        "Evaluation metrics: precision={:.3} recall={:.3} f1={:.3} (predicted pairs: {}, gold pairs: {})",
        metrics.precision, metrics.recall, metrics.f1, metrics.predicted_pairs, metrics.gold_pairs
    );
    Ok(Some(metrics))
}

/// Pair-based precision, recall and F1 of `mapping` against `gold_groups`.
///
/// Both sides are reduced to the set of unordered id pairs that share a group.
/// Any zero denominator yields 0.0.
pub fn evaluate(gold_groups: &GoldGroups, mapping: &ClusterMapping) -> Metrics {
    let predicted_pairs = pairs_from_mapping(mapping);
    let gold_pairs = pairs_from_groups(gold_groups.values());

    let true_positives = predicted_pairs.intersection(&gold_pairs).count();
    let precision = safe_divide(true_positives as f64, predicted_pairs.len() as f64);
    let recall = safe_divide(true_positives as f64, gold_pairs.len() as f64);
    let f1 = safe_divide(2.0 * precision * recall, precision + recall);

    Metrics {
        precision,
        recall,
        f1,
        true_positives,
        predicted_pairs: predicted_pairs.len(),
        gold_pairs: gold_pairs.len(),
    }
}

/// All unordered pairs of ids that share a `cluster_id` in the mapping.
pub fn pairs_from_mapping(mapping: &ClusterMapping) -> PairSet {
    let mut grouped: BTreeMap<&str, Vec<RecordId>> = BTreeMap::new();
    for (id, entry) in mapping.iter() {
        grouped
            .entry(entry.cluster_id.as_str())
            .or_default()
            .push(id.clone());
    }
    pairs_from_groups(grouped.values())
}

/// All unordered pairs within each group. Grows as C(n, 2) per group, so a single
/// very large group dominates both time and memory.
pub fn pairs_from_groups<'a, I>(groups: I) -> PairSet
where
    I: IntoIterator<Item = &'a Vec<RecordId>>,
{
    let mut pairs = PairSet::new();
    for members in groups {
        let mut sorted: Vec<&RecordId> = members.iter().collect();
        sorted.sort();
        for (i, left) in sorted.iter().enumerate() {
            for right in &sorted[i + 1..] {
                if left != right {
                    pairs.insert(((*left).clone(), (*right).clone()));
                }
            }
        }
    }
    pairs
}

fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    numerator / denominator
}
