// src/candidate_generation/candidate_generation.rs

use log::debug;
use std::collections::HashMap;

use crate::models::core::RecordId;
use crate::models::matching::{ordered_pair, CandidatePair, NeighborRecord};

/// Turns raw nearest-neighbor rows into a deduplicated list of undirected candidate pairs.
///
/// Rows with a missing endpoint or linking a record to itself are skipped. When the
/// same unordered pair shows up more than once (both query directions, repeated
/// queries) only the highest score is kept. Pairs come back in first-seen order
/// of their key, so identical input order gives identical output order.
///
/// Arguments:
/// * `neighbor_results` - Rows from the neighbor search, in query order.
///
/// Returns:
/// The candidate pairs, one per distinct unordered id pair.
pub fn build_pairs(neighbor_results: &[NeighborRecord]) -> Vec<CandidatePair> {
    let mut pairs: Vec<CandidatePair> = Vec::new();
    let mut position_by_key: HashMap<(RecordId, RecordId), usize> = HashMap::new();
    let mut skipped = 0usize;

    for result in neighbor_results {
        let (Some(id), Some(neighbor_id)) = (&result.id, &result.neighbor_id) else {
            skipped += 1;
            continue;
        };
        let score = result.score.unwrap_or(0.0);

        let Some(key) = ordered_pair(id.clone(), neighbor_id.clone()) else {
            skipped += 1;
            continue;
        };

        match position_by_key.get(&key) {
            Some(&position) => {
                let existing = &mut pairs[position];
                if score > existing.score {
                    existing.score = score;
                }
            }
            None => {
                position_by_key.insert(key.clone(), pairs.len());
                pairs.push(CandidatePair {
                    low_id: key.0,
                    high_id: key.1,
                    score,
                });
            }
        }
    }

    debug!(
        "Built {} candidate pairs from {} neighbor rows ({} skipped)",
        pairs.len(),
        neighbor_results.len(),
        skipped
    );
    pairs
}

/// Returns up to `limit` pairs with the highest scores, best first.
/// Equal scores keep their original relative order.
pub fn top_pairs(pairs: &[CandidatePair], limit: usize) -> Vec<CandidatePair> {
    let mut ranked: Vec<CandidatePair> = pairs.to_vec();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn row(id: i64, neighbor_id: i64, score: f64) -> NeighborRecord {
        NeighborRecord::new(RecordId::Int(id), RecordId::Int(neighbor_id), score)
    }

    fn as_set(pairs: &[CandidatePair]) -> HashSet<(RecordId, RecordId, u64)> {
        pairs
            .iter()
            .map(|p| (p.low_id.clone(), p.high_id.clone(), p.score.to_bits()))
            .collect()
    }

    #[test]
    fn test_keeps_maximum_score_across_directions() {
        let rows = vec![row(1, 2, 0.81), row(2, 1, 0.93), row(1, 2, 0.85)];
        let pairs = build_pairs(&rows);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].low_id, RecordId::Int(1));
        assert_eq!(pairs[0].high_id, RecordId::Int(2));
        assert_eq!(pairs[0].score, 0.93);
    }

    #[test]
    fn test_skips_self_pairs_and_missing_ids() {
        let mut missing = row(1, 3, 0.9);
        missing.neighbor_id = None;
        let rows = vec![row(5, 5, 1.0), missing, row(3, 4, 0.7)];
        let pairs = build_pairs(&rows);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].key(), (&RecordId::Int(3), &RecordId::Int(4)));
    }

    #[test]
    fn test_missing_score_defaults_to_zero() {
        let mut no_score = row(7, 8, 0.0);
        no_score.score = None;
        let pairs = build_pairs(&[no_score]);
        assert_eq!(pairs[0].score, 0.0);
    }

    #[test]
    fn test_first_seen_order() {
        let rows = vec![row(9, 3, 0.5), row(1, 2, 0.6), row(3, 9, 0.7)];
        let pairs = build_pairs(&rows);
        let keys: Vec<_> = pairs.iter().map(|p| (p.low_id.clone(), p.high_id.clone())).collect();
        assert_eq!(
            keys,
            vec![
                (RecordId::Int(3), RecordId::Int(9)),
                (RecordId::Int(1), RecordId::Int(2)),
            ]
        );
        assert_eq!(pairs[0].score, 0.7);
    }

    #[test]
    fn test_reordered_input_gives_same_pair_set() {
        let rows = vec![
            row(1, 2, 0.9),
            row(2, 3, 0.4),
            row(3, 1, 0.6),
            row(2, 1, 0.95),
            row(4, 1, 0.2),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();

        assert_eq!(as_set(&build_pairs(&rows)), as_set(&build_pairs(&reversed)));
        assert_eq!(as_set(&build_pairs(&rows)), as_set(&build_pairs(&rows)));
    }

    #[test]
    fn test_mixed_id_kinds_order_by_string_form() {
        let rows = vec![NeighborRecord::new(
            RecordId::Text("b-7".to_string()),
            RecordId::Int(100),
            0.88,
        )];
        let pairs = build_pairs(&rows);
        assert_eq!(pairs[0].low_id, RecordId::Int(100));
        assert_eq!(pairs[0].high_id, RecordId::Text("b-7".to_string()));
    }

    #[test]
    fn test_top_pairs_sorted_descending() {
        let pairs = build_pairs(&[row(1, 2, 0.5), row(3, 4, 0.9), row(5, 6, 0.7)]);
        let top = top_pairs(&pairs, 2);
        let scores: Vec<f64> = top.iter().map(|p| p.score).collect();
        assert_eq!(scores, vec![0.9, 0.7]);
    }
}
