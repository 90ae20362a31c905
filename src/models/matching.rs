// src/models/matching.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::core::RecordId;

/// One row returned by the nearest-neighbor search: a source point, one of its
/// neighbors and the similarity score reported by the vector store.
/// Ids are optional because upstream search may omit them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborRecord {
    pub id: Option<RecordId>,
    pub company_name: Option<String>,
    pub neighbor_id: Option<RecordId>,
    pub neighbor_name: Option<String>,
    pub score: Option<f64>,
}

impl NeighborRecord {
    pub fn new(id: RecordId, neighbor_id: RecordId, score: f64) -> Self {
        Self {
            id: Some(id),
            company_name: None,
            neighbor_id: Some(neighbor_id),
            neighbor_name: None,
            score: Some(score),
        }
    }
}

/// An undirected, scored candidate match between two records.
/// `low_id` always sorts before `high_id` by string form and the two never coincide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidatePair {
    pub low_id: RecordId,
    pub high_id: RecordId,
    pub score: f64,
}

impl CandidatePair {
    /// Builds a pair with canonical endpoint order. Self-pairs yield `None`.
    pub fn new(a: RecordId, b: RecordId, score: f64) -> Option<Self> {
        let (low_id, high_id) = ordered_pair(a, b)?;
        Some(Self {
            low_id,
            high_id,
            score,
        })
    }

    pub fn key(&self) -> (&RecordId, &RecordId) {
        (&self.low_id, &self.high_id)
    }
}

/// Orders two ids by string form, smaller first. Returns `None` when they are equal.
pub fn ordered_pair(a: RecordId, b: RecordId) -> Option<(RecordId, RecordId)> {
    if a == b {
        return None;
    }
    if a.as_key() <= b.as_key() {
        Some((a, b))
    } else {
        Some((b, a))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterMember {
    pub id: RecordId,
    pub company_name: String,
}

/// The resolved view of one cluster, shared by every identifier in it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterEntry {
    pub cluster_id: String,
    pub canonical_name: String,
    pub members: Vec<ClusterMember>,
}

/// Identifier -> cluster lookup covering every input record.
///
/// Entries are stored once per cluster in `cluster_<n>` order; every member id
/// points at its cluster's entry, so an update to a cluster is seen through all
/// of its ids.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClusterMapping {
    clusters: Vec<ClusterEntry>,
    #[serde(skip)]
    index: BTreeMap<RecordId, usize>,
}

impl ClusterMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a cluster and registers each of `member_ids` against it.
    pub fn insert_cluster<I>(&mut self, entry: ClusterEntry, member_ids: I)
    where
        I: IntoIterator<Item = RecordId>,
    {
        let position = self.clusters.len();
        self.clusters.push(entry);
        for id in member_ids {
            self.index.insert(id, position);
        }
    }

    pub fn get(&self, id: &RecordId) -> Option<&ClusterEntry> {
        self.index.get(id).map(|&position| &self.clusters[position])
    }

    /// Iterates `(id, entry)` for every mapped identifier, in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (&RecordId, &ClusterEntry)> {
        self.index
            .iter()
            .map(move |(id, &position)| (id, &self.clusters[position]))
    }

    pub fn clusters(&self) -> &[ClusterEntry] {
        &self.clusters
    }

    /// Replaces the canonical name of the cluster at `position` in `clusters()`.
    /// Returns `false` when the position is out of range.
    pub fn set_canonical_name_at(&mut self, position: usize, canonical_name: &str) -> bool {
        match self.clusters.get_mut(position) {
            Some(entry) => {
                entry.canonical_name = canonical_name.to_string();
                true
            }
            None => false,
        }
    }

    /// Number of mapped identifiers.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn cluster_count(&self) -> usize {
        self.clusters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_pair_orders_endpoints() {
        let pair = CandidatePair::new(RecordId::Int(12), RecordId::Int(3), 0.9).unwrap();
        assert_eq!(pair.low_id, RecordId::Int(12));
        assert_eq!(pair.high_id, RecordId::Int(3));

        assert!(CandidatePair::new(RecordId::Int(4), RecordId::Int(4), 1.0).is_none());
    }

    #[test]
    fn test_mapping_shares_entry_between_members() {
        let mut mapping = ClusterMapping::new();
        mapping.insert_cluster(
            ClusterEntry {
                cluster_id: "cluster_1".to_string(),
                canonical_name: "Acme".to_string(),
                members: Vec::new(),
            },
            vec![RecordId::Int(1), RecordId::Int(2)],
        );

        assert!(mapping.set_canonical_name_at(0, "Acme Corporation"));
        assert!(!mapping.set_canonical_name_at(1, "Nope"));
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.cluster_count(), 1);
        assert_eq!(
            mapping.get(&RecordId::Int(2)).unwrap().canonical_name,
            "Acme Corporation"
        );
    }

    #[test]
    fn test_set_canonical_name_at_targets_one_cluster() {
        let mut mapping = ClusterMapping::new();
        for n in 1..=3 {
            mapping.insert_cluster(
                ClusterEntry {
                    cluster_id: format!("cluster_{}", n),
                    canonical_name: format!("Name {}", n),
                    members: Vec::new(),
                },
                vec![RecordId::Int(n)],
            );
        }

        assert!(mapping.set_canonical_name_at(1, "Globex"));
        let names: Vec<&str> = mapping
            .clusters()
            .iter()
            .map(|c| c.canonical_name.as_str())
            .collect();
        assert_eq!(names, vec!["Name 1", "Globex", "Name 3"]);
    }
}
