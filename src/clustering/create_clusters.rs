// src/clustering/create_clusters.rs

use log::{debug, info};
use petgraph::unionfind::UnionFind;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::matching::name::choose_canonical;
use crate::models::core::{Record, RecordId};
use crate::models::matching::{CandidatePair, ClusterEntry, ClusterMapping, ClusterMember};

/// Groups record ids into equivalence classes from the candidate pairs that meet `threshold`.
///
/// A pair is an edge when `score >= threshold` (inclusive); weaker pairs are ignored
/// entirely. Membership is the transitive closure of those edges: if A–B and B–C
/// both qualify, A and C share a cluster even when A–C scored low or was never
/// compared. There is no cap on cluster diameter; see
/// [`calculate_cluster_coherence`](crate::clustering::coherence::calculate_cluster_coherence)
/// to spot clusters held together only by bridging members.
///
/// Ids are interned into a dense index space and a disjoint-set forest
/// (union by rank, iterative path compression) runs over the indices, so all
/// state lives inside this call.
///
/// Arguments:
/// * `pairs` - Candidate pairs from [`build_pairs`](crate::candidate_generation::build_pairs).
/// * `threshold` - Minimum score for a pair to link two records.
///
/// Returns:
/// One set per class, covering only ids that took part in at least one qualifying
/// pair, ordered by first appearance. Records with no qualifying pair are absent
/// and become singletons in [`dedupe_mapping`].
pub fn cluster_candidates(pairs: &[CandidatePair], threshold: f64) -> Vec<BTreeSet<RecordId>> {
    let mut index_of: HashMap<RecordId, usize> = HashMap::new();
    let mut ids: Vec<RecordId> = Vec::new();
    let mut edges: Vec<(usize, usize)> = Vec::new();

    let mut intern = |id: &RecordId, ids: &mut Vec<RecordId>| -> usize {
        *index_of.entry(id.clone()).or_insert_with(|| {
            ids.push(id.clone());
            ids.len() - 1
        })
    };

    for pair in pairs.iter().filter(|p| p.score >= threshold) {
        let low = intern(&pair.low_id, &mut ids);
        let high = intern(&pair.high_id, &mut ids);
        edges.push((low, high));
    }

    debug!(
        "{} of {} candidate pairs meet threshold {:.4} ({} distinct ids)",
        edges.len(),
        pairs.len(),
        threshold,
        ids.len()
    );

    let mut forest: UnionFind<usize> = UnionFind::new(ids.len());
    for (low, high) in edges {
        forest.union(low, high);
    }
    let labels = forest.into_labeling();

    let mut position_by_root: HashMap<usize, usize> = HashMap::new();
    let mut clusters: Vec<BTreeSet<RecordId>> = Vec::new();
    for (index, id) in ids.into_iter().enumerate() {
        let root = labels[index];
        let position = *position_by_root.entry(root).or_insert_with(|| {
            clusters.push(BTreeSet::new());
            clusters.len() - 1
        });
        clusters[position].insert(id);
    }

    clusters
}

/// Builds the complete id -> cluster mapping for a run.
///
/// Every record not covered by `clusters` becomes a singleton. All clusters are then
/// ordered by the pipe-joined, sorted string form of their ids (size as second key)
/// and numbered `cluster_1`, `cluster_2`, ... in that order, so the same records and
/// pairs always produce the same cluster ids no matter how the clusters arrived.
///
/// Arguments:
/// * `records` - Every loaded record.
/// * `clusters` - Output of [`cluster_candidates`].
///
/// Returns:
/// A `ClusterMapping` with one entry per cluster and every id resolvable.
pub fn dedupe_mapping(records: &[Record], clusters: &[BTreeSet<RecordId>]) -> ClusterMapping {
    let mut cluster_sets: Vec<BTreeSet<RecordId>> = clusters
        .iter()
        .filter(|cluster| !cluster.is_empty())
        .cloned()
        .collect();

    let mut covered: HashSet<RecordId> = cluster_sets.iter().flatten().cloned().collect();
    let mut singletons_added = 0usize;
    for record in records {
        if covered.insert(record.id.clone()) {
            cluster_sets.push(BTreeSet::from([record.id.clone()]));
            singletons_added += 1;
        }
    }

    let mut keyed: Vec<((String, usize), BTreeSet<RecordId>)> = cluster_sets
        .into_iter()
        .map(|cluster| (cluster_sort_key(&cluster), cluster))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    let name_by_id: HashMap<&RecordId, &str> = records
        .iter()
        .map(|record| (&record.id, record.company_name.as_str()))
        .collect();

    let mut mapping = ClusterMapping::new();
    for (index, (_, cluster)) in keyed.into_iter().enumerate() {
        let members: Vec<ClusterMember> = cluster
            .iter()
            .filter_map(|id| {
                name_by_id.get(id).map(|name| ClusterMember {
                    id: id.clone(),
                    company_name: name.to_string(),
                })
            })
            .collect();
        let canonical_name = choose_canonical(&members);
        let entry = ClusterEntry {
            cluster_id: format!("cluster_{}", index + 1),
            canonical_name,
            members,
        };
        mapping.insert_cluster(entry, cluster);
    }

    info!(
        "Assembled {} clusters for {} ids ({} singletons added)",
        mapping.cluster_count(),
        mapping.len(),
        singletons_added
    );
    mapping
}

fn cluster_sort_key(cluster: &BTreeSet<RecordId>) -> (String, usize) {
    let ordered: Vec<String> = cluster.iter().map(|id| id.as_key().into_owned()).collect();
    (ordered.join("|"), ordered.len())
}
