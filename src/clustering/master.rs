// src/clustering/master.rs

use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::HashMap;
use std::future::Future;

use crate::matching::name::choose_representative;
use crate::models::core::RecordId;
use crate::models::matching::ClusterMapping;

/// Best match returned by a master registry lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterMatch {
    pub score: f64,
    /// Registry name of the match; lookups whose payload has no name carry `None`.
    pub company_name: Option<String>,
}

/// A reference registry of known-good company names searchable by embedding.
pub trait MasterIndex {
    /// Returns the single nearest registry entry for `vector`, if any.
    fn nearest(&self, vector: &[f32]) -> impl Future<Output = Result<Option<MasterMatch>>> + Send;
}

/// Overrides cluster canonical names with names from a master registry.
///
/// For every cluster a representative member is chosen (shortest normalized name,
/// then lowercase name, then id). Its embedding is looked up in `vectors` and the
/// registry is asked for the nearest entry; when one comes back with a name, that
/// name becomes the cluster's canonical name. Clusters whose representative has
/// no vector, or whose lookup returns nothing usable, are left alone. Membership
/// never changes.
///
/// Arguments:
/// * `mapping` - The assembled mapping, updated in place.
/// * `vectors` - Embedding of each input record.
/// * `master` - The registry to query.
///
/// Returns:
/// The number of clusters whose canonical name was replaced.
pub async fn apply_master_canonicals<M: MasterIndex>(
    mapping: &mut ClusterMapping,
    vectors: &HashMap<RecordId, Vec<f32>>,
    master: &M,
) -> Result<usize> {
    let representatives: Vec<(usize, String, RecordId)> = mapping
        .clusters()
        .iter()
        .enumerate()
        .filter_map(|(position, entry)| {
            choose_representative(&entry.members)
                .map(|member| (position, entry.cluster_id.clone(), member.id.clone()))
        })
        .collect();

    let mut overridden = 0usize;
    for (position, cluster_id, representative_id) in representatives {
        let Some(vector) = vectors.get(&representative_id) else {
            debug!(
                "Cluster {}: no vector for representative {}, keeping canonical name",
                cluster_id, representative_id
            );
            continue;
        };

        let best = master
            .nearest(vector)
            .await
            .with_context(|| format!("Master lookup failed for cluster {}", cluster_id))?;

        let Some(master_name) = best
            .and_then(|m| m.company_name)
            .filter(|name| !name.is_empty())
        else {
            continue;
        };

        if mapping.set_canonical_name_at(position, &master_name) {
            info!("Cluster {} canonical set to master: {}", cluster_id, master_name);
            overridden += 1;
        }
    }

    Ok(overridden)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::create_clusters::{cluster_candidates, dedupe_mapping};
    use crate::models::core::Record;
    use crate::models::matching::CandidatePair;
    use std::sync::Mutex;

    /// Registry stub keyed by the first vector component.
    struct FakeMaster {
        names: HashMap<i64, Option<String>>,
        queries: Mutex<Vec<Vec<f32>>>,
    }

    impl MasterIndex for FakeMaster {
        async fn nearest(&self, vector: &[f32]) -> Result<Option<MasterMatch>> {
            self.queries.lock().unwrap().push(vector.to_vec());
            Ok(self
                .names
                .get(&(vector[0] as i64))
                .map(|name| MasterMatch {
                    score: 0.99,
                    company_name: name.clone(),
                }))
        }
    }

    fn setup() -> (ClusterMapping, HashMap<RecordId, Vec<f32>>) {
        let records = vec![
            Record::new(RecordId::Int(1), "Acme Inc"),
            Record::new(RecordId::Int(2), "Acme, Inc."),
            Record::new(RecordId::Int(3), "Globex"),
            Record::new(RecordId::Int(4), "Initech"),
        ];
        let pairs = vec![CandidatePair::new(RecordId::Int(1), RecordId::Int(2), 0.95).unwrap()];
        let mapping = dedupe_mapping(&records, &cluster_candidates(&pairs, 0.83));
        let vectors: HashMap<RecordId, Vec<f32>> = vec![
            (RecordId::Int(1), vec![1.0, 0.0]),
            (RecordId::Int(2), vec![2.0, 0.0]),
            (RecordId::Int(3), vec![3.0, 0.0]),
        ]
        .into_iter()
        .collect();
        (mapping, vectors)
    }

    #[tokio::test]
    async fn test_overrides_canonical_for_every_member() {
        let (mut mapping, vectors) = setup();
        let master = FakeMaster {
            names: HashMap::from([(1, Some("ACME Incorporated".to_string()))]),
            queries: Mutex::new(Vec::new()),
        };

        let overridden = apply_master_canonicals(&mut mapping, &vectors, &master)
            .await
            .unwrap();

        assert_eq!(overridden, 1);
        assert_eq!(
            mapping.get(&RecordId::Int(1)).unwrap().canonical_name,
            "ACME Incorporated"
        );
        assert_eq!(
            mapping.get(&RecordId::Int(2)).unwrap().canonical_name,
            "ACME Incorporated"
        );
        assert_eq!(mapping.get(&RecordId::Int(3)).unwrap().canonical_name, "Globex");
        // representative of {1, 2} is "Acme Inc" (id 1); record 4 has no vector
        let queries = master.queries.lock().unwrap();
        assert_eq!(queries.len(), 2);
        assert_eq!(queries[0], vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_match_without_name_is_skipped() {
        let (mut mapping, vectors) = setup();
        let master = FakeMaster {
            names: HashMap::from([(1, None), (3, Some(String::new()))]),
            queries: Mutex::new(Vec::new()),
        };

        let overridden = apply_master_canonicals(&mut mapping, &vectors, &master)
            .await
            .unwrap();

        assert_eq!(overridden, 0);
        assert_eq!(mapping.get(&RecordId::Int(2)).unwrap().canonical_name, "Acme Inc");
        assert_eq!(mapping.cluster_count(), 3);
    }

    /// Registry stub that names every lookup after its first vector component.
    struct NamingMaster;

    impl MasterIndex for NamingMaster {
        async fn nearest(&self, vector: &[f32]) -> Result<Option<MasterMatch>> {
            Ok(Some(MasterMatch {
                score: 0.99,
                company_name: Some(format!("Master {}", vector[0] as i64)),
            }))
        }
    }

    #[tokio::test]
    async fn test_overrides_every_singleton_in_large_mapping() {
        let n = 20_000i64;
        let records: Vec<Record> = (1..=n)
            .map(|id| Record::new(RecordId::Int(id), format!("Company {}", id)))
            .collect();
        let vectors: HashMap<RecordId, Vec<f32>> = (1..=n)
            .map(|id| (RecordId::Int(id), vec![id as f32, 0.0]))
            .collect();
        let mut mapping = dedupe_mapping(&records, &cluster_candidates(&[], 0.83));

        let overridden = apply_master_canonicals(&mut mapping, &vectors, &NamingMaster)
            .await
            .unwrap();

        assert_eq!(overridden, n as usize);
        assert_eq!(mapping.cluster_count(), n as usize);
        for id in [1, 777, n] {
            assert_eq!(
                mapping.get(&RecordId::Int(id)).unwrap().canonical_name,
                format!("Master {}", id)
            );
        }
    }
}
