// src/vector_store/qdrant.rs

use anyhow::{Context, Result};
use futures::future::join_all;
use indicatif::ProgressBar;
use log::{debug, info, warn};
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors_config::Config;
use qdrant_client::qdrant::vectors_output::VectorsOptions;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointId, PointStruct, ScrollPointsBuilder,
    SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder, VectorsConfig,
    VectorsOutput,
};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::Duration;
use uuid::Uuid;

use crate::clustering::master::{MasterIndex, MasterMatch};
use crate::models::core::{Record, RecordId};
use crate::models::matching::NeighborRecord;

const SCROLL_PAGE_SIZE: u32 = 1000;
const UPSERT_BATCH_SIZE: usize = 256;

/// A point read back from a collection.
#[derive(Debug, Clone)]
pub struct StoredPoint {
    pub point_id: PointId,
    pub record_id: RecordId,
    pub company_name: Option<String>,
    pub vector: Option<Vec<f32>>,
}

/// A search hit.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    pub point_id: PointId,
    pub record_id: RecordId,
    pub company_name: Option<String>,
    pub score: f64,
}

/// Deterministic point id for a record id. Non-negative integers are used as-is;
/// negative integers and text ids map to a UUIDv5 of their string form.
pub fn point_id_for(id: &RecordId) -> PointId {
    match id {
        RecordId::Int(value) if *value >= 0 => PointId::from(*value as u64),
        other => PointId::from(
            Uuid::new_v5(&Uuid::NAMESPACE_OID, other.as_key().as_bytes()).to_string(),
        ),
    }
}

fn record_payload(record: &Record) -> HashMap<String, Value> {
    let id_kind = match &record.id {
        RecordId::Int(value) => Kind::IntegerValue(*value),
        RecordId::Text(value) => Kind::StringValue(value.clone()),
    };
    HashMap::from([
        ("id".to_string(), Value { kind: Some(id_kind) }),
        (
            "company_name".to_string(),
            Value {
                kind: Some(Kind::StringValue(record.company_name.clone())),
            },
        ),
    ])
}

/// Record id of a stored point: the payload `id` when present, else the point id itself.
fn record_id_of(point_id: &PointId, payload: &HashMap<String, Value>) -> RecordId {
    match payload.get("id").and_then(|v| v.kind.as_ref()) {
        Some(Kind::IntegerValue(value)) => return RecordId::Int(*value),
        Some(Kind::StringValue(value)) => return RecordId::Text(value.clone()),
        _ => {}
    }
    match &point_id.point_id_options {
        Some(PointIdOptions::Num(value)) => RecordId::Int(*value as i64),
        Some(PointIdOptions::Uuid(value)) => RecordId::Text(value.clone()),
        None => RecordId::Text(String::new()),
    }
}

fn name_of(payload: &HashMap<String, Value>) -> Option<String> {
    match payload.get("company_name").and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(name)) => Some(name.clone()),
        _ => None,
    }
}

fn dense_vector(vectors: Option<VectorsOutput>) -> Option<Vec<f32>> {
    match vectors?.vectors_options? {
        VectorsOptions::Vector(v) => Some(v.data),
        _ => None,
    }
}

/// Vector size of an existing collection, for both the single and the named-vector layouts.
fn vector_size(vectors_config: &VectorsConfig) -> Option<usize> {
    match vectors_config.config.as_ref()? {
        Config::Params(params) => Some(params.size as usize),
        Config::ParamsMap(map) => map.map.values().next().map(|p| p.size as usize),
    }
}

/// Qdrant collection and point operations over the gRPC client.
#[derive(Clone)]
pub struct QdrantStore {
    client: Arc<Qdrant>,
}

impl QdrantStore {
    pub fn new(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url)
            .timeout(Duration::from_secs(60))
            .build()
            .with_context(|| format!("Failed to create Qdrant client for {}", url))?;
        Ok(Self {
            client: Arc::new(client),
        })
    }

    pub async fn health(&self) -> Result<()> {
        let reply = self
            .client
            .health_check()
            .await
            .context("Qdrant is not reachable. Check QDRANT_URL.")?;
        debug!("Qdrant version {}", reply.version);
        Ok(())
    }

    /// Makes sure collection `name` exists with cosine distance and `dim`-sized vectors.
    /// An existing collection with a different vector size is dropped and recreated.
    pub async fn ensure_collection(&self, name: &str, dim: usize) -> Result<()> {
        let exists = self
            .client
            .collection_exists(name)
            .await
            .with_context(|| format!("Failed to check collection '{}'", name))?;

        if exists {
            let response = self
                .client
                .collection_info(name)
                .await
                .with_context(|| format!("Failed to get collection '{}' info", name))?;
            let existing_dim = response
                .result
                .and_then(|info| info.config)
                .and_then(|config| config.params)
                .and_then(|params| params.vectors_config)
                .as_ref()
                .and_then(vector_size);

            match existing_dim {
                Some(existing) if existing != dim => {
                    warn!(
                        "Collection '{}' has dimension {}, expected {}; recreating",
                        name, existing, dim
                    );
                    self.client
                        .delete_collection(name)
                        .await
                        .with_context(|| format!("Failed to delete collection '{}'", name))?;
                }
                _ => {
                    debug!("Collection '{}' already exists", name);
                    return Ok(());
                }
            }
        }

        let request = CreateCollectionBuilder::new(name)
            .vectors_config(VectorParamsBuilder::new(dim as u64, Distance::Cosine));
        self.client
            .create_collection(request)
            .await
            .with_context(|| format!("Failed to create collection '{}'", name))?;
        info!("Created collection '{}' (dimension {})", name, dim);
        Ok(())
    }

    /// Stores one point per record, keeping the original id and name in the payload.
    pub async fn upsert_vectors(
        &self,
        name: &str,
        records: &[Record],
        vectors: &[Vec<f32>],
    ) -> Result<()> {
        if records.len() != vectors.len() {
            anyhow::bail!(
                "Rows and vectors length mismatch: {} rows, {} vectors.",
                records.len(),
                vectors.len()
            );
        }

        for (batch_records, batch_vectors) in records
            .chunks(UPSERT_BATCH_SIZE)
            .zip(vectors.chunks(UPSERT_BATCH_SIZE))
        {
            let points: Vec<PointStruct> = batch_records
                .iter()
                .zip(batch_vectors)
                .map(|(record, vector)| {
                    PointStruct::new(point_id_for(&record.id), vector.clone(), record_payload(record))
                })
                .collect();
            self.client
                .upsert_points(UpsertPointsBuilder::new(name, points).wait(true))
                .await
                .with_context(|| format!("Failed to upsert points into '{}'", name))?;
        }
        info!("Upserted {} vectors into '{}'", vectors.len(), name);
        Ok(())
    }

    /// Reads every point of the collection with payload and vector, page by page.
    pub async fn scroll_points(&self, name: &str) -> Result<Vec<StoredPoint>> {
        let mut points = Vec::new();
        let mut offset: Option<PointId> = None;

        loop {
            let mut request = ScrollPointsBuilder::new(name)
                .limit(SCROLL_PAGE_SIZE)
                .with_payload(true)
                .with_vectors(true);
            if let Some(offset) = offset.take() {
                request = request.offset(offset);
            }
            let page = self
                .client
                .scroll(request)
                .await
                .with_context(|| format!("Failed to scroll collection '{}'", name))?;

            for point in page.result {
                let Some(point_id) = point.id else {
                    continue;
                };
                points.push(StoredPoint {
                    record_id: record_id_of(&point_id, &point.payload),
                    company_name: name_of(&point.payload),
                    vector: dense_vector(point.vectors),
                    point_id,
                });
            }
            match page.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        debug!("Scrolled {} points from '{}'", points.len(), name);
        Ok(points)
    }

    /// Top `k` points of collection `name` by similarity to `vector`.
    pub async fn query_top_by_vector(
        &self,
        name: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredPoint>> {
        let request =
            SearchPointsBuilder::new(name, vector.to_vec(), k as u64).with_payload(true);
        let response = self
            .client
            .search_points(request)
            .await
            .with_context(|| format!("Vector search in '{}' failed", name))?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|hit| {
                let point_id = hit.id?;
                Some(ScoredPoint {
                    record_id: record_id_of(&point_id, &hit.payload),
                    company_name: name_of(&hit.payload),
                    score: hit.score as f64,
                    point_id,
                })
            })
            .collect())
    }

    /// Nearest-neighbor rows for every point of collection `name`.
    ///
    /// Each point is searched for `top_k + 1` hits; the point itself is dropped and
    /// at most `top_k` neighbors are kept. Searches run `concurrency` at a time and
    /// results come back in scroll order.
    ///
    /// Arguments:
    /// * `name` - The collection to search.
    /// * `top_k` - Neighbors to keep per point.
    /// * `concurrency` - Searches in flight at once.
    /// * `pb` - Advanced by one per searched point.
    pub async fn nearest(
        &self,
        name: &str,
        top_k: usize,
        concurrency: usize,
        pb: &ProgressBar,
    ) -> Result<Vec<NeighborRecord>> {
        let points: Vec<StoredPoint> = self
            .scroll_points(name)
            .await?
            .into_iter()
            .filter(|p| p.vector.is_some())
            .collect();
        pb.set_length(points.len() as u64);

        let mut neighbors = Vec::new();
        for chunk in points.chunks(concurrency.max(1)) {
            let searches = chunk.iter().map(|point| self.neighbors_of(name, point, top_k));
            for result in join_all(searches).await {
                neighbors.extend(result?);
                pb.inc(1);
            }
        }
        Ok(neighbors)
    }

    async fn neighbors_of(
        &self,
        name: &str,
        point: &StoredPoint,
        top_k: usize,
    ) -> Result<Vec<NeighborRecord>> {
        let Some(vector) = point.vector.as_deref() else {
            return Ok(Vec::new());
        };
        let hits = self.query_top_by_vector(name, vector, top_k + 1).await?;
        Ok(neighbor_rows(point, hits, top_k))
    }
}

/// Turns search hits for `point` into neighbor rows, dropping the point itself.
fn neighbor_rows(point: &StoredPoint, hits: Vec<ScoredPoint>, top_k: usize) -> Vec<NeighborRecord> {
    hits.into_iter()
        .filter(|hit| hit.point_id != point.point_id)
        .take(top_k)
        .map(|hit| NeighborRecord {
            id: Some(point.record_id.clone()),
            company_name: point.company_name.clone(),
            neighbor_id: Some(hit.record_id),
            neighbor_name: hit.company_name,
            score: Some(hit.score),
        })
        .collect()
}

/// Master registry backed by a Qdrant collection.
#[derive(Clone)]
pub struct QdrantMasterIndex {
    store: QdrantStore,
    collection: String,
}

impl QdrantMasterIndex {
    pub fn new(store: QdrantStore, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }
}

impl MasterIndex for QdrantMasterIndex {
    async fn nearest(&self, vector: &[f32]) -> Result<Option<MasterMatch>> {
        let hits = self
            .store
            .query_top_by_vector(&self.collection, vector, 1)
            .await?;
        Ok(hits.into_iter().next().map(|hit| MasterMatch {
            score: hit.score,
            company_name: hit.company_name,
        }))
    }
}
