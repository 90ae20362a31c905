pub mod qdrant;

pub use qdrant::{point_id_for, QdrantMasterIndex, QdrantStore, ScoredPoint, StoredPoint};
