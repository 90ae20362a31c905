pub mod coherence;
pub mod create_clusters;
pub mod master;

pub use coherence::{calculate_cluster_coherence, log_coherence_statistics, ClusterCoherence};
pub use create_clusters::{cluster_candidates, dedupe_mapping};
pub use master::{apply_master_canonicals, MasterIndex, MasterMatch};
