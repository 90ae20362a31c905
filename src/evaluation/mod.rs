pub mod gold;
pub mod metrics;

pub use gold::{load_gold_groups, read_gold_groups, GoldGroups};
pub use metrics::{evaluate, evaluate_if_available, pairs_from_groups, pairs_from_mapping};
