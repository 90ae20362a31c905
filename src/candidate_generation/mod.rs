pub mod candidate_generation;

pub use candidate_generation::{build_pairs, top_pairs};
