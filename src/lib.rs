pub mod candidate_generation;
pub mod clustering;
pub mod embedding;
pub mod evaluation;
pub mod matching;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod utils;
pub mod vector_store;
