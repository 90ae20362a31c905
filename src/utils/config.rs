// src/utils/config.rs

use anyhow::{anyhow, Result};
use log::info;
use serde::Serialize;
use std::env;
use std::str::FromStr;

pub const DEFAULT_EMBED_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://host.docker.internal:11434";
pub const DEFAULT_QDRANT_URL: &str = "http://qdrant:6334";
pub const DEFAULT_SIM_THRESHOLD: f64 = 0.83;
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_COLLECTION_NAME: &str = "companies";
pub const DEFAULT_NEIGHBOR_CONCURRENCY: usize = 8;

/// Runtime settings for a deduplication run.
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub embed_model: String,
    #[serde(skip)]
    pub openai_api_key: Option<String>,
    pub ollama_endpoint: String,
    pub qdrant_url: String,
    pub sim_threshold: f64,
    pub top_k: usize,
    pub collection_name: String,
    pub neighbor_concurrency: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            openai_api_key: None,
            ollama_endpoint: DEFAULT_OLLAMA_ENDPOINT.to_string(),
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            sim_threshold: DEFAULT_SIM_THRESHOLD,
            top_k: DEFAULT_TOP_K,
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
            neighbor_concurrency: DEFAULT_NEIGHBOR_CONCURRENCY,
        }
    }
}

impl AppConfig {
    /// Create configuration from environment variables.
    /// Empty variables fall back to defaults; unparseable numbers are errors.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` but reads values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();

        Ok(Self {
            embed_model: get("EMBED_MODEL").unwrap_or(defaults.embed_model),
            openai_api_key: get("OPENAI_API_KEY"),
            ollama_endpoint: get("OLLAMA_ENDPOINT").unwrap_or(defaults.ollama_endpoint),
            qdrant_url: get("QDRANT_URL").unwrap_or(defaults.qdrant_url),
            sim_threshold: finite_threshold(parse_var(
                "SIM_THRESHOLD",
                get("SIM_THRESHOLD"),
                defaults.sim_threshold,
            )?)?,
            top_k: parse_var("TOP_K", get("TOP_K"), defaults.top_k)?,
            collection_name: get("COLLECTION_NAME").unwrap_or(defaults.collection_name),
            neighbor_concurrency: parse_var(
                "NEIGHBOR_CONCURRENCY",
                get("NEIGHBOR_CONCURRENCY"),
                defaults.neighbor_concurrency,
            )?
            .max(1),
        })
    }

    /// Applies command-line overrides on top of the environment values.
    /// A non-finite threshold is rejected like an unparseable `SIM_THRESHOLD`.
    pub fn with_overrides(
        mut self,
        threshold: Option<f64>,
        top_k: Option<usize>,
        collection: Option<String>,
    ) -> Result<Self> {
        if let Some(threshold) = threshold {
            self.sim_threshold = finite_threshold(threshold)?;
        }
        if let Some(top_k) = top_k {
            self.top_k = top_k;
        }
        if let Some(collection) = collection {
            self.collection_name = collection;
        }
        Ok(self)
    }

    /// Name of the collection holding the master registry.
    pub fn master_collection_name(&self) -> String {
        format!("{}_master", self.collection_name)
    }

    pub fn log_config(&self) {
        info!("⚙️  Deduplication configuration:");
        info!("   Embedding model: {}", self.embed_model);
        info!(
            "   OpenAI API key: {}",
            if self.openai_api_key.is_some() { "set" } else { "missing" }
        );
        info!("   Ollama endpoint: {}", self.ollama_endpoint);
        info!("   Qdrant URL: {}", self.qdrant_url);
        info!("   Collection: {}", self.collection_name);
        info!("   Similarity threshold: {:.2}", self.sim_threshold);
        info!("   Top K neighbors: {}", self.top_k);
        info!("   Neighbor query concurrency: {}", self.neighbor_concurrency);
    }
}

fn parse_var<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .parse::<T>()
            .map_err(|_| anyhow!("Invalid value for {}: {:?}", key, value)),
    }
}

/// Rejects NaN and infinite thresholds.
fn finite_threshold(value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(anyhow!("Invalid value for SIM_THRESHOLD: {:?}", value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.embed_model, "text-embedding-3-small");
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.ollama_endpoint, "http://host.docker.internal:11434");
        assert_eq!(config.qdrant_url, "http://qdrant:6334");
        assert_eq!(config.sim_threshold, 0.83);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.collection_name, "companies");
        assert_eq!(config.neighbor_concurrency, 8);
        assert_eq!(config.master_collection_name(), "companies_master");
    }

    #[test]
    fn test_values_and_empty_fallbacks() {
        let config = AppConfig::from_lookup(lookup(&[
            ("SIM_THRESHOLD", "0.9"),
            ("TOP_K", "10"),
            ("OPENAI_API_KEY", "  "),
            ("COLLECTION_NAME", "orgs"),
            ("EMBED_MODEL", ""),
        ]))
        .unwrap();
        assert_eq!(config.sim_threshold, 0.9);
        assert_eq!(config.top_k, 10);
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.collection_name, "orgs");
        assert_eq!(config.embed_model, DEFAULT_EMBED_MODEL);
    }

    #[test]
    fn test_unparseable_number_names_variable() {
        let err = AppConfig::from_lookup(lookup(&[("TOP_K", "many")])).unwrap_err();
        assert!(err.to_string().contains("TOP_K"));
    }

    #[test]
    fn test_overrides() {
        let config = AppConfig::default()
            .with_overrides(Some(0.5), None, Some("test".into()))
            .unwrap();
        assert_eq!(config.sim_threshold, 0.5);
        assert_eq!(config.top_k, DEFAULT_TOP_K);
        assert_eq!(config.collection_name, "test");
    }

    #[test]
    fn test_non_finite_threshold_from_env_is_rejected() {
        for raw in ["NaN", "inf", "-inf"] {
            let err = AppConfig::from_lookup(lookup(&[("SIM_THRESHOLD", raw)])).unwrap_err();
            assert!(err.to_string().starts_with("Invalid value for SIM_THRESHOLD"));
        }
    }

    #[test]
    fn test_non_finite_threshold_override_is_rejected() {
        let err = AppConfig::default()
            .with_overrides(Some(f64::NAN), None, None)
            .unwrap_err();
        assert!(err.to_string().starts_with("Invalid value for SIM_THRESHOLD"));
        assert!(AppConfig::default()
            .with_overrides(Some(f64::INFINITY), None, None)
            .is_err());
    }
}
