// src/embedding/mod.rs

pub mod ollama;
pub mod openai;

use anyhow::{bail, Context, Result};
use log::info;
use reqwest::Client;
use tokio::time::Duration;

use crate::utils::config::AppConfig;
use ollama::OllamaEmbedder;
use openai::OpenAIEmbedder;

/// The embedding backend selected from configuration.
#[derive(Debug, Clone)]
pub enum EmbeddingProvider {
    OpenAI(OpenAIEmbedder),
    Ollama(OllamaEmbedder),
}

impl EmbeddingProvider {
    /// Picks OpenAI when an API key is configured, Ollama when an endpoint is,
    /// and fails otherwise.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client for embeddings")?;

        if let Some(api_key) = config.openai_api_key.as_deref() {
            return Ok(Self::OpenAI(OpenAIEmbedder::new(
                http_client,
                api_key,
                &config.embed_model,
            )));
        }
        if !config.ollama_endpoint.trim().is_empty() {
            return Ok(Self::Ollama(OllamaEmbedder::new(
                http_client,
                &config.ollama_endpoint,
                &config.embed_model,
            )));
        }
        bail!("No embedding provider configured. Set OPENAI_API_KEY or OLLAMA_ENDPOINT.")
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenAI(_) => "openai",
            Self::Ollama(_) => "ollama",
        }
    }

    /// Embeds `texts` in order. An empty input returns an empty output without
    /// contacting the provider; any other output is validated.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vectors = match self {
            Self::OpenAI(embedder) => embedder.embed(texts).await?,
            Self::Ollama(embedder) => embedder.embed(texts).await?,
        };
        validate_vectors(&vectors)?;
        info!(
            "Generated {} embeddings with dimension {} via {}",
            vectors.len(),
            vectors[0].len(),
            self.name()
        );
        Ok(vectors)
    }

    /// Checks the provider so the run fails before any work is done.
    pub async fn check(&self) -> Result<()> {
        match self {
            Self::OpenAI(embedder) => embedder.check().await,
            Self::Ollama(embedder) => embedder.check().await,
        }
    }
}

/// Rejects empty output, empty vectors and mixed dimensions.
pub fn validate_vectors(vectors: &[Vec<f32>]) -> Result<()> {
    let Some(first) = vectors.first() else {
        bail!("No embedding vectors returned.");
    };
    if first.is_empty() {
        bail!("Embedding vectors are empty or invalid.");
    }
    let dimension = first.len();
    if let Some(idx) = vectors.iter().position(|v| v.len() != dimension) {
        bail!(
            "Embedding vectors have inconsistent dimensions: index {} has {}, expected {}.",
            idx,
            vectors[idx].len(),
            dimension
        );
    }
    Ok(())
}
