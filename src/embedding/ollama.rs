// src/embedding/ollama.rs

use anyhow::{anyhow, Context, Result};
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Option<Vec<f32>>,
}

/// Embeds texts one at a time through a local Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    http_client: Client,
    endpoint: String,
    model: String,
}

impl OllamaEmbedder {
    pub fn new(http_client: Client, endpoint: &str, model: &str) -> Self {
        Self {
            http_client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed_one_with_retry(text).await?);
        }
        Ok(vectors)
    }

    /// Liveness check against `/api/tags`.
    pub async fn check(&self) -> Result<()> {
        let response = self
            .http_client
            .get(&format!("{}/api/tags", self.endpoint))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .context("Ollama endpoint is not reachable.")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Ollama endpoint is not reachable (status {}).",
                response.status()
            ));
        }
        Ok(())
    }

    async fn embed_one_with_retry(&self, text: &str) -> Result<Vec<f32>> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match self.embed_one(text).await {
                Ok(vector) => return Ok(vector),
                Err(e) => {
                    debug!("Ollama embedding attempt {} failed: {:#}", attempt + 1, e);
                    last_error = Some(e);
                    if attempt + 1 < MAX_RETRIES {
                        tokio::time::sleep(Duration::from_millis(500 * 2u64.pow(attempt))).await;
                    }
                }
            }
        }

        let err = last_error.unwrap_or_else(|| anyhow!("no attempts made"));
        Err(err.context("Failed to fetch Ollama embeddings."))
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let request = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .http_client
            .post(&format!("{}/api/embeddings", self.endpoint))
            .json(&request)
            .send()
            .await
            .context("Failed to send embedding request to Ollama")?;

        if !response.status().is_success() {
            return Err(anyhow!("Ollama returned status: {}", response.status()));
        }

        let body: OllamaEmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse Ollama embedding response")?;
        body.embedding
            .ok_or_else(|| anyhow!("Ollama response missing 'embedding'."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trailing_slash_is_trimmed() {
        let embedder = OllamaEmbedder::new(Client::new(), "http://localhost:11434/", "nomic");
        assert_eq!(embedder.endpoint, "http://localhost:11434");
    }

    #[test]
    fn test_response_without_embedding() {
        let body: OllamaEmbeddingResponse = serde_json::from_str(r#"{"error":"x"}"#).unwrap();
        assert!(body.embedding.is_none());
    }
}
