// src/embedding/openai.rs

use anyhow::{anyhow, bail, Context, Result};
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const BATCH_SIZE: usize = 512;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Embeds texts through the OpenAI embeddings API.
#[derive(Debug, Clone)]
pub struct OpenAIEmbedder {
    http_client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAIEmbedder {
    pub fn new(http_client: Client, api_key: &str, model: &str) -> Self {
        Self {
            http_client,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }

    /// Embeds `texts` in batches, preserving input order.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for (batch_number, batch) in texts.chunks(BATCH_SIZE).enumerate() {
            debug!(
                "Requesting OpenAI embeddings for batch {} ({} texts)",
                batch_number + 1,
                batch.len()
            );
            vectors.extend(self.embed_batch(batch).await?);
        }
        Ok(vectors)
    }

    /// Verifies the API key against `/models`.
    pub async fn check(&self) -> Result<()> {
        let response = self
            .http_client
            .get(&format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .context("OpenAI API is not reachable.")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "OpenAI API is not reachable or API key is invalid (status {}).",
                response.status()
            ));
        }
        Ok(())
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: batch,
            encoding_format: "float",
        };

        let response = self
            .http_client
            .post(&format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send embedding request to OpenAI")?;

        if !response.status().is_success() {
            return Err(anyhow!("OpenAI returned status: {}", response.status()));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI embedding response")?;
        vectors_in_input_order(body, batch.len())
    }
}

fn vectors_in_input_order(body: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    let mut items = body.data;
    items.sort_by_key(|item| item.index);
    if items.len() != expected {
        bail!(
            "OpenAI embeddings response size mismatch: expected {}, got {}.",
            expected,
            items.len()
        );
    }
    Ok(items.into_iter().map(|item| item.embedding).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_is_reordered_by_index() {
        let body: EmbeddingResponse = serde_json::from_str(
            r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#,
        )
        .unwrap();
        let vectors = vectors_in_input_order(body, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_size_mismatch_is_an_error() {
        let body: EmbeddingResponse =
            serde_json::from_str(r#"{"data":[{"index":0,"embedding":[1.0]}]}"#).unwrap();
        assert!(vectors_in_input_order(body, 2).is_err());
    }
}
