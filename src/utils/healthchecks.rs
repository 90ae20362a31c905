// src/utils/healthchecks.rs

use anyhow::{bail, Context, Result};
use log::info;
use std::path::Path;

use crate::embedding::EmbeddingProvider;
use crate::vector_store::QdrantStore;

/// Fails with one error listing every path that does not exist.
pub fn ensure_data_files(paths: &[&Path]) -> Result<()> {
    let missing: Vec<String> = paths
        .iter()
        .filter(|path| !path.exists())
        .map(|path| path.display().to_string())
        .collect();
    if !missing.is_empty() {
        bail!("Missing data files: {}", missing.join(", "));
    }
    Ok(())
}

pub async fn check_qdrant(store: &QdrantStore) -> Result<()> {
    store.health().await?;
    info!("Qdrant is reachable");
    Ok(())
}

/// Checks the configured embedding provider and returns its name.
pub async fn check_embedding_provider(provider: &EmbeddingProvider) -> Result<&'static str> {
    provider
        .check()
        .await
        .with_context(|| format!("Embedding provider '{}' failed its health check", provider.name()))?;
    info!("Embedding provider '{}' is reachable", provider.name());
    Ok(provider.name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_every_missing_file() {
        let existing = tempfile::NamedTempFile::new().unwrap();
        assert!(ensure_data_files(&[existing.path()]).is_ok());

        let err = ensure_data_files(&[
            existing.path(),
            Path::new("/nonexistent/a.csv"),
            Path::new("/nonexistent/b.csv"),
        ])
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("/nonexistent/a.csv"));
        assert!(message.contains("/nonexistent/b.csv"));
    }
}
