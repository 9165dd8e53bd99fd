//! Waveform artifact reading

use std::path::Path;

use async_trait::async_trait;

use crate::error::{ApiError, ApiResult};
use crate::models::WaveformArtifact;

/// Reads and parses waveform artifacts
#[async_trait]
pub trait ArtifactReader: Send + Sync {
    async fn read_artifact(&self, path: &Path) -> ApiResult<WaveformArtifact>;
}

/// Reads artifacts from the local filesystem
///
/// Parsing runs on the blocking pool since artifacts hold millions of samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsArtifactReader;

#[async_trait]
impl ArtifactReader for FsArtifactReader {
    async fn read_artifact(&self, path: &Path) -> ApiResult<WaveformArtifact> {
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                ApiError::not_found("waveform", path.display().to_string())
            }
            _ => ApiError::from(e),
        })?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Parsing waveform artifact");

        let artifact = tokio::task::spawn_blocking(move || {
            serde_json::from_slice::<WaveformArtifact>(&bytes)
        })
        .await??;

        Ok(artifact)
    }
}
