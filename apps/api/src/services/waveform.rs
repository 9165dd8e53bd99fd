//! Waveform chunk source
//!
//! Loads waveform documents through the song catalog and artifact reader and
//! keeps exactly one of them resident. The slot holds a `OnceCell` per song
//! id, so concurrent requests for the song being loaded await the same load,
//! while a request for another song swaps in a fresh cell before its own load
//! starts. Failed loads leave the cell empty and are retried on the next
//! request.

use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use crate::error::{ApiError, ApiResult};
use crate::models::{WaveformDocument, WaveformMetadata, WaveformSlice};
use crate::repositories::{ArtifactReader, SongCatalog};

type CacheSlot = (String, Arc<OnceCell<Arc<WaveformDocument>>>);

/// Waveform service with a single-slot document cache
pub struct WaveformService {
    catalog: Arc<dyn SongCatalog>,
    reader: Arc<dyn ArtifactReader>,
    chunk_size: usize,
    slot: Mutex<Option<CacheSlot>>,
}

impl WaveformService {
    pub fn new(
        catalog: Arc<dyn SongCatalog>,
        reader: Arc<dyn ArtifactReader>,
        chunk_size: usize,
    ) -> Self {
        Self {
            catalog,
            reader,
            chunk_size: chunk_size.max(1),
            slot: Mutex::new(None),
        }
    }

    /// Samples per chunk for default slices and streams
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Id of the song whose document is resident; a pending or failed load
    /// does not count
    pub async fn cached_song(&self) -> Option<String> {
        self.slot
            .lock()
            .await
            .as_ref()
            .filter(|(_, cell)| cell.initialized())
            .map(|(id, _)| id.clone())
    }

    /// Load (or reuse) the document for `song_id`
    pub async fn load(&self, song_id: &str) -> ApiResult<Arc<WaveformDocument>> {
        let cell = {
            let mut slot = self.slot.lock().await;
            let hit = slot
                .as_ref()
                .filter(|(cached, _)| cached.as_str() == song_id)
                .map(|(_, cell)| cell.clone());

            match hit {
                Some(cell) => cell,
                None => {
                    if let Some((evicted, _)) = slot.as_ref() {
                        tracing::debug!(evicted = %evicted, song_id = %song_id, "Evicting cached waveform");
                    }
                    let cell = Arc::new(OnceCell::new());
                    *slot = Some((song_id.to_string(), cell.clone()));
                    cell
                }
            }
        };

        let doc = cell.get_or_try_init(|| self.read_document(song_id)).await?;
        Ok(doc.clone())
    }

    async fn read_document(&self, song_id: &str) -> ApiResult<Arc<WaveformDocument>> {
        let song = self.catalog.resolve_song(song_id).await?;
        let artifact = self.reader.read_artifact(&song.waveform_path).await?;

        let doc = WaveformDocument::from_artifact(song.id, artifact).map_err(|e| {
            tracing::warn!(song_id = %song_id, error = %e, "Rejected waveform artifact");
            e
        })?;

        tracing::info!(
            song_id = %song_id,
            samples = doc.num_samples(),
            duration = doc.duration_seconds(),
            "Loaded waveform"
        );

        Ok(Arc::new(doc))
    }

    /// Sample rate, duration and sample count
    pub async fn metadata(&self, song_id: &str) -> ApiResult<WaveformMetadata> {
        Ok(self.load(song_id).await?.metadata())
    }

    /// Samples `[start, end)`, with `end` defaulting to one chunk past `start`
    /// and clamped to the document length
    pub async fn slice(&self, song_id: &str, start: i64, end: Option<i64>) -> ApiResult<WaveformSlice> {
        if start < 0 {
            return Err(ApiError::invalid_range(format!("start must be >= 0, got {start}")));
        }
        if let Some(end) = end {
            if end < start {
                return Err(ApiError::invalid_range(format!(
                    "end ({end}) must not be before start ({start})"
                )));
            }
        }

        let doc = self.load(song_id).await?;
        let len = doc.num_samples();

        let start = usize::try_from(start).unwrap_or(usize::MAX).min(len);
        let end = match end {
            Some(end) => usize::try_from(end).unwrap_or(usize::MAX),
            None => start.saturating_add(self.chunk_size),
        }
        .min(len);

        Ok(WaveformSlice {
            start,
            data: doc.samples()[start..end].to_vec(),
        })
    }

    /// Every `stride`-th sample, starting at index 0
    pub async fn preview(&self, song_id: &str, stride: i64) -> ApiResult<Vec<f64>> {
        let stride = usize::try_from(stride)
            .ok()
            .filter(|s| *s >= 1)
            .ok_or_else(|| ApiError::invalid_range(format!("stride must be >= 1, got {stride}")))?;

        let doc = self.load(song_id).await?;
        Ok(doc.samples().iter().step_by(stride).copied().collect())
    }

    /// Chunks needed to cover the song at the configured chunk size
    pub async fn total_chunks(&self, song_id: &str) -> ApiResult<usize> {
        Ok(self.load(song_id).await?.total_chunks(self.chunk_size))
    }
}

impl std::fmt::Debug for WaveformService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaveformService")
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}
