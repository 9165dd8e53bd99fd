//! Song catalog lookups
//!
//! Resolves a song id to the location of its waveform artifact.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use encore_shared_config::LibraryConfig;

use crate::error::{ApiError, ApiResult};
use crate::models::{SongDatabase, SongRef};

/// Waveform artifact name used when a song entry does not name one
pub const DEFAULT_WAVEFORM_FILE: &str = "waveform.json";

/// Lookup of songs by id
#[async_trait]
pub trait SongCatalog: Send + Sync {
    /// Resolve a song id, failing with `NotFound` for unknown ids
    async fn resolve_song(&self, song_id: &str) -> ApiResult<SongRef>;
}

/// Catalog backed by the library's `database.json`
///
/// The file is re-read on every lookup so songs added by the ingest
/// pipeline show up without a restart.
#[derive(Debug, Clone)]
pub struct JsonSongCatalog {
    library: LibraryConfig,
}

impl JsonSongCatalog {
    pub fn new(library: LibraryConfig) -> Self {
        Self { library }
    }

    /// Load and parse the song database
    pub async fn load_database(&self) -> ApiResult<SongDatabase> {
        let path = self.library.database_path();
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read song database");
            ApiError::from(e)
        })?;

        let db = serde_json::from_slice(&bytes)?;
        Ok(db)
    }
}

#[async_trait]
impl SongCatalog for JsonSongCatalog {
    async fn resolve_song(&self, song_id: &str) -> ApiResult<SongRef> {
        if !is_safe_song_id(song_id) {
            return Err(ApiError::not_found("song", song_id));
        }

        let db = self.load_database().await?;
        let song = db
            .find(song_id)
            .ok_or_else(|| ApiError::not_found("song", song_id))?;

        let file = song.waveform_file().unwrap_or(DEFAULT_WAVEFORM_FILE);
        let waveform_path = self.library.song_dir(&song.id).join(file);

        tracing::debug!(song_id = %song_id, path = %waveform_path.display(), "Resolved song");

        Ok(SongRef {
            id: song.id.clone(),
            waveform_path,
        })
    }
}

/// Song ids name a directory under the library root; reject anything that
/// could escape it
fn is_safe_song_id(song_id: &str) -> bool {
    !song_id.is_empty()
        && song_id != "."
        && song_id != ".."
        && !song_id.contains(['/', '\\', '\0'])
}

/// Fixed catalog, mainly for tests
#[derive(Debug, Clone, Default)]
pub struct InMemorySongCatalog {
    songs: HashMap<String, PathBuf>,
}

impl InMemorySongCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a song
    pub fn with_song(mut self, song_id: impl Into<String>, waveform_path: impl Into<PathBuf>) -> Self {
        self.songs.insert(song_id.into(), waveform_path.into());
        self
    }
}

#[async_trait]
impl SongCatalog for InMemorySongCatalog {
    async fn resolve_song(&self, song_id: &str) -> ApiResult<SongRef> {
        self.songs
            .get(song_id)
            .map(|path| SongRef {
                id: song_id.to_string(),
                waveform_path: path.clone(),
            })
            .ok_or_else(|| ApiError::not_found("song", song_id))
    }
}
