//! Temporary music library fixture
//!
//! Lays out a library the way the ingest pipeline does:
//!
//! ```text
//! <root>/database.json
//! <root>/<song id>/waveform.json
//! ```
//!
//! Every mutation rewrites `database.json`, so the catalog always sees the
//! current song list.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tempfile::TempDir;

/// Temporary on-disk music library, removed on drop
pub struct MusicLibraryFixture {
    dir: TempDir,
    songs: Vec<Value>,
}

impl MusicLibraryFixture {
    /// Create an empty library with an empty song database
    pub fn new() -> Self {
        let fixture = Self {
            dir: TempDir::new().expect("failed to create temp library"),
            songs: Vec::new(),
        };
        fixture.write_database();
        fixture
    }

    /// Library root directory
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a song's waveform artifact
    pub fn waveform_path(&self, song_id: &str) -> PathBuf {
        self.root().join(song_id).join("waveform.json")
    }

    /// Add a song with a valid waveform artifact
    pub fn add_song(&mut self, song_id: &str, samples: &[f64], sample_rate: u32) -> &mut Self {
        self.add_song_with_declared_len(song_id, samples, sample_rate, samples.len())
    }

    /// Add a song whose artifact declares `declared` samples but holds `samples`
    pub fn add_song_with_declared_len(
        &mut self,
        song_id: &str,
        samples: &[f64],
        sample_rate: u32,
        declared: usize,
    ) -> &mut Self {
        let song_dir = self.root().join(song_id);
        fs::create_dir_all(&song_dir).expect("failed to create song dir");

        let artifact = json!({
            "sample_rate": sample_rate,
            "duration": samples.len() as f64 / f64::from(sample_rate.max(1)),
            "num_samples": declared,
            "waveform": samples,
        });
        fs::write(
            self.waveform_path(song_id),
            serde_json::to_vec(&artifact).expect("failed to serialize artifact"),
        )
        .expect("failed to write waveform artifact");

        self.push_song(song_id, "waveform.json")
    }

    /// Add a song entry whose waveform artifact does not exist
    pub fn add_song_without_waveform(&mut self, song_id: &str) -> &mut Self {
        self.push_song(song_id, "waveform.json")
    }

    /// Write raw bytes as a song's waveform artifact
    pub fn add_song_with_raw_artifact(&mut self, song_id: &str, raw: &[u8]) -> &mut Self {
        let song_dir = self.root().join(song_id);
        fs::create_dir_all(&song_dir).expect("failed to create song dir");
        fs::write(self.waveform_path(song_id), raw).expect("failed to write waveform artifact");

        self.push_song(song_id, "waveform.json")
    }

    fn push_song(&mut self, song_id: &str, waveform_file: &str) -> &mut Self {
        self.songs.retain(|song| song["id"] != song_id);
        self.songs.push(json!({
            "id": song_id,
            "name": format!("Song {song_id}"),
            "artist": "Test Artist",
            "files": {
                "vocals": "vocals.mp3",
                "instrumental": "instrumental.mp3",
                "waveform": waveform_file,
                "lyrics": "lyrics.lrc"
            }
        }));
        self.write_database();
        self
    }

    fn write_database(&self) {
        let database = json!({
            "version": "1.0.0",
            "lastUpdated": "2024-01-01T00:00:00.000Z",
            "songs": self.songs,
        });
        fs::write(
            self.root().join("database.json"),
            serde_json::to_vec_pretty(&database).expect("failed to serialize database"),
        )
        .expect("failed to write database.json");
    }
}

impl Default for MusicLibraryFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// `[0.0, 1.0, 2.0, ...]`, so every sample encodes its own index
pub fn ramp_samples(len: usize) -> Vec<f64> {
    (0..len).map(|i| i as f64).collect()
}
