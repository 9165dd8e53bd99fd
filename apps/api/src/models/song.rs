//! Song records from the flat-file song database
//!
//! Only the fields the sync and waveform services consume are modelled;
//! everything else in a song entry is ignored on deserialization.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root document of `database.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongDatabase {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub songs: Vec<SongRecord>,
}

impl SongDatabase {
    /// Find a song entry by id
    pub fn find(&self, song_id: &str) -> Option<&SongRecord> {
        self.songs.iter().find(|song| song.id == song_id)
    }
}

/// A single song entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub files: SongFiles,
}

/// Artifact file names, relative to the song's directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SongFiles {
    #[serde(default)]
    pub vocals: String,
    #[serde(default)]
    pub instrumental: String,
    #[serde(default)]
    pub waveform: String,
    #[serde(default)]
    pub lyrics: String,
}

impl SongRecord {
    /// Waveform artifact name, if the song has one
    pub fn waveform_file(&self) -> Option<&str> {
        let name = self.files.waveform.trim();
        (!name.is_empty()).then_some(name)
    }
}

/// A resolved song: its id plus where its waveform artifact lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongRef {
    pub id: String,
    pub waveform_path: PathBuf,
}
