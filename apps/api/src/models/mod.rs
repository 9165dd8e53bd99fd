//! Data models for Encore
//!
//! - Song records from the flat-file song database
//! - Waveform artifacts, documents and slices

pub mod song;
pub mod waveform;

pub use song::{SongDatabase, SongFiles, SongRecord, SongRef};
pub use waveform::{WaveformArtifact, WaveformDocument, WaveformMetadata, WaveformSlice};
