//! Data access layer for Encore
//!
//! Both lookups sit behind traits so services can be tested against
//! in-memory catalogs and temporary artifacts.

pub mod song;
pub mod waveform;

pub use song::{InMemorySongCatalog, JsonSongCatalog, SongCatalog, DEFAULT_WAVEFORM_FILE};
pub use waveform::{ArtifactReader, FsArtifactReader};
