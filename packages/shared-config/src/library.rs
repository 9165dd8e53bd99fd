//! Song library location types

use std::path::{Path, PathBuf};

use crate::{get_env_or_default, ConfigError, ConfigResult};

/// File name of the flat-file song database inside the library root
pub const DEFAULT_DATABASE_FILE: &str = "database.json";

/// On-disk song library configuration
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    /// Root directory holding one sub-directory per song
    pub root: PathBuf,

    /// Song database file name, relative to `root`
    pub database_file: String,
}

impl LibraryConfig {
    /// Load library configuration from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        let root = get_env_or_default("MUSIC_LIBRARY_PATH", "./music");
        let database_file = get_env_or_default("SONG_DATABASE_FILE", DEFAULT_DATABASE_FILE);

        if database_file.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "SONG_DATABASE_FILE".to_string(),
                "must not be empty".to_string(),
            ));
        }

        Ok(Self {
            root: PathBuf::from(root),
            database_file,
        })
    }

    /// Create a configuration rooted at a custom path (useful for testing)
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            database_file: DEFAULT_DATABASE_FILE.to_string(),
        }
    }

    /// Full path of the song database file
    pub fn database_path(&self) -> PathBuf {
        self.root.join(&self.database_file)
    }

    /// Directory holding a single song's artifacts
    pub fn song_dir(&self, song_id: &str) -> PathBuf {
        self.root.join(song_id)
    }

    /// Whether the library root exists and is a directory
    pub fn exists(&self) -> bool {
        Path::new(&self.root).is_dir()
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self::with_root("./music")
    }
}
