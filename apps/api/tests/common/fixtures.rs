//! App fixtures backed by a temporary music library

use axum::Router;
use encore_api::config::Config;
use encore_api::{app_router, AppServices};
use encore_shared_config::LibraryConfig;
use encore_test_utils::{ramp_samples, MusicLibraryFixture};

/// Sample count of the default test song: two full chunks plus a partial one
pub const RAMP_SAMPLES: usize = 250_000;

/// Running app plus the library it reads from
pub struct TestApp {
    pub library: MusicLibraryFixture,
    pub services: AppServices,
}

impl TestApp {
    /// Library with `ramp` (250k indexed samples), `flat` (1k samples of 0.5),
    /// `corrupt` (declares more samples than it holds) and `missing` (no artifact)
    pub fn new() -> Self {
        let mut library = MusicLibraryFixture::new();
        library
            .add_song("ramp", &ramp_samples(RAMP_SAMPLES), 44100)
            .add_song("flat", &vec![0.5; 1_000], 44100)
            .add_song_with_declared_len("corrupt", &ramp_samples(10), 44100, 11)
            .add_song_without_waveform("missing");

        Self::with_library(library)
    }

    pub fn with_library(library: MusicLibraryFixture) -> Self {
        let config = Config::for_library(LibraryConfig::with_root(library.root()));
        Self::with_config(library, config)
    }

    pub fn with_config(library: MusicLibraryFixture, config: Config) -> Self {
        Self {
            services: AppServices::from_config(config),
            library,
        }
    }

    pub fn router(&self) -> Router {
        app_router(&self.services)
    }
}
