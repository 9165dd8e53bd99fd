//! Shared test utilities for Encore workspace
//!
//! This crate builds throwaway music libraries on disk so the API test
//! suites can exercise the real song catalog and artifact reader.
//!
//! # Fixtures
//!
//! - [`MusicLibraryFixture`] - Temporary library root with `database.json`
//!   and per-song waveform artifacts
//!
//! # Example
//!
//! ```rust,ignore
//! use encore_test_utils::{ramp_samples, MusicLibraryFixture};
//!
//! let mut library = MusicLibraryFixture::new();
//! library.add_song("song-a", &ramp_samples(250_000), 44100);
//!
//! // Point LibraryConfig::with_root at library.root()
//! ```

mod library;

pub use library::{ramp_samples, MusicLibraryFixture};
