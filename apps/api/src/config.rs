//! API server configuration

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use encore_shared_config::{
    parse_env, parse_positive_env, CommonConfig, ConfigError, ConfigResult, Environment,
    LibraryConfig,
};

/// Default port, matching the karaoke front-end's expectations
const DEFAULT_PORT: u16 = 3001;

/// Default interval between `timeUpdate` pushes while playing
pub const DEFAULT_TIME_UPDATE_INTERVAL_MS: u64 = 100;

/// Default number of samples per waveform chunk
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// Default stride used for waveform previews
pub const DEFAULT_PREVIEW_STRIDE: usize = 1000;

/// API server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Common configuration shared with other services
    pub common: CommonConfig,

    /// Server port (default: 3001)
    pub port: u16,

    /// CORS allowed origins (optional)
    pub cors_allowed_origins: Option<Vec<String>>,

    /// Playback sync session settings
    pub sync: SyncConfig,

    /// Waveform delivery settings
    pub waveform: WaveformConfig,
}

/// Settings for duplex playback sync sessions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Period of the per-session `timeUpdate` push while playing
    pub time_update_interval: Duration,

    /// Close a session after this long without inbound frames (None disables)
    pub idle_timeout: Option<Duration>,

    /// Interval between server pings (None disables)
    pub ping_interval: Option<Duration>,

    /// Capacity of each session's outbound queue
    pub session_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            time_update_interval: Duration::from_millis(DEFAULT_TIME_UPDATE_INTERVAL_MS),
            idle_timeout: Some(Duration::from_secs(300)),
            ping_interval: Some(Duration::from_secs(30)),
            session_buffer: 256,
        }
    }
}

impl SyncConfig {
    /// Load sync settings from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        let interval_ms = parse_positive_env(
            "SYNC_TIME_UPDATE_INTERVAL_MS",
            DEFAULT_TIME_UPDATE_INTERVAL_MS,
        )?;
        let idle_secs: u64 = parse_env("SYNC_IDLE_TIMEOUT_SECS", 300)?;
        let ping_secs: u64 = parse_env("SYNC_PING_INTERVAL_SECS", 30)?;

        // Pongs reset the idle deadline, so pings must come first
        if idle_secs > 0 && ping_secs >= idle_secs {
            return Err(ConfigError::ValidationError(format!(
                "SYNC_PING_INTERVAL_SECS ({ping_secs}) must be shorter than SYNC_IDLE_TIMEOUT_SECS ({idle_secs})"
            )));
        }

        Ok(Self {
            time_update_interval: Duration::from_millis(interval_ms),
            idle_timeout: (idle_secs > 0).then(|| Duration::from_secs(idle_secs)),
            ping_interval: (ping_secs > 0).then(|| Duration::from_secs(ping_secs)),
            session_buffer: parse_positive_env("SYNC_SESSION_BUFFER", 256usize)?,
        })
    }
}

/// Settings for waveform chunk delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveformConfig {
    /// Samples per chunk for slices and streams
    pub chunk_size: usize,

    /// Stride used by the metadata preview and the default preview route
    pub preview_stride: usize,

    /// Events buffered between a streamer and its client connection
    pub stream_buffer: usize,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            preview_stride: DEFAULT_PREVIEW_STRIDE,
            stream_buffer: 4,
        }
    }
}

impl WaveformConfig {
    /// Load waveform settings from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            chunk_size: parse_positive_env("WAVEFORM_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            preview_stride: parse_positive_env("WAVEFORM_PREVIEW_STRIDE", DEFAULT_PREVIEW_STRIDE)?,
            stream_buffer: parse_positive_env("WAVEFORM_STREAM_BUFFER", 4usize)?,
        })
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let common = CommonConfig::from_env().context("Failed to load common config")?;

        Ok(Self {
            common,

            port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .context("Invalid PORT value")?,

            cors_allowed_origins: env::var("CORS_ORIGINS").ok().map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            }),

            sync: SyncConfig::from_env().context("Invalid sync configuration")?,

            waveform: WaveformConfig::from_env().context("Invalid waveform configuration")?,
        })
    }

    /// Configuration for a library root with every other setting at its default
    pub fn for_library(library: LibraryConfig) -> Self {
        Self {
            common: CommonConfig {
                library,
                environment: Environment::Development,
                log_level: "info".to_string(),
            },
            port: DEFAULT_PORT,
            cors_allowed_origins: None,
            sync: SyncConfig::default(),
            waveform: WaveformConfig::default(),
        }
    }

    /// Get library configuration
    pub fn library(&self) -> &LibraryConfig {
        &self.common.library
    }

    /// Get environment mode
    pub fn environment(&self) -> Environment {
        self.common.environment
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.common.environment.is_production()
    }
}
