//! HTTP route handlers for the Encore API
//!
//! This module contains all endpoint handlers including:
//! - Waveform metadata, chunk, preview and SSE stream endpoints
//! - The playback sync WebSocket
//! - Health check and status endpoints

pub mod health;
pub mod waveform;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

pub use health::{health_router, HealthState};
pub use waveform::{waveform_router, WaveformState};

use crate::config::Config;
use crate::repositories::{ArtifactReader, FsArtifactReader, JsonSongCatalog, SongCatalog};
use crate::services::WaveformService;
use crate::websocket::{sync_router, BroadcastHub, SyncState};

/// Long-lived services shared by every router
#[derive(Debug, Clone)]
pub struct AppServices {
    pub config: Arc<Config>,
    pub hub: BroadcastHub,
    pub waveform: Arc<WaveformService>,
}

impl AppServices {
    /// Services backed by the on-disk music library
    pub fn from_config(config: Config) -> Self {
        let catalog = Arc::new(JsonSongCatalog::new(config.library().clone()));
        Self::with_collaborators(config, catalog, Arc::new(FsArtifactReader))
    }

    /// Services backed by custom song lookup and artifact reading
    pub fn with_collaborators(
        config: Config,
        catalog: Arc<dyn SongCatalog>,
        reader: Arc<dyn ArtifactReader>,
    ) -> Self {
        let waveform = WaveformService::new(catalog, reader, config.waveform.chunk_size);

        Self {
            config: Arc::new(config),
            hub: BroadcastHub::new(),
            waveform: Arc::new(waveform),
        }
    }
}

/// Build the application router
///
/// # Routes
/// - `GET /` - Banner
/// - `/health`, `/health/live`, `/health/ready`
/// - `GET /ws/sync` - Playback sync WebSocket
/// - `/api/waveform/{metadata,chunk,preview,stream}`
pub fn app_router(services: &AppServices) -> Router {
    let health_state = HealthState {
        config: services.config.clone(),
        hub: services.hub.clone(),
        waveform: services.waveform.clone(),
    };

    let sync_state = SyncState {
        hub: services.hub.clone(),
        config: services.config.sync.clone(),
    };

    let waveform_state = WaveformState {
        service: services.waveform.clone(),
        config: services.config.waveform.clone(),
    };

    Router::new()
        .route("/", get(root))
        // Nested health routes: /health, /health/live, /health/ready
        .nest("/health", health_router(health_state))
        // Sync socket: /ws/sync
        .nest("/ws", sync_router(sync_state))
        // Waveform routes: /api/waveform/*
        .nest("/api/waveform", waveform_router(waveform_state))
        .layer(TraceLayer::new_for_http())
}

async fn root() -> &'static str {
    "Encore - karaoke playback sync and waveform server"
}
