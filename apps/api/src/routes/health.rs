//! Health check HTTP route handlers
//!
//! Provides endpoints for checking the health of the API:
//! - `GET /health` - Simple liveness check (returns 200 OK)
//! - `GET /health/ready` - Readiness check (music library, sync sessions, cache)
//! - `GET /health/live` - Kubernetes-style liveness probe

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::config::Config;
use crate::services::WaveformService;
use crate::websocket::BroadcastHub;

/// Shared application state for health check handlers
#[derive(Debug, Clone)]
pub struct HealthState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Sync session registry
    pub hub: BroadcastHub,
    /// Waveform service (for the cached song)
    pub waveform: Arc<WaveformService>,
}

/// Readiness report
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub library: LibraryStatus,
    pub sync_sessions: usize,
    pub cached_song: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LibraryStatus {
    pub path: String,
    pub available: bool,
}

/// Create health check router
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/", get(simple_health))
        .route("/live", get(liveness_probe))
        .route("/ready", get(readiness_probe))
        .with_state(state)
}

/// Simple health check - always returns OK if the server is running
async fn simple_health() -> &'static str {
    "OK"
}

/// Liveness probe for Kubernetes
///
/// Returns 200 if the server process is running and can handle requests.
async fn liveness_probe() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness probe
///
/// # Response
/// - 200 OK if the music library directory exists
/// - 503 Service Unavailable otherwise
async fn readiness_probe(State(state): State<HealthState>) -> impl IntoResponse {
    let library = state.config.library();
    let available = library.exists();

    let response = ReadinessResponse {
        status: if available { "ready" } else { "unavailable" },
        library: LibraryStatus {
            path: library.root.display().to_string(),
            available,
        },
        sync_sessions: state.hub.session_count().await,
        cached_song: state.waveform.cached_song().await,
    };

    let status_code = if available {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_health() {
        let response = simple_health().await;
        assert_eq!(response, "OK");
    }

    #[tokio::test]
    async fn test_liveness_probe() {
        let response = liveness_probe().await;
        let json = response.into_response();
        assert_eq!(json.status(), StatusCode::OK);
    }
}
