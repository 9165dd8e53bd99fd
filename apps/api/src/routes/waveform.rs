//! Waveform HTTP route handlers
//!
//! This module provides endpoints for delivering a song's waveform:
//! - `GET /metadata?song=ID` - Metadata, chunk count and a coarse preview
//! - `GET /chunk?song=ID&start=S[&end=E]` - A slice of samples
//! - `GET /preview?song=ID[&rate=N]` - Every N-th sample
//! - `GET /stream?song=ID` - The whole waveform as Server-Sent Events

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use crate::config::WaveformConfig;
use crate::error::{ApiError, ApiResult};
use crate::models::WaveformMetadata;
use crate::services::{spawn_stream, WaveformService};

/// Query parameters shared by the waveform endpoints
#[derive(Debug, Deserialize, Default)]
pub struct WaveformQuery {
    /// Song id (required)
    pub song: Option<String>,
    /// First sample index for `/chunk`
    pub start: Option<i64>,
    /// Exclusive end index for `/chunk`
    pub end: Option<i64>,
    /// Stride for `/preview`
    pub rate: Option<i64>,
}

impl WaveformQuery {
    fn song_id(&self) -> ApiResult<&str> {
        self.song
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::ValidationError("song id is required".to_string()))
    }
}

/// Shared state for waveform handlers
#[derive(Debug, Clone)]
pub struct WaveformState {
    pub service: Arc<WaveformService>,
    pub config: WaveformConfig,
}

#[derive(Debug, Serialize)]
pub struct MetadataResponse {
    #[serde(flatten)]
    pub metadata: WaveformMetadata,
    #[serde(rename = "totalChunks")]
    pub total_chunks: usize,
    pub preview: Vec<f64>,
    #[serde(rename = "previewLength")]
    pub preview_length: usize,
    #[serde(rename = "songId")]
    pub song_id: String,
}

#[derive(Debug, Serialize)]
pub struct ChunkResponse {
    /// First sample index actually sliced, clamped to the sample count
    pub start: i64,
    /// Inclusive index of the last returned sample (`start - 1` when empty)
    pub end: i64,
    pub data: Vec<f64>,
    pub length: usize,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    #[serde(flatten)]
    pub metadata: WaveformMetadata,
    pub preview: Vec<f64>,
    #[serde(rename = "previewLength")]
    pub preview_length: usize,
    pub stride: usize,
}

/// Create the waveform router
pub fn waveform_router(state: WaveformState) -> Router {
    Router::new()
        .route("/metadata", get(get_metadata))
        .route("/chunk", get(get_chunk))
        .route("/preview", get(get_preview))
        .route("/stream", get(stream_waveform))
        .with_state(state)
}

async fn get_metadata(
    State(state): State<WaveformState>,
    Query(query): Query<WaveformQuery>,
) -> ApiResult<Json<MetadataResponse>> {
    let song_id = query.song_id()?;

    let metadata = state.service.metadata(song_id).await?;
    let total_chunks = state.service.total_chunks(song_id).await?;
    let preview = state
        .service
        .preview(song_id, state.config.preview_stride as i64)
        .await?;

    Ok(Json(MetadataResponse {
        metadata,
        total_chunks,
        preview_length: preview.len(),
        preview,
        song_id: song_id.to_string(),
    }))
}

async fn get_chunk(
    State(state): State<WaveformState>,
    Query(query): Query<WaveformQuery>,
) -> ApiResult<Json<ChunkResponse>> {
    let song_id = query.song_id()?;
    let start = query
        .start
        .ok_or_else(|| ApiError::ValidationError("start is required".to_string()))?;

    let slice = state.service.slice(song_id, start, query.end).await?;
    let start = slice.start as i64;
    let end = slice.last_index().map_or(start - 1, |last| last as i64);

    Ok(Json(ChunkResponse {
        start,
        end,
        length: slice.data.len(),
        data: slice.data,
    }))
}

async fn get_preview(
    State(state): State<WaveformState>,
    Query(query): Query<WaveformQuery>,
) -> ApiResult<Json<PreviewResponse>> {
    let song_id = query.song_id()?;
    let stride = query.rate.unwrap_or(state.config.preview_stride as i64);

    let preview = state.service.preview(song_id, stride).await?;
    let metadata = state.service.metadata(song_id).await?;

    Ok(Json(PreviewResponse {
        metadata,
        preview_length: preview.len(),
        preview,
        // preview() rejected anything below 1
        stride: stride as usize,
    }))
}

/// Stream the whole waveform as Server-Sent Events
///
/// Lookup failures are returned as regular JSON errors; once the stream
/// has opened, a disconnect simply drops the body and cancels the streamer.
async fn stream_waveform(
    State(state): State<WaveformState>,
    Query(query): Query<WaveformQuery>,
) -> ApiResult<Response> {
    let song_id = query.song_id()?;
    let document = state.service.load(song_id).await?;

    tracing::info!(
        song_id = %song_id,
        samples = document.num_samples(),
        "Starting waveform stream"
    );

    let events = spawn_stream(
        document,
        state.service.chunk_size(),
        state.config.stream_buffer,
    )
    .map(|event| Event::default().json_data(event));

    Ok(Sse::new(events)
        .keep_alive(KeepAlive::default())
        .into_response())
}
