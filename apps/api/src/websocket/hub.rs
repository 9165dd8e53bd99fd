//! Sync session registry and broadcast
//!
//! The hub owns the playback clock and the set of connected sessions behind
//! one lock, so commands, registration and fan-out are serialized and no
//! session ever reads a torn clock. Each session is reached through a bounded
//! queue drained by its own writer task; the hub only ever `try_send`s, so a
//! stalled client cannot hold the lock or delay the others. A failed enqueue
//! removes that session on the spot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use super::messages::ServerMessage;
use crate::services::{ClockState, PlaybackCommand, StateChange};

/// Handle for sending messages to a single session
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Outbound queue drained by the session's writer task
    sender: mpsc::Sender<ServerMessage>,

    /// When this session registered (Unix timestamp ms)
    connected_at: i64,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            sender,
            connected_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Milliseconds since the session registered
    pub fn connected_for_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis() - self.connected_at
    }

    /// Enqueue without waiting
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SendError::ConnectionClosed,
        })
    }
}

#[derive(Debug, Default)]
struct HubState {
    clock: ClockState,
    sessions: HashMap<Uuid, ConnectionHandle>,
}

impl HubState {
    /// Deliver to every session, dropping the ones that fail
    fn broadcast(&mut self, msg: &ServerMessage) -> usize {
        let mut dead = Vec::new();
        for (id, handle) in &self.sessions {
            if let Err(e) = handle.send(msg.clone()) {
                tracing::debug!(session_id = %id, error = %e, "Dropping session after failed broadcast");
                dead.push(*id);
            }
        }

        for id in &dead {
            self.sessions.remove(id);
        }

        self.sessions.len()
    }

    /// Deliver to one session, dropping it if the enqueue fails
    fn send_or_drop(&mut self, session_id: Uuid, msg: ServerMessage) -> Result<(), SendError> {
        let result = self
            .sessions
            .get(&session_id)
            .ok_or(SendError::SessionNotFound)?
            .send(msg);

        if let Err(e) = &result {
            tracing::debug!(session_id = %session_id, error = %e, "Dropping session after failed send");
            self.sessions.remove(&session_id);
        }
        result
    }
}

/// Owner of the shared playback clock and all sync sessions
///
/// Wrapped in Arc for cheap cloning.
#[derive(Debug, Clone, Default)]
pub struct BroadcastHub {
    state: Arc<Mutex<HubState>>,
}

impl BroadcastHub {
    /// Create a hub with a paused clock at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session and queue the current clock snapshot as its first message
    pub async fn register(&self, sender: mpsc::Sender<ServerMessage>) -> Result<Uuid, SendError> {
        let mut state = self.state.lock().await;

        let handle = ConnectionHandle::new(sender);
        let snapshot = ServerMessage::from(state.clock.snapshot(Instant::now()));
        handle.send(snapshot)?;

        let session_id = Uuid::new_v4();
        state.sessions.insert(session_id, handle);

        tracing::debug!(
            session_id = %session_id,
            session_count = state.sessions.len(),
            "Session registered"
        );

        Ok(session_id)
    }

    /// Remove a session; returns false if it was already gone
    pub async fn unregister(&self, session_id: Uuid) -> bool {
        let mut state = self.state.lock().await;
        let Some(handle) = state.sessions.remove(&session_id) else {
            return false;
        };

        tracing::debug!(
            session_id = %session_id,
            connected_ms = handle.connected_for_ms(),
            session_count = state.sessions.len(),
            "Session unregistered"
        );

        true
    }

    /// Send to every session; returns how many sessions remain registered
    pub async fn broadcast(&self, msg: ServerMessage) -> usize {
        self.state.lock().await.broadcast(&msg)
    }

    /// Apply a command and broadcast the resulting state under the same lock
    pub async fn apply(&self, command: PlaybackCommand) -> Option<StateChange> {
        let mut state = self.state.lock().await;

        let change = state.clock.apply(command, Instant::now())?;
        let delivered = state.broadcast(&ServerMessage::from(change));

        tracing::debug!(
            command = ?command,
            state = ?change.state,
            timestamp = change.timestamp,
            sessions = delivered,
            "Playback state changed"
        );

        Some(change)
    }

    /// Send to one session. A failed send removes that session.
    pub async fn send_to(&self, session_id: Uuid, msg: ServerMessage) -> Result<(), SendError> {
        self.state.lock().await.send_or_drop(session_id, msg)
    }

    /// Reply to a `getTime` request.
    ///
    /// The position is read and queued under one lock, so the reply can never
    /// land behind a newer `stateChanged`.
    pub async fn send_time(&self, session_id: Uuid) -> Result<(), SendError> {
        let mut state = self.state.lock().await;

        let msg = ServerMessage::time_update(state.clock.current_position(Instant::now()));
        state.send_or_drop(session_id, msg)
    }

    /// Periodic tick: push the position to one session if playing.
    ///
    /// Returns `Ok(false)` when paused and nothing was sent.
    pub async fn push_time_update(&self, session_id: Uuid) -> Result<bool, SendError> {
        let mut state = self.state.lock().await;

        if !state.clock.is_playing() {
            return Ok(false);
        }

        let msg = ServerMessage::time_update(state.clock.current_position(Instant::now()));
        state.send_or_drop(session_id, msg).map(|()| true)
    }

    /// Number of registered sessions
    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    /// Check if a session is registered
    pub async fn is_registered(&self, session_id: Uuid) -> bool {
        self.state.lock().await.sessions.contains_key(&session_id)
    }
}

/// Errors when sending to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("session not found")]
    SessionNotFound,
    #[error("connection closed")]
    ConnectionClosed,
    #[error("outbound queue full")]
    QueueFull,
}
