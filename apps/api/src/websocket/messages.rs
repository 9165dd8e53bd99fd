//! WebSocket message types for playback synchronization
//!
//! This module defines the message protocol for client-server communication
//! over the sync socket. Messages are JSON objects tagged by `type`.

use serde::{Deserialize, Serialize};

use crate::services::{PlaybackCommand, PlaybackStatus, StateChange};

// =============================================================================
// Client -> Server Messages
// =============================================================================

/// Messages sent from client to server
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Start playback from the current position
    Play,

    /// Pause playback
    Pause,

    /// Jump to a position in seconds (negative values clamp to zero)
    Seek { timestamp: f64 },

    /// Ask for the current position; answered to the sender only
    GetTime,
}

impl ClientMessage {
    /// Parse a text or binary frame payload
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// The clock mutation this message requests, if any
    pub fn command(self) -> Option<PlaybackCommand> {
        match self {
            Self::Play => Some(PlaybackCommand::Play),
            Self::Pause => Some(PlaybackCommand::Pause),
            Self::Seek { timestamp } => Some(PlaybackCommand::Seek(timestamp)),
            Self::GetTime => None,
        }
    }
}

// =============================================================================
// Server -> Client Messages
// =============================================================================

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Transport state changed (broadcast), or snapshot on connect
    StateChanged {
        state: PlaybackStatus,
        timestamp: f64,
    },

    /// Current position (per session)
    TimeUpdate { timestamp: f64 },

    /// Inbound message could not be handled (sender only)
    Error { message: String },
}

impl ServerMessage {
    pub fn time_update(timestamp: f64) -> Self {
        Self::TimeUpdate { timestamp }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

impl From<StateChange> for ServerMessage {
    fn from(change: StateChange) -> Self {
        Self::StateChanged {
            state: change.state,
            timestamp: change.timestamp,
        }
    }
}
