//! Playback synchronization logic
//!
//! Routes inbound client messages for one session to the hub: commands
//! mutate the shared clock and are broadcast, time queries are answered to
//! the sender only, and malformed payloads get an `error` reply.

use uuid::Uuid;

use super::hub::{BroadcastHub, SendError};
use super::messages::{ClientMessage, ServerMessage};

/// Handles synchronization messages for a single session
#[derive(Debug, Clone)]
pub struct SyncHandler {
    session_id: Uuid,
    hub: BroadcastHub,
}

impl SyncHandler {
    pub fn new(session_id: Uuid, hub: BroadcastHub) -> Self {
        Self { session_id, hub }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Handle a raw text or binary frame payload
    pub async fn handle_payload(&self, payload: &[u8]) -> Result<(), SyncError> {
        match ClientMessage::parse(payload) {
            Ok(message) => self.handle_message(message).await,
            Err(e) => {
                tracing::debug!(
                    session_id = %self.session_id,
                    error = %e,
                    "Failed to parse client message"
                );
                self.send_error(format!("Invalid message format: {e}")).await
            }
        }
    }

    /// Handle a parsed client message
    pub async fn handle_message(&self, message: ClientMessage) -> Result<(), SyncError> {
        match message.command() {
            Some(command) => {
                self.hub.apply(command).await;
                Ok(())
            }
            None => {
                self.hub.send_time(self.session_id).await?;
                Ok(())
            }
        }
    }

    /// Periodic tick; sends nothing while paused
    pub async fn push_time_update(&self) -> Result<bool, SyncError> {
        Ok(self.hub.push_time_update(self.session_id).await?)
    }

    /// Send an error to this session only
    async fn send_error(&self, message: String) -> Result<(), SyncError> {
        self.hub
            .send_to(self.session_id, ServerMessage::error(message))
            .await?;
        Ok(())
    }
}

/// Errors that end a sync session
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("failed to reach session: {0}")]
    Send(#[from] SendError),
}
