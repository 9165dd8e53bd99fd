//! WebSocket handlers for playback synchronization
//!
//! This module handles:
//! - The sync message protocol
//! - The shared clock and session registry (`BroadcastHub`)
//! - Per-connection command dispatch and periodic time updates

pub mod handler;
pub mod hub;
pub mod messages;
pub mod sync;

pub use handler::{sync_router, ws_handler, CloseReason, SessionState, SyncSession, SyncState};
pub use hub::{BroadcastHub, ConnectionHandle, SendError};
pub use messages::{ClientMessage, ServerMessage};
pub use sync::{SyncError, SyncHandler};
