//! WebSocket upgrade handler for playback sync sessions
//!
//! Each connection runs two tasks:
//! - a writer draining the session's outbound queue to the socket and
//!   sending keepalive pings
//! - a reader dispatching inbound frames, ticking `timeUpdate` pushes while
//!   playing and enforcing the idle timeout
//!
//! Whichever finishes first decides the close reason; the other is aborted
//! and the session goes through the same cleanup on every path.

use std::fmt::Display;
use std::future::pending;
use std::net::SocketAddr;
use std::pin::Pin;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior, Sleep};
use uuid::Uuid;

use super::hub::BroadcastHub;
use super::messages::ServerMessage;
use super::sync::SyncHandler;
use crate::config::SyncConfig;

/// Shared state for the sync socket
#[derive(Debug, Clone)]
pub struct SyncState {
    pub hub: BroadcastHub,
    pub config: SyncConfig,
}

/// Create the sync socket router
pub fn sync_router(state: SyncState) -> Router {
    Router::new()
        .route("/sync", get(ws_handler))
        .with_state(state)
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Close frame received or stream ended
    ClientClosed,
    /// Socket read or write failed
    TransportError,
    /// No inbound frame within the idle timeout
    IdleTimeout,
    /// The hub could not enqueue to this session and dropped it
    SendFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed(CloseReason),
}

/// Registered session; closing it is the single cleanup path
#[derive(Debug)]
pub struct SyncSession {
    id: Uuid,
    hub: BroadcastHub,
    state: SessionState,
}

impl SyncSession {
    /// Register with the hub; the clock snapshot is queued before anything else
    pub async fn open(hub: BroadcastHub, sender: mpsc::Sender<ServerMessage>) -> Option<Self> {
        match hub.register(sender).await {
            Ok(id) => Some(Self {
                id,
                hub,
                state: SessionState::Open,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to register sync session");
                None
            }
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Move to `Closed` and unregister. Only the first reason is kept.
    pub async fn close(&mut self, reason: CloseReason) {
        if self.state != SessionState::Open {
            return;
        }

        self.state = SessionState::Closed(reason);
        self.hub.unregister(self.id).await;

        tracing::info!(session_id = %self.id, reason = ?reason, "Sync session closed");
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<SyncState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    let client = connect_info
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    tracing::debug!(client = %client, "Sync socket upgrade requested");

    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, state: SyncState) {
    let SyncState { hub, config } = state;

    let (tx, rx) = mpsc::channel::<ServerMessage>(config.session_buffer.max(1));
    let Some(mut session) = SyncSession::open(hub.clone(), tx).await else {
        return;
    };
    let session_id = session.id();

    tracing::info!(session_id = %session_id, "Sync session opened");

    let (ws_sender, ws_receiver) = socket.split();

    let mut send_task = tokio::spawn(write_loop(session_id, rx, ws_sender, config.ping_interval));
    let mut recv_task = tokio::spawn(read_loop(
        SyncHandler::new(session_id, hub),
        ws_receiver,
        config.time_update_interval,
        config.idle_timeout,
    ));

    // Wait for either task to complete, then abort the other
    let reason = tokio::select! {
        result = &mut send_task => {
            recv_task.abort();
            result.unwrap_or(CloseReason::TransportError)
        }
        result = &mut recv_task => {
            send_task.abort();
            result.unwrap_or(CloseReason::TransportError)
        }
    };

    session.close(reason).await;
}

/// Drain the outbound queue to the socket
async fn write_loop<S>(
    session_id: Uuid,
    mut rx: mpsc::Receiver<ServerMessage>,
    mut ws_sender: S,
    ping_interval: Option<Duration>,
) -> CloseReason
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let mut ping = ping_interval.map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    loop {
        tokio::select! {
            msg = rx.recv() => {
                // the hub dropped our handle after a failed enqueue
                let Some(msg) = msg else {
                    return CloseReason::SendFailed;
                };

                match serde_json::to_string(&msg) {
                    Ok(json) => {
                        if let Err(e) = ws_sender.send(Message::Text(json)).await {
                            tracing::debug!(session_id = %session_id, error = %e, "WebSocket send failed");
                            return CloseReason::TransportError;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize message");
                    }
                }
            }
            _ = next_tick(&mut ping) => {
                if let Err(e) = ws_sender.send(Message::Ping(Vec::new())).await {
                    tracing::debug!(session_id = %session_id, error = %e, "WebSocket ping failed");
                    return CloseReason::TransportError;
                }
            }
        }
    }
}

/// Dispatch inbound frames and push time updates while playing
async fn read_loop<R, E>(
    handler: SyncHandler,
    mut ws_receiver: R,
    time_update_interval: Duration,
    idle_timeout: Option<Duration>,
) -> CloseReason
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    let session_id = handler.session_id();

    let mut ticker = tokio::time::interval(time_update_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut idle: Option<Pin<Box<Sleep>>> =
        idle_timeout.map(|timeout| Box::pin(tokio::time::sleep(timeout)));

    loop {
        tokio::select! {
            frame = ws_receiver.next() => {
                if let (Some(deadline), Some(timeout)) = (idle.as_mut(), idle_timeout) {
                    deadline.as_mut().reset(Instant::now() + timeout);
                }

                let payload = match frame {
                    Some(Ok(Message::Text(text))) => text.into_bytes(),
                    Some(Ok(Message::Binary(data))) => data,
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        tracing::trace!(session_id = %session_id, "Keepalive frame received");
                        continue;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(session_id = %session_id, "WebSocket close received");
                        return CloseReason::ClientClosed;
                    }
                    Some(Err(e)) => {
                        tracing::debug!(session_id = %session_id, error = %e, "WebSocket error");
                        return CloseReason::TransportError;
                    }
                };

                if let Err(e) = handler.handle_payload(&payload).await {
                    tracing::debug!(session_id = %session_id, error = %e, "Session unreachable");
                    return CloseReason::SendFailed;
                }
            }
            _ = ticker.tick() => {
                if let Err(e) = handler.push_time_update().await {
                    tracing::debug!(session_id = %session_id, error = %e, "Stopping time updates");
                    return CloseReason::SendFailed;
                }
            }
            _ = idle_expired(&mut idle) => {
                tracing::debug!(session_id = %session_id, "Sync session idle");
                return CloseReason::IdleTimeout;
            }
        }
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}

async fn idle_expired(deadline: &mut Option<Pin<Box<Sleep>>>) {
    match deadline {
        Some(deadline) => deadline.as_mut().await,
        None => pending().await,
    }
}
