//! Shared playback clock
//!
//! The clock is a two-state machine. The `Playing` variant carries the
//! instant playback (re)started, so "playing without a start instant" is
//! unrepresentable. Every operation takes `now` explicitly; callers pass
//! `Instant::now()` and tests pass synthetic instants.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Wire name of the transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Transport {
    Paused,
    Playing { started_at: Instant },
}

/// A state change produced by a command, ready to broadcast
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateChange {
    pub state: PlaybackStatus,
    pub timestamp: f64,
}

/// Commands that mutate the clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackCommand {
    Play,
    Pause,
    Seek(f64),
}

/// Authoritative playback position
#[derive(Debug, Clone, PartialEq)]
pub struct ClockState {
    /// Position while paused, or the position at `started_at` while playing
    position_seconds: f64,
    transport: Transport,
}

impl Default for ClockState {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockState {
    /// Paused at zero
    pub fn new() -> Self {
        Self {
            position_seconds: 0.0,
            transport: Transport::Paused,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.transport, Transport::Playing { .. })
    }

    pub fn status(&self) -> PlaybackStatus {
        match self.transport {
            Transport::Paused => PlaybackStatus::Paused,
            Transport::Playing { .. } => PlaybackStatus::Playing,
        }
    }

    /// Stored position, without elapsed playing time
    pub fn position_seconds(&self) -> f64 {
        self.position_seconds
    }

    /// Position in the song at `now`
    pub fn current_position(&self, now: Instant) -> f64 {
        match self.transport {
            Transport::Paused => self.position_seconds,
            Transport::Playing { started_at } => {
                // saturating: an instant captured before `started_at` reads as zero elapsed
                let elapsed = now.saturating_duration_since(started_at);
                self.position_seconds + elapsed.as_secs_f64()
            }
        }
    }

    /// Snapshot sent to newly registered sessions
    pub fn snapshot(&self, now: Instant) -> StateChange {
        StateChange {
            state: self.status(),
            timestamp: self.current_position(now),
        }
    }

    /// Start playing from the stored position. No-op while playing.
    pub fn play(&mut self, now: Instant) -> Option<StateChange> {
        if self.is_playing() {
            return None;
        }

        self.transport = Transport::Playing { started_at: now };
        Some(StateChange {
            state: PlaybackStatus::Playing,
            timestamp: self.position_seconds,
        })
    }

    /// Freeze the position. No-op while paused.
    pub fn pause(&mut self, now: Instant) -> Option<StateChange> {
        if !self.is_playing() {
            return None;
        }

        self.position_seconds = self.current_position(now);
        self.transport = Transport::Paused;
        Some(StateChange {
            state: PlaybackStatus::Paused,
            timestamp: self.position_seconds,
        })
    }

    /// Jump to `target` (clamped at zero), keeping the transport state
    pub fn seek(&mut self, target: f64, now: Instant) -> StateChange {
        self.position_seconds = target.max(0.0);
        if let Transport::Playing { started_at } = &mut self.transport {
            *started_at = now;
        }

        StateChange {
            state: self.status(),
            timestamp: self.position_seconds,
        }
    }

    /// Apply a command; `None` means nothing changed
    pub fn apply(&mut self, command: PlaybackCommand, now: Instant) -> Option<StateChange> {
        match command {
            PlaybackCommand::Play => self.play(now),
            PlaybackCommand::Pause => self.pause(now),
            PlaybackCommand::Seek(target) => Some(self.seek(target, now)),
        }
    }
}
