//! Business logic services for Encore
//!
//! - `clock`: the shared playback clock
//! - `waveform`: waveform loading, caching, slices and previews
//! - `chunk_streamer`: cancellable chunked push of a whole waveform

pub mod chunk_streamer;
pub mod clock;
pub mod waveform;

pub use chunk_streamer::{
    spawn_stream, ChunkStreamer, StreamCursor, StreamEvent, StreamOutcome, StreamState,
    WaveformStream,
};
pub use clock::{ClockState, PlaybackCommand, PlaybackStatus, StateChange};
pub use waveform::WaveformService;
