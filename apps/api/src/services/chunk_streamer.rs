//! Chunked waveform streaming
//!
//! A [`ChunkStreamer`] pushes one document to one client as a `metadata`
//! event, a gapless run of `chunk` events and a final `end` event. Events
//! go through a bounded channel, so a slow client applies backpressure
//! instead of the whole transfer piling up in the transport. The streamer
//! yields to the scheduler after every chunk and checks its cancellation
//! token before every push.
//!
//! State machine:
//!
//! ```text
//! Metadata -> Streaming -> Ended
//!     \           |
//!      +------> Aborted
//! ```

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::ApiResult;
use crate::models::WaveformDocument;

/// Events of the waveform stream protocol
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Metadata {
        sample_rate: u32,
        duration: f64,
        num_samples: usize,
        #[serde(rename = "totalChunks")]
        total_chunks: usize,
    },
    /// `start` and `end` are inclusive sample indices
    Chunk {
        start: usize,
        end: usize,
        data: Vec<f64>,
    },
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Metadata,
    Streaming,
    Ended,
    Aborted,
}

/// How a stream finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed,
    Aborted,
}

/// Progress through the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamCursor {
    pub next_index: usize,
}

/// Streams one document to one client
#[derive(Debug)]
pub struct ChunkStreamer {
    document: Arc<WaveformDocument>,
    chunk_size: usize,
    state: StreamState,
    cursor: Option<StreamCursor>,
    chunks_sent: usize,
    cancel: CancellationToken,
}

impl ChunkStreamer {
    pub fn new(document: Arc<WaveformDocument>, chunk_size: usize, cancel: CancellationToken) -> Self {
        Self {
            document,
            chunk_size: chunk_size.max(1),
            state: StreamState::Metadata,
            cursor: None,
            chunks_sent: 0,
            cancel,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn cursor(&self) -> Option<StreamCursor> {
        self.cursor
    }

    /// Move to `Aborted`, dropping the cursor. Returns false if the stream
    /// had already finished or been aborted.
    pub fn abort(&mut self) -> bool {
        match self.state {
            StreamState::Ended | StreamState::Aborted => false,
            StreamState::Metadata | StreamState::Streaming => {
                self.state = StreamState::Aborted;
                self.cursor = None;
                self.cancel.cancel();
                true
            }
        }
    }

    /// Next event to push, or `None` once the stream has finished
    fn next_event(&mut self) -> Option<StreamEvent> {
        match self.state {
            StreamState::Metadata => {
                let meta = self.document.metadata();
                Some(StreamEvent::Metadata {
                    sample_rate: meta.sample_rate,
                    duration: meta.duration,
                    num_samples: meta.num_samples,
                    total_chunks: self.document.total_chunks(self.chunk_size),
                })
            }
            StreamState::Streaming => {
                let cursor = self.cursor.get_or_insert(StreamCursor { next_index: 0 });
                let samples = self.document.samples();
                if cursor.next_index >= samples.len() {
                    return Some(StreamEvent::End);
                }

                let start = cursor.next_index;
                let end = (start + self.chunk_size).min(samples.len());
                cursor.next_index = end;

                Some(StreamEvent::Chunk {
                    start,
                    end: end - 1,
                    data: samples[start..end].to_vec(),
                })
            }
            StreamState::Ended | StreamState::Aborted => None,
        }
    }

    /// Record delivery of the event `next_event` produced last
    fn commit(&mut self, was_end: bool) {
        match self.state {
            StreamState::Metadata => {
                self.state = StreamState::Streaming;
                self.cursor = Some(StreamCursor { next_index: 0 });
            }
            StreamState::Streaming if was_end => {
                self.state = StreamState::Ended;
                self.cursor = None;
            }
            StreamState::Streaming => self.chunks_sent += 1,
            StreamState::Ended | StreamState::Aborted => {}
        }
    }

    /// Push every event into `tx` until the stream ends or is cancelled.
    ///
    /// A closed receiver counts as a disconnect; send failures never escape.
    pub async fn run(mut self, tx: mpsc::Sender<StreamEvent>) -> StreamOutcome {
        let song_id = self.document.song_id().to_string();
        tracing::debug!(song_id = %song_id, chunk_size = self.chunk_size, "Waveform stream opened");

        while let Some(event) = self.next_event() {
            let is_end = event == StreamEvent::End;
            let is_chunk = matches!(event, StreamEvent::Chunk { .. });

            let delivered = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => false,
                sent = tx.send(event) => sent.is_ok(),
            };

            if !delivered {
                self.abort();
                tracing::debug!(song_id = %song_id, chunks = self.chunks_sent, "Waveform stream aborted");
                return StreamOutcome::Aborted;
            }
            self.commit(is_end);

            if is_chunk {
                tokio::task::yield_now().await;
            }
        }

        tracing::debug!(song_id = %song_id, chunks = self.chunks_sent, "Waveform stream completed");
        StreamOutcome::Completed
    }
}

/// Client side of a running [`ChunkStreamer`]
///
/// Dropping it cancels the streamer. Once aborted it yields nothing more,
/// even if events are still buffered.
#[derive(Debug)]
pub struct WaveformStream {
    inner: ReceiverStream<StreamEvent>,
    cancel: CancellationToken,
    _guard: DropGuard,
    task: JoinHandle<StreamOutcome>,
}

impl WaveformStream {
    /// Stop the stream; safe to call more than once
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    /// Release the client side and wait for the streamer to finish
    pub async fn close(self) -> ApiResult<StreamOutcome> {
        let Self {
            inner,
            cancel: _,
            _guard,
            task,
        } = self;
        drop(inner);
        drop(_guard);
        Ok(task.await?)
    }
}

impl Stream for WaveformStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.cancel.is_cancelled() {
            return Poll::Ready(None);
        }
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Spawn a streamer for `document` and return its client side
pub fn spawn_stream(document: Arc<WaveformDocument>, chunk_size: usize, buffer: usize) -> WaveformStream {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    let cancel = CancellationToken::new();

    let streamer = ChunkStreamer::new(document, chunk_size, cancel.clone());
    let task = tokio::spawn(streamer.run(tx));

    WaveformStream {
        inner: ReceiverStream::new(rx),
        cancel: cancel.clone(),
        _guard: cancel.drop_guard(),
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WaveformArtifact;
    use tokio_stream::StreamExt;

    fn document(num_samples: usize) -> Arc<WaveformDocument> {
        let artifact = WaveformArtifact {
            sample_rate: 44100,
            duration: num_samples as f64 / 44100.0,
            num_samples,
            waveform: (0..num_samples).map(|i| i as f64).collect(),
        };
        Arc::new(WaveformDocument::from_artifact("song", artifact).unwrap())
    }

    async fn collect(doc: Arc<WaveformDocument>, chunk_size: usize) -> (Vec<StreamEvent>, StreamOutcome) {
        let (tx, mut rx) = mpsc::channel(2);
        let streamer = ChunkStreamer::new(doc, chunk_size, CancellationToken::new());
        let task = tokio::spawn(streamer.run(tx));

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (events, task.await.unwrap())
    }

    #[tokio::test]
    async fn test_stream_250k_samples_in_three_chunks() {
        let (events, outcome) = collect(document(250_000), 100_000).await;

        assert_eq!(outcome, StreamOutcome::Completed);
        assert_eq!(events.len(), 5);
        assert_eq!(
            events[0],
            StreamEvent::Metadata {
                sample_rate: 44100,
                duration: 250_000.0 / 44100.0,
                num_samples: 250_000,
                total_chunks: 3,
            }
        );

        let ranges: Vec<(usize, usize)> = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Chunk { start, end, .. } => Some((*start, *end)),
                _ => None,
            })
            .collect();
        assert_eq!(ranges, vec![(0, 99_999), (100_000, 199_999), (200_000, 249_999)]);

        let total: usize = events
            .iter()
            .map(|e| match e {
                StreamEvent::Chunk { data, .. } => data.len(),
                _ => 0,
            })
            .sum();
        assert_eq!(total, 250_000);
        assert_eq!(events.last(), Some(&StreamEvent::End));
    }

    #[tokio::test]
    async fn test_chunks_are_gapless() {
        let (events, _) = collect(document(1_234), 100).await;

        let mut expected_start = 0;
        for event in &events {
            if let StreamEvent::Chunk { start, end, data } = event {
                assert_eq!(*start, expected_start);
                assert_eq!(end - start + 1, data.len());
                assert_eq!(data[0], *start as f64);
                expected_start = end + 1;
            }
        }
        assert_eq!(expected_start, 1_234);
    }

    #[tokio::test]
    async fn test_empty_document_sends_metadata_then_end() {
        let (events, outcome) = collect(document(0), 100).await;

        assert_eq!(outcome, StreamOutcome::Completed);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], StreamEvent::Metadata { total_chunks: 0, .. }));
        assert_eq!(events[1], StreamEvent::End);
    }

    #[tokio::test]
    async fn test_abort_after_first_chunk() {
        let doc = document(250_000);
        let mut stream = spawn_stream(doc.clone(), 100_000, 1);

        assert!(matches!(stream.next().await, Some(StreamEvent::Metadata { .. })));
        assert!(matches!(
            stream.next().await,
            Some(StreamEvent::Chunk { start: 0, .. })
        ));

        stream.abort();
        stream.abort();
        assert_eq!(stream.next().await, None);

        assert_eq!(stream.close().await.unwrap(), StreamOutcome::Aborted);
        assert_eq!(Arc::strong_count(&doc), 1);
    }

    #[tokio::test]
    async fn test_dropped_receiver_aborts_streamer() {
        let doc = document(1_000);
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let outcome = ChunkStreamer::new(doc.clone(), 100, CancellationToken::new())
            .run(tx)
            .await;

        assert_eq!(outcome, StreamOutcome::Aborted);
        assert_eq!(Arc::strong_count(&doc), 1);
    }

    #[tokio::test]
    async fn test_dropping_stream_cancels_streamer() {
        let doc = document(1_000_000);
        let stream = spawn_stream(doc.clone(), 1_000, 1);
        let cancel = stream.cancel.clone();

        drop(stream);
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_double_abort_is_idempotent() {
        let mut streamer = ChunkStreamer::new(document(10), 5, CancellationToken::new());
        assert_eq!(streamer.state(), StreamState::Metadata);

        assert!(streamer.abort());
        assert!(!streamer.abort());
        assert_eq!(streamer.state(), StreamState::Aborted);
        assert_eq!(streamer.cursor(), None);
        assert_eq!(streamer.next_event(), None);
    }

    fn step(streamer: &mut ChunkStreamer) -> StreamEvent {
        let event = streamer.next_event().unwrap();
        streamer.commit(event == StreamEvent::End);
        event
    }

    #[test]
    fn test_state_transitions() {
        let mut streamer = ChunkStreamer::new(document(10), 5, CancellationToken::new());

        assert!(matches!(step(&mut streamer), StreamEvent::Metadata { .. }));
        assert_eq!(streamer.state(), StreamState::Streaming);
        assert_eq!(streamer.cursor(), Some(StreamCursor { next_index: 0 }));

        step(&mut streamer);
        assert_eq!(streamer.cursor(), Some(StreamCursor { next_index: 5 }));

        step(&mut streamer);
        assert_eq!(step(&mut streamer), StreamEvent::End);

        assert_eq!(streamer.state(), StreamState::Ended);
        assert_eq!(streamer.next_event(), None);
        assert!(!streamer.abort());
    }

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_value(StreamEvent::Metadata {
            sample_rate: 44100,
            duration: 1.5,
            num_samples: 3,
            total_chunks: 1,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "metadata",
                "sample_rate": 44100,
                "duration": 1.5,
                "num_samples": 3,
                "totalChunks": 1
            })
        );

        let json = serde_json::to_value(StreamEvent::End).unwrap();
        assert_eq!(json, serde_json::json!({"type": "end"}));
    }
}
