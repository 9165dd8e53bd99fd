//! Waveform artifact and document types

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};

/// On-disk waveform artifact (`waveform.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaveformArtifact {
    pub sample_rate: u32,
    pub duration: f64,
    pub num_samples: usize,
    pub waveform: Vec<f64>,
}

/// Parsed, validated waveform of one song
///
/// `samples.len() == num_samples` holds for every constructed document.
#[derive(Debug, Clone)]
pub struct WaveformDocument {
    song_id: String,
    sample_rate: u32,
    duration_seconds: f64,
    samples: Vec<f64>,
}

impl WaveformDocument {
    /// Validate an artifact against its declared length
    pub fn from_artifact(song_id: impl Into<String>, artifact: WaveformArtifact) -> ApiResult<Self> {
        let song_id = song_id.into();
        if artifact.waveform.len() != artifact.num_samples {
            return Err(ApiError::WaveformCorrupt {
                song_id,
                expected: artifact.num_samples,
                actual: artifact.waveform.len(),
            });
        }

        Ok(Self {
            song_id,
            sample_rate: artifact.sample_rate,
            duration_seconds: artifact.duration,
            samples: artifact.waveform,
        })
    }

    pub fn song_id(&self) -> &str {
        &self.song_id
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_seconds
    }

    pub fn num_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Metadata without the sample sequence
    pub fn metadata(&self) -> WaveformMetadata {
        WaveformMetadata {
            sample_rate: self.sample_rate,
            duration: self.duration_seconds,
            num_samples: self.num_samples(),
        }
    }

    /// Number of `chunk_size` windows needed to cover every sample
    pub fn total_chunks(&self, chunk_size: usize) -> usize {
        self.num_samples().div_ceil(chunk_size.max(1))
    }
}

/// Waveform metadata, serialized with the artifact's field names
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveformMetadata {
    pub sample_rate: u32,
    pub duration: f64,
    pub num_samples: usize,
}

/// A contiguous window of samples
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformSlice {
    /// Index of the first sample
    pub start: usize,
    pub data: Vec<f64>,
}

impl WaveformSlice {
    /// Inclusive index of the last sample, `None` for an empty slice
    pub fn last_index(&self) -> Option<usize> {
        (!self.data.is_empty()).then(|| self.start + self.data.len() - 1)
    }
}
