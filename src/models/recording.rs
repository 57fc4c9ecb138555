use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Lifecycle of a single audio chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStatus {
    /// Samples are still being written to this chunk's file
    Capturing,
    /// Waiting for transcription
    Queued,
    /// Transcription in progress
    Transcribing,
    /// File finalized, duration stamped
    Completed,
    /// A write to the chunk file failed; samples after the failure are lost
    Failed,
}

/// A fixed-duration segment of one recording, stored as an individual WAV file
///
/// Created by the segmenter on rollover; mutated (duration, status) only by
/// the segmenter. Indices are contiguous from 0 in creation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioChunk {
    pub id: Uuid,
    /// Sequence index within the owning recording
    pub index: u32,
    /// Offset from the start of the recording, in seconds
    pub start_secs: f64,
    /// Stamped once, on finalize
    pub duration_secs: f64,
    pub file_path: PathBuf,
    pub status: ChunkStatus,
    /// Back-reference to a transcript segment covering this chunk, if any
    pub segment_id: Option<Uuid>,
}

impl AudioChunk {
    pub fn new(index: u32, start_secs: f64, file_path: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4(),
            index,
            start_secs,
            duration_secs: 0.0,
            file_path,
            status: ChunkStatus::Capturing,
            segment_id: None,
        }
    }
}

/// One timed span of transcribed text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub id: Uuid,
    pub text: String,
    pub start_secs: f64,
    pub end_secs: f64,
    /// Provider confidence, 0.0 to 1.0
    pub confidence: f32,
}

impl TranscriptSegment {
    pub fn new(text: String, start_secs: f64, end_secs: f64, confidence: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            start_secs,
            end_secs,
            confidence,
        }
    }
}

/// The transcript for one recording session
///
/// `raw_text` is append-only during a session and replaced wholesale on
/// retranscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub id: Uuid,
    pub raw_text: String,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    pub fn new(raw_text: String, language: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            raw_text,
            language,
            created_at: now,
            updated_at: now,
            segments: Vec::new(),
        }
    }
}

/// A voice note: the ownership root of the entity graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Total duration in seconds; reproducible from buffer count x buffer duration
    pub duration_secs: f64,
    /// Owned, cascade-deleted with the recording
    pub chunks: Vec<AudioChunk>,
    /// Owned, cascade-deleted with the recording
    pub transcript: Option<Transcript>,
    /// Profile used for post-processing; referenced, never owned
    pub profile_id: Option<Uuid>,
}

impl Recording {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            created_at: Utc::now(),
            duration_secs: 0.0,
            chunks: Vec::new(),
            transcript: None,
            profile_id: None,
        }
    }

    /// Default title for a new recording, e.g. "Recording 2025-07-08 14:02:11"
    pub fn default_title() -> String {
        format!("Recording {}", Utc::now().format("%Y-%m-%d %H:%M:%S"))
    }
}
