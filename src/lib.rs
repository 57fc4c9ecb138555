pub mod audio;
pub mod config;
pub mod llm;
pub mod models;
pub mod secrets;
pub mod session;
pub mod store;
pub mod transcribe;

pub use audio::{
    AudioCapture, AudioChunkFile, AudioFrame, CaptureError, CaptureEvent, ChunkConfig,
    ChunkSegmenter, LevelMeter, MicrophoneCapture,
};
pub use config::Config;
pub use llm::{process_transcript, LlmError, TextProcessor};
pub use models::{
    AudioChunk, ChunkStatus, LlmService, ProcessedResult, Profile, Recording, Transcript,
    TranscriptSegment,
};
pub use secrets::{FileSecretStore, MemorySecretStore, SecretStore, SecretStoreExt};
pub use session::{RecordingSession, SessionConfig};
pub use store::ObjectStore;
pub use transcribe::{ConnectError, SendError, StreamingTranscriber, TranscribeOptions};
