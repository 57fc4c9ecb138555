use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::transcribe::TranscribeOptions;

/// Configuration for a recording session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory chunk files are written to
    pub output_dir: PathBuf,
    /// Duration of each audio chunk before rotating files
    pub chunk_duration: Duration,
    /// Language tag stamped on transcripts
    pub language: String,
    /// Stream audio to the transcription service while recording
    pub transcription_enabled: bool,
    pub transcribe: TranscribeOptions,
    /// Secret-store key holding the transcription credential
    pub credential_key: String,
}

impl SessionConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_dir: PathBuf::from(&config.audio.recordings_path),
            chunk_duration: Duration::from_secs(config.audio.chunk_duration_secs),
            language: config.transcription.language.clone(),
            transcription_enabled: config.transcription.enabled,
            transcribe: TranscribeOptions::from_config(&config.transcription),
            credential_key: "deepgram".to_string(),
        }
    }
}
