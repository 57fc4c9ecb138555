use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub audio: AudioConfig,
    pub transcription: TranscriptionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Directory chunk files are written to
    pub recordings_path: String,
    /// Length of each chunk file in seconds
    #[serde(default = "default_chunk_secs")]
    pub chunk_duration_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionConfig {
    /// Stream audio to the transcription service while recording
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_language")]
    pub language: String,
    /// Endpointing silence threshold in milliseconds
    #[serde(default = "default_endpointing_ms")]
    pub endpointing_ms: u32,
}

fn default_chunk_secs() -> u64 {
    30
}

fn default_endpoint() -> String {
    "wss://api.deepgram.com/v1/listen".to_string()
}

fn default_model() -> String {
    "nova-2".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_endpointing_ms() -> u32 {
    300
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio: AudioConfig {
                recordings_path: dirs::data_local_dir()
                    .unwrap_or_else(|| std::path::PathBuf::from("."))
                    .join("voxnotes")
                    .join("recordings")
                    .to_string_lossy()
                    .into_owned(),
                chunk_duration_secs: default_chunk_secs(),
            },
            transcription: TranscriptionConfig {
                enabled: false,
                endpoint: default_endpoint(),
                model: default_model(),
                language: default_language(),
                endpointing_ms: default_endpointing_ms(),
            },
        }
    }
}
