pub mod backend;
pub mod capture;
pub mod chunk;
pub mod file;
pub mod level;
pub mod resample;

pub use backend::{AudioCapture, AudioFrame, CaptureError, CaptureEvent};
pub use capture::MicrophoneCapture;
pub use chunk::{ChunkConfig, ChunkSegmenter};
pub use file::AudioChunkFile;
pub use level::LevelMeter;
