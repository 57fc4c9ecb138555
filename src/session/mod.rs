//! Recording session management
//!
//! `RecordingSession` orchestrates one recording at a time:
//! - audio capture through an injected backend
//! - chunked durable storage via the segmenter
//! - best-effort streaming transcription
//! - persistence of the finished recording and its transcript

mod config;
mod session;

pub use config::SessionConfig;
pub use session::RecordingSession;
