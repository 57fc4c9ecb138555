//! Streaming transcription over a persistent duplex WebSocket
//!
//! Outbound: binary frames of mono 16 kHz 16-bit little-endian PCM.
//! Inbound: JSON envelopes carrying interim and finalized transcript
//! alternatives.

mod client;
mod protocol;
mod state;

pub use client::{ConnectError, SendError, StreamingTranscriber, TranscribeOptions};
pub use protocol::{Alternative, Channel, Metadata, ModelInfo, ProviderEnvelope, Word};
pub use state::TranscriptState;
