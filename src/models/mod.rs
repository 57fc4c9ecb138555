//! Persistent entity graph
//!
//! Recording is the ownership root: chunks and the transcript are embedded
//! and die with it. Profiles and processed results live independently and
//! reference each other by id only, resolved through the store.

mod profile;
mod recording;

pub use profile::{LlmService, ProcessedResult, Profile};
pub use recording::{AudioChunk, ChunkStatus, Recording, Transcript, TranscriptSegment};
