use tracing::warn;

use super::protocol::ProviderEnvelope;

/// Interim and accumulated transcript text for one session
///
/// Inbound envelopes are applied strictly in arrival order; no deduplication
/// or reordering is performed, so duplicate text is possible if the provider
/// retransmits a segment.
#[derive(Debug, Default)]
pub struct TranscriptState {
    current: String,
    final_text: String,
    confidence: f32,
}

impl TranscriptState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one raw inbound message. Malformed envelopes are dropped and
    /// logged, never fatal.
    pub fn apply(&mut self, raw: &str) {
        let envelope: ProviderEnvelope = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Dropping malformed transcription envelope: {}", e);
                return;
            }
        };

        let Some(alternative) = envelope.top_alternative() else {
            return;
        };

        self.current = alternative.transcript.clone();
        self.confidence = alternative.confidence as f32;

        if envelope.is_final_result() && !alternative.transcript.is_empty() {
            if !self.final_text.is_empty() {
                self.final_text.push(' ');
            }
            self.final_text.push_str(&alternative.transcript);
        }
    }

    /// The current, possibly interim, transcript
    pub fn current(&self) -> &str {
        &self.current
    }

    /// The accumulated finalized transcript
    pub fn final_text(&self) -> &str {
        &self.final_text
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Clear the interim transcript, leaving the accumulated text untouched
    /// (used on disconnect so the caller can still retrieve it)
    pub fn clear_current(&mut self) {
        self.current.clear();
    }

    /// Clear everything, for a new session reusing the same client
    pub fn reset(&mut self) {
        self.current.clear();
        self.final_text.clear();
        self.confidence = 0.0;
    }
}
