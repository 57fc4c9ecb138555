use serde::Deserialize;

/// Inbound response envelope from the transcription provider
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEnvelope {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub channel: Option<Channel>,
    /// Present on result envelopes; false marks an interim alternative that
    /// a later message for the same audio span may supersede
    pub is_final: Option<bool>,
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Alternative {
    pub transcript: String,
    pub confidence: f64,
    pub words: Option<Vec<Word>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Word {
    pub word: String,
    pub start: f64,
    pub end: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    pub request_id: Option<String>,
    pub model_info: Option<ModelInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub version: String,
    pub arch: String,
}

impl ProviderEnvelope {
    /// Top transcript alternative, if the envelope carries one
    pub fn top_alternative(&self) -> Option<&Alternative> {
        self.channel.as_ref().and_then(|c| c.alternatives.first())
    }

    /// Whether this envelope carries a finalized result segment.
    ///
    /// Envelopes without an `is_final` field are treated as final, matching
    /// providers that only tag interim results explicitly.
    pub fn is_final_result(&self) -> bool {
        self.kind.as_deref() == Some("Results") && self.is_final.unwrap_or(true)
    }
}
