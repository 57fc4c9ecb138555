//! Transcript post-processing through chat-completion APIs
//!
//! Each provider is an opaque text-processing capability: given a system
//! prompt, the transcript, and sampling parameters from a profile, it
//! returns generated text or a typed failure. No retry is built in; errors
//! surface directly to the caller.

mod anthropic;
mod openai;

pub use anthropic::AnthropicProcessor;
pub use openai::OpenAiProcessor;

use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{LlmService, ProcessedResult, Profile};
use crate::secrets::{SecretStore, SecretStoreExt};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API key not found. Please configure it in settings.")]
    MissingCredential,
    #[error("API key was rejected by the service")]
    Unauthorized,
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,
    #[error("Invalid response from AI service")]
    InvalidResponse,
    #[error("Processing failed: {0}")]
    Other(String),
}

#[async_trait::async_trait]
pub trait TextProcessor: Send + Sync {
    /// Submit the transcript with the profile's prompt and sampling
    /// parameters, returning the generated text
    async fn generate(
        &self,
        transcript: &str,
        profile: &Profile,
        api_key: &str,
    ) -> Result<String, LlmError>;
}

pub fn processor_for(service: LlmService) -> Box<dyn TextProcessor> {
    match service {
        LlmService::OpenAi | LlmService::Custom => Box::new(OpenAiProcessor::new()),
        LlmService::Anthropic => Box::new(AnthropicProcessor::new()),
    }
}

/// The exact prompt recorded on the result, system prompt and transcript
/// combined
pub fn build_prompt(system_prompt: &str, transcript: &str) -> String {
    format!("{}\n\nTranscript:\n{}", system_prompt, transcript)
}

/// Run one LLM invocation over a transcript, measuring latency and
/// producing the persistent result entity.
pub async fn process_transcript(
    secrets: &dyn SecretStore,
    profile: &Profile,
    transcript: &str,
    recording_id: Option<Uuid>,
) -> Result<ProcessedResult, LlmError> {
    let api_key = secrets
        .profile_key(profile.service, &profile.api_key_id)
        .map_err(|e| LlmError::Other(e.to_string()))?
        .ok_or(LlmError::MissingCredential)?;

    let processor = processor_for(profile.service);

    let started = Instant::now();
    let text = processor.generate(transcript, profile, &api_key).await?;
    let latency_secs = started.elapsed().as_secs_f64();

    let mut result = ProcessedResult::new(
        text,
        build_prompt(&profile.system_prompt, transcript),
        profile.model.clone(),
    );
    result.temperature = profile.temperature;
    result.max_tokens = profile.max_tokens;
    result.latency_secs = latency_secs;
    result.recording_id = recording_id;
    result.profile_id = Some(profile.id);

    Ok(result)
}
