use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which chat-completion API a profile talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmService {
    OpenAi,
    Anthropic,
    /// OpenAI-compatible API at a profile-supplied endpoint
    Custom,
}

impl LlmService {
    pub fn base_url(&self) -> Option<&'static str> {
        match self {
            LlmService::OpenAi => Some("https://api.openai.com/v1/chat/completions"),
            LlmService::Anthropic => Some("https://api.anthropic.com/v1/messages"),
            LlmService::Custom => None,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmService::OpenAi => "gpt-4o",
            LlmService::Anthropic => "claude-3-5-sonnet-20241022",
            LlmService::Custom => "",
        }
    }

    /// Secret-store key prefix for this service
    pub fn key_name(&self) -> &'static str {
        match self {
            LlmService::OpenAi => "openai",
            LlmService::Anthropic => "anthropic",
            LlmService::Custom => "custom",
        }
    }
}

/// A named LLM configuration used to post-process transcripts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub service: LlmService,
    pub model: String,
    /// Opaque identifier used to look up the API key in the secret store
    pub api_key_id: String,
    pub system_prompt: String,
    pub temperature: f64,
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    pub max_tokens: Option<u32>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    /// Required when `service` is `Custom`
    pub custom_endpoint: Option<String>,
}

impl Profile {
    pub fn new(name: impl Into<String>, service: LlmService) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            service,
            model: service.default_model().to_string(),
            api_key_id: Uuid::new_v4().to_string(),
            system_prompt: "You are a helpful assistant that processes voice transcriptions."
                .to_string(),
            temperature: 0.7,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            max_tokens: None,
            active: true,
            created_at: Utc::now(),
            custom_endpoint: None,
        }
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.custom_endpoint
            .as_deref()
            .or_else(|| self.service.base_url())
    }
}

/// Output of one LLM invocation over a transcript
///
/// Weakly references the originating recording and profile; the references
/// are nullified, not cascaded, when either is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedResult {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub text: String,
    /// The exact prompt submitted, system prompt and transcript combined
    pub prompt: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub latency_secs: f64,
    pub recording_id: Option<Uuid>,
    pub profile_id: Option<Uuid>,
}

impl ProcessedResult {
    pub fn new(text: String, prompt: String, model: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            text,
            prompt,
            model,
            temperature: 0.7,
            max_tokens: None,
            latency_secs: 0.0,
            recording_id: None,
            profile_id: None,
        }
    }
}
