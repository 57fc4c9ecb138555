use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::{LlmError, TextProcessor};
use crate::models::Profile;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// The API requires max_tokens; used when the profile doesn't cap it
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicProcessor {
    client: Client,
}

impl AnthropicProcessor {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for AnthropicProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TextProcessor for AnthropicProcessor {
    async fn generate(
        &self,
        transcript: &str,
        profile: &Profile,
        api_key: &str,
    ) -> Result<String, LlmError> {
        let endpoint = profile
            .endpoint()
            .ok_or_else(|| LlmError::Other("profile has no endpoint configured".to_string()))?;

        let body = json!({
            "model": profile.model,
            "messages": [
                { "role": "user", "content": transcript },
            ],
            "system": profile.system_prompt,
            "temperature": profile.temperature,
            "top_p": profile.top_p,
            "max_tokens": profile.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });

        let response = self
            .client
            .post(endpoint)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Other(format!("Network error: {}", e)))?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::TOO_MANY_REQUESTS => return Err(LlmError::RateLimited),
            StatusCode::UNAUTHORIZED => return Err(LlmError::Unauthorized),
            status => {
                let message = response.text().await.unwrap_or_default();
                return Err(LlmError::Other(format!("Status {}: {}", status, message)));
            }
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|_| LlmError::InvalidResponse)?;

        payload
            .get("content")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("text"))
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .ok_or(LlmError::InvalidResponse)
    }
}
