use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::{LlmError, TextProcessor};
use crate::models::Profile;

/// OpenAI-compatible chat completions client, also used for profiles with a
/// custom endpoint speaking the same protocol
pub struct OpenAiProcessor {
    client: Client,
}

impl OpenAiProcessor {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for OpenAiProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TextProcessor for OpenAiProcessor {
    async fn generate(
        &self,
        transcript: &str,
        profile: &Profile,
        api_key: &str,
    ) -> Result<String, LlmError> {
        let endpoint = profile
            .endpoint()
            .ok_or_else(|| LlmError::Other("profile has no endpoint configured".to_string()))?;

        let mut body = json!({
            "model": profile.model,
            "messages": [
                { "role": "system", "content": profile.system_prompt },
                { "role": "user", "content": transcript },
            ],
            "temperature": profile.temperature,
            "top_p": profile.top_p,
            "frequency_penalty": profile.frequency_penalty,
            "presence_penalty": profile.presence_penalty,
        });
        if let Some(max_tokens) = profile.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(api_key)
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
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .ok_or(LlmError::InvalidResponse)
    }
}
