use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{error_from_response, AiBackend, AiError};
use crate::config::BackendSettings;

const NAME: &str = "OpenAI";

/// Sampling temperature for the fallback reviewer.
pub const TEMPERATURE: f64 = 0.7;

/// OpenAI chat-completions backend. Used as the fallback reviewer.
pub struct OpenAiBackend {
    client: reqwest::Client,
    settings: BackendSettings,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

impl OpenAiBackend {
    pub fn new(client: reqwest::Client, settings: BackendSettings) -> Self {
        Self { client, settings }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.settings.base_url.trim_end_matches('/')
        )
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.settings.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": TEMPERATURE,
        })
    }
}

/// `{"error": {"code": "insufficient_quota", ...}}`
fn is_insufficient_quota(body: &serde_json::Value) -> bool {
    body.pointer("/error/code").and_then(|c| c.as_str()) == Some("insufficient_quota")
}

fn first_choice_text(response: ChatResponse) -> Option<String> {
    let content = response.choices.into_iter().next()?.message.content?;
    let content = content.trim();
    (!content.is_empty()).then(|| content.to_string())
}

#[async_trait]
impl AiBackend for OpenAiBackend {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(skip(self, prompt), fields(prompt_bytes = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.settings.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| AiError::other(NAME, e))?;

        if !response.status().is_success() {
            return Err(error_from_response(NAME, response, is_insufficient_quota).await);
        }

        let parsed = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| AiError::other(NAME, format!("failed to parse response: {e}")))?;

        let text = first_choice_text(parsed)
            .ok_or_else(|| AiError::other(NAME, "response contained no message content"))?;
        debug!(model = %self.settings.model, reply_bytes = text.len(), "received OpenAI reply");
        Ok(text)
    }
}
