use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{error_from_response, AiBackend, AiError};
use crate::config::BackendSettings;

const NAME: &str = "Gemini";

/// Google Gemini `generateContent` backend. Used as the primary reviewer.
pub struct GeminiBackend {
    client: reqwest::Client,
    settings: BackendSettings,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiBackend {
    pub fn new(client: reqwest::Client, settings: BackendSettings) -> Self {
        Self { client, settings }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        )
    }
}

/// `{"error": {"status": "RESOURCE_EXHAUSTED", ...}}`
fn is_resource_exhausted(body: &serde_json::Value) -> bool {
    body.pointer("/error/status").and_then(|s| s.as_str()) == Some("RESOURCE_EXHAUSTED")
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GenerateResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[async_trait]
impl AiBackend for GeminiBackend {
    fn name(&self) -> &str {
        NAME
    }

    #[instrument(skip(self, prompt), fields(prompt_bytes = prompt.len()))]
    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::other(NAME, e))?;

        if !response.status().is_success() {
            return Err(error_from_response(NAME, response, is_resource_exhausted).await);
        }

        let parsed = response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| AiError::other(NAME, format!("failed to parse response: {e}")))?;

        let text = extract_text(parsed).ok_or_else(|| AiError::other(NAME, "response contained no text"))?;
        debug!(model = %self.settings.model, reply_bytes = text.len(), "received Gemini reply");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    fn backend() -> GeminiBackend {
        GeminiBackend::new(
            reqwest::Client::new(),
            BackendSettings {
                api_key: "key".to_string(),
                model: "gemini-2.0-pro-exp".to_string(),
                base_url: "https://generativelanguage.googleapis.com/".to_string(),
            },
        )
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            backend().endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-pro-exp:generateContent"
        );
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let raw = r#"{"candidates":[{"content":{"parts":[{"text":"  LG"},{"text":"TM \n"}],"role":"model"}}]}"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(extract_text(parsed).as_deref(), Some("LGTM"));
    }

    #[test]
    fn test_extract_text_empty_candidates() {
        let parsed: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(extract_text(parsed).is_none());

        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert!(extract_text(blocked).is_none());
    }

    #[test]
    fn test_resource_exhausted_marker() {
        let body = serde_json::json!({
            "error": { "code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED" }
        });
        assert!(is_resource_exhausted(&body));
        let other = serde_json::json!({ "error": { "code": 400, "status": "INVALID_ARGUMENT" } });
        assert!(!is_resource_exhausted(&other));
    }

    async fn backend_for(status: u16, body: &str) -> GeminiBackend {
        let base = test_support::respond_once(status, body).await;
        GeminiBackend::new(
            test_support::client(),
            BackendSettings {
                api_key: "key".to_string(),
                model: "gemini-2.0-pro-exp".to_string(),
                base_url: base,
            },
        )
    }

    #[tokio::test]
    async fn test_generate_success() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Possible bug in a.py"}]}}]}"#;
        let text = backend_for(200, body).await.generate("p").await.unwrap();
        assert_eq!(text, "Possible bug in a.py");
    }

    #[tokio::test]
    async fn test_generate_429_is_quota() {
        let err = backend_for(429, r#"{"error":{"code":429}}"#).await.generate("p").await.unwrap_err();
        assert!(err.is_quota());
    }

    #[tokio::test]
    async fn test_generate_resource_exhausted_is_quota() {
        let body = r#"{"error":{"code":403,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = backend_for(403, body).await.generate("p").await.unwrap_err();
        assert!(err.is_quota());
        assert!(err.to_string().contains("RESOURCE_EXHAUSTED"));
    }

    #[tokio::test]
    async fn test_generate_server_error_is_other() {
        let body = r#"{"error":{"code":500,"status":"INTERNAL"}}"#;
        let err = backend_for(500, body).await.generate("p").await.unwrap_err();
        assert!(matches!(err, AiError::Other { .. }));
    }

    #[tokio::test]
    async fn test_generate_empty_reply_is_other() {
        let err = backend_for(200, r#"{"candidates":[]}"#).await.generate("p").await.unwrap_err();
        assert!(!err.is_quota());
    }
}
