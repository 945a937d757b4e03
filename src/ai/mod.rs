pub mod gemini;
pub mod openai;

pub use gemini::GeminiBackend;
pub use openai::OpenAiBackend;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single generation call.
///
/// Quota exhaustion is kept apart from every other failure so callers can
/// decide on fallback with a plain match.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("{backend} quota exhausted: {detail}")]
    QuotaExceeded { backend: String, detail: String },

    #[error("{backend} request failed: {detail}")]
    Other { backend: String, detail: String },
}

impl AiError {
    pub fn is_quota(&self) -> bool {
        matches!(self, AiError::QuotaExceeded { .. })
    }

    pub(crate) fn other(backend: &str, detail: impl std::fmt::Display) -> Self {
        AiError::Other {
            backend: backend.to_string(),
            detail: detail.to_string(),
        }
    }
}

/// A text-generation service that turns the review prompt into review text.
#[async_trait]
pub trait AiBackend: Send + Sync {
    /// Human-readable name used in logs and error messages (e.g., "Gemini")
    fn name(&self) -> &str;

    /// Generate a reply for `prompt`. Returns the trimmed text on success.
    async fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

/// Turn a non-success HTTP response into an `AiError`.
///
/// 429 is always quota exhaustion. Otherwise `is_quota_body` inspects the
/// decoded error body for the provider's own quota marker.
pub(crate) async fn error_from_response(
    backend: &str,
    response: reqwest::Response,
    is_quota_body: fn(&serde_json::Value) -> bool,
) -> AiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let quota = status == StatusCode::TOO_MANY_REQUESTS
        || serde_json::from_str::<serde_json::Value>(&body)
            .map(|v| is_quota_body(&v))
            .unwrap_or(false);

    let detail = format!("HTTP {}: {}", status.as_u16(), body);
    if quota {
        AiError::QuotaExceeded {
            backend: backend.to_string(),
            detail,
        }
    } else {
        AiError::Other {
            backend: backend.to_string(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_classification() {
        let quota = AiError::QuotaExceeded {
            backend: "Gemini".to_string(),
            detail: "HTTP 429".to_string(),
        };
        assert!(quota.is_quota());
        assert!(!AiError::other("Gemini", "boom").is_quota());
    }

    #[test]
    fn test_error_messages_name_backend() {
        let err = AiError::other("OpenAI", "HTTP 500: upstream");
        assert_eq!(err.to_string(), "OpenAI request failed: HTTP 500: upstream");
    }
}
