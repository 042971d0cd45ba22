use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::{GenerationError, TextGenerator, GENERIC_UPSTREAM_FAILURE};
use crate::config::GeminiConfig;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
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

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

/// Pulls the provider's own message out of an error body, if it has one.
fn upstream_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|r| r.error)
        .and_then(|e| e.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| GENERIC_UPSTREAM_FAILURE.to_string())
}

/// Transport and decode failures, without the request URL.
fn transport_error(err: reqwest::Error) -> GenerationError {
    GenerationError::Upstream(err.without_url().to_string())
}

fn first_text(response: GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()?
        .text
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            GenerationError::Upstream("GEMINI_API_KEY is not configured".to_string())
        })?;

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .json(&json!({ "contents": [{ "parts": [{ "text": prompt }] }] }))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Text generator returned {}: {}", status, body);
            return Err(GenerationError::Upstream(upstream_message(&body)));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(transport_error)?;

        first_text(body).ok_or_else(|| GenerationError::Upstream("empty response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_upstream_message_prefers_provider_text() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid."}}"#;
        assert_eq!(upstream_message(body), "API key not valid.");
        assert_eq!(upstream_message("<html>bad gateway</html>"), GENERIC_UPSTREAM_FAILURE);
        assert_eq!(upstream_message(r#"{"error": {}}"#), GENERIC_UPSTREAM_FAILURE);
    }

    #[test]
    fn test_first_text_reads_first_candidate_part() {
        let response: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "{}"}, {"text": "ignored"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(first_text(response).as_deref(), Some("{}"));

        let empty: GenerateContentResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(first_text(empty).is_none());
    }

    #[test]
    fn test_endpoint_joins_base_and_model() {
        let client = GeminiClient::new(GeminiConfig {
            api_url: "http://localhost:9999/v1beta/".to_string(),
            model: "gemini-2.0-flash".to_string(),
            ..GeminiConfig::default()
        })
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_transport_failure_does_not_leak_api_key() {
        let client = GeminiClient::new(GeminiConfig {
            api_key: Some("SUPERSECRETKEY".to_string()),
            api_url: "http://127.0.0.1:1/v1beta".to_string(),
            model: "m".to_string(),
            ..GeminiConfig::default()
        })
        .unwrap();

        let err = client.complete("hi").await.unwrap_err();
        assert!(matches!(err, GenerationError::Upstream(_)));
        assert!(!err.to_string().contains("SUPERSECRETKEY"));

        let response = crate::error::AppError::from(err).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(!String::from_utf8_lossy(&bytes).contains("SUPERSECRETKEY"));
    }

    #[tokio::test]
    async fn test_missing_key_is_upstream_error() {
        let client = GeminiClient::new(GeminiConfig::default()).unwrap();
        let err = client.complete("hi").await.unwrap_err();
        assert!(matches!(err, GenerationError::Upstream(_)));
    }
}
