//! Gemini `generateContent` client
//!
//! Sends one user turn per request and returns the first candidate's text.

use super::{LlmConfig, TextGenerator};
use crate::error::{GemchatError, Result};
use crate::util::{sanitize_base_url, validate_api_key};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client as HttpClient, StatusCode,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for the Google Generative AI REST API
pub struct GeminiClient {
    config: LlmConfig,
    endpoint: String,
    http_client: HttpClient,
}

impl GeminiClient {
    /// Create a new client; fails on an unusable key or base URL
    pub fn new(config: LlmConfig) -> Result<Self> {
        let api_key = validate_api_key(&config.api_key).map_err(|e| {
            GemchatError::InvalidCredentials {
                reason: format!("{:#}", e),
            }
        })?;
        let base_url = sanitize_base_url(&config.base_url, "Base URL").map_err(|e| {
            GemchatError::InvalidConfig {
                message: format!("{:#}", e),
            }
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, api_key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let mut builder = HttpClient::builder()
            .default_headers(headers)
            .user_agent(concat!("gemchat/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().map_err(|e| GemchatError::InvalidConfig {
            message: format!("failed to build HTTP client: {}", e),
        })?;

        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            base_url, config.model
        );

        Ok(Self {
            config,
            endpoint,
            http_client,
        })
    }

    /// Full request URL, without credentials
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Request a single completion for `prompt`
    pub async fn generate_content(&self, prompt: &str) -> Result<GenerateContentResponse> {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        let started = Instant::now();
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| GemchatError::ConnectionFailed {
                message: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| GemchatError::MalformedResponse {
            message: format!("failed to read response body: {}", e),
        })?;
        tracing::debug!(
            "Gemini responded {} in {:?} ({} bytes)",
            status,
            started.elapsed(),
            text.len()
        );

        match status {
            StatusCode::OK => GenerateContentResponse::parse(&text),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GemchatError::Unauthorized {
                message: api_error_message(&text),
            }),
            StatusCode::TOO_MANY_REQUESTS => Err(GemchatError::RateLimitExceeded {
                message: api_error_message(&text),
            }),
            status => Err(GemchatError::ProviderError {
                status: status.as_u16(),
                message: api_error_message(&text),
            }),
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let started = Instant::now();
        let result = self.generate_content(prompt).await;

        match &result {
            Ok(response) => {
                let version = response.model_version.as_deref().unwrap_or(&self.config.model);
                let finish = response.finish_reason().unwrap_or("unknown");
                match &response.usage_metadata {
                    Some(usage) => tracing::info!(
                        "Generation completed in {:?}: model={} finish={} prompt={} reply={} total={}",
                        started.elapsed(),
                        version,
                        finish,
                        usage.prompt_token_count,
                        usage.candidates_token_count,
                        usage.total_token_count
                    ),
                    None => tracing::info!(
                        "Generation completed in {:?}: model={} finish={} (no usage data)",
                        started.elapsed(),
                        version,
                        finish
                    ),
                }
            }
            Err(e) => tracing::error!("Generation failed after {:?}: {}", started.elapsed(), e),
        }

        result.map(|response| response.reply_text())
    }
}

/// Pull `error.message` out of an API error body, or fall back to the body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .as_ref()
        .and_then(|v| v.get("error"))
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "Unknown error".to_string()
            } else {
                trimmed.to_string()
            }
        })
}

/// Decoded `generateContent` response, with the raw JSON kept for fallback
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    pub usage_metadata: Option<GeminiUsageMetadata>,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(skip)]
    raw: serde_json::Value,
}

impl GenerateContentResponse {
    /// Decode a response body
    pub fn parse(body: &str) -> Result<Self> {
        let raw: serde_json::Value =
            serde_json::from_str(body).map_err(|e| GemchatError::MalformedResponse {
                message: format!("{}. Response body: {}", e, body),
            })?;
        let mut response: GenerateContentResponse = serde_json::from_value(raw.clone())
            .map_err(|e| GemchatError::MalformedResponse {
                message: format!("{}. Response body: {}", e, body),
            })?;
        response.raw = raw;
        Ok(response)
    }

    /// Concatenated text parts of the first candidate, if any
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let texts: Vec<&str> = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();

        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }

    /// Why the first candidate stopped, e.g. `STOP` or `SAFETY`
    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates.first()?.finish_reason.as_deref()
    }

    /// Reply text, or the whole response as JSON when it carries none
    pub fn reply_text(&self) -> String {
        self.text().unwrap_or_else(|| self.raw.to_string())
    }
}

#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'a str,
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiCandidateContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiCandidateContent {
    #[serde(default)]
    pub parts: Vec<GeminiCandidatePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiCandidatePart {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiUsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
    #[serde(default)]
    pub total_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use serde_json::json;

    const PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

    fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::new(LlmConfig::new(
            server.base_url(),
            "gemini-2.5-flash",
            "test-key",
        ))
        .unwrap()
    }

    #[test]
    fn text_joins_parts_of_first_candidate() {
        let response = GenerateContentResponse::parse(
            r#"{"candidates":[
                {"content":{"role":"model","parts":[{"text":"Hel"},{"text":"lo"}]},"finishReason":"STOP"},
                {"content":{"role":"model","parts":[{"text":"ignored"}]}}
            ]}"#,
        )
        .unwrap();
        assert_eq!(response.text().as_deref(), Some("Hello"));
        assert_eq!(response.reply_text(), "Hello");
        assert_eq!(response.finish_reason(), Some("STOP"));
        assert_eq!(response.model_version, None);
    }

    #[test]
    fn reply_falls_back_to_whole_response() {
        let body = r#"{"candidates":[{"finishReason":"SAFETY"}],"modelVersion":"gemini-2.5-flash"}"#;
        let response = GenerateContentResponse::parse(body).unwrap();
        assert!(response.text().is_none());
        assert_eq!(response.finish_reason(), Some("SAFETY"));
        assert_eq!(response.model_version.as_deref(), Some("gemini-2.5-flash"));

        let fallback: serde_json::Value = serde_json::from_str(&response.reply_text()).unwrap();
        assert_eq!(fallback["candidates"][0]["finishReason"], "SAFETY");
        assert_eq!(fallback["modelVersion"], "gemini-2.5-flash");
    }

    #[test]
    fn non_json_body_is_malformed() {
        let err = GenerateContentResponse::parse("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, GemchatError::MalformedResponse { .. }));
    }

    #[test]
    fn rejects_blank_key() {
        let result = GeminiClient::new(LlmConfig::new(
            "https://generativelanguage.googleapis.com",
            "gemini-2.5-flash",
            "   ",
        ));
        assert!(matches!(result, Err(GemchatError::InvalidCredentials { .. })));
    }

    #[test]
    fn endpoint_includes_model() {
        let client = GeminiClient::new(LlmConfig::new(
            "https://generativelanguage.googleapis.com/",
            "gemini-2.5-pro",
            "k",
        ))
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-pro:generateContent"
        );
        assert_eq!(client.model(), "gemini-2.5-pro");
    }

    #[tokio::test]
    async fn generate_sends_prompt_and_returns_text() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(PATH)
                    .header("x-goog-api-key", "test-key")
                    .json_body(json!({
                        "contents": [{"role": "user", "parts": [{"text": "User: hello"}]}]
                    }));
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "candidates": [{"content": {"role": "model", "parts": [{"text": "hi!"}]}}],
                        "usageMetadata": {"promptTokenCount": 3, "candidatesTokenCount": 2, "totalTokenCount": 5}
                    }));
            })
            .await;

        let reply = client_for(&server).generate("User: hello").await.unwrap();
        mock.assert_async().await;
        assert_eq!(reply, "hi!");
    }

    #[tokio::test]
    async fn unauthorized_maps_to_unauthorized() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(401)
                    .json_body(json!({"error": {"code": 401, "message": "API key not valid."}}));
            })
            .await;

        let err = client_for(&server).generate("x").await.unwrap_err();
        match err {
            GemchatError::Unauthorized { message } => assert_eq!(message, "API key not valid."),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn quota_maps_to_rate_limit() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(429)
                    .json_body(json!({"error": {"message": "Resource has been exhausted"}}));
            })
            .await;

        let err = client_for(&server).generate("x").await.unwrap_err();
        assert!(matches!(err, GemchatError::RateLimitExceeded { .. }));
    }

    #[tokio::test]
    async fn server_error_keeps_status_and_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(503).body("upstream unavailable");
            })
            .await;

        let err = client_for(&server).generate("x").await.unwrap_err();
        match err {
            GemchatError::ProviderError { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "upstream unavailable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_server_is_connection_failure() {
        let client = GeminiClient::new(LlmConfig::new(
            "http://127.0.0.1:9",
            "gemini-2.5-flash",
            "k",
        ))
        .unwrap();
        let err = client.generate("x").await.unwrap_err();
        assert!(matches!(err, GemchatError::ConnectionFailed { .. }));
    }
}
