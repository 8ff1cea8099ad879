//! Google Gemini provider implementation
//!
//! Talks to the `models/{model}:generateContent` REST endpoint with API-key
//! authentication. Only the non-streaming call is used.

use super::*;
use crate::error::{self, Result};
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Gemini provider
pub struct GeminiProvider {
    client: Client,
    config: ProviderConfig,
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| {
            error::provider_unavailable(format!("failed to create HTTP client: {}", e))
                .with_operation("gemini::new")
                .set_source(e)
        })?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url(), model)
    }

    fn build_request(request: &CompletionRequest) -> GeminiRequest {
        let contents = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| GeminiContent {
                role: Some("user".into()),
                parts: vec![GeminiPart::text(m.content.clone())],
            })
            .collect();

        let system_instruction = request.system_instruction().map(|text| GeminiContent {
            role: None,
            parts: vec![GeminiPart::text(text)],
        });

        let generation_config = request
            .temperature
            .map(|temperature| GenerationConfig { temperature });

        GeminiRequest {
            contents,
            system_instruction,
            generation_config,
        }
    }
}

impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        self.config.default_model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    async fn complete(&self, request: CompletionRequest) -> std::result::Result<CompletionResponse, ProviderError> {
        let model = request.model.as_deref().unwrap_or(self.default_model()).to_string();
        let api_request = Self::build_request(&request);

        if api_request.contents.is_empty() {
            return Err(ProviderError::InvalidRequest("request has no user content".into()));
        }

        debug!(
            model = %model,
            temperature = ?request.temperature,
            messages = request.messages.len(),
            "sending generateContent request"
        );

        let mut req = self.client.post(self.endpoint(&model)).json(&api_request);

        if let Some(api_key) = &self.config.api_key {
            if !api_key.is_empty() {
                req = req.header("x-goog-api-key", api_key);
            }
        }

        let response = req.send().await.map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let text = response.text().await.unwrap_or_default();
            warn!(status, model = %model, "generateContent returned an error status");

            return Err(match status {
                401 | 403 => ProviderError::AuthenticationFailed,
                429 => ProviderError::RateLimited { retry_after },
                _ => ProviderError::Api {
                    status,
                    message: extract_error_message(&text),
                },
            });
        }

        let api_response: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let candidate = api_response.candidates.first();

        let content = candidate
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .filter(|p| !p.thought.unwrap_or(false))
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .filter(|text| !text.is_empty());

        let finish_reason = match candidate.and_then(|c| c.finish_reason.as_deref()) {
            Some("STOP") => FinishReason::Stop,
            Some("MAX_TOKENS") => FinishReason::Length,
            Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT") => {
                FinishReason::Safety
            }
            _ => FinishReason::Unknown,
        };

        let usage = api_response
            .usage_metadata
            .map(|u| Usage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            })
            .unwrap_or_default();

        debug!(
            model = %model,
            finish_reason = ?finish_reason,
            total_tokens = usage.total_tokens,
            has_content = content.is_some(),
            "generateContent completed"
        );

        Ok(CompletionResponse {
            model: api_response.model_version.unwrap_or(model),
            content,
            finish_reason,
            usage,
        })
    }
}

/// Pull `error.message` out of a Gemini error body, falling back to the raw text.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<GeminiErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.to_string())
}

// ============================================================================
// Gemini API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

impl GeminiPart {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            thought: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
    #[serde(default)]
    total_token_count: usize,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENDPOINT: &str = "/models/gemini-2.5-flash:generateContent";

    fn provider_for(server: &MockServer) -> GeminiProvider {
        GeminiProvider::new(ProviderConfig::gemini("test-key").with_base_url(server.uri())).unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new(vec![
            ChatMessage::system("You are TerraForge"),
            ChatMessage::user("Create an S3 bucket"),
        ])
        .with_temperature(0.2)
    }

    #[test]
    fn test_request_body_shape() {
        // go through text so f32 temperatures compare the way the wire sees them
        let text = serde_json::to_string(&GeminiProvider::build_request(&request())).unwrap();
        let body: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Create an S3 bucket" }] }],
                "systemInstruction": { "parts": [{ "text": "You are TerraForge" }] },
                "generationConfig": { "temperature": 0.2 }
            })
        );
    }

    #[test]
    fn test_extract_error_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(extract_error_message(body), "API key not valid");
        assert_eq!(extract_error_message("upstream exploded"), "upstream exploded");
    }

    #[tokio::test]
    async fn test_complete_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(json!({
                "contents": [{ "parts": [{ "text": "Create an S3 bucket" }] }],
                "generationConfig": { "temperature": 0.2 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [
                            { "text": "thinking...", "thought": true },
                            { "text": "resource \"aws_s3_bucket\" " },
                            { "text": "\"this\" {}" }
                        ]
                    },
                    "finishReason": "STOP"
                }],
                "usageMetadata": {
                    "promptTokenCount": 12,
                    "candidatesTokenCount": 8,
                    "totalTokenCount": 20
                },
                "modelVersion": "gemini-2.5-flash-001"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider_for(&server).complete(request()).await.unwrap();
        assert_eq!(response.content.as_deref(), Some("resource \"aws_s3_bucket\" \"this\" {}"));
        assert_eq!(response.finish_reason, FinishReason::Stop);
        assert_eq!(response.model, "gemini-2.5-flash-001");
        assert_eq!(response.usage.total_tokens, 20);
    }

    #[tokio::test]
    async fn test_complete_without_candidates_has_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .mount(&server)
            .await;

        let response = provider_for(&server).complete(request()).await.unwrap();
        assert_eq!(response.content, None);
        assert_eq!(response.model, "gemini-2.5-flash");
    }

    #[tokio::test]
    async fn test_complete_maps_error_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/rate-limited:generateContent"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "12"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/models/forbidden:generateContent"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/models/broken:generateContent"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": { "code": 500, "message": "internal failure", "status": "INTERNAL" }
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server);

        let err = provider.complete(request().with_model("rate-limited")).await.unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { retry_after: Some(12) }));

        let err = provider.complete(request().with_model("forbidden")).await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed));

        let err = provider.complete(request().with_model("broken")).await.unwrap_err();
        match err {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "internal failure");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_rejects_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = provider_for(&server).complete(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }

    #[tokio::test]
    async fn test_complete_network_failure() {
        let provider = GeminiProvider::new(
            ProviderConfig::gemini("test-key").with_base_url("http://127.0.0.1:1"),
        )
        .unwrap();

        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
    }

    #[tokio::test]
    async fn test_complete_requires_user_content() {
        let server = MockServer::start().await;
        let err = provider_for(&server)
            .complete(CompletionRequest::new(vec![ChatMessage::system("only a persona")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));
    }
}
