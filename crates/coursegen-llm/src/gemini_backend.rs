//! Gemini REST backend
//!
//! Text generation goes through `models/{model}:generateContent` with a JSON
//! response schema. Video generation is a long-running operation started with
//! `models/{model}:predictLongRunning` and polled by operation name.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

use crate::http_client::HttpClient;
use crate::types::{ContentRequest, GenerationProvider, MediaOperation, MediaRequest};
use coursegen_config::Config;
use coursegen_utils::error::LlmError;

const PROVIDER: &str = "gemini";

/// JSON pointer to the artifact of a finished video operation
const VIDEO_URI_POINTER: &str = "/generateVideoResponse/generatedSamples/0/video/uri";

#[derive(Clone)]
pub(crate) struct GeminiBackend {
    client: HttpClient,
    base_url: String,
    api_key: String,
    /// Timeout for media submit/poll calls, which carry no per-request timeout
    media_timeout: Duration,
}

impl GeminiBackend {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the HTTP client cannot be constructed
    pub fn new(api_key: String, base_url: &str, media_timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: HttpClient::new()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            media_timeout,
        })
    }

    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the API key environment
    /// variable is unset or empty.
    pub fn new_from_config(config: &Config) -> Result<Self, LlmError> {
        let resolved = config.llm.gemini_resolved();

        let api_key = std::env::var(&resolved.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                LlmError::Misconfiguration(format!(
                    "Gemini API key not found in environment variable '{}'. \
                     Please set this variable or configure a different api_key_env in [llm.gemini].",
                    resolved.api_key_env
                ))
            })?;

        Self::new(api_key, &resolved.base_url, config.llm.timeout())
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{model}:{method}", self.base_url)
    }

    fn operation_url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name.trim_start_matches('/'))
    }
}

#[async_trait]
impl GenerationProvider for GeminiBackend {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn generate_json(&self, req: &ContentRequest) -> Result<String, LlmError> {
        debug!(
            provider = PROVIDER,
            model = %req.model,
            prompt_chars = req.prompt.len(),
            "Invoking Gemini generateContent"
        );

        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: &req.prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: req.schema.to_json(),
            },
        };

        let request = self
            .client
            .inner()
            .post(self.model_url(&req.model, "generateContent"))
            .header("x-goog-api-key", &self.api_key)
            .json(&body);

        let response = self.client.execute(request, req.timeout, PROVIDER).await?;
        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            LlmError::Transport(format!("Failed to parse Gemini response: {e}"))
        })?;

        let text = parsed.text();
        debug!(
            provider = PROVIDER,
            response_chars = text.len(),
            "Gemini generateContent completed"
        );
        Ok(text)
    }

    async fn submit_media(&self, req: &MediaRequest) -> Result<MediaOperation, LlmError> {
        debug!(
            provider = PROVIDER,
            model = %req.model,
            resolution = %req.resolution,
            aspect_ratio = %req.aspect_ratio,
            "Submitting Gemini video operation"
        );

        let body = json!({
            "instances": [{ "prompt": req.prompt }],
            "parameters": {
                "aspectRatio": req.aspect_ratio,
                "resolution": req.resolution,
                "sampleCount": req.count,
            }
        });

        let request = self
            .client
            .inner()
            .post(self.model_url(&req.model, "predictLongRunning"))
            .header("x-goog-api-key", &self.api_key)
            .json(&body);

        let response = self
            .client
            .execute(request, self.media_timeout, PROVIDER)
            .await?;
        let raw: OperationResponse = response.json().await.map_err(|e| {
            LlmError::Transport(format!("Failed to parse Gemini operation: {e}"))
        })?;
        Ok(raw.into_operation())
    }

    async fn poll_media(&self, op: &MediaOperation) -> Result<MediaOperation, LlmError> {
        let request = self
            .client
            .inner()
            .get(self.operation_url(&op.name))
            .header("x-goog-api-key", &self.api_key);

        let response = self
            .client
            .execute(request, self.media_timeout, PROVIDER)
            .await?;
        let raw: OperationResponse = response.json().await.map_err(|e| {
            LlmError::Transport(format!("Failed to parse Gemini operation: {e}"))
        })?;

        let refreshed = raw.into_operation();
        debug!(
            provider = PROVIDER,
            operation = %refreshed.name,
            done = refreshed.done,
            "Polled Gemini video operation"
        );
        Ok(refreshed)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate; empty when the
    /// provider returned no candidate or no text.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OperationResponse {
    name: String,
    #[serde(default)]
    done: bool,
    error: Option<OperationError>,
    response: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    code: Option<i64>,
    message: Option<String>,
}

impl OperationResponse {
    fn into_operation(self) -> MediaOperation {
        let artifact_uri = self
            .response
            .as_ref()
            .and_then(|r| r.pointer(VIDEO_URI_POINTER))
            .and_then(Value::as_str)
            .map(str::to_string);

        let error = self.error.map(|e| match (e.code, e.message) {
            (Some(code), Some(message)) => format!("{message} (code {code})"),
            (None, Some(message)) => message,
            (Some(code), None) => format!("operation failed with code {code}"),
            (None, None) => "operation failed".to_string(),
        });

        MediaOperation {
            name: self.name,
            done: self.done,
            artifact_uri,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> GeminiBackend {
        GeminiBackend::new(
            "test-key".to_string(),
            "https://example.test/v1beta/",
            Duration::from_secs(30),
        )
        .unwrap()
    }

    #[test]
    fn test_urls() {
        let b = backend();
        assert_eq!(
            b.model_url("gemini-2.5-flash", "generateContent"),
            "https://example.test/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(
            b.operation_url("models/veo/operations/abc"),
            "https://example.test/v1beta/models/veo/operations/abc"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let schema = crate::Schema::object().field("topics", crate::Schema::string());
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: "hello" }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema.to_json(),
            },
        };
        let wire = serde_json::to_value(&body).unwrap();

        assert_eq!(wire["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(
            wire["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(wire["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn test_text_joins_parts_of_first_candidate() {
        let parsed: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"parts": [{"text": "```json\n{\"a\":"}, {"text": "1}\n```"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }))
        .unwrap();

        assert_eq!(parsed.text(), "```json\n{\"a\":1}\n```");
    }

    #[test]
    fn test_text_is_empty_without_candidates() {
        let blocked: GenerateContentResponse =
            serde_json::from_value(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap();
        assert_eq!(blocked.text(), "");

        let no_content: GenerateContentResponse =
            serde_json::from_value(json!({"candidates": [{"finishReason": "SAFETY"}]})).unwrap();
        assert_eq!(no_content.text(), "");
    }

    #[test]
    fn test_pending_operation() {
        let raw: OperationResponse =
            serde_json::from_value(json!({"name": "models/veo/operations/1"})).unwrap();
        assert_eq!(
            raw.into_operation(),
            MediaOperation::pending("models/veo/operations/1")
        );
    }

    #[test]
    fn test_finished_operation_with_video() {
        let raw: OperationResponse = serde_json::from_value(json!({
            "name": "op",
            "done": true,
            "response": {"generateVideoResponse": {"generatedSamples": [
                {"video": {"uri": "https://files.example.test/v.mp4"}}
            ]}}
        }))
        .unwrap();

        assert_eq!(
            raw.into_operation(),
            MediaOperation::completed("op", "https://files.example.test/v.mp4")
        );
    }

    #[test]
    fn test_finished_operation_without_samples() {
        let raw: OperationResponse = serde_json::from_value(json!({
            "name": "op",
            "done": true,
            "response": {"generateVideoResponse": {"raiMediaFilteredCount": 1}}
        }))
        .unwrap();

        let op = raw.into_operation();
        assert!(op.done);
        assert_eq!(op.artifact_uri, None);
        assert_eq!(op.error, None);
    }

    #[test]
    fn test_failed_operation_error_message() {
        let raw: OperationResponse = serde_json::from_value(json!({
            "name": "op",
            "done": true,
            "error": {"code": 3, "message": "prompt rejected"}
        }))
        .unwrap();

        assert_eq!(
            raw.into_operation().error.as_deref(),
            Some("prompt rejected (code 3)")
        );
    }

    #[test]
    fn test_new_from_config_missing_api_key() {
        let test_env_var = "COURSEGEN_GEMINI_KEY_TEST_MISSING";
        // SAFETY: the variable name is unique to this test.
        unsafe {
            std::env::remove_var(test_env_var);
        }

        let mut config = Config::minimal_for_testing();
        config.llm.gemini = Some(coursegen_config::GeminiConfig {
            api_key_env: Some(test_env_var.to_string()),
            ..Default::default()
        });

        match GeminiBackend::new_from_config(&config) {
            Err(LlmError::Misconfiguration(msg)) => assert!(msg.contains(test_env_var)),
            Err(other) => panic!("expected Misconfiguration, got {other:?}"),
            Ok(_) => panic!("expected Misconfiguration, got a backend"),
        }
    }
}
