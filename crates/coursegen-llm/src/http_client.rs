//! Shared HTTP client for HTTP-based providers
//!
//! One `reqwest::Client` is configured per backend and reused for every call.
//! Unlike a general-purpose client this one never retries: failures are
//! classified into `LlmError` variants and handed to the caller's
//! `RetryPolicy`, which owns the retry decision.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::debug;

use coursegen_utils::error::LlmError;
use coursegen_utils::redaction::redact_error_message;

/// Default connect timeout (30 seconds)
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest slice of an error body carried into an error message
const MAX_BODY_IN_ERROR: usize = 300;

#[derive(Clone)]
pub(crate) struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn new() -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| LlmError::Misconfiguration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Execute a request once, mapping non-success statuses to `LlmError`.
    ///
    /// # Errors
    ///
    /// - `LlmError::Timeout` when `timeout` elapses
    /// - `LlmError::Transport` for network failures
    /// - any variant produced by [`classify_status`] for non-2xx responses
    pub async fn execute(
        &self,
        request: RequestBuilder,
        timeout: Duration,
        provider_name: &str,
    ) -> Result<Response, LlmError> {
        debug!(
            provider = provider_name,
            timeout_secs = timeout.as_secs(),
            "Executing HTTP request"
        );

        let response = request.timeout(timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout { duration: timeout }
            } else {
                LlmError::Transport(format!(
                    "{provider_name} request failed: {}",
                    redact_error_message(&e.to_string())
                ))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body, provider_name))
    }
}

/// Map an unsuccessful HTTP status and its body to an `LlmError`.
///
/// - 401/403 → `ProviderAuth`
/// - 503, or a body mentioning "overloaded" / "UNAVAILABLE" → `ProviderOverloaded`
/// - 429 → `ProviderQuota`
/// - other 5xx → `ProviderOutage`
/// - other 4xx → `Transport`
pub(crate) fn classify_status(status: StatusCode, body: &str, provider_name: &str) -> LlmError {
    let detail = truncate(&redact_error_message(body.trim()), MAX_BODY_IN_ERROR);
    let message = if detail.is_empty() {
        format!("{provider_name} returned {status}")
    } else {
        format!("{provider_name} returned {status}: {detail}")
    };

    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return LlmError::ProviderAuth(message);
    }
    if status == StatusCode::SERVICE_UNAVAILABLE || is_overload_body(body) {
        return LlmError::ProviderOverloaded(message);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return LlmError::ProviderQuota(message);
    }
    if status.is_server_error() {
        return LlmError::ProviderOutage(message);
    }
    LlmError::Transport(message)
}

fn is_overload_body(body: &str) -> bool {
    body.to_ascii_lowercase().contains("overloaded") || body.contains("UNAVAILABLE")
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
