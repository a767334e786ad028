//! Core types for the generation provider abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::schema::Schema;
use coursegen_utils::error::LlmError;

/// A structured-text generation request.
///
/// The provider is asked to answer `prompt` with a JSON document shaped like
/// `schema`. Conformance is checked by the caller, not the provider.
#[derive(Debug, Clone)]
pub struct ContentRequest {
    /// Model to use for this request
    pub model: String,
    pub prompt: String,
    pub schema: Schema,
    /// Per-request HTTP timeout
    pub timeout: Duration,
}

impl ContentRequest {
    #[must_use]
    pub fn new(
        model: impl Into<String>,
        prompt: impl Into<String>,
        schema: Schema,
        timeout: Duration,
    ) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            schema,
            timeout,
        }
    }
}

/// A long-running video generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRequest {
    pub model: String,
    pub prompt: String,
    /// e.g. "720p"
    pub resolution: String,
    /// e.g. "16:9"
    pub aspect_ratio: String,
    pub count: u32,
}

/// Handle to a provider-side asynchronous media operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaOperation {
    /// Provider-assigned operation name, used to poll
    pub name: String,
    pub done: bool,
    /// Reference to the generated artifact, present once done and successful
    pub artifact_uri: Option<String>,
    /// Provider-reported failure of a done operation
    pub error: Option<String>,
}

impl MediaOperation {
    /// An operation that has been accepted but not finished.
    #[must_use]
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A finished operation carrying an artifact reference.
    #[must_use]
    pub fn completed(name: impl Into<String>, artifact_uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: true,
            artifact_uri: Some(artifact_uri.into()),
            error: None,
        }
    }

    /// A finished operation that the provider reports as failed.
    #[must_use]
    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: true,
            artifact_uri: None,
            error: Some(message.into()),
        }
    }
}

/// Trait for generation provider implementations
///
/// The orchestration layer depends only on this contract: a prompt in, raw
/// JSON text out, or a classified failure. Implementations never retry;
/// retrying is the job of [`crate::RetryPolicy`].
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Short provider name used in logs
    fn name(&self) -> &str;

    /// Generate a JSON document for `req`, returned as raw response text.
    ///
    /// # Errors
    ///
    /// Returns `LlmError` for transport, auth, quota, overload, outage,
    /// timeout, and budget failures.
    async fn generate_json(&self, req: &ContentRequest) -> Result<String, LlmError>;

    /// Start an asynchronous media generation.
    ///
    /// # Errors
    ///
    /// Same failure classes as [`GenerationProvider::generate_json`].
    async fn submit_media(&self, req: &MediaRequest) -> Result<MediaOperation, LlmError>;

    /// Refresh the state of a previously submitted media operation.
    ///
    /// # Errors
    ///
    /// Same failure classes as [`GenerationProvider::generate_json`].
    async fn poll_media(&self, op: &MediaOperation) -> Result<MediaOperation, LlmError>;
}
