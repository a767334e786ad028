//! The generation front door.
//!
//! [`CourseGenerator`] owns the provider handle, the single retry policy and
//! the model choices. The operations themselves live in `outline`,
//! `materializer`, `quiz`, `media` and `ideas` as separate `impl` blocks.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use coursegen_config::{Config, ModelSet};
use coursegen_llm::{
    ContentRequest, GenerationProvider, MediaOperation, MediaRequest, RetryPolicy, Schema,
    parse_payload,
};
use coursegen_utils::error::{GenerationError, LlmError, SchemaError};

/// How video generations are requested and polled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSettings {
    pub poll_interval: Duration,
    pub resolution: String,
    pub aspect_ratio: String,
}

impl Default for MediaSettings {
    fn default() -> Self {
        let config = coursegen_config::MediaConfig::default();
        Self {
            poll_interval: config.poll_interval(),
            resolution: config.resolution().to_string(),
            aspect_ratio: config.aspect_ratio().to_string(),
        }
    }
}

#[derive(Clone)]
pub struct CourseGenerator {
    provider: Arc<dyn GenerationProvider>,
    pub(crate) retry: RetryPolicy,
    pub(crate) models: ModelSet,
    pub(crate) request_timeout: Duration,
    pub(crate) media: MediaSettings,
}

impl CourseGenerator {
    /// Generator with built-in defaults for retry, models and media.
    #[must_use]
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self::from_config(provider, &Config::default())
    }

    #[must_use]
    pub fn from_config(provider: Arc<dyn GenerationProvider>, config: &Config) -> Self {
        Self {
            provider,
            retry: RetryPolicy::from_config(&config.retry),
            models: config.llm.gemini_resolved().models,
            request_timeout: config.llm.timeout(),
            media: MediaSettings {
                poll_interval: config.media.poll_interval(),
                resolution: config.media.resolution().to_string(),
                aspect_ratio: config.media.aspect_ratio().to_string(),
            },
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_media(mut self, media: MediaSettings) -> Self {
        self.media = media;
        self
    }

    #[must_use]
    pub fn with_models(mut self, models: ModelSet) -> Self {
        self.models = models;
        self
    }

    pub fn provider(&self) -> &Arc<dyn GenerationProvider> {
        &self.provider
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// One retried provider call, parsed and validated against `schema`.
    pub(crate) async fn generate<T: DeserializeOwned>(
        &self,
        label: &str,
        model: &str,
        prompt: String,
        schema: Schema,
    ) -> Result<T, GenerationError> {
        let request = ContentRequest::new(model, prompt, schema, self.request_timeout);
        let raw = self
            .retry
            .run(label, || self.provider.generate_json(&request))
            .await?;

        let value = parse_payload(&raw)?;
        request.schema.validate(&value)?;
        serde_json::from_value(value)
            .map_err(|e| GenerationError::Schema(SchemaError::InvalidJson(e.to_string())))
    }

    pub(crate) async fn submit_media(
        &self,
        request: &MediaRequest,
    ) -> Result<MediaOperation, LlmError> {
        self.retry
            .run("media_submit", || self.provider.submit_media(request))
            .await
    }

    pub(crate) async fn refresh_media(
        &self,
        operation: &MediaOperation,
    ) -> Result<MediaOperation, LlmError> {
        self.retry
            .run("media_poll", || self.provider.poll_media(operation))
            .await
    }
}
