//! Scripted provider for tests.
//!
//! Enabled in this crate's own tests and, for downstream crates, through the
//! `test-utils` feature.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::types::{ContentRequest, GenerationProvider, MediaOperation, MediaRequest};
use coursegen_utils::error::LlmError;

/// A provider that replays queued responses in order and counts calls.
///
/// Text responses and media operations have separate queues; submit and
/// poll share the media queue. An exhausted queue answers with the fallback
/// text when one is set, otherwise with a `Transport` error.
#[derive(Default)]
pub struct ScriptedProvider {
    text: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback_text: Option<String>,
    media: Mutex<VecDeque<Result<MediaOperation, LlmError>>>,
    latency: Option<Duration>,
    text_calls: AtomicU32,
    media_submits: AtomicU32,
    media_polls: AtomicU32,
    prompts: Mutex<Vec<String>>,
    media_requests: Mutex<Vec<MediaRequest>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.push_text(text);
        self
    }

    #[must_use]
    pub fn with_text_error(self, err: LlmError) -> Self {
        lock(&self.text).push_back(Err(err));
        self
    }

    /// Text returned once the queue is empty, for open-ended test runs.
    #[must_use]
    pub fn with_fallback_text(mut self, text: impl Into<String>) -> Self {
        self.fallback_text = Some(text.into());
        self
    }

    #[must_use]
    pub fn with_media(self, op: MediaOperation) -> Self {
        lock(&self.media).push_back(Ok(op));
        self
    }

    #[must_use]
    pub fn with_media_error(self, err: LlmError) -> Self {
        lock(&self.media).push_back(Err(err));
        self
    }

    /// Delay every call by `latency`, so concurrent callers overlap.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a text response on a provider that is already shared.
    pub fn push_text(&self, text: impl Into<String>) {
        lock(&self.text).push_back(Ok(text.into()));
    }

    pub fn text_calls(&self) -> u32 {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn media_submits(&self) -> u32 {
        self.media_submits.load(Ordering::SeqCst)
    }

    pub fn media_polls(&self) -> u32 {
        self.media_polls.load(Ordering::SeqCst)
    }

    /// Prompts received by `generate_json`, in call order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    pub fn media_requests(&self) -> Vec<MediaRequest> {
        lock(&self.media_requests).clone()
    }

    async fn pause(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn next_media(&self) -> Result<MediaOperation, LlmError> {
        lock(&self.media)
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Transport("media script exhausted".to_string())))
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate_json(&self, req: &ContentRequest) -> Result<String, LlmError> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.prompts).push(req.prompt.clone());
        self.pause().await;

        let next = lock(&self.text).pop_front();
        match (next, &self.fallback_text) {
            (Some(scripted), _) => scripted,
            (None, Some(fallback)) => Ok(fallback.clone()),
            (None, None) => Err(LlmError::Transport("text script exhausted".to_string())),
        }
    }

    async fn submit_media(&self, req: &MediaRequest) -> Result<MediaOperation, LlmError> {
        self.media_submits.fetch_add(1, Ordering::SeqCst);
        lock(&self.media_requests).push(req.clone());
        self.pause().await;
        self.next_media()
    }

    async fn poll_media(&self, _op: &MediaOperation) -> Result<MediaOperation, LlmError> {
        self.media_polls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.next_media()
    }
}
