//! Budgeted provider wrapper for call limiting
//!
//! Wraps any `GenerationProvider` and refuses calls once a per-process limit
//! is reached. Only generation and media submission are billable; polling an
//! operation that was already paid for is not counted.

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::{debug, warn};

use crate::types::{ContentRequest, GenerationProvider, MediaOperation, MediaRequest};
use coursegen_utils::error::LlmError;

/// A wrapper around a `GenerationProvider` that enforces a budget limit.
///
/// The budget tracks attempted calls, not successful requests: a failed call
/// still consumes its slot, so retry loops cannot bypass the limit.
pub struct BudgetedProvider {
    inner: Arc<dyn GenerationProvider>,
    used: AtomicU32,
    limit: u32,
}

impl BudgetedProvider {
    pub fn new(inner: Arc<dyn GenerationProvider>, limit: u32) -> Self {
        debug!(limit, provider = inner.name(), "Creating BudgetedProvider");
        Self {
            inner,
            used: AtomicU32::new(0),
            limit,
        }
    }

    /// Calls attempted so far, including refused ones.
    pub fn call_count(&self) -> u32 {
        self.used.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
    }

    fn consume(&self) -> Result<(), LlmError> {
        let attempted = self.used.fetch_add(1, Ordering::SeqCst) + 1;
        if attempted > self.limit {
            warn!(
                limit = self.limit,
                attempted, "Provider call budget exhausted"
            );
            return Err(LlmError::BudgetExceeded {
                limit: self.limit,
                attempted,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl GenerationProvider for BudgetedProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate_json(&self, req: &ContentRequest) -> Result<String, LlmError> {
        self.consume()?;
        self.inner.generate_json(req).await
    }

    async fn submit_media(&self, req: &MediaRequest) -> Result<MediaOperation, LlmError> {
        self.consume()?;
        self.inner.submit_media(req).await
    }

    async fn poll_media(&self, op: &MediaOperation) -> Result<MediaOperation, LlmError> {
        self.inner.poll_media(op).await
    }
}
