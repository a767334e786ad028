//! Generation provider abstraction for coursegen
//!
//! Every provider implements [`GenerationProvider`]; the engine only sees
//! that trait plus the [`RetryPolicy`] that wraps each call. Response shapes
//! are declared with [`Schema`] and checked after the fact.

mod budgeted_provider;
mod gemini_backend;
pub(crate) mod http_client;
mod retry;
pub mod schema;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

use std::sync::Arc;
use tracing::debug;

pub use budgeted_provider::BudgetedProvider;
pub use retry::{RetryPolicy, TransientPredicate};
pub use schema::{Schema, SchemaType, parse_payload};
pub use types::{ContentRequest, GenerationProvider, MediaOperation, MediaRequest};

pub use coursegen_config as config;
pub use coursegen_utils::error::{LlmError, SchemaError};

use gemini_backend::GeminiBackend;

use crate::config::Config;

/// Supported provider names
pub const PROVIDERS: &[&str] = &["gemini"];

/// Create a provider from configuration.
///
/// When `[llm] budget` is set the provider is wrapped in a
/// [`BudgetedProvider`].
///
/// # Errors
///
/// Returns `LlmError::Unsupported` for an unknown provider name and
/// `LlmError::Misconfiguration` when provider settings are incomplete
/// (for example a missing API key).
pub fn from_config(config: &Config) -> Result<Arc<dyn GenerationProvider>, LlmError> {
    let provider: Arc<dyn GenerationProvider> = match config.llm.provider() {
        "gemini" => Arc::new(GeminiBackend::new_from_config(config)?),
        unknown => {
            return Err(LlmError::Unsupported(format!(
                "Unknown LLM provider '{unknown}'. Supported providers: {}.",
                PROVIDERS.join(", ")
            )));
        }
    };

    debug!(provider = provider.name(), "Constructed generation provider");

    Ok(match config.llm.budget {
        Some(limit) => Arc::new(BudgetedProvider::new(provider, limit)),
        None => provider,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_is_unsupported() {
        let mut config = Config::minimal_for_testing();
        config.llm.provider = Some("openrouter".to_string());

        match from_config(&config) {
            Err(LlmError::Unsupported(msg)) => {
                assert!(msg.contains("openrouter"));
                assert!(msg.contains("gemini"));
            }
            Err(other) => panic!("expected Unsupported, got {other:?}"),
            Ok(_) => panic!("expected Unsupported, got a provider"),
        }
    }

    #[test]
    fn test_gemini_with_key_and_budget() {
        let key_env = "COURSEGEN_GEMINI_KEY_TEST_PRESENT";
        // SAFETY: the variable name is unique to this test.
        unsafe {
            std::env::set_var(key_env, "test-key");
        }

        let mut config = Config::minimal_for_testing();
        config.llm.budget = Some(3);
        config.llm.gemini = Some(config::GeminiConfig {
            api_key_env: Some(key_env.to_string()),
            ..Default::default()
        });

        let provider = from_config(&config).unwrap();
        assert_eq!(provider.name(), "gemini");

        unsafe {
            std::env::remove_var(key_env);
        }
    }
}
