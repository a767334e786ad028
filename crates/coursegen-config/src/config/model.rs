use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default number of attempts for every provider call (first try included)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay before the first retry; doubles on each subsequent retry
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1_000;

/// Default interval between media operation status checks
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Default per-request HTTP timeout
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 300;

pub const DEFAULT_PROVIDER: &str = "gemini";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_OUTLINE_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_UNIT_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_QUIZ_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_IDEAS_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";

/// Defaults applied to generation requests when the caller leaves a field out
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    /// Content language: "en" or "pt"
    pub language: Option<String>,
    /// Proficiency level: "beginner", "intermediate" or "advanced"
    pub level: Option<String>,
    /// Study time per session, free text (e.g. "20 minutes")
    pub duration: Option<String>,
    pub include_exercises: Option<bool>,
    /// Owner id recorded on courses created from the CLI
    pub owner: Option<String>,
}

impl Defaults {
    #[must_use]
    pub fn language(&self) -> &str {
        self.language.as_deref().unwrap_or("en")
    }

    #[must_use]
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or("intermediate")
    }

    #[must_use]
    pub fn duration(&self) -> &str {
        self.duration.as_deref().unwrap_or("30 minutes")
    }

    #[must_use]
    pub fn include_exercises(&self) -> bool {
        self.include_exercises.unwrap_or(false)
    }

    #[must_use]
    pub fn owner(&self) -> &str {
        self.owner.as_deref().unwrap_or("local")
    }
}

/// Retry policy shared by every provider call site
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetryConfig {
    pub max_attempts: Option<u32>,
    pub initial_delay_ms: Option<u64>,
}

impl RetryConfig {
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS)
    }

    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms.unwrap_or(DEFAULT_INITIAL_DELAY_MS))
    }
}

/// Media (video) generation settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MediaConfig {
    pub poll_interval_secs: Option<u64>,
    pub resolution: Option<String>,
    pub aspect_ratio: Option<String>,
}

impl MediaConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.unwrap_or(DEFAULT_POLL_INTERVAL_SECS))
    }

    #[must_use]
    pub fn resolution(&self) -> &str {
        self.resolution.as_deref().unwrap_or("720p")
    }

    #[must_use]
    pub fn aspect_ratio(&self) -> &str {
        self.aspect_ratio.as_deref().unwrap_or("16:9")
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Provider name; only "gemini" is implemented
    pub provider: Option<String>,
    /// Maximum provider calls per process; unlimited when unset
    pub budget: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub gemini: Option<GeminiConfig>,
}

impl LlmConfig {
    #[must_use]
    pub fn provider(&self) -> &str {
        self.provider.as_deref().unwrap_or(DEFAULT_PROVIDER)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_LLM_TIMEOUT_SECS))
    }

    /// Gemini settings with every unset field resolved to its default
    #[must_use]
    pub fn gemini_resolved(&self) -> ResolvedGeminiConfig {
        let g = self.gemini.clone().unwrap_or_default();
        ResolvedGeminiConfig {
            base_url: g
                .base_url
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            api_key_env: g
                .api_key_env
                .unwrap_or_else(|| DEFAULT_GEMINI_API_KEY_ENV.to_string()),
            models: ModelSet {
                outline: g
                    .outline_model
                    .unwrap_or_else(|| DEFAULT_OUTLINE_MODEL.to_string()),
                unit: g.unit_model.unwrap_or_else(|| DEFAULT_UNIT_MODEL.to_string()),
                quiz: g.quiz_model.unwrap_or_else(|| DEFAULT_QUIZ_MODEL.to_string()),
                ideas: g
                    .ideas_model
                    .unwrap_or_else(|| DEFAULT_IDEAS_MODEL.to_string()),
                video: g
                    .video_model
                    .unwrap_or_else(|| DEFAULT_VIDEO_MODEL.to_string()),
            },
        }
    }
}

/// Gemini REST API configuration as written in the file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct GeminiConfig {
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    pub outline_model: Option<String>,
    pub unit_model: Option<String>,
    pub quiz_model: Option<String>,
    pub ideas_model: Option<String>,
    pub video_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGeminiConfig {
    pub base_url: String,
    pub api_key_env: String,
    pub models: ModelSet,
}

/// Model used for each kind of generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSet {
    pub outline: String,
    pub unit: String,
    pub quiz: String,
    pub ideas: String,
    pub video: String,
}

impl Default for ModelSet {
    fn default() -> Self {
        LlmConfig::default().gemini_resolved().models
    }
}

/// Course store location
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StoreConfig {
    pub dir: Option<PathBuf>,
}

impl StoreConfig {
    /// Store directory: configured value, else the platform data dir, else
    /// `.coursegen/store` under the working directory.
    #[must_use]
    pub fn dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|d| d.join("coursegen"))
                .unwrap_or_else(|| PathBuf::from(".coursegen").join("store"))
        })
    }
}
