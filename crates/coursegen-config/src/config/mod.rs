mod discovery;
mod model;
mod validation;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

pub use discovery::HOME_ENV_VAR;
pub use model::*;

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value provided via CLI argument (highest precedence).
    Cli,
    /// Value read from a `COURSEGEN_*` environment variable.
    Env,
    /// Value loaded from configuration file.
    ConfigFile(PathBuf),
    /// Built-in default value (lowest precedence).
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "cli"),
            Self::Env => write!(f, "env"),
            Self::ConfigFile(path) => write!(f, "config ({})", path.display()),
            Self::Defaults => write!(f, "default"),
        }
    }
}

/// Overrides supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    /// Explicit configuration file, bypassing discovery
    pub config_path: Option<PathBuf>,
    pub provider: Option<String>,
    pub max_attempts: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub store_dir: Option<PathBuf>,
    pub language: Option<String>,
}

/// Configuration for coursegen operations.
///
/// Built by [`Config::discover`] with precedence CLI > environment > file >
/// defaults. Every setting that was explicitly provided records its
/// [`ConfigSource`] in `source_attribution`.
///
/// # Configuration File Format
///
/// ```toml
/// [defaults]
/// language = "en"
/// level = "beginner"
/// duration = "20 minutes"
/// include_exercises = true
///
/// [retry]
/// max_attempts = 5
/// initial_delay_ms = 1000
///
/// [media]
/// poll_interval_secs = 10
///
/// [llm]
/// provider = "gemini"
/// budget = 40
///
/// [llm.gemini]
/// api_key_env = "GEMINI_API_KEY"
///
/// [store]
/// dir = "/var/lib/coursegen"
/// ```
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub defaults: Defaults,
    pub retry: RetryConfig,
    pub media: MediaConfig,
    pub llm: LlmConfig,
    pub store: StoreConfig,
    /// Source attribution for each explicitly provided setting.
    pub source_attribution: BTreeMap<String, ConfigSource>,
}

impl Config {
    /// Configuration with built-in defaults only, independent of the environment.
    #[must_use]
    pub fn minimal_for_testing() -> Self {
        Self::default()
    }

    /// Effective configuration as `key -> (value, source)` for display.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let mut out = BTreeMap::new();
        let mut add = |key: &str, value: String| {
            let source = self
                .source_attribution
                .get(key)
                .unwrap_or(&ConfigSource::Defaults)
                .to_string();
            out.insert(key.to_string(), (value, source));
        };

        add("language", self.defaults.language().to_string());
        add("level", self.defaults.level().to_string());
        add("duration", self.defaults.duration().to_string());
        add(
            "include_exercises",
            self.defaults.include_exercises().to_string(),
        );
        add("owner", self.defaults.owner().to_string());
        add("max_attempts", self.retry.max_attempts().to_string());
        add(
            "initial_delay_ms",
            self.retry.initial_delay().as_millis().to_string(),
        );
        add(
            "poll_interval_secs",
            self.media.poll_interval().as_secs().to_string(),
        );
        add("provider", self.llm.provider().to_string());
        add(
            "budget",
            self.llm
                .budget
                .map_or_else(|| "unlimited".to_string(), |b| b.to_string()),
        );
        add("timeout_secs", self.llm.timeout().as_secs().to_string());
        add("store_dir", self.store.dir().display().to_string());

        out
    }
}

#[cfg(test)]
mod tests;
