use coursegen_utils::error::ConfigError;

use super::Config;

const KNOWN_PROVIDERS: &[&str] = &["gemini"];
const KNOWN_LEVELS: &[&str] = &["beginner", "intermediate", "advanced"];
const KNOWN_LANGUAGES: &[&str] = &["en", "pt"];

impl Config {
    /// Validate configuration values, collecting every problem found.
    ///
    /// A single problem is reported as `InvalidValue`; several as
    /// `ValidationFailed` listing all of them.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` describing every invalid value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems: Vec<(String, String)> = Vec::new();
        let mut check = |ok: bool, key: &str, msg: String| {
            if !ok {
                problems.push((key.to_string(), msg));
            }
        };

        if let Some(max_attempts) = self.retry.max_attempts {
            check(
                max_attempts > 0,
                "max_attempts",
                "must be greater than 0".to_string(),
            );
            check(
                max_attempts <= 20,
                "max_attempts",
                "exceeds maximum limit of 20".to_string(),
            );
        }

        if let Some(interval) = self.media.poll_interval_secs {
            check(
                interval > 0,
                "poll_interval_secs",
                "must be greater than 0".to_string(),
            );
        }

        if let Some(timeout) = self.llm.timeout_secs {
            check(
                timeout >= 5,
                "timeout_secs",
                "must be at least 5 seconds".to_string(),
            );
        }

        if let Some(provider) = &self.llm.provider {
            check(
                KNOWN_PROVIDERS.contains(&provider.as_str()),
                "provider",
                format!("unknown provider '{provider}'"),
            );
        }

        if let Some(level) = &self.defaults.level {
            check(
                KNOWN_LEVELS.contains(&level.as_str()),
                "level",
                format!("unknown level '{level}'"),
            );
        }

        if let Some(language) = &self.defaults.language {
            check(
                KNOWN_LANGUAGES.contains(&language.as_str()),
                "language",
                format!("unknown language '{language}'"),
            );
        }

        if let Some(duration) = &self.defaults.duration {
            check(
                !duration.trim().is_empty(),
                "duration",
                "must not be empty".to_string(),
            );
        }

        match problems.len() {
            0 => Ok(()),
            1 => {
                let (key, value) = problems.remove(0);
                Err(ConfigError::InvalidValue { key, value })
            }
            n => Err(ConfigError::ValidationFailed {
                errors: problems
                    .into_iter()
                    .map(|(key, msg)| format!("{key}: {msg}"))
                    .collect(),
                error_count: n,
            }),
        }
    }
}
