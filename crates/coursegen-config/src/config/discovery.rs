use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use coursegen_utils::error::ConfigError;

use super::{
    CliArgs, Config, ConfigSource, Defaults, LlmConfig, MediaConfig, RetryConfig, StoreConfig,
};

/// Environment variable pointing at a directory that holds `config.toml`
pub const HOME_ENV_VAR: &str = "COURSEGEN_HOME";

const ENV_PROVIDER: &str = "COURSEGEN_PROVIDER";
const ENV_MAX_ATTEMPTS: &str = "COURSEGEN_MAX_ATTEMPTS";
const ENV_STORE_DIR: &str = "COURSEGEN_STORE_DIR";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    defaults: Option<Defaults>,
    retry: Option<RetryConfig>,
    media: Option<MediaConfig>,
    llm: Option<LlmConfig>,
    store: Option<StoreConfig>,
}

/// Overwrite `target` when `value` is set, recording where it came from.
fn apply<T>(
    target: &mut Option<T>,
    value: Option<T>,
    key: &str,
    source: &ConfigSource,
    attribution: &mut BTreeMap<String, ConfigSource>,
) {
    if let Some(v) = value {
        *target = Some(v);
        attribution.insert(key.to_string(), source.clone());
    }
}

impl Config {
    /// Discover and load configuration with precedence: CLI > env > file > defaults
    ///
    /// # Errors
    ///
    /// Fails when the working directory is unreadable, the config file cannot
    /// be parsed, or the merged configuration does not validate.
    pub fn discover(cli_args: &CliArgs) -> Result<Self> {
        let start_dir = std::env::current_dir().context("Failed to get current directory")?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Discover starting from a specific directory, reading the process environment.
    ///
    /// # Errors
    ///
    /// See [`Config::discover`].
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self> {
        Self::discover_with_env(start_dir, cli_args, |key| std::env::var(key).ok())
    }

    /// Path-and-environment driven variant used by tests to avoid process-global state.
    ///
    /// # Errors
    ///
    /// See [`Config::discover`].
    pub fn discover_with_env(
        start_dir: &Path,
        cli_args: &CliArgs,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = Config::default();
        let mut attribution = BTreeMap::new();

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    }
                    .into());
                }
                Some(explicit.clone())
            }
            None => match env(HOME_ENV_VAR) {
                Some(home) => Some(PathBuf::from(home).join("config.toml")),
                None => Self::discover_config_file_from(start_dir)?,
            },
        };

        if let Some(path) = &config_path {
            let file = Self::load_config_file(path)
                .with_context(|| format!("Failed to load config file: {}", path.display()))?;
            config.apply_file(file, &ConfigSource::ConfigFile(path.clone()), &mut attribution);
        }

        let env_source = ConfigSource::Env;
        apply(
            &mut config.llm.provider,
            env(ENV_PROVIDER),
            "provider",
            &env_source,
            &mut attribution,
        );
        if let Some(raw) = env(ENV_MAX_ATTEMPTS) {
            let parsed = raw.parse::<u32>().with_context(|| {
                format!("{ENV_MAX_ATTEMPTS} must be a positive integer, got '{raw}'")
            })?;
            apply(
                &mut config.retry.max_attempts,
                Some(parsed),
                "max_attempts",
                &env_source,
                &mut attribution,
            );
        }
        apply(
            &mut config.store.dir,
            env(ENV_STORE_DIR).map(PathBuf::from),
            "store_dir",
            &env_source,
            &mut attribution,
        );

        let cli = ConfigSource::Cli;
        apply(
            &mut config.llm.provider,
            cli_args.provider.clone(),
            "provider",
            &cli,
            &mut attribution,
        );
        apply(
            &mut config.retry.max_attempts,
            cli_args.max_attempts,
            "max_attempts",
            &cli,
            &mut attribution,
        );
        apply(
            &mut config.retry.initial_delay_ms,
            cli_args.initial_delay_ms,
            "initial_delay_ms",
            &cli,
            &mut attribution,
        );
        apply(
            &mut config.store.dir,
            cli_args.store_dir.clone(),
            "store_dir",
            &cli,
            &mut attribution,
        );
        apply(
            &mut config.defaults.language,
            cli_args.language.clone(),
            "language",
            &cli,
            &mut attribution,
        );

        config.source_attribution = attribution;
        config.validate()?;
        Ok(config)
    }

    fn apply_file(
        &mut self,
        file: TomlConfig,
        source: &ConfigSource,
        attribution: &mut BTreeMap<String, ConfigSource>,
    ) {
        if let Some(d) = file.defaults {
            apply(&mut self.defaults.language, d.language, "language", source, attribution);
            apply(&mut self.defaults.level, d.level, "level", source, attribution);
            apply(&mut self.defaults.duration, d.duration, "duration", source, attribution);
            apply(
                &mut self.defaults.include_exercises,
                d.include_exercises,
                "include_exercises",
                source,
                attribution,
            );
            apply(&mut self.defaults.owner, d.owner, "owner", source, attribution);
        }
        if let Some(r) = file.retry {
            apply(
                &mut self.retry.max_attempts,
                r.max_attempts,
                "max_attempts",
                source,
                attribution,
            );
            apply(
                &mut self.retry.initial_delay_ms,
                r.initial_delay_ms,
                "initial_delay_ms",
                source,
                attribution,
            );
        }
        if let Some(m) = file.media {
            apply(
                &mut self.media.poll_interval_secs,
                m.poll_interval_secs,
                "poll_interval_secs",
                source,
                attribution,
            );
            apply(&mut self.media.resolution, m.resolution, "resolution", source, attribution);
            apply(
                &mut self.media.aspect_ratio,
                m.aspect_ratio,
                "aspect_ratio",
                source,
                attribution,
            );
        }
        if let Some(l) = file.llm {
            apply(&mut self.llm.provider, l.provider, "provider", source, attribution);
            apply(&mut self.llm.budget, l.budget, "budget", source, attribution);
            apply(
                &mut self.llm.timeout_secs,
                l.timeout_secs,
                "timeout_secs",
                source,
                attribution,
            );
            apply(&mut self.llm.gemini, l.gemini, "gemini", source, attribution);
        }
        if let Some(s) = file.store {
            apply(&mut self.store.dir, s.dir, "store_dir", source, attribution);
        }
    }

    /// Search upward from `start_dir` for `.coursegen/config.toml`.
    ///
    /// Stops at the filesystem root or at a repository root marker.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` leaves room for permission errors.
    pub fn discover_config_file_from(start_dir: &Path) -> Result<Option<PathBuf>> {
        let mut current_dir = start_dir.to_path_buf();

        loop {
            let config_path = current_dir.join(".coursegen").join("config.toml");
            if config_path.exists() {
                return Ok(Some(config_path));
            }

            if current_dir.join(".git").exists() || current_dir.join(".hg").exists() {
                break;
            }

            match current_dir.parent() {
                Some(parent) => current_dir = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(None)
    }

    fn load_config_file(path: &Path) -> Result<TomlConfig> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).with_context(|| {
                format!("Failed to parse TOML config file: {}", path.display())
            }),
            // A missing file under COURSEGEN_HOME means "use defaults".
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TomlConfig::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }
}
