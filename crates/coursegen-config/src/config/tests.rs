use super::*;
use anyhow::Result;
use coursegen_utils::error::ConfigError;
use serial_test::serial;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn create_config_file(dir: &Path, content: &str) -> PathBuf {
    let config_dir = dir.join(".coursegen");
    fs::create_dir_all(&config_dir).unwrap();
    let config_path = config_dir.join("config.toml");
    fs::write(&config_path, content).unwrap();
    config_path
}

fn no_env(_: &str) -> Option<String> {
    None
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_default_config() {
    let config = Config::minimal_for_testing();

    assert_eq!(config.defaults.language(), "en");
    assert_eq!(config.defaults.level(), "intermediate");
    assert!(!config.defaults.include_exercises());
    assert_eq!(config.retry.max_attempts(), DEFAULT_MAX_ATTEMPTS);
    assert_eq!(config.retry.initial_delay().as_millis(), 1_000);
    assert_eq!(config.media.poll_interval().as_secs(), 10);
    assert_eq!(config.media.resolution(), "720p");
    assert_eq!(config.media.aspect_ratio(), "16:9");
    assert_eq!(config.llm.provider(), "gemini");
    assert!(config.source_attribution.is_empty());
}

#[test]
fn test_resolved_models_default_to_known_models() {
    let resolved = LlmConfig::default().gemini_resolved();

    assert_eq!(resolved.base_url, DEFAULT_GEMINI_BASE_URL);
    assert_eq!(resolved.api_key_env, "GEMINI_API_KEY");
    assert_eq!(resolved.models.outline, "gemini-2.5-flash");
    assert_eq!(resolved.models.video, "veo-3.1-fast-generate-preview");
}

#[test]
fn test_file_values_are_loaded_and_attributed() -> Result<()> {
    let temp_dir = TempDir::new()?;
    fs::create_dir_all(temp_dir.path().join(".git"))?;
    let config_path = create_config_file(
        temp_dir.path(),
        r#"
[defaults]
language = "pt"
level = "beginner"
include_exercises = true

[retry]
max_attempts = 3

[llm.gemini]
unit_model = "gemini-2.5-pro"
"#,
    );

    let config = Config::discover_with_env(temp_dir.path(), &CliArgs::default(), no_env)?;

    assert_eq!(config.defaults.language(), "pt");
    assert_eq!(config.defaults.level(), "beginner");
    assert!(config.defaults.include_exercises());
    assert_eq!(config.retry.max_attempts(), 3);
    assert_eq!(config.llm.gemini_resolved().models.unit, "gemini-2.5-pro");
    assert_eq!(
        config.source_attribution.get("max_attempts"),
        Some(&ConfigSource::ConfigFile(config_path))
    );
    assert!(!config.source_attribution.contains_key("poll_interval_secs"));
    Ok(())
}

#[test]
fn test_upward_discovery_finds_parent_config() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    fs::create_dir_all(root.join(".git"))?;
    create_config_file(root, "[media]\npoll_interval_secs = 2\n");

    let nested = root.join("lessons").join("drafts");
    fs::create_dir_all(&nested)?;

    let found = Config::discover_config_file_from(&nested)?;
    assert_eq!(found, Some(root.join(".coursegen").join("config.toml")));

    let config = Config::discover_with_env(&nested, &CliArgs::default(), no_env)?;
    assert_eq!(config.media.poll_interval().as_secs(), 2);
    Ok(())
}

#[test]
fn test_upward_discovery_stops_at_repository_root() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let outer = temp_dir.path();
    create_config_file(outer, "[retry]\nmax_attempts = 2\n");

    let repo = outer.join("repo");
    fs::create_dir_all(repo.join(".git"))?;

    assert_eq!(Config::discover_config_file_from(&repo)?, None);
    Ok(())
}

#[test]
fn test_precedence_cli_over_env_over_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    fs::create_dir_all(temp_dir.path().join(".git"))?;
    create_config_file(
        temp_dir.path(),
        "[retry]\nmax_attempts = 2\n\n[store]\ndir = \"/from/file\"\n",
    );

    let env = env_from(&[
        ("COURSEGEN_MAX_ATTEMPTS", "4"),
        ("COURSEGEN_STORE_DIR", "/from/env"),
    ]);

    let config = Config::discover_with_env(temp_dir.path(), &CliArgs::default(), &env)?;
    assert_eq!(config.retry.max_attempts(), 4);
    assert_eq!(config.store.dir(), PathBuf::from("/from/env"));
    assert_eq!(
        config.source_attribution.get("max_attempts"),
        Some(&ConfigSource::Env)
    );

    let cli_args = CliArgs {
        max_attempts: Some(7),
        ..Default::default()
    };
    let config = Config::discover_with_env(temp_dir.path(), &cli_args, &env)?;
    assert_eq!(config.retry.max_attempts(), 7);
    assert_eq!(config.store.dir(), PathBuf::from("/from/env"));
    assert_eq!(
        config.source_attribution.get("max_attempts"),
        Some(&ConfigSource::Cli)
    );
    Ok(())
}

#[test]
fn test_non_numeric_env_attempts_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join(".git")).unwrap();
    let env = env_from(&[("COURSEGEN_MAX_ATTEMPTS", "many")]);

    let err = Config::discover_with_env(temp_dir.path(), &CliArgs::default(), env).unwrap_err();
    assert!(err.to_string().contains("COURSEGEN_MAX_ATTEMPTS"));
}

#[test]
fn test_explicit_missing_config_path_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let cli_args = CliArgs {
        config_path: Some(temp_dir.path().join("absent.toml")),
        ..Default::default()
    };

    let err = Config::discover_with_env(temp_dir.path(), &cli_args, no_env).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::NotFound { .. })
    ));
}

#[test]
fn test_unknown_fields_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join(".git")).unwrap();
    create_config_file(temp_dir.path(), "[phases]\nrequirements = true\n");

    let result = Config::discover_with_env(temp_dir.path(), &CliArgs::default(), no_env);
    assert!(result.is_err());
}

#[test]
fn test_invalid_toml_syntax_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join(".git")).unwrap();
    create_config_file(temp_dir.path(), "[retry\nmax_attempts = ");

    let err =
        Config::discover_with_env(temp_dir.path(), &CliArgs::default(), no_env).unwrap_err();
    assert!(format!("{err:#}").contains("Failed to load config file"));
}

#[test]
fn test_empty_file_uses_defaults() -> Result<()> {
    let temp_dir = TempDir::new()?;
    fs::create_dir_all(temp_dir.path().join(".git"))?;
    create_config_file(temp_dir.path(), "# nothing configured yet\n");

    let config = Config::discover_with_env(temp_dir.path(), &CliArgs::default(), no_env)?;
    assert_eq!(config.retry.max_attempts(), DEFAULT_MAX_ATTEMPTS);
    assert!(config.source_attribution.is_empty());
    Ok(())
}

#[test]
fn test_validation_single_problem_is_invalid_value() {
    let mut config = Config::minimal_for_testing();
    config.retry.max_attempts = Some(0);

    match config.validate() {
        Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "max_attempts"),
        other => panic!("expected InvalidValue, got {other:?}"),
    }
}

#[test]
fn test_validation_collects_every_problem() {
    let mut config = Config::minimal_for_testing();
    config.media.poll_interval_secs = Some(0);
    config.llm.provider = Some("openrouter".to_string());
    config.defaults.language = Some("fr".to_string());
    config.defaults.level = Some("expert".to_string());

    match config.validate() {
        Err(ConfigError::ValidationFailed {
            errors,
            error_count,
        }) => {
            assert_eq!(error_count, 4);
            assert!(errors.iter().any(|e| e.starts_with("provider:")));
            assert!(errors.iter().any(|e| e.contains("'fr'")));
        }
        other => panic!("expected ValidationFailed, got {other:?}"),
    }
}

#[test]
fn test_validation_accepts_supported_values() {
    let mut config = Config::minimal_for_testing();
    config.defaults.language = Some("pt".to_string());
    config.defaults.level = Some("advanced".to_string());
    config.retry.max_attempts = Some(1);

    assert!(config.validate().is_ok());
}

#[test]
fn test_effective_config_reports_sources() -> Result<()> {
    let temp_dir = TempDir::new()?;
    fs::create_dir_all(temp_dir.path().join(".git"))?;
    let cli_args = CliArgs {
        language: Some("pt".to_string()),
        ..Default::default()
    };

    let config = Config::discover_with_env(temp_dir.path(), &cli_args, no_env)?;
    let effective = config.effective_config();

    assert_eq!(
        effective.get("language"),
        Some(&("pt".to_string(), "cli".to_string()))
    );
    assert_eq!(
        effective.get("provider"),
        Some(&("gemini".to_string(), "default".to_string()))
    );
    assert_eq!(
        effective.get("budget").map(|(v, _)| v.as_str()),
        Some("unlimited")
    );
    Ok(())
}

#[test]
#[serial]
fn test_home_env_var_overrides_discovery() -> Result<()> {
    let home = TempDir::new()?;
    fs::write(
        home.path().join("config.toml"),
        "[defaults]\nowner = \"studio\"\n",
    )?;

    let workdir = TempDir::new()?;
    fs::create_dir_all(workdir.path().join(".git"))?;
    create_config_file(workdir.path(), "[defaults]\nowner = \"ignored\"\n");

    // SAFETY: serialized with other environment-mutating tests.
    unsafe { std::env::set_var(discovery::HOME_ENV_VAR, home.path()) };
    let result = Config::discover_from(workdir.path(), &CliArgs::default());
    unsafe { std::env::remove_var(discovery::HOME_ENV_VAR) };

    let config = result?;
    assert_eq!(config.defaults.owner(), "studio");
    Ok(())
}
