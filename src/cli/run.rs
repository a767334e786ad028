//! CLI entry point and dispatch logic
//!
//! `run()` parses arguments, discovers configuration, installs logging,
//! builds the provider and store, and dispatches to a command. It owns all
//! error output.

use anyhow::Result;
use clap::Parser;

use super::args::{Cli, Commands};
use super::commands::{self, Session};

use crate::config::{CliArgs, Config};
use crate::engine::{CourseGenerator, Language};
use crate::error::{ConfigError, GenerationError, LlmError, UserFriendlyError};
use crate::exit_codes::ExitCode;
use crate::llm::GenerationProvider;
use crate::logging::{LogFormat, init_tracing};

/// Main CLI execution function.
///
/// Returns `Err(ExitCode)` after the error has been printed; `main` only maps
/// it to the process exit status.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    let language = match &cli.command {
        Commands::Outline { language, .. } | Commands::Ideas { language } => language.clone(),
        _ => None,
    };
    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        provider: cli.provider.clone(),
        max_attempts: cli.max_attempts,
        initial_delay_ms: cli.initial_delay_ms,
        store_dir: cli.store_dir.clone(),
        language,
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => return Err(report(&err, "config")),
    };

    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    if let Err(e) = init_tracing(cli.verbose, format) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    if matches!(cli.command, Commands::Config) {
        return commands::execute_config_command(&config).map_err(|e| report(&e, "config"));
    }

    let operation = operation_name(&cli.command);

    let provider = match crate::llm::from_config(&config) {
        Ok(provider) => provider,
        Err(err) => return Err(report(&anyhow::Error::new(err), operation)),
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("✗ Failed to create async runtime: {e}");
            return Err(ExitCode::INTERNAL);
        }
    };

    rt.block_on(dispatch(cli, &config, provider))
        .map_err(|e| report(&e, operation))
}

async fn dispatch(
    cli: Cli,
    config: &Config,
    provider: std::sync::Arc<dyn GenerationProvider>,
) -> Result<()> {
    if let Commands::Ideas { .. } = cli.command {
        let generator = CourseGenerator::from_config(provider, config);
        let language: Language = config.defaults.language().parse()?;
        return commands::execute_ideas_command(&generator, language).await;
    }

    let session = Session::open(config, provider, cli.owner)?;
    match cli.command {
        Commands::Outline {
            topic,
            level,
            duration,
            exercises,
            no_exercises,
            ..
        } => {
            let exercises = match (exercises, no_exercises) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let request = commands::build_request(config, topic, level, duration, exercises)?;
            commands::execute_outline_command(&session, request).await
        }
        Commands::Unit { course_id, index } => {
            commands::execute_unit_command(&session, &course_id, index).await
        }
        Commands::Complete { course_id, index } => {
            commands::execute_complete_command(&session, &course_id, index, false).await
        }
        Commands::Toggle { course_id, index } => {
            commands::execute_complete_command(&session, &course_id, index, true).await
        }
        Commands::Quiz { course_id } => commands::execute_quiz_command(&session, &course_id).await,
        Commands::Answer { course_id, answers } => {
            commands::execute_answer_command(&session, &course_id, &answers).await
        }
        Commands::Video { course_id, index } => {
            commands::execute_video_command(&session, &course_id, index).await
        }
        Commands::List => commands::execute_list_command(&session).await,
        Commands::Show { course_id } => commands::execute_show_command(&session, &course_id).await,
        Commands::Note {
            course_id,
            index,
            text,
        } => commands::execute_note_command(&session, &course_id, index, text).await,
        Commands::Progress { course_id } => {
            commands::execute_progress_command(&session, &course_id).await
        }
        Commands::Ideas { .. } | Commands::Config => Ok(()),
    }
}

fn operation_name(command: &Commands) -> &'static str {
    match command {
        Commands::Outline { .. } => "outline",
        Commands::Unit { .. } => "unit",
        Commands::Complete { .. } => "complete",
        Commands::Toggle { .. } => "toggle",
        Commands::Quiz { .. } => "quiz",
        Commands::Answer { .. } => "answer",
        Commands::Video { .. } => "video",
        Commands::Ideas { .. } => "ideas",
        Commands::List => "list",
        Commands::Show { .. } => "show",
        Commands::Note { .. } => "note",
        Commands::Progress { .. } => "progress",
        Commands::Config => "config",
    }
}

/// Print a user-facing report for `err` and pick the exit code.
fn report(err: &anyhow::Error, operation: &str) -> ExitCode {
    if let Some(e) = err.downcast_ref::<GenerationError>() {
        eprintln!("{}", render(e, operation));
        return e.into();
    }
    if let Some(e) = err.downcast_ref::<LlmError>() {
        eprintln!("{}", render(e, operation));
        return e.into();
    }
    if let Some(e) = err.downcast_ref::<ConfigError>() {
        eprintln!("{}", render(e, operation));
        return e.into();
    }
    eprintln!("✗ {operation} failed: {err:#}");
    if operation == "config" {
        ExitCode::CLI_ARGS
    } else {
        ExitCode::INTERNAL
    }
}

pub(crate) fn render(err: &dyn UserFriendlyError, operation: &str) -> String {
    let mut out = format!("✗ {operation} failed: {}", err.user_message());
    if let Some(context) = err.context() {
        out.push_str(&format!("\n  {context}"));
    }
    let suggestions = err.suggestions();
    if !suggestions.is_empty() {
        out.push_str("\n  Suggestions:");
        for s in suggestions {
            out.push_str(&format!("\n    • {s}"));
        }
    }
    out
}
