//! Logging and observability infrastructure for coursegen
//!
//! Structured logging through `tracing`. Library crates only emit events and
//! spans; the CLI installs the subscriber once via [`init_tracing`].

use std::time::Duration;
use tracing::{Level, info, span, warn};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Output format for the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable compact lines
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `coursegen=debug` in verbose mode
/// and `coursegen=info` by default. Logs go to stderr so stdout stays clean
/// for JSON command output.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(verbose: bool, format: LogFormat) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            if verbose {
                EnvFilter::try_new("coursegen=debug,info")
            } else {
                EnvFilter::try_new("coursegen=info,warn")
            }
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_current_span(true)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .try_init()?;
        }
        LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(verbose)
                        .with_thread_ids(false)
                        .with_line_number(false)
                        .with_file(false)
                        .compact(),
                )
                .try_init()?;
        }
    }

    Ok(())
}

/// Span wrapping all work on one course.
pub fn course_span(course_id: &str, operation: &'static str) -> tracing::Span {
    span!(
        Level::INFO,
        "course",
        course_id = %course_id,
        operation = operation,
    )
}

/// Log a stage boundary with its duration.
pub fn log_stage_complete(stage: &str, elapsed: Duration) {
    info!(
        stage = %stage,
        duration_ms = elapsed.as_millis() as u64,
        "Generation stage completed"
    );
}

/// Log a failure that was converted into entity state rather than raised.
pub fn log_absorbed_failure(entity: &str, index: usize, error: &str) {
    warn!(
        entity = %entity,
        unit_index = index,
        error = %error,
        "Generation failed; recorded as error status"
    );
}
