//! CLI argument definitions and parsing structures

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// coursegen - generate structured courses with an LLM provider
#[derive(Parser)]
#[command(name = "coursegen")]
#[command(about = "Generate courses, lazily filled units, quizzes, and video summaries")]
#[command(long_about = r#"
coursegen turns a topic into a course outline, generates each unit's content
the first time it is opened, and derives quizzes and short video summaries
from what has been studied.

EXAMPLES:
  # Outline a new course (the first unit is generated right away)
  coursegen outline "Intro to Baking" --level beginner --duration "20 minutes" --exercises

  # Open unit 2 of a course, generating it if needed
  coursegen unit <course-id> 2

  # Mark unit 2 as studied; unit 3 is prefetched
  coursegen complete <course-id> 2

  # Quiz over the studied units, then answer the quiz that was shown
  coursegen quiz <course-id>
  coursegen answer <course-id> 0,2,1,3,0

  # Show the effective configuration and where each value came from
  coursegen config

CONFIGURATION:
  Precedence: CLI flags > COURSEGEN_* environment > config file > defaults
  The config file is found by searching upward from CWD for .coursegen/config.toml
  Unit indices are zero-based
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Generation provider (gemini)
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Maximum attempts per provider call, including the first
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Delay before the first retry, in milliseconds; doubles per retry
    #[arg(long, global = true)]
    pub initial_delay_ms: Option<u64>,

    /// Directory of the JSON course store
    #[arg(long, global = true)]
    pub store_dir: Option<PathBuf>,

    /// Owner id for courses and progress (default from config)
    #[arg(long, global = true)]
    pub owner: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a course outline and generate its first unit
    Outline {
        /// Course topic
        topic: String,

        /// Proficiency level: beginner, intermediate or advanced
        #[arg(long)]
        level: Option<String>,

        /// Study time per session, e.g. "20 minutes"
        #[arg(long)]
        duration: Option<String>,

        /// Include an exercise and solution in every unit
        #[arg(long, overrides_with = "no_exercises")]
        exercises: bool,

        /// Leave exercises out even when the config enables them
        #[arg(long, overrides_with = "exercises")]
        no_exercises: bool,

        /// Content language: en or pt
        #[arg(long)]
        language: Option<String>,
    },

    /// Open a unit, generating its content if it is pending or failed
    Unit {
        course_id: String,
        index: usize,
    },

    /// Mark a generated unit as studied and prefetch the next one
    Complete {
        course_id: String,
        index: usize,
    },

    /// Flip the studied mark of a unit
    Toggle {
        course_id: String,
        index: usize,
    },

    /// Generate a quiz over the studied units and keep it open for answering
    Quiz { course_id: String },

    /// Grade answers to the open quiz and record the score
    Answer {
        course_id: String,

        /// Comma-separated chosen option indices, one per question
        #[arg(value_delimiter = ',', required = true)]
        answers: Vec<usize>,
    },

    /// Generate a short video summary for a unit
    Video {
        course_id: String,
        index: usize,
    },

    /// Suggest course topics
    Ideas {
        /// Content language: en or pt
        #[arg(long)]
        language: Option<String>,
    },

    /// List the owner's courses, newest first
    List,

    /// Print a stored course
    Show { course_id: String },

    /// Read or write the note on a unit; an empty text removes it
    Note {
        course_id: String,
        index: usize,
        text: Option<String>,
    },

    /// Print the owner's progress through a course
    Progress { course_id: String },

    /// Print the effective configuration with value sources
    Config,
}

/// Build the clap command, for help and completion generation.
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}
