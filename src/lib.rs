//! coursegen - course generation with an LLM provider
//!
//! A topic becomes a course outline with every unit `pending`. Units are
//! generated the first time they are opened (and the next one is prefetched
//! when a unit is completed), quizzes are derived from the completed units,
//! and short video summaries run as provider-side long operations.
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! export GEMINI_API_KEY=...
//! coursegen outline "Intro to Baking" --level beginner --exercises
//! coursegen unit <course-id> 1
//! coursegen quiz <course-id>
//! ```
//!
//! # Library
//!
//! ```no_run
//! use coursegen::engine::{Coordinator, CourseGenerator, GenerationRequest, Language, Level, MemoryStore, NoProgress};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = coursegen::config::Config::default();
//! let provider = coursegen::llm::from_config(&config)?;
//! let coordinator = Coordinator::new(CourseGenerator::from_config(provider, &config), MemoryStore::new());
//!
//! let request = GenerationRequest {
//!     topic: "Intro to Baking".to_string(),
//!     level: Level::Beginner,
//!     duration: "20 minutes".to_string(),
//!     include_exercises: true,
//!     language: Language::En,
//! };
//! let course = coordinator.create_course(&request, "me", &NoProgress).await?;
//! let unit = coordinator.open_unit(&course.id, 1).await?;
//! # let _ = unit;
//! # Ok(())
//! # }
//! ```

pub use coursegen_config as config;
pub use coursegen_engine as engine;
pub use coursegen_llm as llm;

pub use coursegen_utils::error;
pub use coursegen_utils::exit_codes;
pub use coursegen_utils::logging;

pub use coursegen_config::{CliArgs, Config};
pub use coursegen_engine::{Coordinator, Course, CourseGenerator, GenerationRequest, Quiz, Unit};
pub use coursegen_utils::error::GenerationError;
pub use coursegen_utils::exit_codes::ExitCode;

pub mod cli;
