//! Course generation pipeline.
//!
//! [`CourseGenerator`] turns a [`GenerationRequest`] into a [`Course`] outline,
//! fills units in lazily, derives quizzes and video summaries, and suggests
//! topics. [`Coordinator`] sequences those calls against a [`CourseStore`].

// Re-export shared crates so callers need only this one.
pub use coursegen_config as config;
pub use coursegen_llm as llm;

pub use coursegen_utils::error;
pub use coursegen_utils::exit_codes;
pub use coursegen_utils::logging;

pub mod coordinator;
mod generator;
mod ideas;
pub mod materializer;
mod media;
pub mod model;
mod outline;
pub mod progress;
pub mod prompts;
mod quiz;
pub mod store;

pub use coordinator::Coordinator;
pub use generator::{CourseGenerator, MediaSettings};
pub use materializer::MaterializeOutcome;
pub use model::{
    Course, CourseProgress, GenerationParams, GenerationRequest, Language, Level, MediaStatus,
    Quiz, QuizQuestion, QuizScore, SharedCourse, Unit, UnitStatus, lock_course, share,
};
pub use progress::{NoProgress, ProgressSink, STAGE_OUTLINE};
pub use store::{CourseStore, JsonFileStore, MemoryStore};
