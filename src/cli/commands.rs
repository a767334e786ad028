//! Command implementations.
//!
//! Every command prints one JSON document to stdout. Progress and logs go to
//! stderr.

use anyhow::{Context as _, Result};
use camino::Utf8PathBuf;
use serde::Serialize;
use std::sync::Arc;

use crate::config::Config;
use crate::engine::{
    Coordinator, CourseGenerator, GenerationRequest, JsonFileStore, Language, Level, ProgressSink,
    QuizScore,
};
use crate::llm::GenerationProvider;

/// Prints stage labels on stderr while a long call runs.
struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn stage(&self, label: &str) {
        eprintln!("… {label}");
    }
}

/// Everything a provider-backed command needs.
pub(crate) struct Session {
    pub coordinator: Coordinator<JsonFileStore>,
    pub owner: String,
}

impl Session {
    pub fn open(
        config: &Config,
        provider: Arc<dyn GenerationProvider>,
        owner: Option<String>,
    ) -> Result<Self> {
        let dir = config.store.dir();
        let root = Utf8PathBuf::from_path_buf(dir)
            .map_err(|p| anyhow::anyhow!("Store directory is not valid UTF-8: {}", p.display()))?;
        let generator = CourseGenerator::from_config(provider, config);

        Ok(Self {
            coordinator: Coordinator::new(generator, JsonFileStore::new(root)),
            owner: owner.unwrap_or_else(|| config.defaults.owner().to_string()),
        })
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{text}");
    Ok(())
}

pub(crate) fn build_request(
    config: &Config,
    topic: String,
    level: Option<String>,
    duration: Option<String>,
    exercises: Option<bool>,
) -> Result<GenerationRequest> {
    let level: Level = level.as_deref().unwrap_or(config.defaults.level()).parse()?;
    let language: Language = config.defaults.language().parse()?;
    Ok(GenerationRequest {
        topic,
        level,
        duration: duration.unwrap_or_else(|| config.defaults.duration().to_string()),
        include_exercises: exercises.unwrap_or_else(|| config.defaults.include_exercises()),
        language,
    })
}

pub(crate) async fn execute_outline_command(
    session: &Session,
    request: GenerationRequest,
) -> Result<()> {
    let course = session
        .coordinator
        .create_course(&request, &session.owner, &StderrProgress)
        .await?;
    print_json(&course)
}

pub(crate) async fn execute_unit_command(
    session: &Session,
    course_id: &str,
    index: usize,
) -> Result<()> {
    let unit = session.coordinator.open_unit(course_id, index).await?;
    print_json(&unit)
}

pub(crate) async fn execute_complete_command(
    session: &Session,
    course_id: &str,
    index: usize,
    toggle: bool,
) -> Result<()> {
    let progress = if toggle {
        session
            .coordinator
            .toggle_unit_completion(&session.owner, course_id, index)
            .await?
    } else {
        session
            .coordinator
            .complete_unit(&session.owner, course_id, index)
            .await?
    };
    print_json(&progress)
}

pub(crate) async fn execute_quiz_command(session: &Session, course_id: &str) -> Result<()> {
    let quiz = session
        .coordinator
        .open_quiz(&session.owner, course_id)
        .await?;
    print_json(&quiz)
}

#[derive(Serialize)]
struct AnswerOutput {
    score: QuizScore,
    #[serde(skip_serializing_if = "Option::is_none")]
    best: Option<QuizScore>,
}

pub(crate) async fn execute_answer_command(
    session: &Session,
    course_id: &str,
    answers: &[usize],
) -> Result<()> {
    let (score, progress) = session
        .coordinator
        .grade_quiz(&session.owner, course_id, answers)
        .await?;
    print_json(&AnswerOutput {
        score,
        best: progress.quiz_score,
    })
}

#[derive(Serialize)]
struct VideoOutput<'a> {
    course_id: &'a str,
    index: usize,
    media_ref: String,
}

pub(crate) async fn execute_video_command(
    session: &Session,
    course_id: &str,
    index: usize,
) -> Result<()> {
    let media_ref = session.coordinator.generate_media(course_id, index).await?;
    print_json(&VideoOutput {
        course_id,
        index,
        media_ref,
    })
}

pub(crate) async fn execute_ideas_command(
    generator: &CourseGenerator,
    language: Language,
) -> Result<()> {
    let ideas = generator.suggest_topics(language).await?;
    print_json(&ideas)
}

pub(crate) async fn execute_list_command(session: &Session) -> Result<()> {
    let courses = session.coordinator.courses_for_owner(&session.owner).await?;
    print_json(&courses)
}

pub(crate) async fn execute_show_command(session: &Session, course_id: &str) -> Result<()> {
    let course = session.coordinator.course(course_id).await?;
    print_json(&course)
}

pub(crate) async fn execute_note_command(
    session: &Session,
    course_id: &str,
    index: usize,
    text: Option<String>,
) -> Result<()> {
    match text {
        Some(text) => {
            let progress = session
                .coordinator
                .save_note(&session.owner, course_id, index, &text)
                .await?;
            print_json(&progress)
        }
        None => {
            let note = session
                .coordinator
                .note(&session.owner, course_id, index)
                .await?;
            print_json(&note)
        }
    }
}

pub(crate) async fn execute_progress_command(session: &Session, course_id: &str) -> Result<()> {
    let progress = session
        .coordinator
        .progress(&session.owner, course_id)
        .await?;
    print_json(&progress)
}

#[derive(Serialize)]
struct ConfigEntry {
    value: String,
    source: String,
}

pub(crate) fn execute_config_command(config: &Config) -> Result<()> {
    let entries: std::collections::BTreeMap<String, ConfigEntry> = config
        .effective_config()
        .into_iter()
        .map(|(key, (value, source))| (key, ConfigEntry { value, source }))
        .collect();
    print_json(&entries)
}
