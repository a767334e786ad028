//! Course data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use coursegen_utils::error::GenerationError;

/// Lifecycle of a unit's content.
///
/// `pending → generating → completed | error`, `error → generating`.
/// Nothing returns to `pending` and `completed` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    #[default]
    Pending,
    Generating,
    Completed,
    Error,
}

impl UnitStatus {
    /// Whether a materialization request may start from this status.
    #[must_use]
    pub fn can_materialize(self) -> bool {
        matches!(self, Self::Pending | Self::Error)
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaStatus {
    #[default]
    Idle,
    Generating,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Level {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            other => Err(GenerationError::InvalidRequest(format!(
                "unknown level '{other}' (expected beginner, intermediate or advanced)"
            ))),
        }
    }
}

/// Content language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Pt,
}

impl Language {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Pt => "pt",
        }
    }

    /// Language name as written in prompts.
    #[must_use]
    pub fn instruction(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Pt => "Portuguese (Portugal)",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "pt" => Ok(Self::Pt),
            other => Err(GenerationError::InvalidRequest(format!(
                "unknown language '{other}' (expected en or pt)"
            ))),
        }
    }
}

/// Caller-supplied parameters for a new course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub topic: String,
    pub level: Level,
    /// Study time per session, free text
    pub duration: String,
    pub include_exercises: bool,
    pub language: Language,
}

impl GenerationRequest {
    /// Presence check only; the domain meaning of the fields is the provider's concern.
    ///
    /// # Errors
    ///
    /// `GenerationError::InvalidRequest` when topic or duration is blank.
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.topic.trim().is_empty() {
            return Err(GenerationError::InvalidRequest(
                "topic must not be empty".to_string(),
            ));
        }
        if self.duration.trim().is_empty() {
            return Err(GenerationError::InvalidRequest(
                "duration must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn params(&self) -> GenerationParams {
        GenerationParams {
            level: self.level,
            include_exercises: self.include_exercises,
            language: self.language,
            topic: self.topic.clone(),
            duration: self.duration.clone(),
        }
    }
}

/// The part of the originating request a course keeps for lazy unit generation.
///
/// Courses stored before this field existed load with the defaults
/// (intermediate, no exercises, English).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    pub level: Level,
    pub include_exercises: bool,
    pub language: Language,
    pub topic: String,
    pub duration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    /// HTML-flavored markup; non-empty exactly when `status` is `Completed`
    #[serde(default)]
    pub detailed_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_solution: Option<String>,
    #[serde(default)]
    pub status: UnitStatus,
    #[serde(default)]
    pub media_status: MediaStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_ref: Option<String>,
    /// Redacted message of the last failed materialization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_error: Option<String>,
}

impl Unit {
    #[must_use]
    pub fn pending(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            summary: String::new(),
            detailed_content: String::new(),
            exercise: None,
            exercise_solution: None,
            status: UnitStatus::Pending,
            media_status: MediaStatus::Idle,
            media_ref: None,
            last_error: None,
            media_error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Study sequence; length and order never change after the outline
    pub units: Vec<Unit>,
    pub estimated_duration: String,
    pub conclusion: String,
    pub owner_id: String,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub generation: GenerationParams,
}

impl Course {
    /// # Errors
    ///
    /// `GenerationError::UnitIndexOutOfRange` for an index past the end.
    pub fn unit(&self, index: usize) -> Result<&Unit, GenerationError> {
        self.units
            .get(index)
            .ok_or(GenerationError::UnitIndexOutOfRange {
                index,
                len: self.units.len(),
            })
    }

    /// # Errors
    ///
    /// `GenerationError::UnitIndexOutOfRange` for an index past the end.
    pub fn unit_mut(&mut self, index: usize) -> Result<&mut Unit, GenerationError> {
        let len = self.units.len();
        self.units
            .get_mut(index)
            .ok_or(GenerationError::UnitIndexOutOfRange { index, len })
    }

    /// Units whose content has been generated, with their indices.
    pub fn completed_units(&self) -> impl Iterator<Item = (usize, &Unit)> {
        self.units
            .iter()
            .enumerate()
            .filter(|(_, u)| u.status == UnitStatus::Completed)
    }
}

/// A course shared between tasks.
///
/// All status transitions go through [`lock_course`]; the guard is never held
/// across an `.await`.
pub type SharedCourse = Arc<Mutex<Course>>;

#[must_use]
pub fn share(course: Course) -> SharedCourse {
    Arc::new(Mutex::new(course))
}

/// Lock a shared course. A poisoned lock still yields the data: every
/// critical section leaves the course in a valid state before it can panic.
pub fn lock_course(course: &SharedCourse) -> MutexGuard<'_, Course> {
    course.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question_text: String,
    pub options: Vec<String>,
    /// Zero-based index into `options`
    pub correct_answer_index: usize,
}

/// A derived assessment; regenerated on demand and never stored with the course.
///
/// The copy shown to a learner is held in their [`CourseProgress`] until graded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

impl Quiz {
    /// Grade chosen option indices; missing answers count as wrong.
    #[must_use]
    pub fn score(&self, answers: &[usize]) -> QuizScore {
        let correct = self
            .questions
            .iter()
            .zip(answers)
            .filter(|(q, a)| q.correct_answer_index == **a)
            .count();
        QuizScore {
            score: u32::try_from(correct).unwrap_or(u32::MAX),
            total: u32::try_from(self.questions.len()).unwrap_or(u32::MAX),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizScore {
    pub score: u32,
    pub total: u32,
}

impl QuizScore {
    /// Compares by ratio, so scores from quizzes of different sizes compare fairly.
    #[must_use]
    pub fn beats(&self, other: &QuizScore) -> bool {
        u64::from(self.score) * u64::from(other.total.max(1))
            > u64::from(other.score) * u64::from(self.total.max(1))
    }
}

/// One learner's progress through one course.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseProgress {
    pub completed_units: BTreeSet<usize>,
    pub notes: BTreeMap<usize, String>,
    pub quiz_score: Option<QuizScore>,
    /// The quiz last shown to this learner, kept until it is answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_quiz: Option<Quiz>,
}

impl CourseProgress {
    /// Keep `score` if it is better than the stored one. Returns whether it was kept.
    pub fn record_score(&mut self, score: QuizScore) -> bool {
        let better = self.quiz_score.is_none_or(|best| score.beats(&best));
        if better {
            self.quiz_score = Some(score);
        }
        better
    }
}
