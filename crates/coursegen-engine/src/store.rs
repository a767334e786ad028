//! Course and progress persistence.
//!
//! Courses are keyed by id; progress by `(owner, course)`. Stores never hold
//! a [`SharedCourse`](crate::model::SharedCourse): callers snapshot the course
//! and hand over an owned value.

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use coursegen_utils::atomic_write::write_file_atomic;
use coursegen_utils::error::GenerationError;

use crate::model::{Course, CourseProgress};

#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Insert or replace a course.
    async fn upsert_course(&self, course: &Course) -> Result<(), GenerationError>;

    async fn course(&self, course_id: &str) -> Result<Option<Course>, GenerationError>;

    /// An owner's courses, newest first.
    async fn courses_by_owner(&self, owner_id: &str) -> Result<Vec<Course>, GenerationError>;

    /// Stored progress, or the empty default when none exists.
    async fn progress(
        &self,
        owner_id: &str,
        course_id: &str,
    ) -> Result<CourseProgress, GenerationError>;

    async fn upsert_progress(
        &self,
        owner_id: &str,
        course_id: &str,
        progress: &CourseProgress,
    ) -> Result<(), GenerationError>;
}

fn newest_first(courses: &mut [Course]) {
    courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Process-local store, used by tests and one-shot runs.
#[derive(Default)]
pub struct MemoryStore {
    courses: RwLock<HashMap<String, Course>>,
    progress: RwLock<HashMap<(String, String), CourseProgress>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CourseStore for MemoryStore {
    async fn upsert_course(&self, course: &Course) -> Result<(), GenerationError> {
        self.courses
            .write()
            .await
            .insert(course.id.clone(), course.clone());
        Ok(())
    }

    async fn course(&self, course_id: &str) -> Result<Option<Course>, GenerationError> {
        Ok(self.courses.read().await.get(course_id).cloned())
    }

    async fn courses_by_owner(&self, owner_id: &str) -> Result<Vec<Course>, GenerationError> {
        let mut courses: Vec<Course> = self
            .courses
            .read()
            .await
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        newest_first(&mut courses);
        Ok(courses)
    }

    async fn progress(
        &self,
        owner_id: &str,
        course_id: &str,
    ) -> Result<CourseProgress, GenerationError> {
        Ok(self
            .progress
            .read()
            .await
            .get(&(owner_id.to_string(), course_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert_progress(
        &self,
        owner_id: &str,
        course_id: &str,
        progress: &CourseProgress,
    ) -> Result<(), GenerationError> {
        self.progress
            .write()
            .await
            .insert((owner_id.to_string(), course_id.to_string()), progress.clone());
        Ok(())
    }
}

/// One JSON document per course and per progress record under a root directory.
///
/// ```text
/// <root>/courses/<course_id>.json
/// <root>/progress/<owner_id>/<course_id>.json
/// ```
///
/// Writes are atomic (temp file, fsync, rename). Filesystem work runs on the
/// blocking pool.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: Utf8PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn course_path(&self, course_id: &str) -> Result<Utf8PathBuf, GenerationError> {
        check_key("course id", course_id)?;
        Ok(self.root.join("courses").join(format!("{course_id}.json")))
    }

    fn progress_path(&self, owner_id: &str, course_id: &str) -> Result<Utf8PathBuf, GenerationError> {
        check_key("owner id", owner_id)?;
        check_key("course id", course_id)?;
        Ok(self
            .root
            .join("progress")
            .join(owner_id)
            .join(format!("{course_id}.json")))
    }
}

/// Ids become file names, so only a conservative character set is accepted.
fn check_key(what: &str, key: &str) -> Result<(), GenerationError> {
    let valid = !key.is_empty()
        && key.len() <= 128
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(GenerationError::InvalidRequest(format!(
            "{what} '{key}' contains unsupported characters"
        )))
    }
}

fn store_err(context: &str, err: impl std::fmt::Display) -> GenerationError {
    GenerationError::Store(format!("{context}: {err}"))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Utf8Path) -> Result<Option<T>, GenerationError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(store_err(&format!("failed to read {path}"), e)),
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| store_err(&format!("failed to parse {path}"), e))
}

fn write_json<T: serde::Serialize>(path: &Utf8Path, value: &T) -> Result<(), GenerationError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| store_err(&format!("failed to serialize {path}"), e))?;
    write_file_atomic(path, &text).map_err(|e| store_err("write failed", format!("{e:#}")))
}

async fn blocking<T, F>(f: F) -> Result<T, GenerationError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, GenerationError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| store_err("store task failed", e))?
}

#[async_trait]
impl CourseStore for JsonFileStore {
    async fn upsert_course(&self, course: &Course) -> Result<(), GenerationError> {
        let path = self.course_path(&course.id)?;
        let course = course.clone();
        debug!(path = %path, "Writing course");
        blocking(move || write_json(&path, &course)).await
    }

    async fn course(&self, course_id: &str) -> Result<Option<Course>, GenerationError> {
        let path = self.course_path(course_id)?;
        blocking(move || read_json(&path)).await
    }

    async fn courses_by_owner(&self, owner_id: &str) -> Result<Vec<Course>, GenerationError> {
        let dir = self.root.join("courses");
        let owner_id = owner_id.to_string();
        blocking(move || {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(store_err(&format!("failed to list {dir}"), e)),
            };

            let mut courses = Vec::new();
            for entry in entries {
                let entry = entry.map_err(|e| store_err(&format!("failed to list {dir}"), e))?;
                let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
                    continue;
                };
                if path.extension() != Some("json") {
                    continue;
                }
                // One unreadable document must not hide every other course.
                match read_json::<Course>(&path) {
                    Ok(Some(course)) if course.owner_id == owner_id => courses.push(course),
                    Ok(_) => {}
                    Err(err) => warn!(path = %path, error = %err, "Skipping unreadable course"),
                }
            }
            newest_first(&mut courses);
            Ok(courses)
        })
        .await
    }

    async fn progress(
        &self,
        owner_id: &str,
        course_id: &str,
    ) -> Result<CourseProgress, GenerationError> {
        let path = self.progress_path(owner_id, course_id)?;
        blocking(move || read_json(&path).map(Option::unwrap_or_default)).await
    }

    async fn upsert_progress(
        &self,
        owner_id: &str,
        course_id: &str,
        progress: &CourseProgress,
    ) -> Result<(), GenerationError> {
        let path = self.progress_path(owner_id, course_id)?;
        let progress = progress.clone();
        blocking(move || write_json(&path, &progress)).await
    }
}
