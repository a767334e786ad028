//! Caller-facing sequencing of the generation pipeline with persistence.
//!
//! The coordinator keeps one [`SharedCourse`] per course id it has touched,
//! so concurrent requests against the same course contend on the same lock
//! and the materializer's single-flight guarantee holds across them. Every
//! mutation is followed by an upsert of a snapshot.
//!
//! That map is a per-process cache: once a course is tracked, the store is
//! not re-read for it until [`Coordinator::release`] drops it. Long-lived
//! callers release courses they are done with.
//!
//! Store writes are serialized per course, and progress read-modify-write
//! cycles per `(owner, course)`, so concurrent callers never overwrite each
//! other with stale records.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use coursegen_utils::error::GenerationError;

use crate::generator::CourseGenerator;
use crate::materializer::MaterializeOutcome;
use crate::model::{
    Course, CourseProgress, GenerationRequest, MediaStatus, Quiz, QuizScore, SharedCourse, Unit,
    UnitStatus, lock_course, share,
};
use crate::progress::ProgressSink;
use crate::store::CourseStore;

const INTERRUPTED: &str = "generation was interrupted before it finished";

type KeyedLocks<K> = Mutex<HashMap<K, Arc<AsyncMutex<()>>>>;

pub struct Coordinator<S: CourseStore> {
    generator: CourseGenerator,
    store: S,
    live: Mutex<HashMap<String, SharedCourse>>,
    course_writes: KeyedLocks<String>,
    progress_updates: KeyedLocks<(String, String)>,
}

impl<S: CourseStore> Coordinator<S> {
    pub fn new(generator: CourseGenerator, store: S) -> Self {
        Self {
            generator,
            store,
            live: Mutex::new(HashMap::new()),
            course_writes: Mutex::new(HashMap::new()),
            progress_updates: Mutex::new(HashMap::new()),
        }
    }

    pub fn generator(&self) -> &CourseGenerator {
        &self.generator
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Outline a new course, store it, then materialize its first unit.
    ///
    /// A failure of the first unit is recorded on the unit; the course is
    /// still returned.
    ///
    /// # Errors
    ///
    /// Any outline failure, or a store failure.
    pub async fn create_course(
        &self,
        request: &GenerationRequest,
        owner_id: &str,
        progress: &dyn ProgressSink,
    ) -> Result<Course, GenerationError> {
        let course = self
            .generator
            .synthesize_outline(request, owner_id, progress)
            .await?;
        self.store.upsert_course(&course).await?;
        info!(course_id = %course.id, owner = %owner_id, "Course created");

        let shared = self.track(share(course));
        if let MaterializeOutcome::Failed(err) =
            self.generator.materialize_unit(&shared, 0, None).await?
        {
            debug!(error = %err, "First unit failed; course kept");
        }
        self.persist(&shared).await
    }

    /// The stored course, including in-flight state of this process.
    ///
    /// # Errors
    ///
    /// `CourseNotFound` or a store failure.
    pub async fn course(&self, course_id: &str) -> Result<Course, GenerationError> {
        let shared = self.load(course_id).await?;
        Ok(lock_course(&shared).clone())
    }

    /// Materialize a unit if it still needs content and return it.
    ///
    /// # Errors
    ///
    /// `CourseNotFound`, `UnitIndexOutOfRange`, or a store failure.
    pub async fn open_unit(&self, course_id: &str, index: usize) -> Result<Unit, GenerationError> {
        let shared = self.load(course_id).await?;
        let outcome = self.generator.materialize_unit(&shared, index, None).await?;
        if outcome.changed_course() {
            self.persist(&shared).await?;
        }
        Ok(lock_course(&shared).unit(index)?.clone())
    }

    /// Mark a materialized unit as studied and prefetch the next one.
    ///
    /// # Errors
    ///
    /// `UnitNotCompleted` when the unit has no content yet, plus the lookup
    /// and store failures of [`Self::open_unit`].
    pub async fn complete_unit(
        &self,
        owner_id: &str,
        course_id: &str,
        index: usize,
    ) -> Result<CourseProgress, GenerationError> {
        let shared = self.load(course_id).await?;
        require_completed(&shared, index)?;

        let (progress, _) = self
            .update_progress(owner_id, course_id, |p| {
                p.completed_units.insert(index);
                Ok(())
            })
            .await?;

        if let Some(outcome) = self.generator.materialize_adjacent(&shared, index).await? {
            if let MaterializeOutcome::Failed(err) = &outcome {
                warn!(course_id = %course_id, unit_index = index + 1, error = %err, "Prefetch failed");
            }
            self.persist(&shared).await?;
        }
        Ok(progress)
    }

    /// Flip a unit's studied mark. Marking goes through [`Self::complete_unit`].
    ///
    /// # Errors
    ///
    /// As [`Self::complete_unit`].
    pub async fn toggle_unit_completion(
        &self,
        owner_id: &str,
        course_id: &str,
        index: usize,
    ) -> Result<CourseProgress, GenerationError> {
        let (progress, unmarked) = self
            .update_progress(owner_id, course_id, |p| Ok(p.completed_units.remove(&index)))
            .await?;
        if unmarked {
            Ok(progress)
        } else {
            self.complete_unit(owner_id, course_id, index).await
        }
    }

    /// Store a note for a unit; blank text removes it.
    ///
    /// # Errors
    ///
    /// `CourseNotFound`, `UnitIndexOutOfRange`, or a store failure.
    pub async fn save_note(
        &self,
        owner_id: &str,
        course_id: &str,
        index: usize,
        text: &str,
    ) -> Result<CourseProgress, GenerationError> {
        let shared = self.load(course_id).await?;
        lock_course(&shared).unit(index)?;

        let (progress, _) = self
            .update_progress(owner_id, course_id, |p| {
                if text.trim().is_empty() {
                    p.notes.remove(&index);
                } else {
                    p.notes.insert(index, text.to_string());
                }
                Ok(())
            })
            .await?;
        Ok(progress)
    }

    pub async fn note(
        &self,
        owner_id: &str,
        course_id: &str,
        index: usize,
    ) -> Result<Option<String>, GenerationError> {
        let progress = self.store.progress(owner_id, course_id).await?;
        Ok(progress.notes.get(&index).cloned())
    }

    pub async fn progress(
        &self,
        owner_id: &str,
        course_id: &str,
    ) -> Result<CourseProgress, GenerationError> {
        self.store.progress(owner_id, course_id).await
    }

    /// Generate a quiz over the course's completed units.
    ///
    /// # Errors
    ///
    /// `NoCompletedUnits`, `CourseNotFound`, or a generation failure.
    pub async fn assess(&self, course_id: &str) -> Result<Quiz, GenerationError> {
        let course = self.course(course_id).await?;
        self.generator.synthesize_quiz(&course).await
    }

    /// Generate a quiz and hold it as the owner's open quiz, replacing any
    /// earlier one that was never answered.
    ///
    /// # Errors
    ///
    /// As [`Self::assess`], or a store failure.
    pub async fn open_quiz(&self, owner_id: &str, course_id: &str) -> Result<Quiz, GenerationError> {
        let quiz = self.assess(course_id).await?;
        self.update_progress(owner_id, course_id, |p| {
            p.pending_quiz = Some(quiz.clone());
            Ok(())
        })
        .await?;
        Ok(quiz)
    }

    /// Grade `answers` against the owner's open quiz, record the score, and
    /// close the quiz.
    ///
    /// # Errors
    ///
    /// `NoQuizToGrade` when no quiz was opened since the last grading, or a
    /// store failure.
    pub async fn grade_quiz(
        &self,
        owner_id: &str,
        course_id: &str,
        answers: &[usize],
    ) -> Result<(QuizScore, CourseProgress), GenerationError> {
        let (progress, (score, best)) = self
            .update_progress(owner_id, course_id, |p| {
                let quiz = p
                    .pending_quiz
                    .take()
                    .ok_or_else(|| GenerationError::NoQuizToGrade {
                        course_id: course_id.to_string(),
                    })?;
                let score = quiz.score(answers);
                Ok((score, p.record_score(score)))
            })
            .await?;
        if best {
            info!(course_id = %course_id, score = score.score, total = score.total, "New best quiz score");
        }
        Ok((score, progress))
    }

    /// Keep `score` when it beats the stored best.
    ///
    /// # Errors
    ///
    /// Store failures only.
    pub async fn record_quiz_score(
        &self,
        owner_id: &str,
        course_id: &str,
        score: QuizScore,
    ) -> Result<CourseProgress, GenerationError> {
        let (progress, best) = self
            .update_progress(owner_id, course_id, |p| Ok(p.record_score(score)))
            .await?;
        if best {
            info!(course_id = %course_id, score = score.score, total = score.total, "New best quiz score");
        }
        Ok(progress)
    }

    /// Generate a video for a unit and store the outcome, success or failure.
    ///
    /// # Errors
    ///
    /// Any error of `CourseGenerator::poll_media_for_course_unit`, or a store
    /// failure.
    pub async fn generate_media(
        &self,
        course_id: &str,
        index: usize,
    ) -> Result<String, GenerationError> {
        let shared = self.load(course_id).await?;
        let result = self
            .generator
            .poll_media_for_course_unit(&shared, index)
            .await;

        match &result {
            Err(
                GenerationError::UnitIndexOutOfRange { .. }
                | GenerationError::UnitNotCompleted { .. }
                | GenerationError::MediaAlreadyInFlight { .. },
            ) => {}
            _ => {
                self.persist(&shared).await?;
            }
        }
        result
    }

    /// # Errors
    ///
    /// Store failures only.
    pub async fn courses_for_owner(&self, owner_id: &str) -> Result<Vec<Course>, GenerationError> {
        self.store.courses_by_owner(owner_id).await
    }

    /// Drop the cached state of a course so the next call re-reads the store.
    ///
    /// Returns `false`, keeping the cache entry, while an operation on the
    /// course is still running.
    pub fn release(&self, course_id: &str) -> bool {
        let mut live = self.live();
        if live
            .get(course_id)
            .is_some_and(|shared| Arc::strong_count(shared) > 1)
        {
            return false;
        }
        live.remove(course_id);
        drop(live);

        prune(&self.course_writes, |id| id == course_id);
        prune(&self.progress_updates, |(_, id)| id == course_id);
        true
    }

    fn live(&self) -> std::sync::MutexGuard<'_, HashMap<String, SharedCourse>> {
        self.live.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a course, keeping an already-tracked instance if one exists.
    fn track(&self, course: SharedCourse) -> SharedCourse {
        let id = lock_course(&course).id.clone();
        Arc::clone(self.live().entry(id).or_insert(course))
    }

    async fn load(&self, course_id: &str) -> Result<SharedCourse, GenerationError> {
        let tracked = self.live().get(course_id).cloned();
        if let Some(shared) = tracked {
            return Ok(shared);
        }

        let mut course = self
            .store
            .course(course_id)
            .await?
            .ok_or_else(|| GenerationError::CourseNotFound(course_id.to_string()))?;
        recover_interrupted(&mut course);
        Ok(self.track(share(course)))
    }

    /// Write the current state of a course. The snapshot is taken after the
    /// per-course write lock is held, so writes land in snapshot order.
    async fn persist(&self, shared: &SharedCourse) -> Result<Course, GenerationError> {
        let course_id = lock_course(shared).id.clone();
        let lock = keyed_lock(&self.course_writes, course_id);
        let _writing = lock.lock().await;

        let snapshot = lock_course(shared).clone();
        self.store.upsert_course(&snapshot).await?;
        Ok(snapshot)
    }

    /// Read, change, and write back one progress record while holding its
    /// `(owner, course)` lock. Nothing is written when `change` fails.
    async fn update_progress<T>(
        &self,
        owner_id: &str,
        course_id: &str,
        change: impl FnOnce(&mut CourseProgress) -> Result<T, GenerationError>,
    ) -> Result<(CourseProgress, T), GenerationError> {
        let lock = keyed_lock(
            &self.progress_updates,
            (owner_id.to_string(), course_id.to_string()),
        );
        let _updating = lock.lock().await;

        let mut progress = self.store.progress(owner_id, course_id).await?;
        let value = change(&mut progress)?;
        self.store
            .upsert_progress(owner_id, course_id, &progress)
            .await?;
        Ok((progress, value))
    }
}

fn keyed_lock<K: Eq + Hash>(locks: &KeyedLocks<K>, key: K) -> Arc<AsyncMutex<()>> {
    let mut locks = locks.lock().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(locks.entry(key).or_default())
}

/// Forget idle locks whose key matches.
fn prune<K: Eq + Hash>(locks: &KeyedLocks<K>, matches: impl Fn(&K) -> bool) {
    locks
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .retain(|key, lock| !matches(key) || Arc::strong_count(lock) > 1);
}

fn require_completed(shared: &SharedCourse, index: usize) -> Result<(), GenerationError> {
    let guard = lock_course(shared);
    let unit = guard.unit(index)?;
    if unit.status == UnitStatus::Completed {
        Ok(())
    } else {
        Err(GenerationError::UnitNotCompleted {
            course_id: guard.id.clone(),
            index,
            status: unit.status.to_string(),
        })
    }
}

/// A stored course loaded into a fresh process has no task behind its
/// `generating` units; move them to `error` so they can be retried.
fn recover_interrupted(course: &mut Course) {
    for (index, unit) in course.units.iter_mut().enumerate() {
        if unit.status == UnitStatus::Generating {
            warn!(course_id = %course.id, unit_index = index, "Recovering interrupted unit");
            unit.status = UnitStatus::Error;
            unit.last_error = Some(INTERRUPTED.to_string());
        }
        if unit.media_status == MediaStatus::Generating {
            unit.media_status = MediaStatus::Error;
            unit.media_error = Some(INTERRUPTED.to_string());
        }
    }
}
