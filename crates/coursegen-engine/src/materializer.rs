//! Lazy unit materialization and the per-unit state machine.
//!
//! The status check and the transition to `generating` happen inside one
//! lock acquisition on the [`SharedCourse`], before any provider call. Any
//! number of concurrent triggers for the same unit therefore produce at most
//! one provider call; the losers observe `generating` and return `Skipped`.

use serde::Deserialize;
use std::time::Instant;
use tracing::{Instrument, debug, info};

use coursegen_utils::error::{GenerationError, SchemaError};
use coursegen_utils::logging::{course_span, log_absorbed_failure, log_stage_complete};
use coursegen_utils::redaction::redact_error_message;

use crate::generator::CourseGenerator;
use crate::model::{GenerationParams, SharedCourse, UnitStatus, lock_course};
use crate::prompts;

/// What a materialization request did.
#[derive(Debug)]
pub enum MaterializeOutcome {
    /// The unit was already `generating` or `completed`; nothing was called.
    Skipped(UnitStatus),
    Completed,
    /// The provider call or validation failed; the unit is now `error`.
    Failed(GenerationError),
}

impl MaterializeOutcome {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Whether this call changed the course.
    #[must_use]
    pub fn changed_course(&self) -> bool {
        !matches!(self, Self::Skipped(_))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UnitPayload {
    summary: String,
    detailed_content: String,
    exercise: Option<String>,
    exercise_solution: Option<String>,
}

/// Generated content ready to merge into a unit.
struct UnitContent {
    summary: String,
    detailed_content: String,
    exercise: Option<(String, String)>,
}

impl UnitPayload {
    /// Enforce the content invariants the schema alone cannot express.
    fn into_content(self, include_exercises: bool) -> Result<UnitContent, SchemaError> {
        if self.detailed_content.trim().is_empty() {
            return Err(SchemaError::EmptyField {
                path: "detailedContent".to_string(),
            });
        }

        let exercise = if include_exercises {
            let exercise = non_blank(self.exercise, "exercise")?;
            let solution = non_blank(self.exercise_solution, "exerciseSolution")?;
            Some((exercise, solution))
        } else {
            None
        };

        Ok(UnitContent {
            summary: self.summary,
            detailed_content: self.detailed_content,
            exercise,
        })
    }
}

fn non_blank(value: Option<String>, path: &str) -> Result<String, SchemaError> {
    match value {
        None => Err(SchemaError::MissingField {
            path: path.to_string(),
        }),
        Some(v) if v.trim().is_empty() => Err(SchemaError::EmptyField {
            path: path.to_string(),
        }),
        Some(v) => Ok(v),
    }
}

impl CourseGenerator {
    /// Generate the content of one unit if it is `pending` or `error`.
    ///
    /// `params` overrides the parameters the course was created with. A
    /// failure is recorded on the unit (`error` status plus `last_error`) and
    /// reported as [`MaterializeOutcome::Failed`]; it is not raised.
    ///
    /// # Errors
    ///
    /// Only `GenerationError::UnitIndexOutOfRange`.
    pub async fn materialize_unit(
        &self,
        course: &SharedCourse,
        index: usize,
        params: Option<&GenerationParams>,
    ) -> Result<MaterializeOutcome, GenerationError> {
        let (course_id, course_title, unit_title, params) = {
            let mut guard = lock_course(course);
            let generation = guard.generation.clone();
            let course_id = guard.id.clone();
            let course_title = guard.title.clone();

            let unit = guard.unit_mut(index)?;
            if !unit.status.can_materialize() {
                debug!(course_id = %course_id, unit_index = index, status = %unit.status, "Unit already in flight or done");
                return Ok(MaterializeOutcome::Skipped(unit.status));
            }
            unit.status = UnitStatus::Generating;

            (
                course_id,
                course_title,
                unit.title.clone(),
                params.cloned().unwrap_or(generation),
            )
        };

        let started = Instant::now();
        let result = async {
            let payload: UnitPayload = self
                .generate(
                    "unit",
                    &self.models.unit,
                    prompts::unit_prompt(&course_title, &unit_title, &params),
                    prompts::unit_schema(params.include_exercises),
                )
                .await?;
            Ok::<_, GenerationError>(payload.into_content(params.include_exercises)?)
        }
        .instrument(course_span(&course_id, "materialize_unit"))
        .await;

        let mut guard = lock_course(course);
        let unit = guard.unit_mut(index)?;
        match result {
            Ok(content) => {
                unit.summary = content.summary;
                unit.detailed_content = content.detailed_content;
                (unit.exercise, unit.exercise_solution) = match content.exercise {
                    Some((exercise, solution)) => (Some(exercise), Some(solution)),
                    None => (None, None),
                };
                unit.status = UnitStatus::Completed;
                unit.last_error = None;

                info!(course_id = %course_id, unit_index = index, "Unit materialized");
                log_stage_complete("unit", started.elapsed());
                Ok(MaterializeOutcome::Completed)
            }
            Err(err) => {
                let message = redact_error_message(&err.to_string());
                log_absorbed_failure("unit", index, &message);
                unit.status = UnitStatus::Error;
                unit.last_error = Some(message);
                Ok(MaterializeOutcome::Failed(err))
            }
        }
    }

    /// Speculatively materialize the unit after `index` if it is still `pending`.
    ///
    /// Returns `None` when there is no next unit or it is not `pending`.
    ///
    /// # Errors
    ///
    /// Only `GenerationError::UnitIndexOutOfRange` for `index` itself.
    pub async fn materialize_adjacent(
        &self,
        course: &SharedCourse,
        index: usize,
    ) -> Result<Option<MaterializeOutcome>, GenerationError> {
        let next = {
            let guard = lock_course(course);
            guard.unit(index)?;
            let next = index + 1;
            match guard.units.get(next) {
                Some(unit) if unit.status == UnitStatus::Pending => next,
                _ => return Ok(None),
            }
        };
        debug!(unit_index = next, "Prefetching next unit");
        self.materialize_unit(course, next, None).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Course, Language, Level, Unit, share};
    use coursegen_llm::testing::ScriptedProvider;
    use coursegen_llm::RetryPolicy;
    use coursegen_utils::error::LlmError;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn course(include_exercises: bool) -> SharedCourse {
        share(Course {
            id: "course-1".to_string(),
            title: "Baking Basics".to_string(),
            description: String::new(),
            units: ["Ingredients", "Mixing", "Baking"]
                .into_iter()
                .map(Unit::pending)
                .collect(),
            estimated_duration: "2 weeks".to_string(),
            conclusion: String::new(),
            owner_id: "u".to_string(),
            created_at: chrono::Utc::now(),
            generation: GenerationParams {
                level: Level::Beginner,
                include_exercises,
                language: Language::En,
                ..GenerationParams::default()
            },
        })
    }

    fn unit_json(with_exercise: bool) -> String {
        let mut value = json!({
            "summary": "What goes into bread.",
            "detailedContent": "<p>Flour, <strong>water</strong>, salt.</p>"
        });
        if with_exercise {
            value["exercise"] = json!("Weigh 500g of flour.");
            value["exerciseSolution"] = json!("Use a kitchen scale.");
        }
        value.to_string()
    }

    fn generator(provider: Arc<ScriptedProvider>) -> CourseGenerator {
        CourseGenerator::new(provider).with_retry(RetryPolicy::new(2, Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_completed_unit_is_not_regenerated() {
        let provider = Arc::new(ScriptedProvider::new().with_text(unit_json(true)));
        let generator = generator(provider.clone());
        let course = course(true);

        let first = generator.materialize_unit(&course, 0, None).await.unwrap();
        let second = generator.materialize_unit(&course, 0, None).await.unwrap();

        assert!(first.is_completed());
        assert!(matches!(
            second,
            MaterializeOutcome::Skipped(UnitStatus::Completed)
        ));
        assert_eq!(provider.text_calls(), 1);
    }

    #[tokio::test]
    async fn test_generating_unit_is_skipped() {
        let provider = Arc::new(ScriptedProvider::new());
        let course = course(false);
        lock_course(&course).units[1].status = UnitStatus::Generating;

        let outcome = generator(provider.clone())
            .materialize_unit(&course, 1, None)
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            MaterializeOutcome::Skipped(UnitStatus::Generating)
        ));
        assert_eq!(provider.text_calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_recorded_and_retryable() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_text_error(LlmError::ProviderAuth("401 key=abc".to_string()))
                .with_text(unit_json(false)),
        );
        let generator = generator(provider.clone());
        let course = course(false);

        let failed = generator.materialize_unit(&course, 2, None).await.unwrap();
        assert!(matches!(failed, MaterializeOutcome::Failed(_)));
        {
            let guard = lock_course(&course);
            let unit = &guard.units[2];
            assert_eq!(unit.status, UnitStatus::Error);
            assert!(unit.detailed_content.is_empty());
            assert!(unit.last_error.as_deref().unwrap().contains("authentication"));
        }

        let retried = generator.materialize_unit(&course, 2, None).await.unwrap();
        assert!(retried.is_completed());
        let guard = lock_course(&course);
        assert_eq!(guard.units[2].status, UnitStatus::Completed);
        assert_eq!(guard.units[2].last_error, None);
    }

    #[tokio::test]
    async fn test_empty_detailed_content_is_an_error() {
        let provider = Arc::new(
            ScriptedProvider::new()
                .with_text(json!({"summary": "s", "detailedContent": "  "}).to_string()),
        );
        let course = course(false);

        let outcome = generator(provider)
            .materialize_unit(&course, 0, None)
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            MaterializeOutcome::Failed(GenerationError::Schema(SchemaError::EmptyField { .. }))
        ));
        assert_eq!(lock_course(&course).units[0].status, UnitStatus::Error);
    }

    #[tokio::test]
    async fn test_requested_exercise_must_be_present() {
        let provider = Arc::new(ScriptedProvider::new().with_text(unit_json(false)));
        let course = course(true);

        let outcome = generator(provider)
            .materialize_unit(&course, 0, None)
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            MaterializeOutcome::Failed(GenerationError::Schema(SchemaError::MissingField { .. }))
        ));
    }

    #[tokio::test]
    async fn test_unrequested_exercise_is_dropped() {
        let provider = Arc::new(ScriptedProvider::new().with_text(unit_json(true)));
        let course = course(false);

        generator(provider)
            .materialize_unit(&course, 0, None)
            .await
            .unwrap();

        let guard = lock_course(&course);
        assert_eq!(guard.units[0].exercise, None);
        assert_eq!(guard.units[0].exercise_solution, None);
    }

    #[tokio::test]
    async fn test_params_override_course_params() {
        let provider = Arc::new(ScriptedProvider::new().with_text(unit_json(false)));
        let course = course(true);
        let override_params = GenerationParams {
            level: Level::Advanced,
            include_exercises: false,
            language: Language::Pt,
            ..GenerationParams::default()
        };

        let outcome = generator(provider.clone())
            .materialize_unit(&course, 0, Some(&override_params))
            .await
            .unwrap();

        assert!(outcome.is_completed());
        let prompt = &provider.prompts()[0];
        assert!(prompt.contains("advanced level"));
        assert!(prompt.contains("Portuguese (Portugal)"));
    }

    #[tokio::test]
    async fn test_out_of_range_index() {
        let provider = Arc::new(ScriptedProvider::new());
        let result = generator(provider)
            .materialize_unit(&course(false), 3, None)
            .await;

        assert!(matches!(
            result,
            Err(GenerationError::UnitIndexOutOfRange { index: 3, len: 3 })
        ));
    }

    #[tokio::test]
    async fn test_adjacent_prefetch_only_for_pending_next() {
        let provider = Arc::new(ScriptedProvider::new().with_fallback_text(unit_json(false)));
        let generator = generator(provider.clone());
        let course = course(false);

        let prefetched = generator.materialize_adjacent(&course, 0).await.unwrap();
        assert!(prefetched.is_some_and(|o| o.is_completed()));
        assert_eq!(lock_course(&course).units[1].status, UnitStatus::Completed);

        let again = generator.materialize_adjacent(&course, 0).await.unwrap();
        assert!(again.is_none());

        let last = generator.materialize_adjacent(&course, 2).await.unwrap();
        assert!(last.is_none());
        assert_eq!(provider.text_calls(), 1);
    }
}
