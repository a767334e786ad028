use chrono::Utc;
use serde::Deserialize;
use std::time::Instant;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use coursegen_utils::error::{GenerationError, SchemaError};
use coursegen_utils::logging::log_stage_complete;

use crate::generator::CourseGenerator;
use crate::model::{Course, GenerationRequest, Unit};
use crate::progress::{ProgressSink, STAGE_OUTLINE};
use crate::prompts::{self, MAX_UNITS, MIN_UNITS};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutlinePayload {
    title: String,
    description: String,
    module_titles: Vec<String>,
    estimated_duration: String,
    conclusion: String,
}

impl OutlinePayload {
    fn check(&self) -> Result<(), SchemaError> {
        if self.title.trim().is_empty() {
            return Err(SchemaError::EmptyField {
                path: "title".to_string(),
            });
        }
        let count = self.module_titles.len();
        if !(MIN_UNITS..=MAX_UNITS).contains(&count) {
            return Err(SchemaError::CountOutOfRange {
                path: "moduleTitles".to_string(),
                min: MIN_UNITS,
                max: MAX_UNITS,
                actual: count,
            });
        }
        if let Some(i) = self.module_titles.iter().position(|t| t.trim().is_empty()) {
            return Err(SchemaError::EmptyField {
                path: format!("moduleTitles[{i}]"),
            });
        }
        Ok(())
    }
}

impl CourseGenerator {
    /// Generate a course skeleton with every unit `pending`.
    ///
    /// The sink is notified once, before the provider call. Nothing is
    /// returned unless the whole outline validated.
    ///
    /// # Errors
    ///
    /// `InvalidRequest` for a blank topic or duration, `Provider` once the
    /// retry policy gives up, `Schema` for an unusable payload (including a
    /// unit count outside 5..=8).
    pub async fn synthesize_outline(
        &self,
        request: &GenerationRequest,
        owner_id: &str,
        progress: &dyn ProgressSink,
    ) -> Result<Course, GenerationError> {
        request.validate()?;
        let span = info_span!("outline", topic = %request.topic, level = %request.level);

        async {
            progress.stage(STAGE_OUTLINE);
            let started = Instant::now();

            let payload: OutlinePayload = self
                .generate(
                    "outline",
                    &self.models.outline,
                    prompts::outline_prompt(request),
                    prompts::outline_schema(),
                )
                .await?;
            payload.check()?;

            let course = Course {
                id: Uuid::new_v4().to_string(),
                title: payload.title,
                description: payload.description,
                units: payload.module_titles.into_iter().map(Unit::pending).collect(),
                estimated_duration: payload.estimated_duration,
                conclusion: payload.conclusion,
                owner_id: owner_id.to_string(),
                created_at: Utc::now(),
                generation: request.params(),
            };

            info!(course_id = %course.id, units = course.units.len(), "Outline synthesized");
            log_stage_complete("outline", started.elapsed());
            Ok::<_, GenerationError>(course)
        }
        .instrument(span)
        .await
    }
}
