//! Video summaries through a provider-side long-running operation.

use std::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};

use coursegen_llm::{MediaOperation, MediaRequest};
use coursegen_utils::error::{GenerationError, LlmError};
use coursegen_utils::logging::{course_span, log_stage_complete};
use coursegen_utils::redaction::redact_error_message;

use crate::generator::CourseGenerator;
use crate::model::{MediaStatus, SharedCourse, Unit, UnitStatus, lock_course};
use crate::prompts;

impl CourseGenerator {
    /// Generate a video for `unit` and record the outcome on it.
    ///
    /// Submission and every status query go through the retry policy; between
    /// queries the task sleeps for the configured poll interval.
    ///
    /// # Errors
    ///
    /// `Provider` when submission or polling gives up or the operation reports
    /// a failure, `MissingArtifact` when it finishes without a video reference.
    pub async fn poll_media_for_unit(&self, unit: &mut Unit) -> Result<String, GenerationError> {
        unit.media_status = MediaStatus::Generating;
        unit.media_error = None;

        let span = info_span!("media", unit = %unit.title);
        let result = self
            .run_media_operation(&unit.title, &unit.summary)
            .instrument(span)
            .await;
        record_media_outcome(unit, &result);
        result
    }

    /// Course-level variant of [`Self::poll_media_for_unit`].
    ///
    /// The `idle | error → generating` transition happens under the course
    /// lock, so a second request for the same unit fails fast instead of
    /// submitting another operation. A unit that already has a video returns
    /// the stored reference.
    ///
    /// # Errors
    ///
    /// `UnitIndexOutOfRange`, `UnitNotCompleted` for a unit without content,
    /// `MediaAlreadyInFlight`, or any error of [`Self::poll_media_for_unit`].
    pub async fn poll_media_for_course_unit(
        &self,
        course: &SharedCourse,
        index: usize,
    ) -> Result<String, GenerationError> {
        let (course_id, title, summary) = {
            let mut guard = lock_course(course);
            let course_id = guard.id.clone();
            let unit = guard.unit_mut(index)?;

            if unit.status != UnitStatus::Completed {
                return Err(GenerationError::UnitNotCompleted {
                    course_id,
                    index,
                    status: unit.status.to_string(),
                });
            }
            match (unit.media_status, &unit.media_ref) {
                (MediaStatus::Generating, _) => {
                    return Err(GenerationError::MediaAlreadyInFlight { index });
                }
                (MediaStatus::Success, Some(existing)) => return Ok(existing.clone()),
                _ => {}
            }

            unit.media_status = MediaStatus::Generating;
            unit.media_error = None;
            (course_id, unit.title.clone(), unit.summary.clone())
        };

        let result = self
            .run_media_operation(&title, &summary)
            .instrument(course_span(&course_id, "generate_media"))
            .await;

        let mut guard = lock_course(course);
        record_media_outcome(guard.unit_mut(index)?, &result);
        result
    }

    async fn run_media_operation(
        &self,
        title: &str,
        summary: &str,
    ) -> Result<String, GenerationError> {
        let started = Instant::now();
        let request = MediaRequest {
            model: self.models.video.clone(),
            prompt: prompts::video_prompt(title, summary),
            resolution: self.media.resolution.clone(),
            aspect_ratio: self.media.aspect_ratio.clone(),
            count: 1,
        };

        let mut operation = self.submit_media(&request).await?;
        info!(operation = %operation.name, "Video generation submitted");

        let mut polls = 0u32;
        while !operation.done {
            tokio::time::sleep(self.media.poll_interval).await;
            operation = self.refresh_media(&operation).await?;
            polls += 1;
            debug!(operation = %operation.name, polls, done = operation.done, "Polled video operation");
        }

        let uri = artifact_of(operation)?;
        log_stage_complete("media", started.elapsed());
        Ok(uri)
    }
}

/// The artifact reference of a finished operation.
fn artifact_of(operation: MediaOperation) -> Result<String, GenerationError> {
    if let Some(message) = operation.error {
        return Err(LlmError::OperationFailed(message).into());
    }
    operation
        .artifact_uri
        .filter(|uri| !uri.trim().is_empty())
        .ok_or(GenerationError::MissingArtifact {
            operation: operation.name,
        })
}

fn record_media_outcome(unit: &mut Unit, result: &Result<String, GenerationError>) {
    match result {
        Ok(uri) => {
            unit.media_status = MediaStatus::Success;
            unit.media_ref = Some(uri.clone());
            unit.media_error = None;
        }
        Err(err) => {
            let message = redact_error_message(&err.to_string());
            warn!(unit = %unit.title, error = %message, "Video generation failed");
            unit.media_status = MediaStatus::Error;
            unit.media_error = Some(message);
        }
    }
}
