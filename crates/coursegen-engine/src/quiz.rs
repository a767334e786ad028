use serde::Deserialize;
use std::time::Instant;
use tracing::{Instrument, info};

use coursegen_utils::error::{GenerationError, SchemaError};
use coursegen_utils::logging::{course_span, log_stage_complete};

use crate::generator::CourseGenerator;
use crate::model::{Course, Quiz, QuizQuestion, Unit};
use crate::prompts::{self, QUIZ_OPTIONS, QUIZ_QUESTIONS};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionPayload {
    question_text: String,
    options: Vec<String>,
    correct_answer_index: i64,
}

#[derive(Debug, Deserialize)]
struct QuizPayload {
    title: String,
    questions: Vec<QuestionPayload>,
}

impl QuizPayload {
    fn into_quiz(self, fallback_title: String) -> Result<Quiz, SchemaError> {
        if self.questions.len() != QUIZ_QUESTIONS {
            return Err(SchemaError::CountOutOfRange {
                path: "questions".to_string(),
                min: QUIZ_QUESTIONS,
                max: QUIZ_QUESTIONS,
                actual: self.questions.len(),
            });
        }

        let questions = self
            .questions
            .into_iter()
            .enumerate()
            .map(|(i, q)| q.into_question(i))
            .collect::<Result<Vec<_>, _>>()?;

        let title = if self.title.trim().is_empty() {
            fallback_title
        } else {
            self.title
        };
        Ok(Quiz { title, questions })
    }
}

impl QuestionPayload {
    fn into_question(self, i: usize) -> Result<QuizQuestion, SchemaError> {
        if self.question_text.trim().is_empty() {
            return Err(SchemaError::EmptyField {
                path: format!("questions[{i}].questionText"),
            });
        }
        if self.options.len() != QUIZ_OPTIONS {
            return Err(SchemaError::CountOutOfRange {
                path: format!("questions[{i}].options"),
                min: QUIZ_OPTIONS,
                max: QUIZ_OPTIONS,
                actual: self.options.len(),
            });
        }
        let last = QUIZ_OPTIONS as i64 - 1;
        let correct_answer_index = usize::try_from(self.correct_answer_index)
            .ok()
            .filter(|&idx| idx < QUIZ_OPTIONS)
            .ok_or_else(|| SchemaError::ValueOutOfRange {
                path: format!("questions[{i}].correctAnswerIndex"),
                min: 0,
                max: last,
                actual: self.correct_answer_index,
            })?;

        Ok(QuizQuestion {
            question_text: self.question_text,
            options: self.options,
            correct_answer_index,
        })
    }
}

impl CourseGenerator {
    /// Build a five-question quiz over the course's completed units.
    ///
    /// Units in any other status contribute nothing to the prompt.
    ///
    /// # Errors
    ///
    /// `NoCompletedUnits` before any provider call when nothing is completed;
    /// otherwise `Provider` or `Schema`.
    pub async fn synthesize_quiz(&self, course: &Course) -> Result<Quiz, GenerationError> {
        let completed: Vec<&Unit> = course.completed_units().map(|(_, u)| u).collect();
        if completed.is_empty() {
            return Err(GenerationError::NoCompletedUnits {
                course_id: course.id.clone(),
            });
        }

        async {
            let started = Instant::now();
            let payload: QuizPayload = self
                .generate(
                    "quiz",
                    &self.models.quiz,
                    prompts::quiz_prompt(&course.title, &completed, course.generation.language),
                    prompts::quiz_schema(),
                )
                .await?;
            let quiz = payload.into_quiz(prompts::quiz_title(&course.title))?;

            info!(units = completed.len(), "Quiz synthesized");
            log_stage_complete("quiz", started.elapsed());
            Ok::<_, GenerationError>(quiz)
        }
        .instrument(course_span(&course.id, "synthesize_quiz"))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GenerationParams, UnitStatus};
    use coursegen_llm::RetryPolicy;
    use coursegen_llm::testing::ScriptedProvider;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;

    fn course(statuses: &[UnitStatus]) -> Course {
        let units = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                let mut unit = Unit::pending(format!("Unit {i}"));
                unit.status = *status;
                if *status == UnitStatus::Completed {
                    unit.summary = format!("summary {i}");
                    unit.detailed_content = "<p>content</p>".to_string();
                }
                unit
            })
            .collect();
        Course {
            id: "course-q".to_string(),
            title: "Bread".to_string(),
            description: String::new(),
            units,
            estimated_duration: String::new(),
            conclusion: String::new(),
            owner_id: "u".to_string(),
            created_at: chrono::Utc::now(),
            generation: GenerationParams::default(),
        }
    }

    fn question(correct: Value) -> Value {
        json!({
            "questionText": "Which flour?",
            "options": ["bread", "cake", "rye", "spelt"],
            "correctAnswerIndex": correct
        })
    }

    fn quiz_json(title: &str, questions: Vec<Value>) -> String {
        json!({"title": title, "questions": questions}).to_string()
    }

    fn generator(provider: Arc<ScriptedProvider>) -> CourseGenerator {
        CourseGenerator::new(provider).with_retry(RetryPolicy::new(2, Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_no_completed_units_makes_no_call() {
        let provider = Arc::new(ScriptedProvider::new());
        let course = course(&[UnitStatus::Pending, UnitStatus::Error]);

        let result = generator(provider.clone()).synthesize_quiz(&course).await;

        assert!(matches!(
            result,
            Err(GenerationError::NoCompletedUnits { .. })
        ));
        assert_eq!(provider.text_calls(), 0);
    }

    #[tokio::test]
    async fn test_quiz_prompt_only_covers_completed_units() {
        let questions = (0..5).map(|i| question(json!(i % 4))).collect();
        let provider =
            Arc::new(ScriptedProvider::new().with_text(quiz_json("Knowledge Check: Bread", questions)));
        let course = course(&[
            UnitStatus::Completed,
            UnitStatus::Pending,
            UnitStatus::Completed,
            UnitStatus::Error,
        ]);

        let quiz = generator(provider.clone())
            .synthesize_quiz(&course)
            .await
            .unwrap();

        assert_eq!(quiz.questions.len(), 5);
        assert_eq!(quiz.questions[3].correct_answer_index, 3);
        let prompt = &provider.prompts()[0];
        assert!(prompt.contains("Module \"Unit 0\": summary 0"));
        assert!(prompt.contains("Module \"Unit 2\": summary 2"));
        assert!(!prompt.contains("Unit 1"));
        assert!(!prompt.contains("Unit 3"));
    }

    #[tokio::test]
    async fn test_blank_title_falls_back() {
        let questions = (0..5).map(|_| question(json!(0))).collect();
        let provider = Arc::new(ScriptedProvider::new().with_text(quiz_json(" ", questions)));

        let quiz = generator(provider)
            .synthesize_quiz(&course(&[UnitStatus::Completed]))
            .await
            .unwrap();

        assert_eq!(quiz.title, "Knowledge Check: Bread");
    }

    #[tokio::test]
    async fn test_answer_index_out_of_range_is_rejected() {
        let mut questions: Vec<Value> = (0..4).map(|_| question(json!(1))).collect();
        questions.push(question(json!(4)));
        let provider = Arc::new(ScriptedProvider::new().with_text(quiz_json("t", questions)));

        let result = generator(provider)
            .synthesize_quiz(&course(&[UnitStatus::Completed]))
            .await;

        assert!(matches!(
            result,
            Err(GenerationError::Schema(SchemaError::ValueOutOfRange { actual: 4, .. }))
        ));
    }

    #[tokio::test]
    async fn test_wrong_question_count_is_rejected() {
        let questions = (0..4).map(|_| question(json!(0))).collect();
        let provider = Arc::new(ScriptedProvider::new().with_text(quiz_json("t", questions)));

        let result = generator(provider)
            .synthesize_quiz(&course(&[UnitStatus::Completed]))
            .await;

        assert!(matches!(
            result,
            Err(GenerationError::Schema(SchemaError::CountOutOfRange { actual: 4, .. }))
        ));
    }

    #[tokio::test]
    async fn test_negative_index_is_rejected() {
        let questions = (0..5).map(|_| question(json!(-1))).collect();
        let provider = Arc::new(ScriptedProvider::new().with_text(quiz_json("t", questions)));

        let result = generator(provider)
            .synthesize_quiz(&course(&[UnitStatus::Completed]))
            .await;

        assert!(matches!(
            result,
            Err(GenerationError::Schema(SchemaError::ValueOutOfRange { actual: -1, .. }))
        ));
    }
}
