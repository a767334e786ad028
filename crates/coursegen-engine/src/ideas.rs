use serde::Deserialize;
use tracing::info;

use coursegen_utils::error::GenerationError;

use crate::generator::CourseGenerator;
use crate::model::Language;
use crate::prompts;

#[derive(Debug, Deserialize)]
struct IdeasPayload {
    ideas: Vec<String>,
}

impl CourseGenerator {
    /// Ask for three course topics in `language`; the list comes back as the
    /// provider wrote it.
    ///
    /// # Errors
    ///
    /// `Provider` or `Schema`.
    pub async fn suggest_topics(&self, language: Language) -> Result<Vec<String>, GenerationError> {
        let payload: IdeasPayload = self
            .generate(
                "ideas",
                &self.models.ideas,
                prompts::ideas_prompt(language),
                prompts::ideas_schema(),
            )
            .await?;

        info!(language = %language, count = payload.ideas.len(), "Topics suggested");
        Ok(payload.ideas)
    }
}
