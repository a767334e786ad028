//! Prompt text and response schemas for every generation call.

use coursegen_llm::Schema;

use crate::model::{GenerationParams, GenerationRequest, Language, Unit};

pub const MIN_UNITS: usize = 5;
pub const MAX_UNITS: usize = 8;
pub const QUIZ_QUESTIONS: usize = 5;
pub const QUIZ_OPTIONS: usize = 4;
pub const SUGGESTED_TOPICS: usize = 3;

#[must_use]
pub fn outline_prompt(request: &GenerationRequest) -> String {
    format!(
        "Create a course outline for the topic \"{topic}\" for a {level} level user.\n\
         The course should be structured for someone who can study for {duration} per day.\n\
         Provide a course 'title', a brief 'description', a list of {MIN_UNITS} to {MAX_UNITS} \
         'moduleTitles', an 'estimatedDuration' for the whole course, and a final 'conclusion'.\n\
         Respond in {language}.",
        topic = request.topic.trim(),
        level = request.level,
        duration = request.duration.trim(),
        language = request.language.instruction(),
    )
}

#[must_use]
pub fn outline_schema() -> Schema {
    Schema::object()
        .field("title", Schema::string())
        .field("description", Schema::string())
        .field(
            "moduleTitles",
            Schema::array(Schema::string())
                .describe(format!("A list of {MIN_UNITS} to {MAX_UNITS} module titles.")),
        )
        .field("estimatedDuration", Schema::string())
        .field("conclusion", Schema::string())
}

#[must_use]
pub fn unit_prompt(course_title: &str, unit_title: &str, params: &GenerationParams) -> String {
    let exercise_part = if params.include_exercises {
        "Also provide a practical 'exercise' and its corresponding 'exerciseSolution'."
    } else {
        "Do not include an exercise or solution."
    };
    format!(
        "For a course titled \"{course_title}\", generate content for the module \"{unit_title}\".\n\
         The target audience is at a {level} level.\n\
         Provide:\n\
         1. 'summary': A brief, one-sentence overview.\n\
         2. 'detailedContent': A comprehensive, multi-paragraph explanation of the topic. \
         Use basic HTML tags like <strong> for emphasis, <ul> and <li> for lists to structure the content.\n\
         {exercise_part}\n\
         Respond in {language}.",
        level = params.level,
        language = params.language.instruction(),
    )
}

#[must_use]
pub fn unit_schema(include_exercises: bool) -> Schema {
    let schema = Schema::object()
        .field(
            "summary",
            Schema::string().describe("A brief, one-sentence summary."),
        )
        .field(
            "detailedContent",
            Schema::string().describe(
                "A comprehensive, multi-paragraph explanation formatted with HTML tags \
                 (like <strong>, <ul>, <li>) for better readability.",
            ),
        );
    if include_exercises {
        schema
            .field("exercise", Schema::string())
            .field("exerciseSolution", Schema::string())
    } else {
        schema
    }
}

/// Quiz prompt built from completed units only.
#[must_use]
pub fn quiz_prompt(course_title: &str, completed: &[&Unit], language: Language) -> String {
    let summary = completed
        .iter()
        .map(|u| format!("Module \"{}\": {}", u.title, u.summary))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Based on the following course content, create a multiple-choice quiz with \
         {QUIZ_QUESTIONS} questions to test understanding.\n\
         For each question, provide {QUIZ_OPTIONS} options and indicate the index of the \
         correct answer (0-{last}).\n\
         The quiz should be titled \"{title}\".\n\
         Respond in {language}.\n\n\
         Course Title: {course_title}\n\
         Course Content Summary:\n\
         {summary}",
        last = QUIZ_OPTIONS - 1,
        title = quiz_title(course_title),
        language = language.instruction(),
    )
}

#[must_use]
pub fn quiz_title(course_title: &str) -> String {
    format!("Knowledge Check: {course_title}")
}

#[must_use]
pub fn quiz_schema() -> Schema {
    Schema::object().field("title", Schema::string()).field(
        "questions",
        Schema::array(
            Schema::object()
                .field("questionText", Schema::string())
                .field("options", Schema::array(Schema::string()))
                .field("correctAnswerIndex", Schema::integer()),
        ),
    )
}

#[must_use]
pub fn ideas_prompt(language: Language) -> String {
    format!(
        "Suggest {SUGGESTED_TOPICS} popular and interesting course topics. Respond in {}.",
        language.instruction()
    )
}

#[must_use]
pub fn ideas_schema() -> Schema {
    Schema::object().field("ideas", Schema::array(Schema::string()))
}

#[must_use]
pub fn video_prompt(unit_title: &str, summary: &str) -> String {
    format!(
        "Create a short, dynamic summary video for a single course module titled \"{unit_title}\". \
         The module content is about: {summary}. \
         Keep the video focused and engaging, suitable for an e-learning platform."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Level;

    fn params(include_exercises: bool, language: Language) -> GenerationParams {
        GenerationParams {
            level: Level::Advanced,
            include_exercises,
            language,
            ..GenerationParams::default()
        }
    }

    #[test]
    fn test_outline_prompt_carries_request() {
        let request = GenerationRequest {
            topic: "Intro to Baking".to_string(),
            level: Level::Beginner,
            duration: "20 minutes".to_string(),
            include_exercises: true,
            language: Language::Pt,
        };
        let prompt = outline_prompt(&request);

        assert!(prompt.contains("\"Intro to Baking\""));
        assert!(prompt.contains("beginner level"));
        assert!(prompt.contains("20 minutes per day"));
        assert!(prompt.contains("5 to 8 'moduleTitles'"));
        assert!(prompt.ends_with("Respond in Portuguese (Portugal)."));
    }

    #[test]
    fn test_unit_prompt_exercise_part_follows_flag() {
        let with = unit_prompt("Bread", "Mixing", &params(true, Language::En));
        let without = unit_prompt("Bread", "Mixing", &params(false, Language::En));

        assert!(with.contains("'exerciseSolution'"));
        assert!(without.contains("Do not include an exercise"));
        assert!(with.contains("advanced level"));
        assert!(with.contains("\"Mixing\""));
    }

    #[test]
    fn test_unit_schema_requires_exercise_only_when_requested() {
        assert_eq!(unit_schema(false).required, vec!["summary", "detailedContent"]);
        assert_eq!(
            unit_schema(true).required,
            vec!["summary", "detailedContent", "exercise", "exerciseSolution"]
        );
    }

    #[test]
    fn test_quiz_prompt_lists_given_units() {
        let mut a = Unit::pending("Ingredients");
        a.summary = "Flour, water, salt.".to_string();
        let mut b = Unit::pending("Mixing");
        b.summary = "Combine gently.".to_string();

        let prompt = quiz_prompt("Bread", &[&a, &b], Language::En);

        assert!(prompt.contains("Module \"Ingredients\": Flour, water, salt.\nModule \"Mixing\": Combine gently."));
        assert!(prompt.contains("Knowledge Check: Bread"));
        assert!(prompt.contains("(0-3)"));
    }

    #[test]
    fn test_video_prompt() {
        let prompt = video_prompt("Cooling", "Why bread rests");
        assert!(prompt.contains("titled \"Cooling\""));
        assert!(prompt.contains("about: Why bread rests."));
    }
}
