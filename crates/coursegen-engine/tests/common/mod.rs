//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use coursegen_engine::llm::RetryPolicy;
use coursegen_engine::llm::testing::ScriptedProvider;
use coursegen_engine::{CourseGenerator, GenerationRequest, Language, Level};

pub const TITLES: [&str; 6] = [
    "Ingredients",
    "Mixing",
    "Kneading",
    "Proofing",
    "Baking",
    "Cooling",
];

pub fn request(include_exercises: bool) -> GenerationRequest {
    GenerationRequest {
        topic: "Intro to Baking".to_string(),
        level: Level::Beginner,
        duration: "20 minutes".to_string(),
        include_exercises,
        language: Language::En,
    }
}

pub fn outline_json() -> String {
    json!({
        "title": "Baking Basics",
        "description": "Learn to bake bread at home.",
        "moduleTitles": TITLES,
        "estimatedDuration": "2 weeks",
        "conclusion": "Happy baking!"
    })
    .to_string()
}

pub fn unit_json(summary: &str, with_exercise: bool) -> String {
    let mut value = json!({
        "summary": summary,
        "detailedContent": format!("<p>{summary}</p><ul><li>step</li></ul>")
    });
    if with_exercise {
        value["exercise"] = json!("Try it at home.");
        value["exerciseSolution"] = json!("Follow the steps.");
    }
    value.to_string()
}

pub fn quiz_json() -> String {
    let questions: Vec<_> = (0..5)
        .map(|i| {
            json!({
                "questionText": format!("Question {i}?"),
                "options": ["a", "b", "c", "d"],
                "correctAnswerIndex": i % 4
            })
        })
        .collect();
    json!({"title": "Knowledge Check: Baking Basics", "questions": questions}).to_string()
}

/// Generator with a fast retry policy so failure paths finish quickly.
pub fn generator(provider: &Arc<ScriptedProvider>) -> CourseGenerator {
    CourseGenerator::new(provider.clone()).with_retry(RetryPolicy::new(3, Duration::from_millis(1)))
}
