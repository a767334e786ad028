//! Property tests for the per-unit state machine.
//!
//! Any sequence of materialization attempts with arbitrary provider outcomes
//! must only take legal transitions, must stop calling the provider once the
//! unit is completed, and must keep `detailed_content` non-empty exactly when
//! the unit is completed.

mod common;

use proptest::prelude::*;
use std::sync::Arc;

use common::{generator, unit_json};
use coursegen_engine::error::LlmError;
use coursegen_engine::llm::testing::ScriptedProvider;
use coursegen_engine::{
    Course, GenerationParams, MaterializeOutcome, Unit, UnitStatus, lock_course, share,
};

#[derive(Debug, Clone, Copy)]
enum Reply {
    Valid,
    Malformed,
    Refused,
}

fn reply() -> impl Strategy<Value = Reply> {
    prop_oneof![Just(Reply::Valid), Just(Reply::Malformed), Just(Reply::Refused)]
}

fn one_unit_course() -> Course {
    Course {
        id: "course-p".to_string(),
        title: "t".to_string(),
        description: String::new(),
        units: vec![Unit::pending("only")],
        estimated_duration: String::new(),
        conclusion: String::new(),
        owner_id: "o".to_string(),
        created_at: chrono::Utc::now(),
        generation: GenerationParams::default(),
    }
}

fn legal(from: UnitStatus, to: UnitStatus) -> bool {
    use UnitStatus::*;
    from == to
        || matches!(
            (from, to),
            (Pending | Error, Completed) | (Pending | Error, Error)
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_unit_transitions_are_legal(replies in prop::collection::vec(reply(), 1..8)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        let mut provider = ScriptedProvider::new();
        for r in &replies {
            provider = match r {
                Reply::Valid => provider.with_text(unit_json("s", false)),
                Reply::Malformed => provider.with_text("{\"summary\": 1}"),
                Reply::Refused => provider.with_text_error(LlmError::ProviderQuota("429".into())),
            };
        }
        let provider = Arc::new(provider);
        let generator = generator(&provider);
        let course = share(one_unit_course());

        let first_valid = replies.iter().position(|r| matches!(r, Reply::Valid));

        for _ in 0..replies.len() {
            let before = lock_course(&course).units[0].status;
            let outcome = runtime
                .block_on(generator.materialize_unit(&course, 0, None))
                .unwrap();
            let unit = lock_course(&course).units[0].clone();

            prop_assert!(legal(before, unit.status), "{before} -> {}", unit.status);
            prop_assert_ne!(unit.status, UnitStatus::Pending);
            prop_assert_ne!(unit.status, UnitStatus::Generating);
            prop_assert_eq!(
                !unit.detailed_content.is_empty(),
                unit.status == UnitStatus::Completed
            );
            if before == UnitStatus::Completed {
                prop_assert!(
                    matches!(outcome, MaterializeOutcome::Skipped(UnitStatus::Completed)),
                    "completed unit was not skipped"
                );
            }
        }

        let expected_calls = first_valid.map_or(replies.len(), |i| i + 1);
        prop_assert_eq!(provider.text_calls() as usize, expected_calls);
    }
}
