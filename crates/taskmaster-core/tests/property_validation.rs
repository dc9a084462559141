#![allow(missing_docs)]

use proptest::prelude::*;
use serde_json::json;
use time::OffsetDateTime;
use uuid::Uuid;

use taskmaster_core::schema::{SchemaEnum, TaskCategory, TaskPriority, messages};
use taskmaster_core::task::{TaskCreateInput, TaskInsertRecord};
use taskmaster_core::validate::validate_create_input;

const CORE_CHARS: &str = "[a-zA-Z0-9éßñ日本語Ж]";

fn padding() -> impl Strategy<Value = String> {
    "[ \t\n]{0,4}"
}

fn text(min: usize, max: usize) -> impl Strategy<Value = String> {
    proptest::string::string_regex(&format!("{CORE_CHARS}{{{min},{max}}}"))
        .unwrap_or_else(|err| panic!("bad pattern: {err}"))
}

fn category_strategy() -> impl Strategy<Value = TaskCategory> {
    prop::sample::select(TaskCategory::ALL)
}

fn priority_strategy() -> impl Strategy<Value = TaskPriority> {
    prop::sample::select(TaskPriority::ALL)
}

fn due_date_strategy() -> impl Strategy<Value = OffsetDateTime> {
    // 1970 through 2100, whole seconds.
    (0i64..4_102_444_800).prop_filter_map("timestamp in range", |secs| {
        OffsetDateTime::from_unix_timestamp(secs).ok()
    })
}

fn create_input_strategy() -> impl Strategy<Value = TaskCreateInput> {
    (
        text(1, 200),
        prop::option::of(text(1, 1000)),
        prop::option::of(due_date_strategy()),
        prop::option::of(category_strategy()),
        priority_strategy(),
        prop::option::of(any::<u128>().prop_map(Uuid::from_u128)),
    )
        .prop_map(
            |(title, description, due_date, category, priority, user_id)| TaskCreateInput {
                title,
                description,
                due_date,
                category,
                priority,
                user_id,
            },
        )
}

proptest! {
    #[test]
    fn titles_within_bounds_are_trimmed(core in text(1, 200), left in padding(), right in padding()) {
        let raw = format!("{left}{core}{right}");
        match validate_create_input(&json!({ "title": raw })) {
            Ok(input) => prop_assert_eq!(input.title, core),
            Err(errors) => prop_assert!(false, "rejected {:?}: {:?}", raw, errors),
        }
    }

    #[test]
    fn titles_over_limit_are_rejected(core in text(201, 260), left in padding(), right in padding()) {
        let raw = format!("{left}{core}{right}");
        let Err(errors) = validate_create_input(&json!({ "title": raw })) else {
            return Err(TestCaseError::fail("over-long title accepted"));
        };
        let expected = format!("title: {}", messages::title_too_long());
        prop_assert_eq!(errors.messages(), [expected]);
    }

    #[test]
    fn whitespace_only_titles_are_rejected(raw in padding()) {
        let Err(errors) = validate_create_input(&json!({ "title": raw })) else {
            return Err(TestCaseError::fail("blank title accepted"));
        };
        prop_assert!(errors.mentions(&messages::title_too_short()));
    }

    #[test]
    fn descriptions_within_bounds_are_trimmed(core in text(0, 1000), left in padding(), right in padding()) {
        let raw = format!("{left}{core}{right}");
        match validate_create_input(&json!({ "title": "Task", "description": raw })) {
            Ok(input) => {
                let expected = if core.is_empty() { None } else { Some(core) };
                prop_assert_eq!(input.description, expected);
            }
            Err(errors) => prop_assert!(false, "rejected {:?}: {:?}", raw, errors),
        }
    }

    #[test]
    fn descriptions_over_limit_are_rejected(core in text(1001, 1100), right in padding()) {
        let raw = format!("{core}{right}");
        let Err(errors) = validate_create_input(&json!({ "title": "Task", "description": raw })) else {
            return Err(TestCaseError::fail("over-long description accepted"));
        };
        let expected = format!("description: {}", messages::description_too_long());
        prop_assert_eq!(errors.messages(), [expected]);
    }

    #[test]
    fn create_input_round_trips_through_insert_record(input in create_input_strategy()) {
        let row = input.to_insert_record();
        prop_assert!(!row.is_completed);
        prop_assert_eq!(row.completed_at, None);

        let stored = serde_json::to_value(&row).map_err(|err| TestCaseError::fail(err.to_string()))?;
        let reread: TaskInsertRecord =
            serde_json::from_value(stored).map_err(|err| TestCaseError::fail(err.to_string()))?;
        prop_assert_eq!(TaskCreateInput::from(reread), input);
    }
}
