//! Validation engine: structural checks for every task shape plus the
//! cross-field business rules.
//!
//! Invalid input is an ordinary outcome, so every entry point returns a
//! [`ValidationResult`] (or a plain list of messages for the rule helpers)
//! instead of panicking. Messages have the form `"<field>: <message>"`; errors
//! that concern the whole object use the `(root)` path.

mod shape;

use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

use crate::schema::{
    DESCRIPTION_MAX_LENGTH, SchemaEnum, SortDirection, SortType, TITLE_MAX_LENGTH,
    TITLE_MIN_LENGTH, TaskCategory, TaskPriority, messages,
};
use crate::task::{
    Task, TaskCreateInput, TaskDbRecord, TaskFilterOptions, TaskSortOptions, TaskUpdateInput,
};
use shape::{Presence, Shape};

/// Path used for errors that do not belong to a single field.
pub const ROOT_PATH: &str = "(root)";

/// Every problem found in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .0.join("; "))]
pub struct ValidationErrors(Vec<String>);

/// Either the typed, normalized value or every error found.
pub type ValidationResult<T> = Result<T, ValidationErrors>;

impl ValidationErrors {
    fn check(messages: Vec<String>) -> Result<(), Self> {
        if messages.is_empty() {
            Ok(())
        } else {
            Err(Self(messages))
        }
    }

    fn single(message: String) -> Self {
        Self(vec![message])
    }

    /// Messages in the order they were found.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.0
    }

    /// Consume into the raw message list.
    #[must_use]
    pub fn into_messages(self) -> Vec<String> {
        self.0
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed value; present for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any message mentions `needle` (case-insensitive).
    #[must_use]
    pub fn mentions(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.0
            .iter()
            .any(|message| message.to_lowercase().contains(&needle))
    }
}

impl IntoIterator for ValidationErrors {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Validate a complete wire-form task.
///
/// # Errors
/// Returns every structural or constraint violation found.
pub fn validate_task(raw: &Value) -> ValidationResult<Task> {
    let mut object = Shape::new(raw);
    object
        .field("id", Presence::Required, shape::positive_id)
        .field("title", Presence::Required, shape::title)
        .field("description", Presence::Optional, shape::description)
        .field("is_completed", Presence::Required, shape::boolean)
        .field("created_at", Presence::Required, shape::timestamp)
        .field("completed_at", Presence::Optional, shape::timestamp)
        .field("due_date", Presence::Optional, shape::timestamp)
        .field("category", Presence::Optional, shape::one_of::<TaskCategory>)
        .field("priority", Presence::Required, shape::one_of::<TaskPriority>)
        .field("user_id", Presence::Optional, shape::uuid)
        .field("updated_at", Presence::Required, shape::timestamp);
    object.finish()
}

/// Validate a storage record, where unset optionals are explicit `null`.
///
/// # Errors
/// Returns every structural or constraint violation found.
pub fn validate_db_record(raw: &Value) -> ValidationResult<TaskDbRecord> {
    let mut object = Shape::new(raw);
    object
        .field("id", Presence::Required, shape::positive_id)
        .field("title", Presence::Required, shape::title)
        .field("description", Presence::Nullable, shape::description)
        .field("is_completed", Presence::Required, shape::boolean)
        .field("created_at", Presence::Required, shape::timestamp)
        .field("completed_at", Presence::Nullable, shape::timestamp)
        .field("due_date", Presence::Nullable, shape::timestamp)
        .field("category", Presence::Nullable, shape::one_of::<TaskCategory>)
        .field("priority", Presence::Required, shape::one_of::<TaskPriority>)
        .field("user_id", Presence::Nullable, shape::uuid)
        .field("updated_at", Presence::Required, shape::timestamp);
    object.finish()
}

/// Validate a create input, applying the default priority.
///
/// # Errors
/// Returns every structural or constraint violation found.
pub fn validate_create_input(raw: &Value) -> ValidationResult<TaskCreateInput> {
    let mut object = Shape::new(raw);
    object
        .field("title", Presence::Required, shape::title)
        .field("description", Presence::Optional, shape::description)
        .field("due_date", Presence::Optional, shape::timestamp)
        .field("category", Presence::Optional, shape::one_of::<TaskCategory>)
        .field("priority", Presence::Optional, shape::one_of::<TaskPriority>)
        .field("user_id", Presence::Optional, shape::uuid)
        .default_value("priority", json!(TaskPriority::default().as_str()));
    object.finish()
}

/// Validate a partial update input.
///
/// # Errors
/// Returns every structural or constraint violation found.
pub fn validate_update_input(raw: &Value) -> ValidationResult<TaskUpdateInput> {
    let mut object = Shape::new(raw);
    object
        .field("title", Presence::Optional, shape::title)
        .field("description", Presence::Optional, shape::description)
        .field("is_completed", Presence::Optional, shape::boolean)
        .field("completed_at", Presence::Optional, shape::timestamp)
        .field("due_date", Presence::Optional, shape::timestamp)
        .field("category", Presence::Optional, shape::one_of::<TaskCategory>)
        .field("priority", Presence::Optional, shape::one_of::<TaskPriority>)
        .field("user_id", Presence::Optional, shape::uuid);
    object.finish()
}

/// Validate query filter options.
///
/// # Errors
/// Returns every structural violation found.
pub fn validate_filter_options(raw: &Value) -> ValidationResult<TaskFilterOptions> {
    let mut object = Shape::new(raw);
    object
        .field("category", Presence::Optional, shape::one_of::<TaskCategory>)
        .field("priority", Presence::Optional, shape::one_of::<TaskPriority>)
        .field("is_completed", Presence::Optional, shape::boolean)
        .field("user_id", Presence::Optional, shape::uuid)
        .field("due_before", Presence::Optional, shape::timestamp)
        .field("due_after", Presence::Optional, shape::timestamp);
    object.finish()
}

/// Validate sort options.
///
/// # Errors
/// Returns every structural violation found.
pub fn validate_sort_options(raw: &Value) -> ValidationResult<TaskSortOptions> {
    let mut object = Shape::new(raw);
    object
        .field("field", Presence::Required, shape::one_of::<SortType>)
        .field("direction", Presence::Required, shape::one_of::<SortDirection>);
    object.finish()
}

/// Borrowed view of the fields the business rules look at.
///
/// Built from typed values or straight from raw JSON, so the rules can run on
/// objects the structural validator rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFields<'a> {
    /// Title as given.
    pub title: Option<&'a str>,
    /// Description as given.
    pub description: Option<&'a str>,
    /// Completion flag.
    pub is_completed: Option<bool>,
    /// Completion timestamp.
    pub completed_at: Option<OffsetDateTime>,
    /// Deadline.
    pub due_date: Option<OffsetDateTime>,
    /// Category wire value.
    pub category: Option<&'a str>,
    /// Priority wire value.
    pub priority: Option<&'a str>,
}

impl<'a> TaskFields<'a> {
    /// Best-effort extraction from an untyped object. Values of the wrong type
    /// are treated as absent.
    #[must_use]
    pub fn from_json(raw: &'a Value) -> Self {
        let str_field = |key: &str| raw.get(key).and_then(Value::as_str);
        let time_field = |key: &str| str_field(key).and_then(shape::parse_timestamp);
        Self {
            title: str_field("title"),
            description: str_field("description"),
            is_completed: raw.get("is_completed").and_then(Value::as_bool),
            completed_at: time_field("completed_at"),
            due_date: time_field("due_date"),
            category: str_field("category"),
            priority: str_field("priority"),
        }
    }
}

impl<'a> From<&'a Task> for TaskFields<'a> {
    fn from(task: &'a Task) -> Self {
        Self {
            title: Some(&task.title),
            description: task.description.as_deref(),
            is_completed: Some(task.is_completed),
            completed_at: task.completed_at,
            due_date: task.due_date,
            category: task.category.map(SchemaEnum::as_str),
            priority: Some(task.priority.as_str()),
        }
    }
}

impl<'a> From<&'a TaskCreateInput> for TaskFields<'a> {
    fn from(input: &'a TaskCreateInput) -> Self {
        Self {
            title: Some(&input.title),
            description: input.description.as_deref(),
            is_completed: None,
            completed_at: None,
            due_date: input.due_date,
            category: input.category.map(SchemaEnum::as_str),
            priority: Some(input.priority.as_str()),
        }
    }
}

impl<'a> From<&'a TaskUpdateInput> for TaskFields<'a> {
    fn from(input: &'a TaskUpdateInput) -> Self {
        Self {
            title: input.title.as_deref(),
            description: input.description.as_deref(),
            is_completed: input.is_completed,
            completed_at: input.completed_at,
            due_date: input.due_date,
            category: input.category.map(SchemaEnum::as_str),
            priority: input.priority.map(SchemaEnum::as_str),
        }
    }
}

/// Completion flag and timestamp must agree.
#[must_use]
pub fn validate_completion(fields: &TaskFields<'_>) -> Vec<String> {
    match (fields.is_completed, fields.completed_at) {
        (Some(true), None) => vec![messages::COMPLETED_AT_REQUIRED.to_owned()],
        (Some(false), Some(_)) => vec![messages::COMPLETED_AT_FORBIDDEN.to_owned()],
        _ => Vec::new(),
    }
}

/// A supplied due date must lie strictly after `now`.
#[must_use]
pub fn validate_due_date(due_date: Option<OffsetDateTime>, now: OffsetDateTime) -> Vec<String> {
    match due_date {
        Some(due) if due <= now => vec![messages::DUE_DATE_NOT_FUTURE.to_owned()],
        _ => Vec::new(),
    }
}

/// Length and value-set bounds checked directly against raw field values.
#[must_use]
pub fn validate_business_constraints(fields: &TaskFields<'_>) -> Vec<String> {
    let mut errors = Vec::new();

    if let Some(title) = fields.title {
        let len = title.trim().chars().count();
        if len < TITLE_MIN_LENGTH {
            errors.push(messages::title_too_short());
        }
        if len > TITLE_MAX_LENGTH {
            errors.push(messages::title_too_long());
        }
    }

    if fields
        .description
        .is_some_and(|description| description.trim().chars().count() > DESCRIPTION_MAX_LENGTH)
    {
        errors.push(messages::description_too_long());
    }

    if fields.category.is_some_and(|category| !TaskCategory::contains(category)) {
        errors.push(messages::one_of::<TaskCategory>());
    }

    if fields.priority.is_some_and(|priority| !TaskPriority::contains(priority)) {
        errors.push(messages::one_of::<TaskPriority>());
    }

    errors
}

/// Kind of mutation being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// New task.
    Create,
    /// Change to an existing task.
    Update,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
        })
    }
}

impl FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            other => Err(format!("unknown operation '{other}' (expected create or update)")),
        }
    }
}

/// Typed input produced by [`validate_operation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationInput {
    /// Validated create input.
    Create(TaskCreateInput),
    /// Validated update input.
    Update(TaskUpdateInput),
}

impl OperationInput {
    /// Business-rule view of the validated input.
    #[must_use]
    pub fn fields(&self) -> TaskFields<'_> {
        match self {
            Self::Create(input) => input.into(),
            Self::Update(input) => input.into(),
        }
    }
}

/// Full validation for a create or update, evaluated against the current time.
///
/// # Errors
/// Returns every structural and business-rule violation found.
pub fn validate_operation(kind: OperationKind, raw: &Value) -> ValidationResult<OperationInput> {
    validate_operation_at(kind, raw, OffsetDateTime::now_utc())
}

/// [`validate_operation`] with an explicit clock.
///
/// Structural validation runs first. The completion rule, the due-date rule
/// (create only) and the constraint checks then run against the typed value,
/// or against the raw object when structural validation failed, and every
/// error is reported. A business message that repeats a structural one is
/// listed once.
///
/// # Errors
/// Returns every structural and business-rule violation found.
pub fn validate_operation_at(
    kind: OperationKind,
    raw: &Value,
    now: OffsetDateTime,
) -> ValidationResult<OperationInput> {
    match kind {
        OperationKind::Create => validate_create_operation_at(raw, now).map(OperationInput::Create),
        OperationKind::Update => validate_update_operation_at(raw, now).map(OperationInput::Update),
    }
}

/// Create-only [`validate_operation_at`] returning the typed input.
///
/// # Errors
/// Returns every structural and business-rule violation found.
pub fn validate_create_operation_at(
    raw: &Value,
    now: OffsetDateTime,
) -> ValidationResult<TaskCreateInput> {
    with_business_rules(OperationKind::Create, raw, now, validate_create_input(raw))
}

/// Update-only [`validate_operation_at`] returning the typed input.
///
/// # Errors
/// Returns every structural and business-rule violation found.
pub fn validate_update_operation_at(
    raw: &Value,
    now: OffsetDateTime,
) -> ValidationResult<TaskUpdateInput> {
    with_business_rules(OperationKind::Update, raw, now, validate_update_input(raw))
}

fn with_business_rules<T>(
    kind: OperationKind,
    raw: &Value,
    now: OffsetDateTime,
    structural: ValidationResult<T>,
) -> ValidationResult<T>
where
    for<'a> TaskFields<'a>: From<&'a T>,
{
    let errors = {
        let (mut errors, fields) = match &structural {
            Ok(input) => (Vec::new(), TaskFields::from(input)),
            Err(structural_errors) => (
                structural_errors.messages().to_vec(),
                TaskFields::from_json(raw),
            ),
        };

        let mut business = validate_completion(&fields);
        if kind == OperationKind::Create {
            business.extend(validate_due_date(fields.due_date, now));
        }
        business.extend(validate_business_constraints(&fields));

        for message in business {
            let suffix = format!(": {message}");
            let duplicate = errors
                .iter()
                .any(|existing| existing == &message || existing.ends_with(&suffix));
            if !duplicate {
                errors.push(message);
            }
        }
        errors
    };

    ValidationErrors::check(errors)?;
    structural
}
