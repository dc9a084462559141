//! Task entity and its input/storage variants.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::id::TaskId;
use crate::schema::{SortDirection, SortType, TaskCategory, TaskPriority};

/// Wire/domain form of a task. Unset optional fields are absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Task {
    /// Server-assigned identifier.
    pub id: TaskId,
    /// Trimmed title.
    pub title: String,
    /// Optional trimmed description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Completion flag.
    pub is_completed: bool,
    /// Creation timestamp (server-managed).
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Set exactly when the task is completed.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub completed_at: Option<OffsetDateTime>,
    /// Optional deadline.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub due_date: Option<OffsetDateTime>,
    /// Optional category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<TaskCategory>,
    /// Priority.
    pub priority: TaskPriority,
    /// Owner, reserved for multi-user mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    /// Last modification timestamp (server-managed).
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Task {
    /// A task is overdue when it is open and its due date has passed.
    #[must_use]
    pub fn is_overdue(&self, now: OffsetDateTime) -> bool {
        !self.is_completed && self.due_date.is_some_and(|due| due < now)
    }

    /// Set or clear completion, keeping `completed_at` consistent with the flag.
    pub fn set_completed(&mut self, completed: bool, now: OffsetDateTime) {
        self.is_completed = completed;
        self.completed_at = completed.then_some(now);
    }
}

/// Storage form of a task. Unset optional fields are explicit `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskDbRecord {
    /// Primary key.
    pub id: TaskId,
    /// Title column.
    pub title: String,
    /// Nullable description column.
    pub description: Option<String>,
    /// Completion flag column.
    pub is_completed: bool,
    /// Creation timestamp column.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Nullable completion timestamp column.
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    /// Nullable due date column.
    #[serde(with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    /// Nullable category column.
    pub category: Option<TaskCategory>,
    /// Priority column.
    pub priority: TaskPriority,
    /// Nullable owner column.
    pub user_id: Option<Uuid>,
    /// Modification timestamp column.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<TaskDbRecord> for Task {
    fn from(record: TaskDbRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            is_completed: record.is_completed,
            created_at: record.created_at,
            completed_at: record.completed_at,
            due_date: record.due_date,
            category: record.category,
            priority: record.priority,
            user_id: record.user_id,
            updated_at: record.updated_at,
        }
    }
}

impl From<Task> for TaskDbRecord {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            is_completed: task.is_completed,
            created_at: task.created_at,
            completed_at: task.completed_at,
            due_date: task.due_date,
            category: task.category,
            priority: task.priority,
            user_id: task.user_id,
            updated_at: task.updated_at,
        }
    }
}

/// Storage row for an insert: every column except the server-managed ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskInsertRecord {
    /// Title column.
    pub title: String,
    /// Nullable description column.
    pub description: Option<String>,
    /// Always `false` on insert.
    pub is_completed: bool,
    /// Always `null` on insert.
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    /// Nullable due date column.
    #[serde(with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    /// Nullable category column.
    pub category: Option<TaskCategory>,
    /// Priority column.
    pub priority: TaskPriority,
    /// Nullable owner column.
    pub user_id: Option<Uuid>,
}

/// Fields accepted when creating a task. The server fills id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskCreateInput {
    /// Required title.
    pub title: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional deadline.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub due_date: Option<OffsetDateTime>,
    /// Optional category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<TaskCategory>,
    /// Priority, medium when omitted.
    #[serde(default)]
    pub priority: TaskPriority,
    /// Optional owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
}

impl TaskCreateInput {
    /// Input with only a title; every other field takes its default.
    #[must_use]
    pub fn with_defaults(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            due_date: None,
            category: None,
            priority: TaskPriority::default(),
            user_id: None,
        }
    }

    /// Storage row for inserting this input.
    #[must_use]
    pub fn to_insert_record(&self) -> TaskInsertRecord {
        TaskInsertRecord {
            title: self.title.clone(),
            description: self.description.clone(),
            is_completed: false,
            completed_at: None,
            due_date: self.due_date,
            category: self.category,
            priority: self.priority,
            user_id: self.user_id,
        }
    }
}

impl From<TaskInsertRecord> for TaskCreateInput {
    fn from(record: TaskInsertRecord) -> Self {
        Self {
            title: record.title,
            description: record.description,
            due_date: record.due_date,
            category: record.category,
            priority: record.priority,
            user_id: record.user_id,
        }
    }
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskUpdateInput {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New completion flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    /// New completion timestamp.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub completed_at: Option<OffsetDateTime>,
    /// New deadline.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub due_date: Option<OffsetDateTime>,
    /// New category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<TaskCategory>,
    /// New priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    /// New owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
}

impl TaskUpdateInput {
    /// Patch that only touches completion state.
    #[must_use]
    pub fn completion(completed: bool, completed_at: Option<OffsetDateTime>) -> Self {
        Self {
            is_completed: Some(completed),
            completed_at,
            ..Self::default()
        }
    }

    /// True when the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Overwrite the fields of `task` that this patch sets. Completion
    /// timestamps are copied as given; keeping them consistent with the flag
    /// is up to the caller.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title.clone_from(title);
        }
        if let Some(description) = &self.description {
            task.description = Some(description.clone());
        }
        if let Some(completed) = self.is_completed {
            task.is_completed = completed;
        }
        if let Some(completed_at) = self.completed_at {
            task.completed_at = Some(completed_at);
        }
        if let Some(due_date) = self.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(category) = self.category {
            task.category = Some(category);
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(user_id) = self.user_id {
            task.user_id = Some(user_id);
        }
    }
}

impl From<&Task> for TaskUpdateInput {
    /// Every mutable field of `task`. Unset optionals stay absent, so an update
    /// built this way never clears a column.
    fn from(task: &Task) -> Self {
        Self {
            title: Some(task.title.clone()),
            description: task.description.clone(),
            is_completed: Some(task.is_completed),
            completed_at: task.completed_at,
            due_date: task.due_date,
            category: task.category,
            priority: Some(task.priority),
            user_id: task.user_id,
        }
    }
}

/// Criteria for querying tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskFilterOptions {
    /// Only this category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<TaskCategory>,
    /// Only this priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    /// Only completed or only open tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    /// Only tasks owned by this user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    /// Due strictly before this instant.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub due_before: Option<OffsetDateTime>,
    /// Due strictly after this instant.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub due_after: Option<OffsetDateTime>,
}

impl TaskFilterOptions {
    /// Whether `task` satisfies every configured criterion.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        if self.category.is_some_and(|category| task.category != Some(category)) {
            return false;
        }
        if self.priority.is_some_and(|priority| task.priority != priority) {
            return false;
        }
        if self.is_completed.is_some_and(|completed| task.is_completed != completed) {
            return false;
        }
        if self.user_id.is_some_and(|user| task.user_id != Some(user)) {
            return false;
        }
        if let Some(before) = self.due_before
            && !task.due_date.is_some_and(|due| due < before)
        {
            return false;
        }
        if let Some(after) = self.due_after
            && !task.due_date.is_some_and(|due| due > after)
        {
            return false;
        }
        true
    }
}

/// Sort key plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskSortOptions {
    /// Sort key.
    pub field: SortType,
    /// Direction.
    pub direction: SortDirection,
}
