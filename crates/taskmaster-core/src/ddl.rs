//! PostgreSQL definition of the `tasks` table, rendered from the schema
//! constants so the storage CHECKs cannot drift from the validator.

use crate::schema::{
    DEFAULT_PRIORITY, DESCRIPTION_MAX_LENGTH, SchemaEnum, TITLE_MAX_LENGTH, TITLE_MIN_LENGTH,
    TaskCategory, TaskPriority,
};

/// Name of the backing table.
pub const TABLE_NAME: &str = "tasks";

/// Index names created by [`indexes`].
pub const INDEX_NAMES: [&str; 5] = [
    "idx_tasks_created_at_desc",
    "idx_tasks_composite_filter",
    "idx_tasks_user_id",
    "idx_tasks_due_date",
    "idx_tasks_overdue",
];

/// Trigger names created by [`triggers`].
pub const TRIGGER_NAMES: [&str; 2] = ["update_tasks_updated_at", "handle_tasks_completion"];

/// `CREATE TABLE` statement.
#[must_use]
pub fn table() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {TABLE_NAME} (
  id BIGSERIAL PRIMARY KEY,
  title TEXT NOT NULL CHECK (length(title) >= {TITLE_MIN_LENGTH} AND length(title) <= {TITLE_MAX_LENGTH}),
  description TEXT CHECK (length(description) <= {DESCRIPTION_MAX_LENGTH}),
  is_completed BOOLEAN NOT NULL DEFAULT FALSE,
  created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
  completed_at TIMESTAMPTZ,
  due_date TIMESTAMPTZ,
  category TEXT CHECK (category IN ({categories})),
  priority TEXT NOT NULL DEFAULT '{default_priority}' CHECK (priority IN ({priorities})),
  user_id UUID,
  updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
",
        categories = sql_list::<TaskCategory>(),
        priorities = sql_list::<TaskPriority>(),
        default_priority = DEFAULT_PRIORITY.as_str(),
    )
}

/// Index statements, one per entry of [`INDEX_NAMES`].
#[must_use]
pub fn indexes() -> String {
    let [created, composite, user, due, overdue] = INDEX_NAMES;
    format!(
        "CREATE INDEX IF NOT EXISTS {created} ON {TABLE_NAME} (created_at DESC);
CREATE INDEX IF NOT EXISTS {composite} ON {TABLE_NAME} (is_completed, category, priority, due_date);
CREATE INDEX IF NOT EXISTS {user} ON {TABLE_NAME} (user_id) WHERE user_id IS NOT NULL;
CREATE INDEX IF NOT EXISTS {due} ON {TABLE_NAME} (due_date) WHERE due_date IS NOT NULL;
CREATE INDEX IF NOT EXISTS {overdue} ON {TABLE_NAME} (due_date, is_completed)
  WHERE due_date IS NOT NULL AND is_completed = FALSE;
"
    )
}

/// Trigger functions keeping `updated_at` fresh and `completed_at` in step
/// with `is_completed`.
#[must_use]
pub fn triggers() -> String {
    let [updated, completion] = TRIGGER_NAMES;
    format!(
        "CREATE OR REPLACE FUNCTION update_updated_at_column()
RETURNS TRIGGER AS $$
BEGIN
  NEW.updated_at = NOW();
  RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER {updated}
  BEFORE UPDATE ON {TABLE_NAME}
  FOR EACH ROW
  EXECUTE FUNCTION update_updated_at_column();

CREATE OR REPLACE FUNCTION handle_task_completion()
RETURNS TRIGGER AS $$
BEGIN
  IF NEW.is_completed = TRUE AND OLD.is_completed = FALSE AND NEW.completed_at IS NULL THEN
    NEW.completed_at = NOW();
  END IF;
  IF NEW.is_completed = FALSE AND OLD.is_completed = TRUE THEN
    NEW.completed_at = NULL;
  END IF;
  RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER {completion}
  BEFORE UPDATE ON {TABLE_NAME}
  FOR EACH ROW
  EXECUTE FUNCTION handle_task_completion();
"
    )
}

/// Table, indexes and triggers as one script.
#[must_use]
pub fn complete_schema() -> String {
    format!("{}\n{}\n{}", table(), indexes(), triggers())
}

fn sql_list<T: SchemaEnum>() -> String {
    T::values()
        .iter()
        .map(|value| format!("'{value}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
