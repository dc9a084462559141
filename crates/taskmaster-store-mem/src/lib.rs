//! In-memory stand-in for the hosted `tasks` table.
//!
//! [`MemoryRemote`] behaves like the storage side of the system: it assigns
//! ids and timestamps, enforces the table's CHECK constraints, runs the
//! completion trigger and lists rows newest first.

mod error;

pub use error::MemoryRemoteError;

use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use taskmaster_app::remote::TaskRemote;
use taskmaster_core::id::TaskId;
use taskmaster_core::task::{Task, TaskCreateInput, TaskDbRecord, TaskUpdateInput};
use taskmaster_core::validate::{
    TaskFields, validate_business_constraints, validate_completion, validate_db_record,
};
use time::OffsetDateTime;
use tracing::{debug, info};

/// Result alias for remote operations.
pub type Result<T, E = MemoryRemoteError> = std::result::Result<T, E>;

/// Remote operation, used to schedule injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    /// `list_all`.
    ListAll,
    /// `create`.
    Create,
    /// `update`.
    Update,
    /// `delete`.
    Delete,
}

impl fmt::Display for RemoteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ListAll => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

impl FromStr for RemoteOp {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "list" | "load" => Ok(Self::ListAll),
            "create" | "add" => Ok(Self::Create),
            "update" | "edit" => Ok(Self::Update),
            "delete" | "rm" => Ok(Self::Delete),
            other => Err(format!(
                "unknown operation '{other}' (expected list, create, update or delete)"
            )),
        }
    }
}

/// Rows held in storage form, plus the id sequence and pending failures.
#[derive(Debug, Default)]
struct Table {
    rows: Vec<TaskDbRecord>,
    last_id: u64,
    pending_failures: HashSet<RemoteOp>,
}

impl Table {
    fn take_failure(&mut self, op: RemoteOp) -> Result<()> {
        if self.pending_failures.remove(&op) {
            debug!(%op, "injecting failure");
            return Err(MemoryRemoteError::Injected(op));
        }
        Ok(())
    }

    fn next_id(&mut self) -> Result<TaskId> {
        self.last_id += 1;
        TaskId::new(self.last_id).ok_or_else(|| {
            MemoryRemoteError::CheckViolation("id sequence produced zero".into())
        })
    }

    fn position(&self, id: TaskId) -> Result<usize> {
        self.rows
            .iter()
            .position(|row| row.id == id)
            .ok_or(MemoryRemoteError::TaskNotFound(id))
    }
}

/// Task table kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    table: Mutex<Table>,
}

impl MemoryRemote {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table pre-filled with storage rows. The id sequence continues after the
    /// largest id present.
    #[must_use]
    pub fn from_records(rows: Vec<TaskDbRecord>) -> Self {
        let last_id = rows.iter().map(|row| row.id.get()).max().unwrap_or(0);
        Self {
            table: Mutex::new(Table {
                rows,
                last_id,
                pending_failures: HashSet::new(),
            }),
        }
    }

    /// Table seeded from a JSON array of storage records, each validated.
    ///
    /// # Errors
    /// Returns [`MemoryRemoteError::SeedNotArray`] for non-array input,
    /// [`MemoryRemoteError::InvalidSeed`] for the first malformed record, or
    /// [`MemoryRemoteError::SeedCheckViolation`] for a record whose completion
    /// flag and timestamp disagree.
    pub fn from_seed_json(raw: &Value) -> Result<Self> {
        let Value::Array(items) = raw else {
            return Err(MemoryRemoteError::SeedNotArray);
        };
        let rows = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let record = validate_db_record(item)
                    .map_err(|errors| MemoryRemoteError::InvalidSeed { index, errors })?;
                match completion_violation(&Task::from(record.clone())) {
                    Some(reason) => Err(MemoryRemoteError::SeedCheckViolation { index, reason }),
                    None => Ok(record),
                }
            })
            .collect::<Result<Vec<_>>>()?;
        info!(count = rows.len(), "seeded in-memory remote");
        Ok(Self::from_records(rows))
    }

    /// Table seeded from a JSON file; see [`from_seed_json`](Self::from_seed_json).
    ///
    /// # Errors
    /// Returns an error when the file cannot be read or parsed, or holds an
    /// invalid record.
    pub fn open_seed(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let raw: Value = serde_json::from_str(&contents)?;
        Self::from_seed_json(&raw)
    }

    /// Make the next call of `op` fail once.
    ///
    /// # Errors
    /// Returns [`MemoryRemoteError::LockError`] when the table lock is poisoned.
    pub fn fail_next(&self, op: RemoteOp) -> Result<()> {
        self.lock()?.pending_failures.insert(op);
        Ok(())
    }

    /// Copy of every row in storage form, in insertion order.
    ///
    /// # Errors
    /// Returns [`MemoryRemoteError::LockError`] when the table lock is poisoned.
    pub fn records(&self) -> Result<Vec<TaskDbRecord>> {
        Ok(self.lock()?.rows.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Table>> {
        self.table.lock().map_err(|_| MemoryRemoteError::LockError)
    }

    fn check_constraints(fields: &TaskFields<'_>) -> Result<()> {
        let violations = validate_business_constraints(fields);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(MemoryRemoteError::CheckViolation(violations.join("; ")))
        }
    }

    fn list_rows(&self) -> Result<Vec<Task>> {
        let mut table = self.lock()?;
        table.take_failure(RemoteOp::ListAll)?;
        let mut tasks: Vec<Task> = table.rows.iter().cloned().map(Task::from).collect();
        drop(table);
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tasks)
    }

    fn insert_row(&self, input: &TaskCreateInput) -> Result<Task> {
        let mut table = self.lock()?;
        table.take_failure(RemoteOp::Create)?;
        Self::check_constraints(&TaskFields::from(input))?;

        let now = OffsetDateTime::now_utc();
        let record = input.to_insert_record();
        let row = TaskDbRecord {
            id: table.next_id()?,
            title: record.title,
            description: record.description,
            is_completed: record.is_completed,
            created_at: now,
            completed_at: record.completed_at,
            due_date: record.due_date,
            category: record.category,
            priority: record.priority,
            user_id: record.user_id,
            updated_at: now,
        };
        table.rows.push(row.clone());
        drop(table);
        info!(id = %row.id, "inserted task");
        Ok(Task::from(row))
    }

    fn update_row(&self, id: TaskId, changes: &TaskUpdateInput) -> Result<()> {
        let mut table = self.lock()?;
        table.take_failure(RemoteOp::Update)?;
        let index = table.position(id)?;

        let mut task = Task::from(table.rows[index].clone());
        let was_completed = task.is_completed;
        changes.apply_to(&mut task);
        Self::check_constraints(&TaskFields::from(&task))?;

        let now = OffsetDateTime::now_utc();
        if task.is_completed && !was_completed && task.completed_at.is_none() {
            task.completed_at = Some(now);
        }
        if !task.is_completed && was_completed {
            task.completed_at = None;
        }
        task.updated_at = now;
        if let Some(reason) = completion_violation(&task) {
            return Err(MemoryRemoteError::CheckViolation(reason));
        }

        table.rows[index] = TaskDbRecord::from(task);
        drop(table);
        debug!(%id, "updated task");
        Ok(())
    }

    fn delete_row(&self, id: TaskId) -> Result<()> {
        let mut table = self.lock()?;
        table.take_failure(RemoteOp::Delete)?;
        let index = table.position(id)?;
        table.rows.remove(index);
        drop(table);
        info!(%id, "deleted task");
        Ok(())
    }
}

/// Completion flag and timestamp must agree on every stored row.
fn completion_violation(task: &Task) -> Option<String> {
    let violations = validate_completion(&TaskFields::from(task));
    (!violations.is_empty()).then(|| violations.join("; "))
}

impl TaskRemote for MemoryRemote {
    type Error = MemoryRemoteError;

    async fn list_all(&self) -> Result<Vec<Task>> {
        self.list_rows()
    }

    async fn create(&self, input: TaskCreateInput) -> Result<Task> {
        self.insert_row(&input)
    }

    async fn update(&self, id: TaskId, changes: TaskUpdateInput) -> Result<()> {
        self.update_row(id, &changes)
    }

    async fn delete(&self, id: TaskId) -> Result<()> {
        self.delete_row(id)
    }
}
