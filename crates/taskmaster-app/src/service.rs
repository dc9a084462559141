//! Validation-first façade over [`ClientStore`].
//!
//! Raw JSON payloads go through the full create or update rules before the
//! store sees them, so rejected input never produces an optimistic change.

use serde_json::Value;
use taskmaster_core::id::TaskId;
use taskmaster_core::task::Task;
use taskmaster_core::validate::{
    ValidationErrors, validate_create_operation_at, validate_update_operation_at,
};
use time::OffsetDateTime;
use tracing::debug;

use crate::client_store::{ClientStore, SyncError};
use crate::remote::TaskRemote;

/// Why a submitted change did not go through.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The input failed validation; the remote was not contacted.
    #[error("invalid input: {0}")]
    Invalid(#[from] ValidationErrors),
    /// The remote call failed and any local change was rolled back.
    #[error(transparent)]
    Sync(#[from] SyncError),
    /// The task is not in the local list.
    #[error("task {0} not found")]
    NotFound(TaskId),
}

/// Service façade that validates raw input before it reaches the store.
pub struct TaskService<R> {
    store: ClientStore<R>,
}

impl<R> TaskService<R> {
    /// Wrap an existing store.
    pub const fn new(store: ClientStore<R>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub const fn store(&self) -> &ClientStore<R> {
        &self.store
    }
}

impl<R: TaskRemote> TaskService<R> {
    /// Validate a create payload and add the task.
    ///
    /// # Errors
    /// Returns [`SubmitError::Invalid`] with every validation message, or
    /// [`SubmitError::Sync`] when the remote insert fails.
    pub async fn create(&self, raw: &Value) -> Result<Task, SubmitError> {
        self.create_at(raw, OffsetDateTime::now_utc()).await
    }

    /// [`create`](Self::create) with an explicit clock for the due-date rule.
    ///
    /// # Errors
    /// Same as [`create`](Self::create).
    pub async fn create_at(&self, raw: &Value, now: OffsetDateTime) -> Result<Task, SubmitError> {
        let input = validate_create_operation_at(raw, now)?;
        debug!(title = %input.title, "submitting new task");
        Ok(self.store.add(input).await?)
    }

    /// Validate an update payload, merge it into the listed task and persist
    /// the result.
    ///
    /// # Errors
    /// Returns [`SubmitError::Invalid`] for rejected input,
    /// [`SubmitError::NotFound`] when `id` is not listed, or
    /// [`SubmitError::Sync`] when the remote update fails.
    pub async fn edit(&self, id: TaskId, raw: &Value) -> Result<Task, SubmitError> {
        let now = OffsetDateTime::now_utc();
        let changes = validate_update_operation_at(raw, now)?;

        let mut task = self
            .store
            .tasks()
            .await
            .into_iter()
            .find(|task| task.id == id)
            .ok_or(SubmitError::NotFound(id))?;
        changes.apply_to(&mut task);
        if !task.is_completed {
            task.completed_at = None;
        }
        task.updated_at = now;

        self.store.update(task.clone()).await?;
        Ok(task)
    }

    /// Mark a task completed or open.
    ///
    /// # Errors
    /// Returns [`SubmitError::Sync`] when the remote update fails.
    pub async fn set_completed(&self, id: TaskId, completed: bool) -> Result<(), SubmitError> {
        Ok(self.store.toggle_complete(id, completed).await?)
    }

    /// Delete a task.
    ///
    /// # Errors
    /// Returns [`SubmitError::Sync`] when the remote delete fails.
    pub async fn delete(&self, id: TaskId) -> Result<(), SubmitError> {
        Ok(self.store.remove(id).await?)
    }
}
