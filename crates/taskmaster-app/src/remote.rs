//! Async boundary to the hosted task table.

use anyhow::Error;
use std::sync::Arc;
use taskmaster_core::id::TaskId;
use taskmaster_core::task::{Task, TaskCreateInput, TaskUpdateInput};

/// Capability the client store needs from the remote data source.
///
/// Implementations enforce the storage-side rules themselves (CHECK
/// constraints, server timestamps, the completion trigger); callers treat every
/// error the same way.
#[allow(async_fn_in_trait)]
pub trait TaskRemote: Send + Sync {
    /// Error type bubbled up from the backing store.
    type Error: Into<Error> + Send;

    /// Every task, newest first.
    ///
    /// # Errors
    /// Returns a remote-specific error when the listing fails.
    async fn list_all(&self) -> Result<Vec<Task>, Self::Error>;

    /// Insert a task and return it with its server-assigned fields.
    ///
    /// # Errors
    /// Returns a remote-specific error when the insert is rejected.
    async fn create(&self, input: TaskCreateInput) -> Result<Task, Self::Error>;

    /// Apply a partial update to the task with the given id.
    ///
    /// # Errors
    /// Returns a remote-specific error when the update is rejected.
    async fn update(&self, id: TaskId, changes: TaskUpdateInput) -> Result<(), Self::Error>;

    /// Delete the task with the given id.
    ///
    /// # Errors
    /// Returns a remote-specific error when the delete fails.
    async fn delete(&self, id: TaskId) -> Result<(), Self::Error>;
}

impl<R> TaskRemote for Arc<R>
where
    R: TaskRemote,
{
    type Error = R::Error;

    async fn list_all(&self) -> Result<Vec<Task>, Self::Error> {
        (**self).list_all().await
    }

    async fn create(&self, input: TaskCreateInput) -> Result<Task, Self::Error> {
        (**self).create(input).await
    }

    async fn update(&self, id: TaskId, changes: TaskUpdateInput) -> Result<(), Self::Error> {
        (**self).update(id, changes).await
    }

    async fn delete(&self, id: TaskId) -> Result<(), Self::Error> {
        (**self).delete(id).await
    }
}
