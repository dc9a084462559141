//! In-memory task list with optimistic mutations reconciled against a
//! [`TaskRemote`].

use anyhow::Error;
use std::sync::Arc;
use taskmaster_core::id::TaskId;
use taskmaster_core::task::{Task, TaskCreateInput, TaskUpdateInput};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::remote::TaskRemote;

/// Failure of a single store operation. The display text is the message kept
/// in [`StoreState::error`].
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Listing tasks failed.
    #[error("Failed to load tasks")]
    Load(#[source] Error),
    /// Creating a task failed.
    #[error("Failed to add task")]
    Add(#[source] Error),
    /// Toggling or updating a task failed.
    #[error("Failed to update task")]
    Update(#[source] Error),
    /// Deleting a task failed.
    #[error("Failed to delete task")]
    Delete(#[source] Error),
}

/// Observable state of the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreState {
    /// Tasks in display order.
    pub tasks: Vec<Task>,
    /// A load is in flight (true until the first load settles).
    pub is_loading: bool,
    /// The last remote call succeeded.
    pub is_connected: bool,
    /// Message of the last failed operation.
    pub error: Option<String>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            is_loading: true,
            is_connected: true,
            error: None,
        }
    }
}

impl StoreState {
    fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    /// Swap in `task` for the entry with the same id, returning the old copy.
    fn replace(&mut self, task: Task) -> Option<Task> {
        let index = self.position(task.id)?;
        Some(std::mem::replace(&mut self.tasks[index], task))
    }

    /// Put back a pre-mutation copy if the task is still listed.
    fn restore(&mut self, previous: Task) {
        if self.replace(previous).is_none() {
            debug!("rollback target is no longer listed");
        }
    }

    fn take(&mut self, id: TaskId) -> Option<(usize, Task)> {
        let index = self.position(id)?;
        Some((index, self.tasks.remove(index)))
    }

    /// Re-insert a removed task near its former position unless it came back.
    fn reinsert(&mut self, index: usize, task: Task) {
        if self.position(task.id).is_none() {
            let index = index.min(self.tasks.len());
            self.tasks.insert(index, task);
        }
    }

    const fn succeed(&mut self) {
        self.is_connected = true;
    }

    fn fail(&mut self, error: SyncError) -> SyncError {
        match std::error::Error::source(&error) {
            Some(source) => warn!("{error}: {source}"),
            None => warn!("{error}"),
        }
        self.is_connected = false;
        self.error = Some(error.to_string());
        error
    }
}

/// Controller owning the client-side task list.
///
/// Mutations lock the state only to apply or roll back local changes; the lock
/// is released while the remote call is pending, so several operations may be
/// in flight at once. A failed mutation rolls back only the task it touched.
pub struct ClientStore<R> {
    remote: R,
    state: Arc<Mutex<StoreState>>,
}

impl<R: Clone> Clone for ClientStore<R> {
    /// Clones share the same task list.
    fn clone(&self) -> Self {
        Self {
            remote: self.remote.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<R> ClientStore<R> {
    /// Create a store in its initial state: no tasks, loading, connected.
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            state: Arc::new(Mutex::new(StoreState::default())),
        }
    }

    /// Access the underlying remote.
    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// Clone of the current state.
    pub async fn snapshot(&self) -> StoreState {
        self.state.lock().await.clone()
    }

    /// Clone of the current task list.
    pub async fn tasks(&self) -> Vec<Task> {
        self.state.lock().await.tasks.clone()
    }
}

impl<R: TaskRemote> ClientStore<R> {
    /// Replace the local list with the remote one.
    ///
    /// The current list is kept when the remote call fails.
    ///
    /// # Errors
    /// Returns [`SyncError::Load`] when the remote listing fails.
    pub async fn load(&self) -> Result<(), SyncError> {
        {
            let mut state = self.state.lock().await;
            state.is_loading = true;
            state.error = None;
        }

        let result = self.remote.list_all().await;

        let mut state = self.state.lock().await;
        state.is_loading = false;
        match result {
            Ok(tasks) => {
                debug!(count = tasks.len(), "loaded tasks");
                state.tasks = tasks;
                state.succeed();
                Ok(())
            }
            Err(err) => Err(state.fail(SyncError::Load(err.into()))),
        }
    }

    /// Create a task remotely and prepend the server's copy once confirmed.
    ///
    /// # Errors
    /// Returns [`SyncError::Add`] when the remote rejects the insert; the list
    /// is left untouched.
    pub async fn add(&self, input: TaskCreateInput) -> Result<Task, SyncError> {
        let result = self.remote.create(input).await;

        let mut state = self.state.lock().await;
        match result {
            Ok(task) => {
                debug!(id = %task.id, "added task");
                state.tasks.insert(0, task.clone());
                state.succeed();
                Ok(task)
            }
            Err(err) => Err(state.fail(SyncError::Add(err.into()))),
        }
    }

    /// Set completion locally, then persist it.
    ///
    /// # Errors
    /// Returns [`SyncError::Update`] when the remote update fails; the task is
    /// restored to its previous completion state.
    pub async fn toggle_complete(&self, id: TaskId, completed: bool) -> Result<(), SyncError> {
        let now = OffsetDateTime::now_utc();
        let previous = {
            let mut state = self.state.lock().await;
            state.tasks.iter_mut().find(|task| task.id == id).map(|task| {
                let previous = task.clone();
                task.set_completed(completed, now);
                previous
            })
        };

        let changes = TaskUpdateInput::completion(completed, completed.then_some(now));
        let result = self.remote.update(id, changes).await;
        self.settle_update(result, previous).await
    }

    /// Replace the matching task locally, then persist every mutable field.
    ///
    /// # Errors
    /// Returns [`SyncError::Update`] when the remote update fails; the task is
    /// restored to its previous value.
    pub async fn update(&self, task: Task) -> Result<(), SyncError> {
        let id = task.id;
        let changes = TaskUpdateInput::from(&task);
        let previous = self.state.lock().await.replace(task);

        let result = self.remote.update(id, changes).await;
        self.settle_update(result, previous).await
    }

    /// Remove the task locally, then delete it remotely.
    ///
    /// # Errors
    /// Returns [`SyncError::Delete`] when the remote delete fails; the task is
    /// re-inserted at its former position.
    pub async fn remove(&self, id: TaskId) -> Result<(), SyncError> {
        let removed = self.state.lock().await.take(id);

        let result = self.remote.delete(id).await;

        let mut state = self.state.lock().await;
        match result {
            Ok(()) => {
                debug!(%id, "deleted task");
                state.succeed();
                Ok(())
            }
            Err(err) => {
                if let Some((index, task)) = removed {
                    state.reinsert(index, task);
                }
                Err(state.fail(SyncError::Delete(err.into())))
            }
        }
    }

    async fn settle_update(
        &self,
        result: Result<(), R::Error>,
        previous: Option<Task>,
    ) -> Result<(), SyncError> {
        let mut state = self.state.lock().await;
        match result {
            Ok(()) => {
                state.succeed();
                Ok(())
            }
            Err(err) => {
                if let Some(previous) = previous {
                    state.restore(previous);
                }
                Err(state.fail(SyncError::Update(err.into())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted_remote::{Call, Op, ScriptedRemote, sample_task};

    fn id(raw: u64) -> TaskId {
        TaskId::new(raw).unwrap_or_else(|| unreachable!("non-zero literal"))
    }

    async fn loaded(remote: ScriptedRemote) -> ClientStore<Arc<ScriptedRemote>> {
        let store = ClientStore::new(Arc::new(remote));
        if let Err(err) = store.load().await {
            panic!("initial load failed: {err}");
        }
        store
    }

    #[tokio::test]
    async fn initial_state_is_loading_and_connected() {
        let store = ClientStore::new(ScriptedRemote::default());
        let state = store.snapshot().await;
        assert!(state.tasks.is_empty());
        assert!(state.is_loading);
        assert!(state.is_connected);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn load_replaces_list_and_is_idempotent() {
        let remote = ScriptedRemote::with_tasks(vec![
            sample_task(2, "Second"),
            sample_task(1, "First"),
        ]);
        let store = loaded(remote).await;
        let first = store.snapshot().await;
        assert!(!first.is_loading);
        assert!(first.is_connected);

        assert!(store.load().await.is_ok());
        let second = store.snapshot().await;
        assert_eq!(first.tasks, second.tasks);
        assert_eq!(
            second.tasks.iter().map(|task| task.id.get()).collect::<Vec<_>>(),
            vec![2, 1]
        );
    }

    #[tokio::test]
    async fn failed_first_load_leaves_list_empty() {
        let remote = ScriptedRemote::default();
        remote.fail(Op::ListAll);
        let store = ClientStore::new(remote);

        let Err(err) = store.load().await else {
            panic!("load should fail");
        };
        assert!(matches!(err, SyncError::Load(_)));

        let state = store.snapshot().await;
        assert!(state.tasks.is_empty());
        assert!(!state.is_loading);
        assert!(!state.is_connected);
        assert_eq!(state.error.as_deref(), Some("Failed to load tasks"));
    }

    #[tokio::test]
    async fn reload_clears_previous_error() {
        let remote = Arc::new(ScriptedRemote::with_tasks(vec![sample_task(1, "Only")]));
        remote.fail(Op::ListAll);
        let store = ClientStore::new(Arc::clone(&remote));
        assert!(store.load().await.is_err());

        remote.succeed(Op::ListAll);
        assert!(store.load().await.is_ok());
        let state = store.snapshot().await;
        assert!(state.error.is_none());
        assert!(state.is_connected);
        assert_eq!(state.tasks.len(), 1);
    }

    #[tokio::test]
    async fn add_prepends_server_task() -> anyhow::Result<()> {
        let store = loaded(ScriptedRemote::with_tasks(vec![sample_task(1, "Existing")])).await;

        let created = store.add(TaskCreateInput::with_defaults("Buy milk")).await?;
        assert_eq!(created.id.get(), 2);

        let tasks = store.tasks().await;
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "Buy milk");
        assert_eq!(tasks[1].title, "Existing");
        Ok(())
    }

    #[tokio::test]
    async fn failed_add_leaves_list_untouched() {
        let remote = ScriptedRemote::with_tasks(vec![sample_task(1, "Existing")]);
        remote.fail(Op::Create);
        let store = loaded(remote).await;
        let before = store.tasks().await;

        let Err(err) = store.add(TaskCreateInput::with_defaults("Buy milk")).await else {
            panic!("add should fail");
        };
        assert_eq!(err.to_string(), "Failed to add task");

        let state = store.snapshot().await;
        assert_eq!(state.tasks, before);
        assert!(!state.is_connected);
        assert_eq!(state.error.as_deref(), Some("Failed to add task"));
    }

    #[tokio::test]
    async fn toggle_sets_completion_and_sends_same_fields() -> anyhow::Result<()> {
        let store = loaded(ScriptedRemote::with_tasks(vec![sample_task(1, "Walk")])).await;

        store.toggle_complete(id(1), true).await?;

        let tasks = store.tasks().await;
        assert!(tasks[0].is_completed);
        let completed_at = tasks[0].completed_at;
        assert!(completed_at.is_some());

        let calls = store.remote().calls();
        let Some(Call::Update(target, changes)) = calls.last() else {
            panic!("expected an update call, got {calls:?}");
        };
        assert_eq!(*target, id(1));
        assert_eq!(changes.is_completed, Some(true));
        assert_eq!(changes.completed_at, completed_at);
        Ok(())
    }

    #[tokio::test]
    async fn failed_toggle_restores_previous_state() {
        let remote = ScriptedRemote::with_tasks(vec![sample_task(1, "Walk")]);
        remote.fail(Op::Update);
        let store = loaded(remote).await;

        let Err(err) = store.toggle_complete(id(1), true).await else {
            panic!("toggle should fail");
        };
        assert!(matches!(err, SyncError::Update(_)));

        let state = store.snapshot().await;
        assert!(!state.tasks[0].is_completed);
        assert!(state.tasks[0].completed_at.is_none());
        assert!(!state.is_connected);
        assert_eq!(state.error.as_deref(), Some("Failed to update task"));
    }

    #[tokio::test]
    async fn uncompleting_clears_timestamp() -> anyhow::Result<()> {
        let mut done = sample_task(1, "Walk");
        done.set_completed(true, done.created_at);
        let store = loaded(ScriptedRemote::with_tasks(vec![done])).await;

        store.toggle_complete(id(1), false).await?;

        let tasks = store.tasks().await;
        assert!(!tasks[0].is_completed);
        assert!(tasks[0].completed_at.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn update_replaces_matching_task_only() -> anyhow::Result<()> {
        let store = loaded(ScriptedRemote::with_tasks(vec![
            sample_task(2, "Two"),
            sample_task(1, "One"),
        ]))
        .await;

        let mut edited = sample_task(1, "One, edited");
        edited.description = Some("details".into());
        store.update(edited.clone()).await?;

        let tasks = store.tasks().await;
        assert_eq!(tasks[0].title, "Two");
        assert_eq!(tasks[1], edited);
        Ok(())
    }

    #[tokio::test]
    async fn failed_update_restores_previous_value() {
        let remote = ScriptedRemote::with_tasks(vec![sample_task(1, "One")]);
        remote.fail(Op::Update);
        let store = loaded(remote).await;

        let edited = sample_task(1, "Changed");
        assert!(store.update(edited).await.is_err());
        assert_eq!(store.tasks().await[0].title, "One");
    }

    #[tokio::test]
    async fn remove_deletes_exactly_once() -> anyhow::Result<()> {
        let store = loaded(ScriptedRemote::with_tasks(vec![
            sample_task(2, "Two"),
            sample_task(1, "One"),
        ]))
        .await;

        store.remove(id(2)).await?;

        let state = store.snapshot().await;
        assert_eq!(state.tasks.len(), 1);
        assert_eq!(state.tasks[0].id, id(1));
        assert!(state.is_connected);
        assert_eq!(store.remote().delete_calls(id(2)), 1);
        Ok(())
    }

    #[tokio::test]
    async fn failed_remove_reinserts_at_former_index() {
        let remote = ScriptedRemote::with_tasks(vec![
            sample_task(3, "Three"),
            sample_task(2, "Two"),
            sample_task(1, "One"),
        ]);
        remote.fail(Op::Delete);
        let store = loaded(remote).await;
        let before = store.tasks().await;

        let Err(err) = store.remove(id(2)).await else {
            panic!("remove should fail");
        };
        assert_eq!(err.to_string(), "Failed to delete task");
        assert_eq!(store.tasks().await, before);
    }

    #[tokio::test]
    async fn mutating_unknown_task_still_reaches_remote() {
        let store = loaded(ScriptedRemote::default()).await;
        assert!(store.toggle_complete(id(42), true).await.is_ok());
        assert!(store.tasks().await.is_empty());
        assert!(matches!(
            store.remote().calls().last(),
            Some(Call::Update(target, _)) if *target == id(42)
        ));
    }

    /// A failing toggle that settles after a successful edit of another task
    /// must not undo that edit. Restoring a whole-list snapshot would.
    #[tokio::test]
    async fn concurrent_failure_rolls_back_only_its_own_task() {
        let remote = ScriptedRemote::with_tasks(vec![sample_task(2, "Two"), sample_task(1, "One")]);
        remote.fail_for(id(1));
        remote.hold_updates_for(id(1));
        let store = loaded(remote).await;

        let edited = sample_task(2, "Two, edited");
        let (toggle, ()) = tokio::join!(store.toggle_complete(id(1), true), async {
            store.remote().entered().notified().await;
            if let Err(err) = store.update(edited.clone()).await {
                panic!("unrelated update failed: {err}");
            }
            store.remote().release();
        });

        assert!(toggle.is_err());
        let tasks = store.tasks().await;
        assert_eq!(tasks[0], edited);
        assert!(!tasks[1].is_completed);
        assert!(tasks[1].completed_at.is_none());
    }
}
