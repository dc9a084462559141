//! Scripted [`TaskRemote`] for unit tests: records calls, injects failures and
//! can park updates until released.

use anyhow::{Result, bail};
use std::collections::HashSet;
use std::sync::Mutex;
use taskmaster_core::id::TaskId;
use taskmaster_core::schema::TaskPriority;
use taskmaster_core::task::{Task, TaskCreateInput, TaskUpdateInput};
use time::OffsetDateTime;
use time::macros::datetime;
use tokio::sync::Notify;

use crate::remote::TaskRemote;

pub fn sample_task(id: u64, title: &str) -> Task {
    let offset = time::Duration::minutes(i64::try_from(id).unwrap_or_default());
    let created_at = datetime!(2025-11-01 09:00 UTC) + offset;
    Task {
        id: TaskId::new(id).expect("non-zero id"),
        title: title.into(),
        description: None,
        is_completed: false,
        created_at,
        completed_at: None,
        due_date: None,
        category: None,
        priority: TaskPriority::Medium,
        user_id: None,
        updated_at: created_at,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListAll,
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListAll,
    Create(TaskCreateInput),
    Update(TaskId, TaskUpdateInput),
    Delete(TaskId),
}

#[derive(Default)]
pub struct ScriptedRemote {
    inner: Mutex<ScriptedInner>,
    entered: Notify,
    gate: Notify,
}

#[derive(Default)]
struct ScriptedInner {
    tasks: Vec<Task>,
    failing_ops: HashSet<Op>,
    failing_ids: HashSet<TaskId>,
    held: Option<TaskId>,
    calls: Vec<Call>,
}

impl ScriptedRemote {
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let remote = Self::default();
        remote.inner.lock().expect("lock remote").tasks = tasks;
        remote
    }

    pub fn fail(&self, op: Op) {
        self.inner.lock().expect("lock remote").failing_ops.insert(op);
    }

    pub fn succeed(&self, op: Op) {
        self.inner.lock().expect("lock remote").failing_ops.remove(&op);
    }

    /// Fail updates and deletes that target `id`.
    pub fn fail_for(&self, id: TaskId) {
        self.inner.lock().expect("lock remote").failing_ids.insert(id);
    }

    /// Park updates of `id` until [`release`](Self::release) is called.
    pub fn hold_updates_for(&self, id: TaskId) {
        self.inner.lock().expect("lock remote").held = Some(id);
    }

    /// Signalled when a held update is parked.
    pub const fn entered(&self) -> &Notify {
        &self.entered
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().expect("lock remote").calls.clone()
    }

    pub fn delete_calls(&self, id: TaskId) -> usize {
        self.inner
            .lock()
            .expect("lock remote")
            .calls
            .iter()
            .filter(|call| matches!(call, Call::Delete(target) if *target == id))
            .count()
    }

    fn record(&self, call: Call, op: Op, id: Option<TaskId>) -> (bool, bool) {
        let mut inner = self.inner.lock().expect("lock remote");
        inner.calls.push(call);
        let failing = inner.failing_ops.contains(&op)
            || id.is_some_and(|id| inner.failing_ids.contains(&id));
        let held = id.is_some() && inner.held == id;
        (failing, held)
    }
}

impl TaskRemote for ScriptedRemote {
    type Error = anyhow::Error;

    async fn list_all(&self) -> Result<Vec<Task>> {
        let (failing, _) = self.record(Call::ListAll, Op::ListAll, None);
        if failing {
            bail!("list rejected");
        }
        Ok(self.inner.lock().expect("lock remote").tasks.clone())
    }

    async fn create(&self, input: TaskCreateInput) -> Result<Task> {
        let (failing, _) = self.record(Call::Create(input.clone()), Op::Create, None);
        if failing {
            bail!("insert rejected");
        }
        let mut inner = self.inner.lock().expect("lock remote");
        let next = inner.tasks.iter().map(|task| task.id.get()).max().unwrap_or(0) + 1;
        let now = OffsetDateTime::now_utc();
        let task = Task {
            id: TaskId::new(next).expect("non-zero id"),
            title: input.title,
            description: input.description,
            is_completed: false,
            created_at: now,
            completed_at: None,
            due_date: input.due_date,
            category: input.category,
            priority: input.priority,
            user_id: input.user_id,
            updated_at: now,
        };
        inner.tasks.insert(0, task.clone());
        drop(inner);
        Ok(task)
    }

    async fn update(&self, id: TaskId, changes: TaskUpdateInput) -> Result<()> {
        let (failing, held) = self.record(Call::Update(id, changes), Op::Update, Some(id));
        if held {
            self.entered.notify_one();
            self.gate.notified().await;
        }
        if failing {
            bail!("update rejected for {id}");
        }
        Ok(())
    }

    async fn delete(&self, id: TaskId) -> Result<()> {
        let (failing, _) = self.record(Call::Delete(id), Op::Delete, Some(id));
        if failing {
            bail!("delete rejected for {id}");
        }
        self.inner
            .lock()
            .expect("lock remote")
            .tasks
            .retain(|task| task.id != id);
        Ok(())
    }
}
