//! Line-oriented session against the client store and the in-memory remote.

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Value, json};
use taskmaster_app::{ClientStore, SubmitError, TaskQuery, TaskService, TaskStats};
use taskmaster_core::display::TaskDisplay;
use taskmaster_core::id::TaskId;
use taskmaster_core::schema::{FilterType, SortDirection, SortType};
use taskmaster_store_mem::{MemoryRemote, RemoteOp};
use time::OffsetDateTime;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::commands::{render_stats, render_task_table};

const PROMPT: &str = "taskmaster> ";

const HELP: &str = "\
add <title> | add '<json>'     create a task
done <id> / undo <id>          mark completed or open
edit <id> '<json>'             change fields
rm <id>                        delete a task
ls [all|active|completed]      list tasks
sort <field> [asc|desc]        order by created, due, title or priority
find [text]                    search; no text clears
stats                          summary counts
load                           reload from the remote
fail <op>                      make the next list/create/update/delete fail
quit                           leave
";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Add(Value),
    Done(TaskId),
    Undo(TaskId),
    Edit(TaskId, Value),
    Rm(TaskId),
    Ls(Option<FilterType>),
    Sort(SortType, Option<SortDirection>),
    Find(String),
    Stats,
    Load,
    Fail(RemoteOp),
    Help,
    Quit,
}

impl ShellCommand {
    /// Parse a line; blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let words = shell_words::split(line).map_err(|err| anyhow!("cannot parse line: {err}"))?;
        let Some((name, args)) = words.split_first() else {
            return Ok(None);
        };

        let command = match name.as_str() {
            "add" => Self::Add(create_payload(args)?),
            "done" => Self::Done(single_id(args)?),
            "undo" => Self::Undo(single_id(args)?),
            "edit" => {
                let Some((id, rest)) = args.split_first() else {
                    bail!("usage: edit <id> '<json>'");
                };
                let id = id.parse::<TaskId>()?;
                let payload = serde_json::from_str(&rest.join(" "))
                    .context("edit expects a JSON object")?;
                Self::Edit(id, payload)
            }
            "rm" => Self::Rm(single_id(args)?),
            "ls" => match args {
                [] => Self::Ls(None),
                [filter] => Self::Ls(Some(filter.parse()?)),
                _ => bail!("usage: ls [all|active|completed]"),
            },
            "sort" => match args {
                [field] => Self::Sort(field.parse()?, None),
                [field, direction] => Self::Sort(field.parse()?, Some(direction.parse()?)),
                _ => bail!("usage: sort <field> [asc|desc]"),
            },
            "find" => Self::Find(args.join(" ")),
            "stats" => Self::Stats,
            "load" => Self::Load,
            "fail" => match args {
                [op] => Self::Fail(op.parse().map_err(|err: String| anyhow!(err))?),
                _ => bail!("usage: fail <list|create|update|delete>"),
            },
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => bail!("unknown command '{other}', try 'help'"),
        };
        Ok(Some(command))
    }
}

/// A bare title, or a JSON object when the only argument looks like one.
fn create_payload(args: &[String]) -> Result<Value> {
    match args {
        [] => bail!("usage: add <title>"),
        [single] if single.trim_start().starts_with('{') => {
            serde_json::from_str(single).context("add expects a title or a JSON object")
        }
        words => Ok(json!({ "title": words.join(" ") })),
    }
}

fn single_id(args: &[String]) -> Result<TaskId> {
    match args {
        [id] => Ok(id.parse()?),
        _ => bail!("expected exactly one task id"),
    }
}

/// Reply to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

/// Session state: the service plus the current listing query.
pub struct Session {
    service: TaskService<Arc<MemoryRemote>>,
    query: TaskQuery,
}

impl Session {
    pub fn new(remote: MemoryRemote, query: TaskQuery) -> Self {
        let store = ClientStore::new(Arc::new(remote));
        Self {
            service: TaskService::new(store),
            query,
        }
    }

    const fn store(&self) -> &ClientStore<Arc<MemoryRemote>> {
        self.service.store()
    }

    pub async fn execute(&mut self, command: ShellCommand) -> Reply {
        debug!(?command, "shell command");
        let text = match command {
            ShellCommand::Quit => return Reply::Quit,
            ShellCommand::Help => HELP.to_owned(),
            ShellCommand::Add(raw) => match self.service.create(&raw).await {
                Ok(task) => format!("added {}: {}\n", task.id, task.title),
                Err(err) => describe(&err),
            },
            ShellCommand::Done(id) => self.set_completed(id, true).await,
            ShellCommand::Undo(id) => self.set_completed(id, false).await,
            ShellCommand::Edit(id, raw) => match self.service.edit(id, &raw).await {
                Ok(task) => format!("updated {}: {}\n", task.id, task.title),
                Err(err) => describe(&err),
            },
            ShellCommand::Rm(id) => match self.service.delete(id).await {
                Ok(()) => format!("deleted {id}\n"),
                Err(err) => describe(&err),
            },
            ShellCommand::Ls(filter) => {
                if let Some(filter) = filter {
                    self.query = self.query.clone().with_filter(filter);
                }
                self.listing().await
            }
            ShellCommand::Sort(sort, direction) => {
                let query = self.query.clone().with_sort(sort);
                self.query = match direction {
                    Some(direction) => query.with_direction(direction),
                    None => query,
                };
                self.listing().await
            }
            ShellCommand::Find(text) => {
                self.query = self.query.clone().with_search(&text);
                self.listing().await
            }
            ShellCommand::Stats => {
                let tasks = self.store().tasks().await;
                render_stats(&TaskStats::compute(&tasks, OffsetDateTime::now_utc()))
            }
            ShellCommand::Load => match self.store().load().await {
                Ok(()) => format!("loaded {} task(s)\n", self.store().tasks().await.len()),
                Err(err) => format!("error: {err}\n"),
            },
            ShellCommand::Fail(op) => match self.store().remote().fail_next(op) {
                Ok(()) => format!("next {op} will fail\n"),
                Err(err) => format!("error: {err}\n"),
            },
        };
        Reply::Text(text)
    }

    async fn set_completed(&self, id: TaskId, completed: bool) -> String {
        match self.service.set_completed(id, completed).await {
            Ok(()) if completed => format!("completed {id}\n"),
            Ok(()) => format!("reopened {id}\n"),
            Err(err) => describe(&err),
        }
    }

    async fn listing(&self) -> String {
        let state = self.store().snapshot().await;
        let now = OffsetDateTime::now_utc();
        let rows: Vec<TaskDisplay> = self
            .query
            .apply(&state.tasks)
            .into_iter()
            .map(|task| TaskDisplay::new(task, now))
            .collect();

        let mut out = if rows.is_empty() {
            "No tasks found\n".to_owned()
        } else {
            render_task_table(&rows)
        };
        if !state.is_connected {
            let reason = state.error.as_deref().unwrap_or("unknown error");
            let _ = writeln!(out, "offline: {reason}");
        }
        out
    }
}

fn describe(err: &SubmitError) -> String {
    match err {
        SubmitError::Invalid(errors) => {
            let mut out = String::from("invalid input:\n");
            for message in errors.messages() {
                let _ = writeln!(out, "  - {message}");
            }
            out
        }
        other => format!("error: {other}\n"),
    }
}

/// Read commands from stdin until `quit` or end of input.
pub async fn run(remote: MemoryRemote, query: TaskQuery) -> Result<()> {
    let mut session = Session::new(remote, query);
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    if let Reply::Text(text) = session.execute(ShellCommand::Load).await {
        stdout.write_all(text.as_bytes()).await?;
    }

    loop {
        stdout.write_all(PROMPT.as_bytes()).await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let reply = match ShellCommand::parse(&line) {
            Ok(Some(command)) => session.execute(command).await,
            Ok(None) => continue,
            Err(err) => Reply::Text(format!("{err}\n")),
        };
        match reply {
            Reply::Text(text) => stdout.write_all(text.as_bytes()).await?,
            Reply::Quit => break,
        }
    }
    stdout.flush().await?;
    Ok(())
}
