//! Handlers behind each subcommand.

use std::fmt::Write as _;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use taskmaster_app::{ClientStore, ProjectConfig, TaskQuery, TaskStats, ViewConfig};
use taskmaster_core::ddl;
use taskmaster_core::display::TaskDisplay;
use taskmaster_core::schema::{FilterType, SchemaEnum, SortDirection, SortType};
use taskmaster_core::validate::{self, OperationKind, ValidationErrors, ValidationResult};
use taskmaster_store_mem::MemoryRemote;
use time::OffsetDateTime;
use tracing::info;

use crate::shell;
use crate::{Command, LsFormat, ValidateKind};

pub fn run(workdir: &Path, command: Command) -> Result<()> {
    match command {
        Command::Validate {
            kind,
            operation,
            file,
        } => handle_validate(kind, operation, file.as_deref()),
        Command::Schema => {
            println!("{}", ddl::complete_schema());
            Ok(())
        }
        Command::List {
            filter,
            sort,
            direction,
            search,
            stats,
            seed,
            format,
        } => {
            let config = ProjectConfig::load(workdir)?;
            let query = merge_query(&config.view, filter, sort, direction, search.as_deref());
            let remote = open_remote(seed.or_else(|| config.seed_path()))?;
            runtime()?.block_on(handle_list(remote, &query, stats, format))
        }
        Command::Shell { seed } => {
            let config = ProjectConfig::load(workdir)?;
            let remote = open_remote(seed.or_else(|| config.seed_path()))?;
            runtime()?.block_on(shell::run(remote, config.view.query()))
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start async runtime")
}

pub fn open_remote(seed: Option<PathBuf>) -> Result<MemoryRemote> {
    match seed {
        Some(path) => MemoryRemote::open_seed(&path)
            .with_context(|| format!("failed to load seed {}", path.display())),
        None => Ok(MemoryRemote::new()),
    }
}

fn handle_validate(kind: ValidateKind, operation: bool, file: Option<&Path>) -> Result<()> {
    let contents = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };
    let raw: Value = serde_json::from_str(&contents).context("input is not valid JSON")?;

    match validate_value(kind, operation, &raw)? {
        Ok(normalized) => {
            println!("{}", serde_json::to_string_pretty(&normalized)?);
            Ok(())
        }
        Err(errors) => {
            for message in errors.messages() {
                eprintln!("{message}");
            }
            bail!("{} validation error(s)", errors.len())
        }
    }
}

/// Normalized JSON for a valid document, or every validation message.
///
/// The outer error is reserved for usage mistakes, such as `--operation` with
/// a kind that has no business rules.
pub fn validate_value(
    kind: ValidateKind,
    operation: bool,
    raw: &Value,
) -> Result<Result<Value, ValidationErrors>> {
    if operation {
        let op = match kind {
            ValidateKind::Create => OperationKind::Create,
            ValidateKind::Update => OperationKind::Update,
            other => bail!("--operation applies to create and update, not {other:?}"),
        };
        return match validate::validate_operation(op, raw) {
            Ok(validate::OperationInput::Create(input)) => normalized(Ok(input)),
            Ok(validate::OperationInput::Update(input)) => normalized(Ok(input)),
            Err(errors) => Ok(Err(errors)),
        };
    }

    match kind {
        ValidateKind::Task => normalized(validate::validate_task(raw)),
        ValidateKind::Create => normalized(validate::validate_create_input(raw)),
        ValidateKind::Update => normalized(validate::validate_update_input(raw)),
        ValidateKind::Record => normalized(validate::validate_db_record(raw)),
        ValidateKind::Filter => normalized(validate::validate_filter_options(raw)),
        ValidateKind::Sort => normalized(validate::validate_sort_options(raw)),
    }
}

fn normalized<T: serde::Serialize>(
    result: ValidationResult<T>,
) -> Result<Result<Value, ValidationErrors>> {
    match result {
        Ok(value) => Ok(Ok(
            serde_json::to_value(&value).context("failed to serialize validated value")?
        )),
        Err(errors) => Ok(Err(errors)),
    }
}

/// Command-line values win; a new sort field drops the configured direction.
pub fn merge_query(
    view: &ViewConfig,
    filter: Option<FilterType>,
    sort: Option<SortType>,
    direction: Option<SortDirection>,
    search: Option<&str>,
) -> TaskQuery {
    let direction = direction.or(if sort.is_some() { None } else { view.direction });
    let mut query = TaskQuery::new()
        .with_filter(filter.unwrap_or(view.filter))
        .with_sort(sort.unwrap_or(view.sort));
    if let Some(direction) = direction {
        query = query.with_direction(direction);
    }
    match search {
        Some(text) => query.with_search(text),
        None => query,
    }
}

async fn handle_list(
    remote: MemoryRemote,
    query: &TaskQuery,
    stats: bool,
    format: LsFormat,
) -> Result<()> {
    let store = ClientStore::new(Arc::new(remote));
    store.load().await?;
    let tasks = query.apply(&store.tasks().await);
    let now = OffsetDateTime::now_utc();
    info!(count = tasks.len(), "listing tasks");

    if stats {
        let stats = TaskStats::compute(&tasks, now);
        match format {
            LsFormat::Table => print!("{}", render_stats(&stats)),
            LsFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        }
        return Ok(());
    }

    if tasks.is_empty() {
        println!("No tasks found");
        return Ok(());
    }

    let rows: Vec<TaskDisplay> = tasks
        .into_iter()
        .map(|task| TaskDisplay::new(task, now))
        .collect();
    match format {
        LsFormat::Table => print!("{}", render_task_table(&rows)),
        LsFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
    }
    Ok(())
}

pub fn render_task_table(rows: &[TaskDisplay]) -> String {
    let mut out = String::new();
    out.push_str("ID | Done | Title | Priority | Category | Due\n");
    out.push_str("-- | ---- | ----- | -------- | -------- | ---\n");
    for row in rows {
        let task = &row.task;
        let done = if task.is_completed { "x" } else { " " };
        let category = task.category.map_or("-", |category| category.as_str());
        let due = match (&row.formatted_due_date, &row.time_until_due) {
            (Some(date), Some(relative)) => format!("{date} ({relative})"),
            (Some(date), None) => date.clone(),
            _ => "-".to_owned(),
        };
        let _ = writeln!(
            out,
            "{} | [{done}] | {} | {} | {category} | {due}",
            task.id, task.title, task.priority
        );
    }
    out
}

pub fn render_stats(stats: &TaskStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total: {}", stats.total);
    let _ = writeln!(out, "Completed: {}", stats.completed);
    let _ = writeln!(out, "Active: {}", stats.active);
    let _ = writeln!(out, "Overdue: {}", stats.overdue);
    let _ = writeln!(out, "Completion rate: {:.1}%", stats.completion_rate);
    if let Some(hours) = stats.average_completion_hours {
        let _ = writeln!(out, "Average completion: {hours:.1}h");
    }
    for (category, count) in &stats.by_category {
        let _ = writeln!(out, "Category {category}: {count}");
    }
    for (priority, count) in &stats.by_priority {
        let _ = writeln!(out, "Priority {priority}: {count}");
    }
    out
}
