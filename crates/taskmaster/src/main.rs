//! CLI entry point for taskmaster.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use taskmaster_core::schema::{FilterType, SortDirection, SortType};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod commands;
mod shell;

/// Tasks with a shared schema, validation and an optimistic client store.
#[derive(Parser, Debug)]
#[command(
    name = "taskmaster",
    version,
    about = "taskmaster: validate task payloads and manage tasks through an optimistic client store"
)]
struct Cli {
    /// Directory to look up `.taskmaster/config.toml` from (defaults to current).
    #[arg(long)]
    workdir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a JSON document read from FILE or stdin.
    Validate {
        /// Shape the document must have.
        #[arg(long, value_enum)]
        kind: ValidateKind,
        /// Apply the business rules too (create and update only).
        #[arg(long)]
        operation: bool,
        /// Input file; stdin when omitted.
        file: Option<PathBuf>,
    },

    /// Print the storage DDL generated from the schema.
    Schema,

    /// List tasks from the seed data.
    List {
        /// all, active or completed (default from config).
        #[arg(long, value_parser = parse_schema_value::<FilterType>)]
        filter: Option<FilterType>,
        /// created, due, title or priority (default from config).
        #[arg(long, value_parser = parse_schema_value::<SortType>)]
        sort: Option<SortType>,
        /// asc or desc; defaults to the natural order of the sort field.
        #[arg(long, value_parser = parse_schema_value::<SortDirection>)]
        direction: Option<SortDirection>,
        /// Case-insensitive text matched against title, description and category.
        #[arg(long)]
        search: Option<String>,
        /// Print summary statistics instead of the task list.
        #[arg(long)]
        stats: bool,
        /// Seed file overriding `[data].seed`.
        #[arg(long)]
        seed: Option<PathBuf>,
        /// Output format.
        #[arg(long, value_enum, default_value_t = LsFormat::Table)]
        format: LsFormat,
    },

    /// Interactive session against the in-memory remote.
    Shell {
        /// Seed file overriding `[data].seed`.
        #[arg(long)]
        seed: Option<PathBuf>,
    },
}

/// Document shapes accepted by `validate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ValidateKind {
    /// Client-facing task.
    Task,
    /// Create payload.
    Create,
    /// Update payload.
    Update,
    /// Storage row.
    Record,
    /// Filter options.
    Filter,
    /// Sort options.
    Sort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LsFormat {
    Table,
    Json,
}

fn parse_schema_value<T: std::str::FromStr>(raw: &str) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|err| err.to_string())
}

fn main() -> Result<()> {
    let Cli { workdir, cmd } = Cli::parse();

    if should_install_tracing(&cmd) {
        install_tracing();
    }

    let workdir = workdir.unwrap_or_else(|| PathBuf::from("."));
    commands::run(&workdir, cmd)
}

/// `validate` and `schema` write machine-readable output only.
const fn should_install_tracing(cmd: &Command) -> bool {
    !matches!(cmd, Command::Validate { .. } | Command::Schema)
}

fn install_tracing() {
    // RUST_LOG overrides the default INFO level.
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::NONE)
        .compact()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_validate_command() {
        let cli = Cli::parse_from([
            "taskmaster",
            "validate",
            "--kind",
            "create",
            "--operation",
            "payload.json",
        ]);

        match cli.cmd {
            Command::Validate {
                kind,
                operation,
                file,
            } => {
                assert_eq!(kind, ValidateKind::Create);
                assert!(operation);
                assert_eq!(file, Some(PathBuf::from("payload.json")));
            }
            _ => panic!("expected validate command"),
        }
    }

    #[test]
    fn parse_list_command() {
        let cli = Cli::parse_from([
            "taskmaster",
            "--workdir",
            "/tmp/project",
            "list",
            "--filter",
            "active",
            "--sort",
            "due",
            "--direction",
            "desc",
            "--search",
            "milk",
            "--format",
            "json",
        ]);

        assert_eq!(cli.workdir, Some(PathBuf::from("/tmp/project")));
        match cli.cmd {
            Command::List {
                filter,
                sort,
                direction,
                search,
                stats,
                format,
                ..
            } => {
                assert_eq!(filter, Some(FilterType::Active));
                assert_eq!(sort, Some(SortType::Due));
                assert_eq!(direction, Some(SortDirection::Desc));
                assert_eq!(search.as_deref(), Some("milk"));
                assert!(!stats);
                assert_eq!(format, LsFormat::Json);
            }
            _ => panic!("expected list command"),
        }
    }

    #[test]
    fn list_rejects_unknown_sort() {
        let result = Cli::try_parse_from(["taskmaster", "list", "--sort", "alphabetical"]);
        assert!(result.is_err());
    }

    #[test]
    fn validate_requires_kind() {
        assert!(Cli::try_parse_from(["taskmaster", "validate"]).is_err());
    }

    #[test]
    fn skips_tracing_for_machine_output() {
        assert!(!should_install_tracing(&Command::Schema));
        assert!(!should_install_tracing(&Command::Validate {
            kind: ValidateKind::Task,
            operation: false,
            file: None,
        }));
    }

    #[test]
    fn installs_tracing_for_shell() {
        assert!(should_install_tracing(&Command::Shell { seed: None }));
    }
}
