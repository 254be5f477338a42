use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::filter::Filter;
use crate::task::{Priority, TaskId};

/// Splits `--rc KEY=VALUE` into a trimmed pair.
fn parse_rc_override(raw: &str) -> anyhow::Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {raw}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(anyhow!("empty key in --rc {raw}"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tasks",
    version,
    about = "Task Scheduler: plan, schedule and track tasks against the task REST API",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Config file (TOML).
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the task API; beats every other source.
    #[arg(long = "api-url", global = true)]
    pub api_url: Option<String>,

    /// Config override, e.g. `--rc display.color=off`. Repeatable.
    #[arg(long = "rc", value_parser = parse_rc_override, global = true)]
    pub rc_overrides: Vec<(String, String)>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Show the board, optionally narrowed by a filter.
    List(ListArgs),
    /// Create a task.
    Add(AddArgs),
    /// Flip a task between pending and completed.
    Toggle { id: TaskId },
    /// Change fields of a task.
    Edit(EditArgs),
    /// Delete one task.
    Delete {
        id: TaskId,
        /// Skip the confirmation prompt.
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
    /// Delete every completed task.
    ClearCompleted {
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// all, pending, completed, today, overdue, upcoming, scheduled,
    /// low, medium, high or urgent.
    #[arg(short = 'f', long = "filter", value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<Filter>()))]
    pub filter: Option<Filter>,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    pub title: String,

    #[arg(short = 'd', long = "description")]
    pub description: Option<String>,

    /// Local date/time, e.g. 2026-10-20T17:00.
    #[arg(long = "due")]
    pub due: Option<String>,

    #[arg(long = "scheduled")]
    pub scheduled: Option<String>,

    #[arg(short = 'p', long = "priority", value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<Priority>()))]
    pub priority: Option<Priority>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub id: TaskId,

    #[arg(long = "title")]
    pub title: Option<String>,

    /// Empty string clears the description.
    #[arg(short = 'd', long = "description")]
    pub description: Option<String>,

    #[arg(short = 'p', long = "priority", value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<Priority>()))]
    pub priority: Option<Priority>,

    #[arg(long = "due", conflicts_with = "clear_due")]
    pub due: Option<String>,

    #[arg(long = "clear-due")]
    pub clear_due: bool,

    #[arg(long = "scheduled", conflicts_with = "clear_scheduled")]
    pub scheduled: Option<String>,

    #[arg(long = "clear-scheduled")]
    pub clear_scheduled: bool,
}

/// `-q` beats `-v`; with neither, only warnings are shown.
fn default_level(verbose: u8, quiet: u8) -> &'static str {
    match (quiet, verbose) {
        (2.., _) => "error",
        (1, _) | (0, 0) => "warn",
        (0, 1) => "info",
        (0, 2) => "debug",
        (0, _) => "trace",
    }
}

/// Logs go to stderr so the rendered board on stdout stays clean.
/// `RUST_LOG` overrides the flag-derived level.
pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level(verbose, quiet))
            .map_err(|e| anyhow!("invalid log filter: {e}"))?,
    };

    let stderr_is_tty = std::io::stderr().is_terminal();
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(stderr_is_tty)
        .try_init()
    {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Command, GlobalCli, default_level};
    use crate::filter::Filter;
    use crate::task::Priority;

    #[test]
    fn parses_add_with_options() {
        let cli = GlobalCli::parse_from([
            "tasks",
            "-vv",
            "--rc",
            "display.color=off",
            "add",
            "Plan sprint",
            "--due",
            "2026-10-20T09:00",
            "-p",
            "urgent",
        ]);

        assert_eq!(cli.verbose, 2);
        assert_eq!(
            cli.rc_overrides,
            vec![("display.color".to_string(), "off".to_string())]
        );
        match cli.command {
            Some(Command::Add(args)) => {
                assert_eq!(args.title, "Plan sprint");
                assert_eq!(args.due.as_deref(), Some("2026-10-20T09:00"));
                assert_eq!(args.priority, Some(Priority::Urgent));
            }
            other => panic!("expected add, got {other:?}"),
        }
    }

    #[test]
    fn list_filter_is_parsed() {
        let cli = GlobalCli::parse_from(["tasks", "list", "--filter", "overdue"]);
        match cli.command {
            Some(Command::List(args)) => assert_eq!(args.filter, Some(Filter::Overdue)),
            other => panic!("expected list, got {other:?}"),
        }
        assert!(GlobalCli::try_parse_from(["tasks", "list", "-f", "later"]).is_err());
    }

    #[test]
    fn rc_override_needs_key_and_equals() {
        assert!(GlobalCli::try_parse_from(["tasks", "--rc", "display.color"]).is_err());
        assert!(GlobalCli::try_parse_from(["tasks", "--rc", " =on"]).is_err());
    }

    #[test]
    fn quiet_wins_over_verbose() {
        assert_eq!(default_level(0, 0), "warn");
        assert_eq!(default_level(1, 0), "info");
        assert_eq!(default_level(5, 0), "trace");
        assert_eq!(default_level(3, 1), "warn");
        assert_eq!(default_level(0, 2), "error");
    }

    #[test]
    fn no_command_is_allowed() {
        let cli = GlobalCli::parse_from(["tasks"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn edit_rejects_due_and_clear_due_together() {
        assert!(
            GlobalCli::try_parse_from(["tasks", "edit", "3", "--due", "2026-10-20", "--clear-due"])
                .is_err()
        );
    }
}
