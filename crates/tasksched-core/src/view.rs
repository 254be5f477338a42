use std::io::{self, BufRead, Write};

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::board::Section;
use crate::datetime::{DisplayZone, format_relative_date, format_short_date};
use crate::task::{Priority, Task, TaskId};

pub const DELETE_TASK_PROMPT: &str = "Are you sure you want to delete this task?";
pub const BULK_CLEAR_TITLE: &str = "Delete All Completed Tasks?";
pub const EMPTY_STATE: &str = "Ready to get organized? Create your first task with a schedule \
                               and priority to start your productive journey!";
pub const LOADING_TEXT: &str = "Loading your tasks...";

/// Header line of a task list: title plus count.
pub fn list_header(section: Section, count: usize) -> String {
    format!("{} ({count})", section.title())
}

/// Visibility of the "clear all completed" confirmation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkClearDialog {
    visible: bool,
}

impl BulkClearDialog {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Opens only for completed lists; returns whether it is now shown.
    pub fn open(&mut self, section: Section) -> bool {
        if section.allows_bulk_clear() {
            self.visible = true;
        }
        self.visible
    }

    pub fn cancel(&mut self) {
        self.visible = false;
    }

    /// Hides the dialog and hands back the ids of the done tasks shown.
    pub fn confirm(&mut self, tasks: &[&Task]) -> Vec<TaskId> {
        self.visible = false;
        tasks
            .iter()
            .filter(|task| task.is_done)
            .map(|task| task.id)
            .collect()
    }

    pub fn message(count: usize) -> String {
        let plural = if count == 1 { "" } else { "s" };
        format!(
            "This will permanently delete all {count} completed task{plural}. \
             This action cannot be undone."
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleControl {
    pub label: &'static str,
    pub icon: &'static str,
}

pub fn toggle_control(task: &Task) -> ToggleControl {
    if task.is_done {
        ToggleControl {
            label: "Mark as uncompleted",
            icon: "↺",
        }
    } else {
        ToggleControl {
            label: "Mark as completed",
            icon: "✓",
        }
    }
}

/// Display strings of one task row.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemView {
    pub id: TaskId,
    pub done: bool,
    pub priority: Priority,
    pub title: String,
    pub description: Option<String>,
    pub due: Option<String>,
    pub scheduled: Option<String>,
    pub footnote: Option<String>,
    pub overdue: bool,
    pub toggle: ToggleControl,
}

pub fn item_view(task: &Task, now: DateTime<Utc>, zone: &DisplayZone) -> ItemView {
    let footnote = if task.is_done {
        task.finished_at()
            .map(|at| format!("Completed {}", format_short_date(at, zone)))
    } else {
        task.created_at
            .map(|at| format!("Created {}", format_short_date(at, zone)))
    };

    ItemView {
        id: task.id,
        done: task.is_done,
        priority: task.priority,
        title: task.title.clone(),
        description: task
            .description
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string),
        due: task
            .due_date
            .map(|due| format!("Due: {}", format_relative_date(due, now, zone))),
        scheduled: task
            .scheduled_date
            .map(|at| format!("Scheduled: {}", format_relative_date(at, now, zone))),
        footnote,
        overdue: task.is_overdue,
        toggle: toggle_control(task),
    }
}

/// A yes/no question asked before a destructive action.
pub trait Confirm {
    fn confirm(&mut self, message: &str) -> anyhow::Result<bool>;
}

/// Asks on stderr and reads the answer from stdin; anything but y/yes is no.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, message: &str) -> anyhow::Result<bool> {
        let mut err = io::stderr().lock();
        write!(err, "{message} [y/N] ")?;
        err.flush()?;

        let mut answer = String::new();
        io::stdin()
            .lock()
            .read_line(&mut answer)
            .context("failed to read confirmation")?;
        Ok(matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    }
}

/// Used for `--yes`.
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _message: &str) -> anyhow::Result<bool> {
        Ok(true)
    }
}
