use anyhow::Context;
use tracing::debug;

use crate::datetime::{DisplayZone, parse_local_input};
use crate::task::{Priority, TaskCreate};

pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormPhase {
    #[default]
    Empty,
    Editing,
    /// An accepted submission cleared the fields; the next edit starts over.
    Submitted,
}

/// Local state of the new-task form. Nothing here talks to the server; an
/// accepted submission hands a [`TaskCreate`] to the caller and resets the
/// fields straight away.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskForm {
    title: String,
    description: String,
    due_date: String,
    scheduled_date: String,
    priority: Priority,
    phase: FormPhase,
}

impl TaskForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn due_date(&self) -> &str {
        &self.due_date
    }

    pub fn scheduled_date(&self) -> &str {
        &self.scheduled_date
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn set_title(&mut self, value: &str) {
        self.title = truncate_chars(value, TITLE_MAX_CHARS);
        self.phase = FormPhase::Editing;
    }

    pub fn set_description(&mut self, value: &str) {
        self.description = truncate_chars(value, DESCRIPTION_MAX_CHARS);
        self.phase = FormPhase::Editing;
    }

    pub fn set_due_date(&mut self, value: &str) {
        self.due_date = value.to_string();
        self.phase = FormPhase::Editing;
    }

    pub fn set_scheduled_date(&mut self, value: &str) {
        self.scheduled_date = value.to_string();
        self.phase = FormPhase::Editing;
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
        self.phase = FormPhase::Editing;
    }

    /// `Ok(None)` when the trimmed title is empty: the form is left exactly
    /// as it was. A date that cannot be read is an error and also leaves the
    /// form untouched.
    pub fn submit(&mut self, zone: &DisplayZone) -> anyhow::Result<Option<TaskCreate>> {
        let title = self.title.trim();
        if title.is_empty() {
            debug!("ignoring submit with blank title");
            return Ok(None);
        }

        let due_date = optional_date(&self.due_date, zone).context("invalid due date")?;
        let scheduled_date =
            optional_date(&self.scheduled_date, zone).context("invalid scheduled date")?;

        let create = TaskCreate {
            title: title.to_string(),
            description: self.description.trim().to_string(),
            priority: self.priority,
            due_date,
            scheduled_date,
        };

        *self = Self {
            phase: FormPhase::Submitted,
            ..Self::default()
        };
        Ok(Some(create))
    }
}

fn optional_date(
    raw: &str,
    zone: &DisplayZone,
) -> anyhow::Result<Option<chrono::DateTime<chrono::Utc>>> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    parse_local_input(raw, zone).map(Some)
}

fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}
