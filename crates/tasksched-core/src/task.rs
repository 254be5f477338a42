use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::datetime::iso_date_serde;

pub type TaskId = u64;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Low,
        Priority::Medium,
        Priority::High,
        Priority::Urgent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            Priority::Low => "🟢",
            Priority::Medium => "🟡",
            Priority::High => "🟠",
            Priority::Urgent => "🔴",
        }
    }

    /// ANSI colour code matching the priority accent.
    pub fn color_code(self) -> &'static str {
        match self {
            Priority::Low => "32",
            Priority::Medium => "33",
            Priority::High => "38;5;208",
            Priority::Urgent => "31",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(anyhow!(
                "invalid priority: {other} (expected low, medium, high or urgent)"
            )),
        }
    }
}

/// A task as last reported by the server. The `is_*` flags are computed
/// server-side and are never recomputed locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: TaskId,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub is_done: bool,

    #[serde(default, with = "iso_date_serde::option")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default, with = "iso_date_serde::option")]
    pub scheduled_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub priority_order: Option<u8>,

    #[serde(default, with = "iso_date_serde::option")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, with = "iso_date_serde::option")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default, with = "iso_date_serde::option")]
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub is_overdue: bool,

    #[serde(default)]
    pub is_due_today: bool,

    #[serde(default)]
    pub is_scheduled_for_today: bool,
}

impl Task {
    pub fn is_today(&self) -> bool {
        self.is_due_today || self.is_scheduled_for_today
    }

    pub fn is_scheduled_pending(&self) -> bool {
        self.scheduled_date.is_some() && !self.is_done
    }

    /// When the task was finished, falling back to its last update.
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at.or(self.updated_at)
    }
}

/// Body of `POST /tasks/`. All five fields are always sent.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaskCreate {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    #[serde(with = "iso_date_serde::option")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(with = "iso_date_serde::option")]
    pub scheduled_date: Option<DateTime<Utc>>,
}

/// Partial body of `PATCH /tasks/{id}/`. Unset fields are omitted; the
/// inner `None` of a double option clears the field on the server.
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_done: Option<bool>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "iso_date_serde::patch::serialize"
    )]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "iso_date_serde::patch::serialize"
    )]
    pub scheduled_date: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    pub fn completion(is_done: bool) -> Self {
        Self {
            is_done: Some(is_done),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
