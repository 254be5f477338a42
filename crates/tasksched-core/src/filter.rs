use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

use crate::task::Priority;

/// Which subset of tasks the server is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Pending,
    Completed,
    Today,
    Overdue,
    Upcoming,
    Scheduled,
    Priority(Priority),
}

impl Filter {
    /// Filters offered as buttons above the task lists.
    pub const BAR: [Filter; 6] = [
        Filter::All,
        Filter::Pending,
        Filter::Completed,
        Filter::Today,
        Filter::Overdue,
        Filter::Scheduled,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Pending => "pending",
            Filter::Completed => "completed",
            Filter::Today => "today",
            Filter::Overdue => "overdue",
            Filter::Upcoming => "upcoming",
            Filter::Scheduled => "scheduled",
            Filter::Priority(priority) => priority.as_str(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Filter::All => "All Tasks",
            Filter::Pending => "Pending",
            Filter::Completed => "Completed",
            Filter::Today => "Today",
            Filter::Overdue => "Overdue",
            Filter::Upcoming => "Upcoming",
            Filter::Scheduled => "Scheduled",
            Filter::Priority(Priority::Low) => "Low Priority",
            Filter::Priority(Priority::Medium) => "Medium Priority",
            Filter::Priority(Priority::High) => "High Priority",
            Filter::Priority(Priority::Urgent) => "Urgent Priority",
        }
    }

    /// Query parameters for `GET /tasks/`.
    pub fn query_params(&self) -> Vec<(&'static str, &'static str)> {
        match self {
            Filter::All => vec![],
            Filter::Pending | Filter::Completed => vec![("status", self.key())],
            Filter::Today | Filter::Overdue | Filter::Upcoming | Filter::Scheduled => {
                vec![("schedule", self.key())]
            }
            Filter::Priority(priority) => vec![("priority", priority.as_str())],
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Filter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        let filter = match key.as_str() {
            "all" => Filter::All,
            "pending" => Filter::Pending,
            "completed" => Filter::Completed,
            "today" => Filter::Today,
            "overdue" => Filter::Overdue,
            "upcoming" => Filter::Upcoming,
            "scheduled" => Filter::Scheduled,
            other => match other.parse::<Priority>() {
                Ok(priority) => Filter::Priority(priority),
                Err(_) => {
                    return Err(anyhow!(
                        "unknown filter: {other} (expected all, pending, completed, today, \
                         overdue, upcoming, scheduled or a priority)"
                    ));
                }
            },
        };
        Ok(filter)
    }
}
