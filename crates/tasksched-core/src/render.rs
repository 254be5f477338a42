use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Utc};
use unicode_width::UnicodeWidthStr;

use crate::api::TaskService;
use crate::board::{Board, Section};
use crate::config::Config;
use crate::datetime::DisplayZone;
use crate::filter::Filter;
use crate::task::Task;
use crate::view::{self, BulkClearDialog, EMPTY_STATE, LOADING_TEXT, item_view, list_header};

const BANNER_TITLE: &str = "Task Scheduler Pro";
const BANNER_TAGLINE: &str = "Plan • Schedule • Execute • Achieve";

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
    zone: DisplayZone,
}

impl Renderer {
    /// Colour is used only when enabled and stdout is a terminal.
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            color: cfg.color && io::stdout().is_terminal(),
            zone: cfg.display_zone()?,
        })
    }

    pub fn with_zone(color: bool, zone: DisplayZone) -> Self {
        Self { color, zone }
    }

    pub fn zone(&self) -> &DisplayZone {
        &self.zone
    }

    #[tracing::instrument(skip_all)]
    pub fn render_board<S: TaskService, W: Write>(
        &self,
        out: &mut W,
        board: &Board<S>,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let stats = board.stats();

        writeln!(out, "{}  ·  {BANNER_TAGLINE}", self.paint(BANNER_TITLE, "1"))?;
        if stats.total > 0 {
            writeln!(out, "{}% completed", stats.completion_rate)?;
        }

        if let Some(message) = board.error() {
            writeln!(out, "{}", self.paint(&format!("! {message}"), "31"))?;
        }

        let filters = Filter::BAR
            .iter()
            .map(|filter| {
                let badge = match filter {
                    Filter::Overdue if stats.overdue > 0 => format!(" ({})", stats.overdue),
                    Filter::Today if stats.today > 0 => format!(" ({})", stats.today),
                    _ => String::new(),
                };
                if *filter == board.active_filter() {
                    format!("[{}{badge}]", filter.label())
                } else {
                    format!("{}{badge}", filter.label())
                }
            })
            .collect::<Vec<_>>()
            .join("  ");
        writeln!(out, "Filters: {filters}")?;
        writeln!(
            out,
            "Pending {}  Completed {}  Overdue {}  Scheduled {}",
            stats.pending, stats.completed, stats.overdue, stats.scheduled
        )?;

        if board.is_loading() {
            writeln!(out)?;
            writeln!(out, "{LOADING_TEXT}")?;
            return Ok(());
        }

        if board.tasks().is_empty() {
            writeln!(out)?;
            writeln!(out, "{EMPTY_STATE}")?;
            return Ok(());
        }

        for (section, tasks) in board.sections() {
            writeln!(out)?;
            self.render_task_list(out, section, &tasks, now)?;
        }

        Ok(())
    }

    pub fn render_task_list<W: Write>(
        &self,
        out: &mut W,
        section: Section,
        tasks: &[&Task],
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let header = list_header(section, tasks.len());
        if section.allows_bulk_clear() {
            writeln!(
                out,
                "{}  [Clear All: tasks clear-completed]",
                self.paint(&header, "1;32")
            )?;
        } else {
            writeln!(out, "{}", self.paint(&header, "1;33"))?;
        }

        let rows: Vec<Vec<Cell>> = tasks
            .iter()
            .map(|task| {
                let item = item_view(task, now, &self.zone);
                let title = match &item.description {
                    Some(description) => format!("{} ({description})", item.title),
                    None => item.title.clone(),
                };
                let due = item.due.unwrap_or_default();
                vec![
                    Cell::colored(item.id.to_string(), "33"),
                    Cell::plain(if item.done { "[x]" } else { "[ ]" }),
                    Cell::colored(
                        format!("{} {}", item.priority.marker(), item.priority),
                        item.priority.color_code(),
                    ),
                    Cell::plain(title),
                    if item.overdue {
                        Cell::colored(due, "31")
                    } else {
                        Cell::plain(due)
                    },
                    Cell::plain(item.scheduled.unwrap_or_default()),
                    Cell::plain(item.footnote.unwrap_or_default()),
                ]
            })
            .collect();

        self.write_rows(out, &TASK_COLUMNS, &rows)
    }

    /// Text of the bulk-clear confirmation for `count` tasks.
    pub fn bulk_clear_prompt(&self, count: usize) -> String {
        format!(
            "{}\n{}",
            self.paint(view::BULK_CLEAR_TITLE, "1;31"),
            BulkClearDialog::message(count)
        )
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    /// Columns are sized on the plain text; colour is applied afterwards so
    /// escape codes never count toward the width.
    fn write_rows<W: Write>(
        &self,
        out: &mut W,
        headers: &[&str],
        rows: &[Vec<Cell>],
    ) -> anyhow::Result<()> {
        let mut widths: Vec<usize> = headers.iter().map(|header| header.width()).collect();
        for row in rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.text.width());
            }
        }

        let header_line: Vec<String> = headers
            .iter()
            .zip(&widths)
            .map(|(header, width)| pad_to(header, *width, header.to_string()))
            .collect();
        writeln!(out, "{}", header_line.join(" ").trim_end())?;

        let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
        writeln!(out, "{}", rule.join(" "))?;

        for row in rows {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(cell, width)| {
                    let shown = match cell.code {
                        Some(code) => self.paint(&cell.text, code),
                        None => cell.text.clone(),
                    };
                    pad_to(&cell.text, *width, shown)
                })
                .collect();
            writeln!(out, "{}", line.join(" ").trim_end())?;
        }

        Ok(())
    }
}

const TASK_COLUMNS: [&str; 7] = ["ID", "", "Priority", "Title", "Due", "Scheduled", "Note"];

struct Cell {
    text: String,
    code: Option<&'static str>,
}

impl Cell {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
        }
    }

    fn colored(text: impl Into<String>, code: &'static str) -> Self {
        Self {
            text: text.into(),
            code: Some(code),
        }
    }
}

/// Right-pads `shown` by however much `plain` falls short of `width`.
fn pad_to(plain: &str, width: usize, shown: String) -> String {
    let padding = width.saturating_sub(plain.width());
    format!("{shown}{}", " ".repeat(padding))
}
