use std::io::Write;

use anyhow::{anyhow, bail};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::api::TaskService;
use crate::board::{Board, Section};
use crate::cli::{AddArgs, Command, EditArgs, ListArgs};
use crate::datetime::parse_local_input;
use crate::filter::Filter;
use crate::form::TaskForm;
use crate::render::Renderer;
use crate::task::{TaskId, TaskPatch};
use crate::view::{AssumeYes, BulkClearDialog, Confirm, DELETE_TASK_PROMPT};

/// Runs one command against the board and prints the resulting screen.
/// A banner left on the board afterwards turns into an error.
#[instrument(skip(board, renderer, prompt, out, command))]
pub async fn dispatch<S: TaskService, W: Write>(
    board: &mut Board<S>,
    renderer: &Renderer,
    prompt: &mut dyn Confirm,
    out: &mut W,
    command: Command,
) -> anyhow::Result<()> {
    debug!(?command, "dispatching command");

    match command {
        Command::List(args) => cmd_list(board, args).await,
        Command::Add(args) => cmd_add(board, renderer, out, args).await?,
        Command::Toggle { id } => cmd_toggle(board, id).await,
        Command::Edit(args) => cmd_edit(board, renderer, args).await?,
        Command::Delete { id, yes } => {
            let mut assume_yes = AssumeYes;
            let prompt: &mut dyn Confirm = if yes { &mut assume_yes } else { prompt };
            cmd_delete(board, prompt, id).await?
        }
        Command::ClearCompleted { yes } => {
            let mut assume_yes = AssumeYes;
            let prompt: &mut dyn Confirm = if yes { &mut assume_yes } else { prompt };
            cmd_clear_completed(board, renderer, prompt, out).await?
        }
    }

    // Nothing was fetched, so there is no board to show.
    if !board.is_loading() {
        renderer.render_board(out, board, Utc::now())?;
    }

    match board.error() {
        Some(message) => Err(anyhow!("{message}")),
        None => Ok(()),
    }
}

async fn cmd_list<S: TaskService>(board: &mut Board<S>, args: ListArgs) {
    match args.filter.unwrap_or_default() {
        Filter::All => board.mount().await,
        filter => board.change_filter(filter).await,
    }
}

async fn cmd_add<S: TaskService, W: Write>(
    board: &mut Board<S>,
    renderer: &Renderer,
    out: &mut W,
    args: AddArgs,
) -> anyhow::Result<()> {
    let mut form = TaskForm::new();
    form.set_title(&args.title);
    if let Some(description) = &args.description {
        form.set_description(description);
    }
    if let Some(due) = &args.due {
        form.set_due_date(due);
    }
    if let Some(scheduled) = &args.scheduled {
        form.set_scheduled_date(scheduled);
    }
    if let Some(priority) = args.priority {
        form.set_priority(priority);
    }

    let Some(create) = form.submit(renderer.zone())? else {
        debug!("blank title; nothing submitted");
        writeln!(out, "Title is empty; nothing to add.")?;
        return Ok(());
    };

    board.mount().await;
    board.create(create).await;
    Ok(())
}

async fn cmd_toggle<S: TaskService>(board: &mut Board<S>, id: TaskId) {
    board.mount().await;
    match board.task(id).map(|task| task.is_done) {
        Some(current) => board.toggle(id, current).await,
        None => {
            warn!(id, "task not in the loaded list; letting the server flip it");
            board.flip(id).await;
        }
    }
}

async fn cmd_edit<S: TaskService>(
    board: &mut Board<S>,
    renderer: &Renderer,
    args: EditArgs,
) -> anyhow::Result<()> {
    let zone = renderer.zone();

    let due_date = match (&args.due, args.clear_due) {
        (Some(raw), _) => Some(Some(parse_local_input(raw, zone)?)),
        (None, true) => Some(None),
        (None, false) => None,
    };
    let scheduled_date = match (&args.scheduled, args.clear_scheduled) {
        (Some(raw), _) => Some(Some(parse_local_input(raw, zone)?)),
        (None, true) => Some(None),
        (None, false) => None,
    };

    let mut patch = TaskPatch {
        title: args
            .title
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty()),
        description: args.description.map(|description| {
            let trimmed = description.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        }),
        priority: args.priority,
        is_done: None,
        due_date,
        scheduled_date,
    };

    if patch.is_empty() {
        bail!("nothing to change for task {}", args.id);
    }

    board.mount().await;
    // A patch without `is_done` is read by the server as a toggle, so the
    // cached flag always rides along.
    let Some(current) = board.task(args.id).map(|task| task.is_done) else {
        if board.error().is_some() {
            return Ok(());
        }
        bail!("task {} is not in the task list; nothing edited", args.id);
    };
    patch.is_done = Some(current);
    board.update(args.id, patch).await;
    Ok(())
}

async fn cmd_delete<S: TaskService>(
    board: &mut Board<S>,
    prompt: &mut dyn Confirm,
    id: TaskId,
) -> anyhow::Result<()> {
    board.mount().await;

    if !prompt.confirm(DELETE_TASK_PROMPT)? {
        info!(id, "delete cancelled");
        return Ok(());
    }

    board.delete(id).await;
    Ok(())
}

async fn cmd_clear_completed<S: TaskService, W: Write>(
    board: &mut Board<S>,
    renderer: &Renderer,
    prompt: &mut dyn Confirm,
    out: &mut W,
) -> anyhow::Result<()> {
    board.change_filter(Filter::Completed).await;
    if board.error().is_some() {
        return Ok(());
    }

    let section = Section::Filtered(Filter::Completed);
    let shown: Vec<_> = board.tasks().iter().collect();
    if shown.is_empty() {
        writeln!(out, "No completed tasks to clear.")?;
        return Ok(());
    }

    let mut dialog = BulkClearDialog::default();
    dialog.open(section);

    if !prompt.confirm(&renderer.bulk_clear_prompt(shown.len()))? {
        dialog.cancel();
        info!("bulk clear cancelled");
        return Ok(());
    }

    let ids = dialog.confirm(&shown);
    board.bulk_delete(&ids).await;
    Ok(())
}
