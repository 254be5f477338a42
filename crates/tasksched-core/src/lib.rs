pub mod api;
pub mod board;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod filter;
pub mod form;
pub mod render;
pub mod task;
pub mod view;

use std::ffi::OsString;
use std::io;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting task scheduler CLI"
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli.rc_overrides
  )?;
  cfg.apply_env();
  if let Some(url) = cli.api_url {
    cfg.api_url = url;
  }
  debug!(api_url = %cfg.api_url, "resolved configuration");

  let renderer =
    render::Renderer::new(&cfg)?;
  let client =
    api::ApiClient::new(&cfg.api_url)
      .with_context(|| {
        format!(
          "failed to set up client for \
           {}",
          cfg.api_url
        )
      })?;

  let command =
    cli.command.unwrap_or_else(|| {
      cli::Command::List(
        cli::ListArgs::default()
      )
    });

  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .context(
        "failed to start event loop"
      )?;

  runtime.block_on(async {
    let mut board =
      board::Board::new(client);
    let mut prompt = view::StdinConfirm;
    let mut out = io::stdout().lock();
    commands::dispatch(
      &mut board,
      &renderer,
      &mut prompt,
      &mut out,
      command
    )
    .await
  })?;

  info!("done");
  Ok(())
}
