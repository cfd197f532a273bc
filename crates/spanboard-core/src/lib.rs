pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod item;
pub mod render;
pub mod store;

use std::ffi::OsString;

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
    command = cli.command.name(),
    "starting spanboard"
  );

  let cfg = config::CalendarConfig::load(
    cli.config.as_deref()
  )
  .context(
    "failed to load calendar config"
  )?;
  debug!(source = ?cfg.source, "calendar config ready");

  let items_path = cli
    .items
    .as_deref()
    .map(config::expand_tilde)
    .unwrap_or_else(|| cfg.items_path());

  let store =
    store::ItemStore::open(&items_path)
      .with_context(|| {
        format!(
          "failed to open item store at \
           {}",
          items_path.display()
        )
      })?;

  let renderer =
    render::Renderer::new(&cfg);

  commands::dispatch(
    &store,
    &cfg,
    &renderer,
    cli.command
  )?;

  info!("done");
  Ok(())
}
