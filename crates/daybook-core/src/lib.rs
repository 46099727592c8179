pub mod app_state;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod day;
pub mod error;
pub mod kv;
pub mod render;
pub mod task;
pub mod template;
pub mod tracker;

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
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting daybook"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.daybookrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let store = kv::FileStore::open(
    &data_dir
  )
  .with_context(|| {
    format!(
      "failed to open data store at \
       {}",
      data_dir.display()
    )
  })?;
  let mut tracker =
    tracker::Tracker::with_default_mode(
      store,
      cfg.default_mode()?
    );

  let renderer =
    render::Renderer::new(&cfg)?;
  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;

  commands::dispatch(
    &mut tracker,
    &renderer,
    inv,
    datetime::today()
  )?;

  info!("done");
  Ok(())
}
