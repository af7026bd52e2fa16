pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod events;
pub mod grid;
pub mod host;
pub mod picker;
pub mod position;
pub mod render;
pub mod session;
pub mod timers;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use crate::config::{
  Options,
  OptionsPatch
};
pub use crate::datetime::{
  Clock,
  FixedClock,
  SystemClock
};
pub use crate::events::{
  EventOutcome,
  Key,
  PickerEvent,
  Target
};
pub use crate::grid::{
  DayCell,
  MonthGrid
};
pub use crate::host::{
  ChangeOrigin,
  HeadlessHost,
  Host
};
pub use crate::picker::{
  DateInput,
  Hooks,
  Picker
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
    "starting calpick"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let loaded = config::load(
    cli.config.as_deref(),
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  )
  .context("failed to load picker options")?;
  debug!(
    files = ?loaded.loaded_files,
    "options loaded"
  );

  commands::dispatch(
    cli.command,
    loaded.patch
  )?;

  info!("done");
  Ok(())
}
