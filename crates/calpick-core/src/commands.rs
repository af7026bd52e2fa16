use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::cli::{Command, GridArgs, SessionArgs, ViewArgs};
use crate::config::OptionsPatch;
use crate::datetime::{Clock, FixedClock, SystemClock, midnight};
use crate::grid::MonthGrid;
use crate::host::HeadlessHost;
use crate::picker::{CalendarPane, Hooks, Picker};
use crate::render::{TextRenderer, stdout_wants_color};
use crate::session;

#[instrument(skip(command, patch))]
pub fn dispatch(command: Command, patch: OptionsPatch) -> anyhow::Result<()> {
    debug!(?command, "dispatching command");

    match command {
        Command::Render(view) => cmd_render(patch, &view),
        Command::Grid(args) => cmd_grid(patch, &args),
        Command::Json(view) => cmd_json(patch, &view),
        Command::Session(args) => cmd_session(patch, &args),
    }
}

fn make_clock(today: Option<NaiveDate>, patch: &OptionsPatch) -> Box<dyn Clock> {
    match today {
        Some(day) => Box::new(FixedClock::at(midnight(day))),
        None => {
            let timezone = patch.timezone.clone().flatten();
            Box::new(SystemClock::from_config(timezone.as_deref()))
        }
    }
}

/// An always-visible picker with no field, positioned by the view args.
fn inline_picker(patch: OptionsPatch, view: &ViewArgs) -> Picker<HeadlessHost> {
    let clock = make_clock(view.today, &patch);
    let mut picker = Picker::new(HeadlessHost::new(), clock, patch, Hooks::default());
    if let Some(date) = view.select {
        picker.set_date_quietly(date);
    }
    if let Some(date) = view.goto {
        picker.goto_date(date);
    }
    picker.draw(true);
    picker
}

fn cmd_render(patch: OptionsPatch, view: &ViewArgs) -> anyhow::Result<()> {
    let picker = inline_picker(patch, view);
    let mut out = io::stdout().lock();
    writeln!(out, "{}", picker.host().markup)?;
    info!(renders = picker.host().renders, "rendered markup");
    Ok(())
}

fn cmd_grid(patch: OptionsPatch, args: &GridArgs) -> anyhow::Result<()> {
    let picker = inline_picker(patch, &args.view);
    let renderer = TextRenderer::new(!args.no_color && stdout_wants_color());
    renderer.print_months(picker.options(), &picker.grids())
}

#[derive(Debug, Serialize)]
struct JsonView {
    today: NaiveDate,
    selected: Option<NaiveDate>,
    formatted: String,
    panes: Vec<CalendarPane>,
    months: Vec<MonthGrid>,
}

fn cmd_json(patch: OptionsPatch, view: &ViewArgs) -> anyhow::Result<()> {
    let clock_today = make_clock(view.today, &patch).today();
    let picker = inline_picker(patch, view);
    let payload = JsonView {
        today: clock_today,
        selected: picker.date(),
        formatted: picker.to_formatted_string(None),
        panes: picker.panes().to_vec(),
        months: picker.grids(),
    };
    let text = serde_json::to_string_pretty(&payload).context("failed to encode calendar")?;
    println!("{text}");
    Ok(())
}

fn read_script(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display())),
        _ => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .context("failed to read script from stdin")?;
            Ok(input)
        }
    }
}

fn cmd_session(patch: OptionsPatch, args: &SessionArgs) -> anyhow::Result<()> {
    let script = read_script(args.script.as_deref())?;
    let clock = make_clock(args.today, &patch);

    let mut host = HeadlessHost::new().with_field(&args.field);
    if args.trigger {
        host = host.with_trigger();
    }
    let mut picker = Picker::new(host, clock, patch, Hooks::default());

    let out = io::stdout().lock();
    let count = session::run_script(&mut picker, &script, out)?;
    info!(commands = count, "session finished");
    picker.destroy();
    Ok(())
}
