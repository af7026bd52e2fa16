//! Line-oriented scripts that drive a
//! picker the way a user would.
//!
//! One command per line; blank lines and
//! `#` comments are skipped. After each
//! command the picker state is written as
//! one JSON object.

use std::io::Write;
use std::str::FromStr;

use anyhow::{
  Context,
  anyhow
};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::events::{
  Key,
  PickerEvent,
  Point,
  SelectKind,
  Target
};
use crate::host::{
  ChangeOrigin,
  HeadlessHost
};
use crate::picker::{
  AdjustDirection,
  CalendarPane,
  Picker,
  Visibility
};

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
  Show,
  Hide,
  Next,
  Prev,
  Today,
  Clear,
  Goto(NaiveDate),
  /// Zero-based, may leave 0..=11.
  Month(i32),
  Year(i32),
  Select(NaiveDate),
  SelectText(String),
  Min(Option<NaiveDate>),
  Max(Option<NaiveDate>),
  RangeStart(Option<NaiveDate>),
  RangeEnd(Option<NaiveDate>),
  Adjust(AdjustDirection, i64),
  Key(Key),
  Click(Target),
  Tap(Target),
  Choose(SelectKind, String),
  Type(String),
  Focus,
  Blur,
  ClickOutside,
  Wait(u64)
}

fn date_arg(
  value: &str
) -> anyhow::Result<NaiveDate> {
  NaiveDate::parse_from_str(value, "%Y-%m-%d")
    .with_context(|| {
      format!("expected YYYY-MM-DD, got {value:?}")
    })
}

fn optional_date_arg(
  value: &str
) -> anyhow::Result<Option<NaiveDate>> {
  match value {
    | "none" | "" => Ok(None),
    | other => date_arg(other).map(Some)
  }
}

fn target_arg(
  value: &str
) -> anyhow::Result<Target> {
  let (head, tail) = value
    .split_once(' ')
    .map_or((value, ""), |(h, t)| (h, t.trim()));
  match head {
    | "day" => date_arg(tail).map(Target::Day),
    | "prev" => Ok(Target::PrevMonth),
    | "next" => Ok(Target::NextMonth),
    | "today" => Ok(Target::Today),
    | "month-select" => Ok(Target::MonthSelect),
    | "year-select" => Ok(Target::YearSelect),
    | "surface" => Ok(Target::Surface),
    | other => {
      Err(anyhow!("unknown click target: {other}"))
    }
  }
}

impl FromStr for SessionCommand {
  type Err = anyhow::Error;

  fn from_str(
    line: &str
  ) -> Result<Self, Self::Err> {
    let line = line.trim();
    let (word, rest) = line
      .split_once(char::is_whitespace)
      .map_or((line, ""), |(w, r)| (w, r.trim()));

    let command = match word {
      | "show" => Self::Show,
      | "hide" => Self::Hide,
      | "next" => Self::Next,
      | "prev" => Self::Prev,
      | "today" => Self::Today,
      | "clear" => Self::Clear,
      | "focus" => Self::Focus,
      | "blur" => Self::Blur,
      | "click-outside" => Self::ClickOutside,
      | "goto" => Self::Goto(date_arg(rest)?),
      | "month" => Self::Month(
        rest
          .parse()
          .with_context(|| format!("bad month: {rest}"))?
      ),
      | "year" => Self::Year(
        rest
          .parse()
          .with_context(|| format!("bad year: {rest}"))?
      ),
      | "select" => Self::Select(date_arg(rest)?),
      | "select-text" => {
        Self::SelectText(rest.to_string())
      }
      | "min" => Self::Min(optional_date_arg(rest)?),
      | "max" => Self::Max(optional_date_arg(rest)?),
      | "range-start" => {
        Self::RangeStart(optional_date_arg(rest)?)
      }
      | "range-end" => {
        Self::RangeEnd(optional_date_arg(rest)?)
      }
      | "add" | "subtract" => {
        let direction = if word == "add" {
          AdjustDirection::Add
        } else {
          AdjustDirection::Subtract
        };
        let days = rest
          .parse()
          .with_context(|| format!("bad day count: {rest}"))?;
        Self::Adjust(direction, days)
      }
      | "key" => Self::Key(rest.parse()?),
      | "click" => Self::Click(target_arg(rest)?),
      | "tap" => Self::Tap(target_arg(rest)?),
      | "choose-month" => Self::Choose(
        SelectKind::Month,
        rest.to_string()
      ),
      | "choose-year" => Self::Choose(
        SelectKind::Year,
        rest.to_string()
      ),
      | "type" => Self::Type(rest.to_string()),
      | "wait" => Self::Wait(
        rest
          .parse()
          .with_context(|| format!("bad delay: {rest}"))?
      ),
      | other => {
        return Err(anyhow!(
          "unknown session command: {other}"
        ));
      }
    };
    Ok(command)
  }
}

/// Picker state after one script line.
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
  pub line:       usize,
  pub command:    String,
  pub visibility: Visibility,
  pub selected:   Option<NaiveDate>,
  pub field:      Option<String>,
  pub panes:      Vec<CalendarPane>,
  pub prevented:  bool,
  pub fired:      Vec<String>
}

/// Runs one command, returning whether
/// the host default was prevented and
/// which timers fired.
pub fn apply(
  picker: &mut Picker<HeadlessHost>,
  command: &SessionCommand
) -> (bool, Vec<String>) {
  let mut prevented = false;
  let mut fired = Vec::new();
  match command {
    | SessionCommand::Show => picker.show(),
    | SessionCommand::Hide => picker.hide(),
    | SessionCommand::Next => picker.next_month(),
    | SessionCommand::Prev => picker.prev_month(),
    | SessionCommand::Today => picker.goto_today(),
    | SessionCommand::Clear => picker.clear(),
    | SessionCommand::Goto(date) => {
      picker.goto_date(*date);
    }
    | SessionCommand::Month(month) => {
      picker.goto_month(*month);
    }
    | SessionCommand::Year(year) => {
      picker.goto_year(*year);
    }
    | SessionCommand::Select(date) => {
      picker.set_date(*date);
    }
    | SessionCommand::SelectText(text) => {
      picker.set_date(text.as_str());
    }
    | SessionCommand::Min(date) => {
      picker.set_min_date(*date);
    }
    | SessionCommand::Max(date) => {
      picker.set_max_date(*date);
    }
    | SessionCommand::RangeStart(date) => {
      picker.set_start_range(*date);
      picker.draw(false);
    }
    | SessionCommand::RangeEnd(date) => {
      picker.set_end_range(*date);
      picker.draw(false);
    }
    | SessionCommand::Adjust(direction, days) => {
      picker.adjust_date(*direction, *days);
    }
    | SessionCommand::Wait(ms) => {
      fired = picker
        .advance(*ms)
        .into_iter()
        .map(|kind| format!("{kind:?}"))
        .collect();
    }
    | other => {
      for event in events_for(picker, other) {
        prevented |=
          picker.handle_event(event).prevent_default;
      }
    }
  }
  (prevented, fired)
}

fn events_for(
  picker: &mut Picker<HeadlessHost>,
  command: &SessionCommand
) -> Vec<PickerEvent> {
  let touch = Point { x: 0.0, y: 0.0 };
  match command {
    | SessionCommand::Key(key) => {
      vec![PickerEvent::KeyDown(*key)]
    }
    | SessionCommand::Click(target) => {
      vec![PickerEvent::PointerDown(*target)]
    }
    | SessionCommand::Tap(target) => vec![
      PickerEvent::TouchStart(vec![touch]),
      PickerEvent::TouchEnd {
        touches: vec![touch],
        target:  *target
      },
    ],
    | SessionCommand::Choose(select, value) => {
      vec![PickerEvent::SelectChange {
        select: *select,
        value:  value.clone()
      }]
    }
    | SessionCommand::Type(text) => {
      picker.host_mut().type_into_field(text);
      vec![PickerEvent::FieldChange(
        ChangeOrigin::User
      )]
    }
    | SessionCommand::Focus => {
      vec![PickerEvent::FieldFocus]
    }
    | SessionCommand::Blur => {
      vec![PickerEvent::FieldBlur {
        focus_in_picker: false
      }]
    }
    | SessionCommand::ClickOutside => {
      vec![PickerEvent::DocumentClick {
        inside_picker: false,
        on_trigger:    false
      }]
    }
    | _ => Vec::new()
  }
}

fn capture(
  picker: &Picker<HeadlessHost>,
  line: usize,
  command: &str,
  (prevented, fired): (bool, Vec<String>)
) -> SessionState {
  SessionState {
    line,
    command: command.to_string(),
    visibility: picker.visibility(),
    selected: picker.date(),
    field: picker
      .host()
      .field
      .as_ref()
      .map(|field| field.value.clone()),
    panes: picker.panes().to_vec(),
    prevented,
    fired
  }
}

/// Runs `script` against `picker`,
/// writing one JSON line per command.
/// Returns the number of commands run.
#[tracing::instrument(skip_all)]
pub fn run_script<W: Write>(
  picker: &mut Picker<HeadlessHost>,
  script: &str,
  mut out: W
) -> anyhow::Result<usize> {
  let mut count = 0;
  for (index, raw) in script.lines().enumerate() {
    let number = index + 1;
    let text = raw.trim();
    if text.is_empty() || text.starts_with('#') {
      continue;
    }
    let command = text
      .parse::<SessionCommand>()
      .with_context(|| {
        format!("line {number}: {text}")
      })?;
    debug!(line = number, ?command, "session step");
    let result = apply(picker, &command);
    let state =
      capture(picker, number, text, result);
    serde_json::to_writer(&mut out, &state)?;
    writeln!(out)?;
    count += 1;
  }
  Ok(count)
}
