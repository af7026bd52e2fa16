//! Input events delivered by the host
//! and how the picker reacts to them.

use std::str::FromStr;

use anyhow::anyhow;
use chrono::NaiveDate;
use tracing::{
  debug,
  trace
};

use crate::host::{
  ChangeOrigin,
  Host
};
use crate::picker::{
  AdjustDirection,
  DateInput,
  Picker
};
use crate::timers::{
  BLUR_HIDE_DELAY_MS,
  SELECT_HIDE_DELAY_MS,
  TimerKind
};

/// Finger travel still counted as a
/// tap, in CSS pixels per axis.
pub const TAP_TOLERANCE_PX: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
  pub x: f64,
  pub y: f64
}

/// What a pointer landed on inside the
/// calendar surface.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Target {
  Day(NaiveDate),
  PrevMonth,
  NextMonth,
  Today,
  MonthSelect,
  YearSelect,
  Surface
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum SelectKind {
  Month,
  Year
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum Key {
  Enter,
  Escape,
  Left,
  Up,
  Right,
  Down,
  Backspace,
  Delete,
  Tab,
  Other
}

impl Key {
  /// Maps a DOM `keyCode`.
  #[must_use]
  pub fn from_code(code: u32) -> Self {
    match code {
      | 13 => Self::Enter,
      | 27 => Self::Escape,
      | 37 => Self::Left,
      | 38 => Self::Up,
      | 39 => Self::Right,
      | 40 => Self::Down,
      | 8 => Self::Backspace,
      | 46 => Self::Delete,
      | 9 => Self::Tab,
      | _ => Self::Other
    }
  }
}

impl FromStr for Key {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      | "enter" | "return" => Ok(Self::Enter),
      | "escape" | "esc" => Ok(Self::Escape),
      | "left" => Ok(Self::Left),
      | "up" => Ok(Self::Up),
      | "right" => Ok(Self::Right),
      | "down" => Ok(Self::Down),
      | "backspace" => Ok(Self::Backspace),
      | "delete" | "del" => Ok(Self::Delete),
      | "tab" => Ok(Self::Tab),
      | other => {
        Err(anyhow!("unknown key: {other}"))
      }
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PickerEvent {
  PointerDown(Target),
  SelectChange {
    select: SelectKind,
    value:  String
  },
  KeyDown(Key),
  FieldChange(ChangeOrigin),
  FieldFocus,
  FieldPointerDown,
  FieldBlur {
    /// Focus moved somewhere inside the
    /// calendar surface.
    focus_in_picker: bool
  },
  DocumentClick {
    inside_picker: bool,
    on_trigger:    bool
  },
  TouchStart(Vec<Point>),
  TouchEnd {
    touches: Vec<Point>,
    target:  Target
  },
  TouchCancel
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
  Default,
)]
pub struct EventOutcome {
  pub prevent_default: bool
}

impl EventOutcome {
  const PREVENT: Self = Self {
    prevent_default: true
  };
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TouchState {
  touching: bool,
  start:    Option<Point>
}

fn is_big_move(
  end: Option<Point>,
  start: Option<Point>
) -> bool {
  match (end, start) {
    | (Some(end), Some(start)) => {
      (end.x - start.x).abs()
        > TAP_TOLERANCE_PX
        || (end.y - start.y).abs()
          > TAP_TOLERANCE_PX
    }
    | _ => false
  }
}

impl<H: Host> Picker<H> {
  #[tracing::instrument(skip(self))]
  pub fn handle_event(
    &mut self,
    event: PickerEvent
  ) -> EventOutcome {
    match event {
      | PickerEvent::PointerDown(target) => {
        self.on_pointer_down(target)
      }
      | PickerEvent::SelectChange {
        select,
        value
      } => {
        self.on_select_change(select, &value);
        EventOutcome::default()
      }
      | PickerEvent::KeyDown(key) => {
        self.on_key_down(key)
      }
      | PickerEvent::FieldChange(origin) => {
        self.on_field_change(origin);
        EventOutcome::default()
      }
      | PickerEvent::FieldFocus => {
        if !self.host.field_is_read_only() {
          self
            .timers
            .cancel(TimerKind::HideAfterBlur);
          self.show();
        }
        EventOutcome::default()
      }
      | PickerEvent::FieldPointerDown => {
        if !self.host.field_is_read_only() {
          if self.is_visible() {
            self.hide();
          } else {
            self.show();
          }
        }
        EventOutcome::default()
      }
      | PickerEvent::FieldBlur {
        focus_in_picker
      } => {
        if focus_in_picker {
          return EventOutcome::default();
        }
        if !self.interacting {
          self.timers.schedule(
            TimerKind::HideAfterBlur,
            BLUR_HIDE_DELAY_MS
          );
        }
        self.interacting = false;
        EventOutcome::default()
      }
      | PickerEvent::DocumentClick {
        inside_picker,
        on_trigger
      } => {
        if inside_picker || on_trigger {
          return EventOutcome::PREVENT;
        }
        if self.is_visible() {
          self.hide();
        }
        EventOutcome::default()
      }
      | PickerEvent::TouchStart(points) => {
        self.touch.touching = true;
        if points.len() <= 1 {
          self.touch.start =
            points.first().copied();
        }
        EventOutcome::default()
      }
      | PickerEvent::TouchEnd {
        touches,
        target
      } => {
        self.touch.touching = false;
        let mut outcome =
          EventOutcome::default();
        if touches.len() <= 1
          && !is_big_move(
            touches.first().copied(),
            self.touch.start
          )
        {
          trace!(?target, "tap");
          self.on_pointer_down(target);
          outcome = EventOutcome::PREVENT;
          // the emulated mouse-down that
          // follows must be ignored
          self.touch.touching = true;
        }
        self.touch.start = None;
        outcome
      }
      | PickerEvent::TouchCancel => {
        self.touch = TouchState::default();
        EventOutcome::default()
      }
    }
  }

  fn on_pointer_down(
    &mut self,
    target: Target
  ) -> EventOutcome {
    if self.touch.touching
      || !self.is_visible()
    {
      return EventOutcome::default();
    }

    match target {
      | Target::Day(date) => {
        if self.day_is_pickable(date) {
          self.set_date(date);
          if self.options.is_bound() {
            self.timers.schedule(
              TimerKind::HideAfterSelect,
              SELECT_HIDE_DELAY_MS
            );
          }
        } else {
          debug!(%date, "day not pickable");
        }
      }
      | Target::PrevMonth => {
        let open = self
          .panes()
          .first()
          .is_some_and(|pane| {
            self
              .bounds
              .can_page_back(pane.year, pane.month0())
          });
        if open {
          self.prev_month();
        }
      }
      | Target::NextMonth => {
        let open = self
          .panes()
          .last()
          .is_some_and(|pane| {
            self.bounds.can_page_forward(
              pane.year,
              pane.month0()
            )
          });
        if open {
          self.next_month();
        }
      }
      | Target::Today => {
        let now = self.clock.now();
        self.set_date(DateInput::At(now));
        self.hide();
      }
      | Target::MonthSelect
      | Target::YearSelect => {
        self.interacting = true;
        return EventOutcome::default();
      }
      | Target::Surface => {}
    }
    EventOutcome::PREVENT
  }

  fn day_is_pickable(
    &self,
    date: NaiveDate
  ) -> bool {
    if self.grid_context().is_disabled(date) {
      return false;
    }
    let in_view = self
      .panes()
      .iter()
      .any(|pane| pane.contains(date));
    let options = &self.options;
    in_view
      || (options
        .show_days_in_next_and_previous_months
        && options
          .enable_selection_days_in_next_and_previous_months)
  }

  fn on_select_change(
    &mut self,
    select: SelectKind,
    value: &str
  ) {
    let Ok(parsed) = value.trim().parse::<i32>()
    else {
      debug!(
        ?select,
        value,
        "ignoring non-numeric select value"
      );
      return;
    };
    match select {
      | SelectKind::Month => {
        self.goto_month(parsed);
      }
      | SelectKind::Year => {
        self.goto_year(parsed);
      }
    }
  }

  fn on_key_down(
    &mut self,
    key: Key
  ) -> EventOutcome {
    if !self.options.keyboard_input
      || !self.is_visible()
    {
      return EventOutcome::default();
    }

    match key {
      | Key::Enter | Key::Escape => {
        // the field doubles as the trigger
        // when none is given
        if self.host.has_field() {
          self.host.focus_field();
        }
        self.hide();
      }
      | Key::Left => {
        self.adjust_date(
          AdjustDirection::Subtract,
          1
        );
        return EventOutcome::PREVENT;
      }
      | Key::Up => {
        self.adjust_date(
          AdjustDirection::Subtract,
          7
        );
        return EventOutcome::PREVENT;
      }
      | Key::Right => {
        self.adjust_date(
          AdjustDirection::Add,
          1
        );
        return EventOutcome::PREVENT;
      }
      | Key::Down => {
        self.adjust_date(
          AdjustDirection::Add,
          7
        );
        return EventOutcome::PREVENT;
      }
      | Key::Backspace | Key::Delete => {
        self.clear();
      }
      | Key::Tab => {
        if self.host.has_field()
          || self.host.has_separate_trigger()
        {
          self.hide();
        }
      }
      | Key::Other => {}
    }
    EventOutcome::default()
  }

  fn on_field_change(
    &mut self,
    origin: ChangeOrigin
  ) {
    if origin == ChangeOrigin::Picker {
      trace!("own field change ignored");
      return;
    }
    if self.options.debounce_ms > 0 {
      self.timers.schedule(
        TimerKind::ParseField,
        self.options.debounce_ms
      );
    } else {
      self.apply_field_value();
    }
  }
}
