use chrono::{
  Datelike,
  Duration,
  NaiveDate,
  NaiveDateTime
};
use serde::Serialize;
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::config::{
  MainCalendar,
  Options,
  OptionsPatch
};
use crate::datetime::{
  Clock,
  DateFormat,
  date_from_offset,
  days_in_month,
  midnight,
  parse_date_string,
  parse_field_value
};
use crate::events::TouchState;
use crate::grid::{
  Bounds,
  GridContext,
  MonthGrid,
  build_month
};
use crate::host::{
  ChangeOrigin,
  Host,
  InlinePosition,
  Listener,
  Mount
};
use crate::position::compute_placement;
use crate::render::{
  CLASS_PREFIX,
  CalendarView,
  render_html
};
use crate::timers::{
  FOCUS_DELAY_MS,
  TimerKind,
  TimerQueue
};

const ALL_LISTENERS: [Listener; 9] = [
  Listener::SurfacePointer,
  Listener::SurfaceTouch,
  Listener::SurfaceChange,
  Listener::DocumentKeydown,
  Listener::DocumentClick,
  Listener::FieldChange,
  Listener::TriggerPointer,
  Listener::TriggerFocus,
  Listener::TriggerBlur
];

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
  Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PageDirection {
  Next,
  Prev
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum AdjustDirection {
  Add,
  Subtract
}

/// Anything `set_date` accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateInput {
  Clear,
  At(NaiveDateTime),
  /// Read as a UTC timestamp and
  /// shifted by the local offset.
  Text(String)
}

impl From<NaiveDateTime> for DateInput {
  fn from(at: NaiveDateTime) -> Self {
    Self::At(at)
  }
}

impl From<NaiveDate> for DateInput {
  fn from(date: NaiveDate) -> Self {
    Self::At(midnight(date))
  }
}

impl From<Option<NaiveDate>> for DateInput {
  fn from(date: Option<NaiveDate>) -> Self {
    date.map_or(Self::Clear, Self::from)
  }
}

impl From<&str> for DateInput {
  fn from(text: &str) -> Self {
    Self::Text(text.to_string())
  }
}

impl From<String> for DateInput {
  fn from(text: String) -> Self {
    Self::Text(text)
  }
}

/// `Never` until the first show or
/// hide; a close callback only fires
/// after the picker has been visible
/// or hidden before.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
  #[default]
  Never,
  Visible,
  Hidden
}

/// One displayed month. `month` is
/// zero-based and may leave 0..=11
/// between an edit and the next
/// renormalisation.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
)]
pub struct CalendarPane {
  pub month: i32,
  pub year:  i32
}

impl CalendarPane {
  #[must_use]
  pub fn normalized(self) -> Self {
    Self {
      month: self.month.rem_euclid(12),
      year:  self.year.saturating_add(
        self.month.div_euclid(12)
      )
    }
  }

  #[must_use]
  pub fn month0(self) -> u32 {
    u32::try_from(
      self.normalized().month
    )
    .unwrap_or(0)
  }

  #[must_use]
  pub fn first_day(
    self
  ) -> Option<NaiveDate> {
    let pane = self.normalized();
    date_from_offset(
      pane.year,
      pane.month0(),
      1
    )
  }

  #[must_use]
  pub fn last_day(
    self
  ) -> Option<NaiveDate> {
    let pane = self.normalized();
    date_from_offset(
      pane.year,
      pane.month0(),
      i64::from(days_in_month(
        pane.year,
        pane.month0()
      ))
    )
  }

  #[must_use]
  pub fn contains(
    self,
    date: NaiveDate
  ) -> bool {
    let pane = self.normalized();
    date.year() == pane.year
      && date.month0() == pane.month0()
  }
}

type Predicate =
  Box<dyn Fn(NaiveDate) -> bool>;

/// Callbacks and predicates supplied by
/// the embedding application.
#[derive(Default)]
pub struct Hooks {
  pub on_select:
    Option<Box<dyn FnMut(NaiveDateTime)>>,
  pub on_open:     Option<Box<dyn FnMut()>>,
  pub on_close:    Option<Box<dyn FnMut()>>,
  pub on_draw:
    Option<Box<dyn FnMut(&[MonthGrid])>>,
  pub on_paginate: Option<
    Box<dyn FnMut(PageDirection, u32, i32)>
  >,
  pub disable_day: Option<Predicate>,
  pub select_day:  Option<Predicate>,
  pub format: Option<
    Box<dyn Fn(NaiveDate, &str) -> String>
  >,
  pub parse: Option<
    Box<
      dyn Fn(&str, &str) -> Option<NaiveDate>
    >
  >
}

impl Hooks {
  #[must_use]
  pub fn on_select(
    mut self,
    hook: impl FnMut(NaiveDateTime) + 'static
  ) -> Self {
    self.on_select = Some(Box::new(hook));
    self
  }

  #[must_use]
  pub fn on_open(
    mut self,
    hook: impl FnMut() + 'static
  ) -> Self {
    self.on_open = Some(Box::new(hook));
    self
  }

  #[must_use]
  pub fn on_close(
    mut self,
    hook: impl FnMut() + 'static
  ) -> Self {
    self.on_close = Some(Box::new(hook));
    self
  }

  #[must_use]
  pub fn on_draw(
    mut self,
    hook: impl FnMut(&[MonthGrid]) + 'static
  ) -> Self {
    self.on_draw = Some(Box::new(hook));
    self
  }

  #[must_use]
  pub fn on_paginate(
    mut self,
    hook: impl FnMut(PageDirection, u32, i32)
    + 'static
  ) -> Self {
    self.on_paginate = Some(Box::new(hook));
    self
  }

  #[must_use]
  pub fn disable_day(
    mut self,
    predicate: impl Fn(NaiveDate) -> bool
    + 'static
  ) -> Self {
    self.disable_day =
      Some(Box::new(predicate));
    self
  }

  #[must_use]
  pub fn select_day(
    mut self,
    predicate: impl Fn(NaiveDate) -> bool
    + 'static
  ) -> Self {
    self.select_day =
      Some(Box::new(predicate));
    self
  }

  #[must_use]
  pub fn format(
    mut self,
    format: impl Fn(NaiveDate, &str) -> String
    + 'static
  ) -> Self {
    self.format = Some(Box::new(format));
    self
  }

  #[must_use]
  pub fn parse(
    mut self,
    parse: impl Fn(&str, &str) -> Option<NaiveDate>
    + 'static
  ) -> Self {
    self.parse = Some(Box::new(parse));
    self
  }
}

/// A date picker bound to a host
/// document.
pub struct Picker<H: Host> {
  pub(crate) options:     Options,
  pub(crate) hooks:       Hooks,
  pub(crate) host:        H,
  pub(crate) clock:       Box<dyn Clock>,
  pub(crate) bounds:      Bounds,
  calendars:              Vec<CalendarPane>,
  selected:               Option<NaiveDate>,
  visibility:             Visibility,
  pub(crate) timers:      TimerQueue,
  pub(crate) interacting: bool,
  pub(crate) touch:       TouchState,
  format:                 DateFormat
}

impl<H: Host> Picker<H> {
  #[tracing::instrument(skip_all)]
  pub fn new(
    host: H,
    clock: impl Clock + 'static,
    patch: OptionsPatch,
    hooks: Hooks
  ) -> Self {
    let mut picker = Self {
      options: Options::default(),
      hooks,
      host,
      clock: Box::new(clock),
      bounds: Bounds::default(),
      calendars: Vec::new(),
      selected: None,
      visibility: Visibility::Never,
      timers: TimerQueue::default(),
      interacting: false,
      touch: TouchState::default(),
      format: DateFormat::default()
    };
    picker.configure(patch);
    picker.attach();
    picker.apply_default_date();

    if picker.options.is_bound() {
      picker.hide();
      picker.host.add_class("is-bound");
      for listener in [
        Listener::TriggerPointer,
        Listener::TriggerFocus,
        Listener::TriggerBlur
      ] {
        picker.host.listen(listener);
      }
    } else {
      picker.show();
    }

    info!(
      bound = picker.options.is_bound(),
      months = picker.options.number_of_months,
      "picker ready"
    );
    picker
  }

  fn attach(&mut self) {
    self.host.add_class(&format!(
      "{CLASS_PREFIX}-single"
    ));
    if self.options.is_rtl {
      self.host.add_class("is-rtl");
    }
    if let Some(theme) =
      self.options.theme.clone()
    {
      self.host.add_class(&theme);
    }

    for listener in [
      Listener::SurfaceTouch,
      Listener::SurfacePointer,
      Listener::SurfaceChange
    ] {
      self.host.listen(listener);
    }
    if self.options.keyboard_input {
      self.host.listen(Listener::DocumentKeydown);
    }

    if self.host.has_field() {
      let mount = if self.options.container {
        Mount::Container
      } else if self.options.is_bound() {
        Mount::DocumentBody
      } else {
        Mount::AfterField
      };
      self.host.mount(mount);
      self.host.listen(Listener::FieldChange);

      if self.options.default_date.is_none()
      {
        self.options.default_date =
          self.parse_field();
        self.options.set_default_date = true;
      }
    } else if self.options.container {
      self.host.mount(Mount::Container);
    }
  }

  fn apply_default_date(&mut self) {
    match self.options.default_date {
      | Some(date)
        if self.options.set_default_date =>
      {
        self.commit(DateInput::from(date), false);
      }
      | Some(date) => self.goto_date(date),
      | None => {
        let today = self.clock.today();
        let start = match (
          self.bounds.min_date,
          self.bounds.max_date
        ) {
          | (Some(min), _) if min > today => {
            min
          }
          | (_, Some(max)) if max < today => {
            max
          }
          | _ => today
        };
        self.goto_date(start);
      }
    }
  }

  /// Merges `patch` over the current
  /// options and revalidates them.
  #[tracing::instrument(skip_all)]
  pub fn configure(
    &mut self,
    patch: OptionsPatch
  ) {
    self.options.apply(patch);
    self
      .options
      .sanitize(self.host.has_field());
    self.format =
      DateFormat::new(&self.options.format);

    self.bounds = Bounds::default();
    self.bounds.set_min(self.options.min_date);
    self.bounds.set_max(self.options.max_date);

    debug!(
      min = ?self.bounds.min_date,
      max = ?self.bounds.max_date,
      months = self.options.number_of_months,
      "options applied"
    );

    if !self.calendars.is_empty() {
      self.adjust_calendars();
    }
  }

  #[must_use]
  pub fn options(&self) -> &Options {
    &self.options
  }

  #[must_use]
  pub fn bounds(&self) -> &Bounds {
    &self.bounds
  }

  #[must_use]
  pub fn host(&self) -> &H {
    &self.host
  }

  pub fn host_mut(&mut self) -> &mut H {
    &mut self.host
  }

  #[must_use]
  pub fn timers(&self) -> &TimerQueue {
    &self.timers
  }

  #[must_use]
  pub fn panes(&self) -> &[CalendarPane] {
    &self.calendars
  }

  #[must_use]
  pub fn date(&self) -> Option<NaiveDate> {
    self.selected
  }

  #[must_use]
  pub fn is_visible(&self) -> bool {
    self.visibility == Visibility::Visible
  }

  #[must_use]
  pub fn visibility(&self) -> Visibility {
    self.visibility
  }

  /// The selection in `format` (the
  /// configured format when `None`), or
  /// an empty string.
  #[must_use]
  pub fn to_formatted_string(
    &self,
    format: Option<&str>
  ) -> String {
    let Some(date) = self.selected else {
      return String::new();
    };
    let pattern =
      format.unwrap_or(&self.options.format);
    if let Some(hook) = self.hooks.format.as_ref()
    {
      return hook(date, pattern);
    }
    match format {
      | Some(pattern) => {
        DateFormat::new(pattern).format(date)
      }
      | None => self.format.format(date)
    }
  }

  pub fn set_date(
    &mut self,
    input: impl Into<DateInput>
  ) {
    self.commit(input.into(), true);
  }

  /// Like `set_date` without the select
  /// callback.
  pub fn set_date_quietly(
    &mut self,
    input: impl Into<DateInput>
  ) {
    self.commit(input.into(), false);
  }

  pub fn clear(&mut self) {
    self.commit(DateInput::Clear, true);
  }

  fn commit(
    &mut self,
    input: DateInput,
    notify: bool
  ) {
    let at = match input {
      | DateInput::Clear => {
        self.clear_selection();
        return;
      }
      | DateInput::At(at) => at,
      | DateInput::Text(text) => {
        match parse_date_string(
          &text,
          self.clock.utc_offset()
        ) {
          | Some(at) => at,
          | None => {
            debug!(
              input = %text,
              "ignoring unparseable date"
            );
            return;
          }
        }
      }
    };

    let at = self.clamp_to_bounds(at);
    if notify {
      self.notify_select(at);
    }

    let day = at.date();
    self.selected = Some(day);
    self.goto_date(day);

    if notify {
      self.notify_select(midnight(day));
    }
    self.sync_field();
    info!(date = %day, "selection changed");
  }

  fn notify_select(
    &mut self,
    at: NaiveDateTime
  ) {
    if let Some(hook) =
      self.hooks.on_select.as_mut()
    {
      hook(at);
    }
  }

  fn clamp_to_bounds(
    &self,
    at: NaiveDateTime
  ) -> NaiveDateTime {
    if !self
      .options
      .convert_date_to_min_or_max_date
    {
      return at;
    }
    if let Some(min) = self.bounds.min_date
      && at < midnight(min)
    {
      trace!(%at, %min, "clamped to min date");
      return midnight(min);
    }
    if let Some(max) = self.bounds.max_date
      && at > midnight(max)
    {
      trace!(%at, %max, "clamped to max date");
      return midnight(max);
    }
    at
  }

  fn clear_selection(&mut self) {
    self.selected = None;
    if self.host.has_field()
      && !self.host.field_value().is_empty()
    {
      self.host.set_field_value("");
      self
        .host
        .dispatch_field_change(ChangeOrigin::Picker);
    }
    info!("selection cleared");
    self.draw(false);
  }

  fn sync_field(&mut self) {
    if !self.host.has_field() {
      return;
    }
    let old = self.host.field_value();
    let new = self.to_formatted_string(None);
    self.host.set_field_value(&new);
    if new != old {
      self
        .host
        .dispatch_field_change(ChangeOrigin::Picker);
    }
  }

  pub(crate) fn parse_field(
    &self
  ) -> Option<NaiveDate> {
    let text = self.host.field_value();
    match self.hooks.parse.as_ref() {
      | Some(parse) => {
        parse(&text, &self.options.format)
      }
      | None => {
        parse_field_value(&text, &self.format)
      }
    }
  }

  pub(crate) fn apply_field_value(&mut self) {
    match self.parse_field() {
      | Some(date) => self.set_date(date),
      | None => {
        debug!(
          value = %self.host.field_value(),
          "field value ignored"
        );
      }
    }
  }

  /// Moves `days` from the selection, or
  /// from now without one.
  pub fn adjust_date(
    &mut self,
    direction: AdjustDirection,
    days: i64
  ) {
    let base = self
      .selected
      .map(midnight)
      .unwrap_or_else(|| self.clock.now());
    let shifted = Duration::try_days(days)
      .and_then(|delta| match direction {
        | AdjustDirection::Add => {
          base.checked_add_signed(delta)
        }
        | AdjustDirection::Subtract => {
          base.checked_sub_signed(delta)
        }
      });
    match shifted {
      | Some(at) => self.set_date(at),
      | None => {
        warn!(days, "date adjustment out of range");
      }
    }
  }

  /// Shows `date`, keeping the panes
  /// when it is already visible.
  pub fn goto_date(&mut self, date: NaiveDate) {
    let visible = match (
      self.calendars.first(),
      self.calendars.last()
    ) {
      | (Some(first), Some(last)) => first
        .first_day()
        .zip(last.last_day())
        .is_some_and(|(start, end)| {
          start <= date && date <= end
        }),
      | _ => false
    };

    if !visible {
      let mut pane = CalendarPane {
        month: i32::try_from(date.month0())
          .unwrap_or(0),
        year:  date.year()
      };
      if self.options.main_calendar
        == MainCalendar::Right
      {
        pane.month += 1 - self.pane_count();
      }
      trace!(%date, "resetting panes");
      self.calendars = vec![pane];
    }
    self.adjust_calendars();
  }

  pub fn goto_today(&mut self) {
    let today = self.clock.today();
    self.goto_date(today);
  }

  /// Sets pane 0's zero-based month;
  /// values outside 0..=11 roll the year.
  pub fn goto_month(&mut self, month: i32) {
    if let Some(first) =
      self.calendars.first_mut()
    {
      first.month = month;
      self.adjust_calendars();
    }
  }

  pub fn goto_year(&mut self, year: i32) {
    if let Some(first) =
      self.calendars.first_mut()
    {
      first.year = year;
      self.adjust_calendars();
    }
  }

  pub fn next_month(&mut self) {
    self.page(PageDirection::Next);
  }

  pub fn prev_month(&mut self) {
    self.page(PageDirection::Prev);
  }

  fn page(&mut self, direction: PageDirection) {
    let Some(first) = self.calendars.first_mut()
    else {
      return;
    };
    first.month += match direction {
      | PageDirection::Next => 1,
      | PageDirection::Prev => -1
    };
    self.adjust_calendars();

    if let Some(pane) =
      self.calendars.first().copied()
      && let Some(hook) =
        self.hooks.on_paginate.as_mut()
    {
      hook(direction, pane.month0(), pane.year);
    }
  }

  fn pane_count(&self) -> i32 {
    i32::try_from(self.options.number_of_months)
      .unwrap_or(1)
  }

  fn adjust_calendars(&mut self) {
    self.realign_panes();
    self.draw(false);
  }

  fn realign_panes(&mut self) {
    let Some(anchor) = self
      .calendars
      .first()
      .map(|pane| pane.normalized())
    else {
      return;
    };
    self.calendars = (0..self.pane_count())
      .map(|offset| {
        CalendarPane {
          month: anchor.month + offset,
          year:  anchor.year
        }
        .normalized()
      })
      .collect();
  }

  fn clamp_panes_to_bounds(&mut self) {
    let min_year = self.bounds.min_year;
    let max_year = self.bounds.max_year;
    let min_month = self
      .bounds
      .min_month
      .and_then(|m| i32::try_from(m).ok());
    let max_month = self
      .bounds
      .max_month
      .and_then(|m| i32::try_from(m).ok());

    let Some(first) = self.calendars.first_mut()
    else {
      return;
    };
    let before = *first;
    if first.year <= min_year {
      first.year = min_year;
      if let Some(min) = min_month
        && first.month < min
      {
        first.month = min;
      }
    }
    if first.year >= max_year {
      first.year = max_year;
      if let Some(max) = max_month
        && first.month > max
      {
        first.month = max;
      }
    }
    let after = *first;

    if after != before {
      debug!(
        ?before,
        ?after,
        "pane clamped into bounds"
      );
      self.realign_panes();
    }
  }

  pub fn set_min_date(
    &mut self,
    value: Option<NaiveDate>
  ) {
    self.options.min_date = value;
    if value.is_none() {
      self.options.start_range = None;
    }
    self.bounds.set_min(value);
    self.reset_inverted_bounds();
    self.draw(false);
  }

  pub fn set_max_date(
    &mut self,
    value: Option<NaiveDate>
  ) {
    self.options.max_date = value;
    if value.is_none() {
      self.options.end_range = None;
    }
    self.bounds.set_max(value);
    self.reset_inverted_bounds();
    self.draw(false);
  }

  fn reset_inverted_bounds(&mut self) {
    if self.bounds.is_inverted() {
      warn!(
        min = ?self.bounds.min_date,
        max = ?self.bounds.max_date,
        "max date before min date; \
         resetting both bounds"
      );
      self.bounds = Bounds::default();
      self.options.min_date = None;
      self.options.max_date = None;
    }
  }

  pub fn set_start_range(
    &mut self,
    value: Option<NaiveDate>
  ) {
    self.options.start_range = value;
  }

  pub fn set_end_range(
    &mut self,
    value: Option<NaiveDate>
  ) {
    self.options.end_range = value;
  }

  pub fn show(&mut self) {
    if self.is_visible() {
      return;
    }
    self.visibility = Visibility::Visible;
    self.draw(false);
    self.host.remove_class("is-hidden");
    if self.options.is_bound() {
      self.host.listen(Listener::DocumentClick);
      self.adjust_position();
    }
    debug!("picker shown");
    if let Some(hook) = self.hooks.on_open.as_mut()
    {
      hook();
    }
  }

  pub fn hide(&mut self) {
    let prior = self.visibility;
    if prior == Visibility::Hidden {
      return;
    }
    if self.options.is_bound() {
      self.host.unlisten(Listener::DocumentClick);
    }
    if !self.options.container {
      self
        .host
        .set_inline_position(InlinePosition::Static);
    }
    self.host.add_class("is-hidden");
    self.visibility = Visibility::Hidden;
    debug!(?prior, "picker hidden");

    if prior != Visibility::Never
      && let Some(hook) =
        self.hooks.on_close.as_mut()
    {
      hook();
    }
  }

  pub(crate) fn grid_context(
    &self
  ) -> GridContext<'_> {
    GridContext {
      first_day:        self.options.first_day,
      today:            self.clock.today(),
      selected:         self.selected,
      bounds:           &self.bounds,
      start_range:      self.options.start_range,
      end_range:        self.options.end_range,
      disable_weekends: self
        .options
        .disable_weekends,
      events:           &self.options.events,
      disabled_days:    &self
        .options
        .disabled_days,
      enabled_days:     &self
        .options
        .enabled_days,
      disable_day:      self
        .hooks
        .disable_day
        .as_deref(),
      select_day:       self
        .hooks
        .select_day
        .as_deref(),
      show_week_number: self
        .options
        .show_week_number,
      week_min_days:    self
        .options
        .first_week_of_year_min_days,
      pick_whole_week:  self
        .options
        .pick_whole_week
    }
  }

  /// Day grids for every visible pane.
  #[must_use]
  pub fn grids(&self) -> Vec<MonthGrid> {
    let ctx = self.grid_context();
    self
      .calendars
      .iter()
      .map(|pane| {
        let pane = pane.normalized();
        build_month(pane.year, pane.month0(), &ctx)
      })
      .collect()
  }

  /// Renders every pane into the
  /// surface. Skipped while hidden
  /// unless `force` is set.
  #[tracing::instrument(skip(self))]
  pub fn draw(&mut self, force: bool) {
    if !self.is_visible() && !force {
      trace!("hidden; draw skipped");
      return;
    }
    self.clamp_panes_to_bounds();

    let grids = self.grids();
    let label =
      self.to_formatted_string(Some("L"));
    let html = render_html(&CalendarView {
      options:       &self.options,
      bounds:        &self.bounds,
      grids:         &grids,
      current_label: &label
    });
    self.host.set_markup(html);

    let bound = self.options.is_bound();
    if bound && !self.host.field_is_hidden() {
      self.timers.schedule(
        TimerKind::FocusTrigger,
        FOCUS_DELAY_MS
      );
    }
    if let Some(hook) = self.hooks.on_draw.as_mut()
    {
      hook(&grids);
    }
    if bound {
      self.host.set_field_attribute(
        "aria-label",
        &self.options.aria_label
      );
    }
    debug!(panes = grids.len(), "calendar drawn");
  }

  /// Places the popup next to its
  /// anchor. No-op inside a container.
  pub fn adjust_position(&mut self) {
    if self.options.container {
      return;
    }
    let placement = compute_placement(
      self.host.anchor_rect(),
      self.host.surface_size(),
      self.host.viewport(),
      self.options.position,
      self.options.reposition
    );
    self.host.set_inline_position(
      InlinePosition::Absolute {
        left: placement.left,
        top:  placement.top
      }
    );
    for (add, remove) in [
      placement.horizontal_class(),
      placement.vertical_class()
    ] {
      self.host.add_class(add);
      self.host.remove_class(remove);
    }
    trace!(?placement, "popup placed");
  }

  /// Advances the virtual clock and runs
  /// every timer falling due, in order.
  pub fn advance(
    &mut self,
    elapsed_ms: u64
  ) -> Vec<TimerKind> {
    let until = self
      .timers
      .now_ms()
      .saturating_add(elapsed_ms);
    let mut fired = Vec::new();
    while let Some(kind) =
      self.timers.pop_due(until)
    {
      self.fire(kind);
      fired.push(kind);
    }
    self.timers.advance_to(until);
    fired
  }

  fn fire(&mut self, kind: TimerKind) {
    trace!(?kind, "timer fired");
    match kind {
      | TimerKind::HideAfterBlur => self.hide(),
      | TimerKind::HideAfterSelect => {
        self.hide();
        if self.options.blur_field_on_select
          && self.host.has_field()
        {
          self.host.blur_field();
        }
      }
      | TimerKind::ParseField => {
        self.apply_field_value();
      }
      | TimerKind::FocusTrigger => {
        self.host.focus_trigger();
      }
    }
  }

  /// Hides, detaches every listener and
  /// removes the surface, handing the
  /// host back.
  pub fn destroy(mut self) -> H {
    self.hide();
    for listener in ALL_LISTENERS {
      self.host.unlisten(listener);
    }
    self.host.unmount();
    info!("picker destroyed");
    self.host
  }
}
