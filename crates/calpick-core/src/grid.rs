use std::collections::BTreeSet;

use chrono::{
  Datelike,
  NaiveDate
};
use serde::Serialize;

use crate::datetime::{
  date_from_offset,
  days_in_month,
  iso_week,
  is_weekend
};

pub const DEFAULT_MIN_YEAR: i32 = 0;
pub const DEFAULT_MAX_YEAR: i32 = 9999;

/// Earliest and latest selectable dates
/// with their year/month cached for the
/// title bar and pane clamping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bounds {
  pub min_date:  Option<NaiveDate>,
  pub max_date:  Option<NaiveDate>,
  pub min_year:  i32,
  pub max_year:  i32,
  pub min_month: Option<u32>,
  pub max_month: Option<u32>
}

impl Default for Bounds {
  fn default() -> Self {
    Self {
      min_date:  None,
      max_date:  None,
      min_year:  DEFAULT_MIN_YEAR,
      max_year:  DEFAULT_MAX_YEAR,
      min_month: None,
      max_month: None
    }
  }
}

impl Bounds {
  pub fn set_min(
    &mut self,
    value: Option<NaiveDate>
  ) {
    match value {
      | Some(date) => {
        self.min_date = Some(date);
        self.min_year = date.year();
        self.min_month = Some(date.month0());
      }
      | None => {
        self.min_date = None;
        self.min_year = DEFAULT_MIN_YEAR;
        self.min_month = None;
      }
    }
  }

  pub fn set_max(
    &mut self,
    value: Option<NaiveDate>
  ) {
    match value {
      | Some(date) => {
        self.max_date = Some(date);
        self.max_year = date.year();
        self.max_month = Some(date.month0());
      }
      | None => {
        self.max_date = None;
        self.max_year = DEFAULT_MAX_YEAR;
        self.max_month = None;
      }
    }
  }

  #[must_use]
  pub fn is_inverted(&self) -> bool {
    matches!(
      (self.min_date, self.max_date),
      (Some(min), Some(max)) if max < min
    )
  }

  #[must_use]
  pub fn excludes(
    &self,
    date: NaiveDate
  ) -> bool {
    self.min_date.is_some_and(|min| {
      date < min
    }) || self.max_date.is_some_and(
      |max| date > max
    )
  }

  /// Whether the pane showing
  /// `year`/`month` may page backwards.
  #[must_use]
  pub fn can_page_back(
    &self,
    year: i32,
    month: u32
  ) -> bool {
    !(year == self.min_year
      && (month == 0
        || self.min_month.is_some_and(
          |min| min >= month
        )))
  }

  #[must_use]
  pub fn can_page_forward(
    &self,
    year: i32,
    month: u32
  ) -> bool {
    !(year == self.max_year
      && (month == 11
        || self.max_month.is_some_and(
          |max| max <= month
        )))
  }

  /// Month options outside the bounds
  /// in the title's month select.
  #[must_use]
  pub fn month_unavailable(
    &self,
    year: i32,
    month: u32
  ) -> bool {
    (year == self.min_year
      && self
        .min_month
        .is_some_and(|min| month < min))
      || (year == self.max_year
        && self
          .max_month
          .is_some_and(|max| month > max))
  }
}

/// Everything a month grid depends on
/// besides the month itself.
pub struct GridContext<'a> {
  pub first_day:        u32,
  pub today:            NaiveDate,
  pub selected:         Option<NaiveDate>,
  pub bounds:           &'a Bounds,
  pub start_range:      Option<NaiveDate>,
  pub end_range:        Option<NaiveDate>,
  pub disable_weekends: bool,
  pub events:           &'a BTreeSet<NaiveDate>,
  pub disabled_days:    &'a BTreeSet<NaiveDate>,
  pub enabled_days:     &'a BTreeSet<NaiveDate>,
  pub disable_day:
    Option<&'a dyn Fn(NaiveDate) -> bool>,
  pub select_day:
    Option<&'a dyn Fn(NaiveDate) -> bool>,
  pub show_week_number: bool,
  pub week_min_days:    u32,
  pub pick_whole_week:  bool
}

impl GridContext<'_> {
  #[must_use]
  pub fn is_disabled(
    &self,
    date: NaiveDate
  ) -> bool {
    self.bounds.excludes(date)
      || (self.disable_weekends
        && is_weekend(date))
      || self
        .disable_day
        .is_some_and(|disabled| {
          disabled(date)
        })
      || self.disabled_days.contains(&date)
      || (!self.enabled_days.is_empty()
        && !self
          .enabled_days
          .contains(&date))
  }

  #[must_use]
  pub fn is_selected(
    &self,
    date: NaiveDate
  ) -> bool {
    match self.select_day {
      | Some(selected) => selected(date),
      | None => self.selected == Some(date)
    }
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct DayCell {
  pub day:            u32,
  /// Zero-based month owning the cell.
  pub month:          u32,
  pub year:           i32,
  pub is_empty:       bool,
  pub is_today:       bool,
  pub is_selected:    bool,
  pub is_disabled:    bool,
  pub has_event:      bool,
  pub is_start_range: bool,
  pub is_end_range:   bool,
  pub is_in_range:    bool
}

impl DayCell {
  #[must_use]
  pub fn date(&self) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
      self.year,
      self.month + 1,
      self.day
    )
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct WeekRow {
  pub cells:       Vec<DayCell>,
  pub week_number: Option<u32>,
  /// Only set in whole-week mode.
  pub is_selected: bool
}

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct MonthGrid {
  pub year:  i32,
  pub month: u32,
  pub rows:  Vec<WeekRow>
}

impl MonthGrid {
  pub fn cells(
    &self
  ) -> impl Iterator<Item = &DayCell> {
    self
      .rows
      .iter()
      .flat_map(|row| row.cells.iter())
  }
}

/// Builds the day grid for a zero-based
/// `month`, padded with adjacent-month
/// days to whole weeks.
#[must_use]
pub fn build_month(
  year: i32,
  month: u32,
  ctx: &GridContext<'_>
) -> MonthGrid {
  let mut grid = MonthGrid {
    year,
    month,
    rows: Vec::new()
  };
  let Some(first) =
    date_from_offset(year, month, 1)
  else {
    tracing::warn!(
      year,
      month,
      "month outside the calendar range"
    );
    return grid;
  };

  let days = days_in_month(year, month);
  let before = (first
    .weekday()
    .num_days_from_sunday()
    + 7
    - ctx.first_day % 7)
    % 7;
  let cells = (days + before).div_ceil(7)
    * 7;

  let mut row = Vec::with_capacity(7);
  let mut row_dates =
    Vec::with_capacity(7);
  let mut week_selected = false;

  for i in 0..cells {
    let Some(date) = date_from_offset(
      year,
      month,
      1 + i64::from(i) - i64::from(before)
    ) else {
      break;
    };

    let is_selected =
      ctx.is_selected(date);
    if ctx.pick_whole_week && is_selected
    {
      week_selected = true;
    }

    row.push(DayCell {
      day: date.day(),
      month: date.month0(),
      year: date.year(),
      is_empty: i < before
        || i >= days + before,
      is_today: date == ctx.today,
      is_selected,
      is_disabled: ctx.is_disabled(date),
      has_event: ctx
        .events
        .contains(&date),
      is_start_range: ctx.start_range
        == Some(date),
      is_end_range: ctx.end_range
        == Some(date),
      is_in_range: matches!(
        (ctx.start_range, ctx.end_range),
        (Some(start), Some(end))
          if start < date && date < end
      )
    });
    row_dates.push(date);

    if row.len() == 7 {
      let week_number = ctx
        .show_week_number
        .then(|| {
          iso_week(
            row_dates[5],
            ctx.week_min_days
          )
        });
      grid.rows.push(WeekRow {
        cells: std::mem::take(&mut row),
        week_number,
        is_selected: week_selected
      });
      row_dates.clear();
      week_selected = false;
    }
  }

  grid
}
