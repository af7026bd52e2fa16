use std::fmt::Write as _;
use std::sync::OnceLock;

use chrono::{
  DateTime,
  Datelike,
  Duration,
  FixedOffset,
  Local,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Offset,
  Utc,
  Weekday
};
use chrono_tz::Tz;
use regex::Regex;

const TIMEZONE_ENV_VAR: &str =
  "CALPICK_TIMEZONE";

pub const DEFAULT_FORMAT: &str =
  "YYYY-MM-DD";

const DAYS_IN_MONTH: [u32; 12] = [
  31, 28, 31, 30, 31, 30, 31, 31, 30,
  31, 30, 31
];

/// Source of wall-clock time for the
/// picker. Everything is compared as
/// local naive date/time.
pub trait Clock {
  fn now(&self) -> NaiveDateTime;

  /// Offset of local time from UTC.
  fn utc_offset(&self) -> FixedOffset;

  fn today(&self) -> NaiveDate {
    self.now().date()
  }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
  fn now(&self) -> NaiveDateTime {
    (**self).now()
  }

  fn utc_offset(&self) -> FixedOffset {
    (**self).utc_offset()
  }
}

#[derive(Debug, Clone, Default)]
pub struct SystemClock {
  timezone: Option<Tz>
}

impl SystemClock {
  #[must_use]
  pub fn new(
    timezone: Option<Tz>
  ) -> Self {
    Self { timezone }
  }

  /// Resolves the clock timezone from
  /// `CALPICK_TIMEZONE`, then the
  /// configured id, then the machine's
  /// local offset.
  #[must_use]
  pub fn from_config(
    configured: Option<&str>
  ) -> Self {
    Self::new(resolve_timezone(
      configured
    ))
  }
}

impl Clock for SystemClock {
  fn now(&self) -> NaiveDateTime {
    match self.timezone {
      | Some(tz) => {
        Utc::now()
          .with_timezone(&tz)
          .naive_local()
      }
      | None => Local::now().naive_local()
    }
  }

  fn utc_offset(&self) -> FixedOffset {
    match self.timezone {
      | Some(tz) => {
        Utc::now()
          .with_timezone(&tz)
          .offset()
          .fix()
      }
      | None => *Local::now().offset()
    }
  }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
  pub now:    NaiveDateTime,
  pub offset: FixedOffset
}

impl FixedClock {
  #[must_use]
  pub fn at(now: NaiveDateTime) -> Self {
    Self {
      now,
      offset: Utc.fix()
    }
  }

  #[must_use]
  pub fn with_offset(
    mut self,
    offset: FixedOffset
  ) -> Self {
    self.offset = offset;
    self
  }
}

impl Clock for FixedClock {
  fn now(&self) -> NaiveDateTime {
    self.now
  }

  fn utc_offset(&self) -> FixedOffset {
    self.offset
  }
}

fn resolve_timezone(
  configured: Option<&str>
) -> Option<Tz> {
  if let Ok(raw) =
    std::env::var(TIMEZONE_ENV_VAR)
    && let Some(tz) =
      parse_timezone(&raw, TIMEZONE_ENV_VAR)
  {
    return Some(tz);
  }

  if let Some(raw) = configured
    && let Some(tz) =
      parse_timezone(raw, "config")
  {
    return Some(tz);
  }

  tracing::debug!(
    "no timezone configured; using \
     local offset"
  );
  None
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::info!(
        source,
        timezone = %trimmed,
        "configured clock timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

#[must_use]
pub fn is_leap_year(year: i32) -> bool {
  (year % 4 == 0 && year % 100 != 0)
    || year % 400 == 0
}

/// Day count of a zero-based month.
#[must_use]
pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  if month == 1 && is_leap_year(year) {
    return 29;
  }
  DAYS_IN_MONTH
    .get(month as usize)
    .copied()
    .unwrap_or(31)
}

#[must_use]
pub fn is_weekend(
  date: NaiveDate
) -> bool {
  matches!(
    date.weekday(),
    Weekday::Sat | Weekday::Sun
  )
}

/// Calendar date from a zero-based
/// month and a day offset that may run
/// past either end of the month.
#[must_use]
pub fn date_from_offset(
  year: i32,
  month: u32,
  day: i64
) -> Option<NaiveDate> {
  let first = NaiveDate::from_ymd_opt(
    year,
    month + 1,
    1
  )?;
  first.checked_add_signed(
    Duration::days(day - 1)
  )
}

#[must_use]
pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  Duration::try_days(days)
    .and_then(|delta| {
      date.checked_add_signed(delta)
    })
    .unwrap_or(date)
}

#[must_use]
pub fn midnight(
  date: NaiveDate
) -> NaiveDateTime {
  date.and_time(NaiveTime::MIN)
}

fn monday_index(date: NaiveDate) -> i64 {
  i64::from(
    date.weekday().num_days_from_monday()
  )
}

/// Week number with week one being the
/// first week holding at least
/// `min_days` days of January (4 gives
/// ISO 8601). A week belongs to the year
/// of its `7 - min_days`th day after
/// Monday.
#[must_use]
pub fn iso_week(
  date: NaiveDate,
  min_days: u32
) -> u32 {
  let offset =
    7 - i64::from(min_days.clamp(1, 7));
  let anchor = add_days(
    date,
    offset - monday_index(date)
  );
  let Some(jan1) =
    NaiveDate::from_ymd_opt(
      anchor.year(),
      1,
      1
    )
  else {
    return 1;
  };
  let first = add_days(
    jan1,
    (offset - monday_index(jan1))
      .rem_euclid(7)
  );

  let weeks = (anchor - first)
    .num_days()
    .div_euclid(7);
  u32::try_from(1 + weeks).unwrap_or(1)
}

fn format_tokens() -> Option<&'static Regex>
{
  static TOKENS: OnceLock<
    Option<Regex>
  > = OnceLock::new();
  TOKENS
    .get_or_init(|| {
      Regex::new(
        r"\[[^\]]*\]|YYYY|YY|MMMM|MMM|MM|M|DD|D|dddd|ddd|L",
      )
      .map_err(|err| {
        tracing::error!(
          error = %err,
          "internal regex compile failure"
        );
      })
      .ok()
    })
    .as_ref()
}

/// A moment-style display format such
/// as `YYYY-MM-DD` or `D MMM YYYY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
  pattern:  String,
  strftime: String
}

impl DateFormat {
  #[must_use]
  pub fn new(pattern: &str) -> Self {
    Self {
      pattern:  pattern.to_string(),
      strftime: to_strftime(pattern)
    }
  }

  #[must_use]
  pub fn pattern(&self) -> &str {
    &self.pattern
  }

  #[must_use]
  pub fn format(
    &self,
    date: NaiveDate
  ) -> String {
    let mut out = String::new();
    if write!(
      out,
      "{}",
      date.format(&self.strftime)
    )
    .is_err()
    {
      tracing::warn!(
        pattern = %self.pattern,
        "unusable date format; using \
         iso date"
      );
      return date
        .format("%Y-%m-%d")
        .to_string();
    }
    out
  }

  #[must_use]
  pub fn parse(
    &self,
    text: &str
  ) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(
      text.trim(),
      &self.strftime
    )
    .ok()
  }
}

impl Default for DateFormat {
  fn default() -> Self {
    Self::new(DEFAULT_FORMAT)
  }
}

fn to_strftime(pattern: &str) -> String {
  let Some(tokens) = format_tokens()
  else {
    return "%Y-%m-%d".to_string();
  };

  let mut out = String::new();
  let mut last = 0;
  for found in tokens.find_iter(pattern)
  {
    out.push_str(&escape_literal(
      &pattern[last..found.start()]
    ));
    let token = found.as_str();
    let mapped = match token {
      | "YYYY" => "%Y",
      | "YY" => "%y",
      | "MMMM" => "%B",
      | "MMM" => "%b",
      | "MM" => "%m",
      | "M" => "%-m",
      | "DD" => "%d",
      | "D" => "%-d",
      | "dddd" => "%A",
      | "ddd" => "%a",
      | "L" => "%m/%d/%Y",
      | literal => {
        out.push_str(&escape_literal(
          literal
            .trim_start_matches('[')
            .trim_end_matches(']')
        ));
        ""
      }
    };
    out.push_str(mapped);
    last = found.end();
  }
  out.push_str(&escape_literal(
    &pattern[last..]
  ));
  out
}

fn escape_literal(text: &str) -> String {
  text.replace('%', "%%")
}

/// Reads a field's text: the configured
/// format first, then common machine
/// formats.
#[must_use]
pub fn parse_field_value(
  text: &str,
  format: &DateFormat
) -> Option<NaiveDate> {
  let token = text.trim();
  if token.is_empty() {
    return None;
  }

  if let Some(date) = format.parse(token)
  {
    return Some(date);
  }

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Some(dt.naive_local().date());
  }

  for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
    if let Ok(date) =
      NaiveDate::parse_from_str(token, fmt)
    {
      return Some(date);
    }
  }

  for fmt in [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Some(ndt.date());
    }
  }

  tracing::debug!(
    input = token,
    "field value is not a date"
  );
  None
}

/// Reads `text` as a UTC timestamp and
/// adds the local offset. A bare date
/// lands on local midnight of that
/// date; a zoned timestamp lands on its
/// UTC wall clock; a naive timestamp is
/// taken as local and shifted back by
/// the offset.
#[must_use]
pub fn parse_date_string(
  text: &str,
  offset: FixedOffset
) -> Option<NaiveDateTime> {
  let token = text.trim();

  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Some(dt.naive_utc());
  }

  if let Ok(date) =
    NaiveDate::parse_from_str(
      token, "%Y-%m-%d"
    )
  {
    return Some(midnight(date));
  }

  for fmt in [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return ndt.checked_sub_signed(
        Duration::seconds(i64::from(
          offset.local_minus_utc()
        ))
      );
    }
  }

  tracing::debug!(
    input = token,
    "unparseable date string"
  );
  None
}

#[cfg(test)]
mod tests {
  use chrono::{
    FixedOffset,
    NaiveDate
  };

  use super::*;

  fn ymd(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn leap_years_follow_gregorian_rule() {
    assert!(is_leap_year(2000));
    assert!(!is_leap_year(1900));
    assert!(is_leap_year(2024));
    assert!(!is_leap_year(2023));
  }

  #[test]
  fn february_length_tracks_leap_years(
  ) {
    assert_eq!(days_in_month(2024, 1), 29);
    assert_eq!(days_in_month(2023, 1), 28);
    assert_eq!(days_in_month(2100, 1), 28);
    assert_eq!(days_in_month(2023, 11), 31);
  }

  #[test]
  fn week_one_spans_monday_to_sunday() {
    // 2015-01-01 is a Thursday.
    let mut day = ymd(2014, 12, 29);
    for _ in 0..7 {
      assert_eq!(iso_week(day, 4), 1);
      day = add_days(day, 1);
    }
    assert_eq!(iso_week(day, 4), 2);
  }

  #[test]
  fn long_years_have_week_fifty_three() {
    assert_eq!(
      iso_week(ymd(2021, 1, 1), 4),
      53
    );
    assert_eq!(
      iso_week(ymd(2020, 12, 31), 4),
      53
    );
    assert_eq!(
      iso_week(ymd(2021, 1, 4), 4),
      1
    );
  }

  #[test]
  fn one_day_of_january_starts_week_one(
  ) {
    // 2021-01-01 is a Friday.
    assert_eq!(
      iso_week(ymd(2020, 12, 28), 1),
      1
    );
    assert_eq!(
      iso_week(ymd(2021, 1, 1), 1),
      1
    );
    assert_eq!(
      iso_week(ymd(2021, 1, 3), 1),
      1
    );
    assert_eq!(
      iso_week(ymd(2021, 1, 4), 1),
      2
    );
    assert_eq!(
      iso_week(ymd(2020, 12, 27), 1),
      52
    );
  }

  #[test]
  fn full_week_of_january_starts_week_one(
  ) {
    assert_eq!(
      iso_week(ymd(2021, 1, 4), 7),
      1
    );
    assert_eq!(
      iso_week(ymd(2021, 1, 3), 7),
      52
    );
    // 2024-01-01 is a Monday.
    assert_eq!(
      iso_week(ymd(2024, 1, 1), 7),
      1
    );
  }

  #[test]
  fn huge_offsets_keep_the_date() {
    let day = ymd(2024, 1, 20);
    assert_eq!(add_days(day, i64::MAX), day);
    assert_eq!(add_days(day, i64::MIN), day);
  }

  #[test]
  fn iso_week_matches_chrono() {
    let mut day = ymd(2019, 12, 1);
    for _ in 0..800 {
      assert_eq!(
        iso_week(day, 4),
        day.iso_week().week(),
        "{day}"
      );
      day = add_days(day, 1);
    }
  }

  #[test]
  fn moment_format_translates_tokens() {
    let date = ymd(2024, 3, 7);
    assert_eq!(
      DateFormat::default().format(date),
      "2024-03-07"
    );
    assert_eq!(
      DateFormat::new("D MMM YYYY")
        .format(date),
      "7 Mar 2024"
    );
    assert_eq!(
      DateFormat::new("L").format(date),
      "03/07/2024"
    );
    assert_eq!(
      DateFormat::new("[Day] DD%")
        .format(date),
      "Day 07%"
    );
  }

  #[test]
  fn field_values_parse_with_fallbacks() {
    let format = DateFormat::new(
      "DD/MM/YYYY"
    );
    assert_eq!(
      parse_field_value(
        "05/01/2024",
        &format
      ),
      Some(ymd(2024, 1, 5))
    );
    assert_eq!(
      parse_field_value(
        "2024-01-05",
        &format
      ),
      Some(ymd(2024, 1, 5))
    );
    assert_eq!(
      parse_field_value("soon", &format),
      None
    );
    assert_eq!(
      parse_field_value("  ", &format),
      None
    );
  }

  #[test]
  fn date_strings_land_on_local_wall_clock(
  ) {
    let east = FixedOffset::east_opt(
      2 * 3600
    )
    .expect("valid offset");

    assert_eq!(
      parse_date_string(
        "2024-01-05",
        east
      ),
      Some(midnight(ymd(2024, 1, 5)))
    );
    assert_eq!(
      parse_date_string(
        "2024-01-05T01:00:00+02:00",
        east
      ),
      Some(
        ymd(2024, 1, 4)
          .and_hms_opt(23, 0, 0)
          .expect("valid time")
      )
    );
    assert_eq!(
      parse_date_string(
        "2024-01-05T01:00",
        east
      ),
      Some(
        ymd(2024, 1, 4)
          .and_hms_opt(23, 0, 0)
          .expect("valid time")
      )
    );
    assert_eq!(
      parse_date_string("nope", east),
      None
    );
  }
}
