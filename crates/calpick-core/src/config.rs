use std::collections::BTreeSet;
use std::fs;
use std::path::{
  Path,
  PathBuf
};
use std::str::FromStr;

use anyhow::{
  Context,
  anyhow
};
use chrono::NaiveDate;
use serde::{
  Deserialize,
  Deserializer
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

const CONFIG_ENV_VAR: &str =
  "CALPICK_CONFIG";
const CONFIG_FILE: &str = "calpick.toml";
pub const DEFAULT_YEAR_RANGE: i64 = 10;
pub const MAX_MONTHS: u32 = 4;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Vertical {
  Top,
  #[default]
  Bottom
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Horizontal {
  #[default]
  Left,
  Right
}

/// Preferred popup placement. `top` and
/// `right` modify the default
/// bottom-left placement.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Deserialize,
)]
#[serde(from = "String")]
pub struct Position {
  pub vertical:   Vertical,
  pub horizontal: Horizontal
}

impl From<&str> for Position {
  fn from(raw: &str) -> Self {
    let lower = raw.to_ascii_lowercase();
    let words = lower
      .split_whitespace()
      .collect::<Vec<_>>();
    Self {
      vertical:   if words.contains(&"top")
      {
        Vertical::Top
      } else {
        Vertical::Bottom
      },
      horizontal: if words
        .contains(&"right")
      {
        Horizontal::Right
      } else {
        Horizontal::Left
      }
    }
  }
}

impl From<String> for Position {
  fn from(raw: String) -> Self {
    Self::from(raw.as_str())
  }
}

impl FromStr for Position {
  type Err = std::convert::Infallible;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    Ok(Self::from(s))
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum YearOrder {
  #[default]
  Ascending,
  Descending
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MainCalendar {
  #[default]
  Left,
  Right
}

/// Years offered by the year select:
/// an explicit span or an offset either
/// side of the viewed year.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
  Deserialize,
)]
#[serde(untagged)]
pub enum YearRange {
  Span([i32; 2]),
  Offset(i64)
}

impl Default for YearRange {
  fn default() -> Self {
    Self::Offset(DEFAULT_YEAR_RANGE)
  }
}

impl YearRange {
  #[must_use]
  pub fn normalized(self) -> Self {
    match self {
      | Self::Span([a, b]) => {
        Self::Span([a.min(b), a.max(b)])
      }
      | Self::Offset(0) => {
        Self::Offset(DEFAULT_YEAR_RANGE)
      }
      | Self::Offset(n) => {
        Self::Offset(n.saturating_abs())
      }
    }
  }

  /// Inclusive year span around
  /// `viewed`.
  #[must_use]
  pub fn years(
    self,
    viewed: i32
  ) -> (i32, i32) {
    match self.normalized() {
      | Self::Span([low, high]) => {
        (low, high)
      }
      | Self::Offset(n) => {
        let n = i32::try_from(n)
          .unwrap_or(i32::MAX);
        (
          viewed.saturating_sub(n),
          viewed.saturating_add(n)
        )
      }
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I18n {
  pub previous_month: String,
  pub next_month:     String,
  pub today:          String,
  pub months:         Vec<String>,
  pub weekdays:       Vec<String>,
  pub weekdays_short: Vec<String>
}

impl Default for I18n {
  fn default() -> Self {
    let owned = |items: &[&str]| {
      items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
    };
    Self {
      previous_month: "Previous Month"
        .to_string(),
      next_month:     "Next Month"
        .to_string(),
      today:          "Today".to_string(),
      months:         owned(&[
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December"
      ]),
      weekdays:       owned(&[
        "Sunday",
        "Monday",
        "Tuesday",
        "Wednesday",
        "Thursday",
        "Friday",
        "Saturday"
      ]),
      weekdays_short: owned(&[
        "Sun", "Mon", "Tue", "Wed",
        "Thu", "Fri", "Sat"
      ])
    }
  }
}

impl I18n {
  #[must_use]
  pub fn month(&self, month: u32) -> &str {
    self
      .months
      .get(month as usize)
      .map_or("", String::as_str)
  }

  /// Weekday name for a column of a
  /// week starting on `first_day`.
  #[must_use]
  pub fn weekday(
    &self,
    column: u32,
    first_day: u32,
    abbr: bool
  ) -> &str {
    let names = if abbr {
      &self.weekdays_short
    } else {
      &self.weekdays
    };
    names
      .get(((column + first_day) % 7)
        as usize)
      .map_or("", String::as_str)
  }

  fn apply(&mut self, patch: I18nPatch) {
    fill_text(
      &mut self.previous_month,
      patch.previous_month
    );
    fill_text(
      &mut self.next_month,
      patch.next_month
    );
    fill_text(&mut self.today, patch.today);
    fill_names(
      &mut self.months,
      patch.months,
      12,
      "months"
    );
    fill_names(
      &mut self.weekdays,
      patch.weekdays,
      7,
      "weekdays"
    );
    fill_names(
      &mut self.weekdays_short,
      patch.weekdays_short,
      7,
      "weekdays_short"
    );
  }
}

/// Fully resolved picker options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
  pub bound: Option<bool>,
  pub aria_label: String,
  pub position: Position,
  pub reposition: bool,
  pub format: String,
  pub default_date: Option<NaiveDate>,
  pub set_default_date: bool,
  pub first_day: u32,
  pub first_week_of_year_min_days: u32,
  pub min_date: Option<NaiveDate>,
  pub max_date: Option<NaiveDate>,
  pub year_order: YearOrder,
  pub year_range: YearRange,
  pub show_week_number: bool,
  pub show_today_button: bool,
  pub pick_whole_week: bool,
  pub start_range: Option<NaiveDate>,
  pub end_range: Option<NaiveDate>,
  pub is_rtl: bool,
  pub year_suffix: String,
  pub show_month_after_year: bool,
  pub show_days_in_next_and_previous_months:
    bool,
  pub enable_selection_days_in_next_and_previous_months:
    bool,
  pub convert_date_to_min_or_max_date:
    bool,
  pub number_of_months: u32,
  pub main_calendar: MainCalendar,
  pub container: bool,
  pub blur_field_on_select: bool,
  pub i18n: I18n,
  pub theme: Option<String>,
  pub events: BTreeSet<NaiveDate>,
  pub disabled_days: BTreeSet<NaiveDate>,
  pub enabled_days: BTreeSet<NaiveDate>,
  pub disable_weekends: bool,
  pub keyboard_input: bool,
  pub debounce_ms: u64,
  pub timezone: Option<String>
}

impl Default for Options {
  fn default() -> Self {
    Self {
      bound: None,
      aria_label: "Use the arrow keys to \
                   pick a date"
        .to_string(),
      position: Position::default(),
      reposition: true,
      format: crate::datetime::DEFAULT_FORMAT
        .to_string(),
      default_date: None,
      set_default_date: false,
      first_day: 0,
      first_week_of_year_min_days: 4,
      min_date: None,
      max_date: None,
      year_order: YearOrder::Ascending,
      year_range: YearRange::default(),
      show_week_number: false,
      show_today_button: false,
      pick_whole_week: false,
      start_range: None,
      end_range: None,
      is_rtl: false,
      year_suffix: String::new(),
      show_month_after_year: false,
      show_days_in_next_and_previous_months:
        false,
      enable_selection_days_in_next_and_previous_months:
        false,
      convert_date_to_min_or_max_date:
        true,
      number_of_months: 1,
      main_calendar: MainCalendar::Left,
      container: false,
      blur_field_on_select: true,
      i18n: I18n::default(),
      theme: None,
      events: BTreeSet::new(),
      disabled_days: BTreeSet::new(),
      enabled_days: BTreeSet::new(),
      disable_weekends: false,
      keyboard_input: true,
      debounce_ms: 0,
      timezone: None
    }
  }
}

impl Options {
  #[must_use]
  pub fn is_bound(&self) -> bool {
    self.bound.unwrap_or(false)
  }

  /// Overwrites every field present in
  /// `patch`. Blank strings and
  /// wrongly-sized name lists keep the
  /// current value.
  pub fn apply(
    &mut self,
    patch: OptionsPatch
  ) {
    set(&mut self.bound, patch.bound.map(Some));
    fill_text(
      &mut self.aria_label,
      patch.aria_label
    );
    set(&mut self.position, patch.position);
    set(
      &mut self.reposition,
      patch.reposition
    );
    fill_text(&mut self.format, patch.format);
    set(
      &mut self.default_date,
      patch.default_date
    );
    set(
      &mut self.set_default_date,
      patch.set_default_date
    );
    set(&mut self.first_day, patch.first_day);
    set(
      &mut self.first_week_of_year_min_days,
      patch.first_week_of_year_min_days
    );
    set(&mut self.min_date, patch.min_date);
    set(&mut self.max_date, patch.max_date);
    set(
      &mut self.year_order,
      patch.year_order
    );
    set(
      &mut self.year_range,
      patch.year_range
    );
    set(
      &mut self.show_week_number,
      patch.show_week_number
    );
    set(
      &mut self.show_today_button,
      patch.show_today_button
    );
    set(
      &mut self.pick_whole_week,
      patch.pick_whole_week
    );
    set(
      &mut self.start_range,
      patch.start_range
    );
    set(&mut self.end_range, patch.end_range);
    set(&mut self.is_rtl, patch.is_rtl);
    set(
      &mut self.year_suffix,
      patch.year_suffix
    );
    set(
      &mut self.show_month_after_year,
      patch.show_month_after_year
    );
    set(
      &mut self
        .show_days_in_next_and_previous_months,
      patch
        .show_days_in_next_and_previous_months
    );
    set(
      &mut self
        .enable_selection_days_in_next_and_previous_months,
      patch
        .enable_selection_days_in_next_and_previous_months
    );
    set(
      &mut self
        .convert_date_to_min_or_max_date,
      patch.convert_date_to_min_or_max_date
    );
    set(
      &mut self.number_of_months,
      patch.number_of_months
    );
    set(
      &mut self.main_calendar,
      patch.main_calendar
    );
    set(&mut self.container, patch.container);
    set(
      &mut self.blur_field_on_select,
      patch.blur_field_on_select
    );
    if let Some(i18n) = patch.i18n {
      self.i18n.apply(i18n);
    }
    set(&mut self.theme, patch.theme);
    set(&mut self.events, patch.events);
    set(
      &mut self.disabled_days,
      patch.disabled_days
    );
    set(
      &mut self.enabled_days,
      patch.enabled_days
    );
    set(
      &mut self.disable_weekends,
      patch.disable_weekends
    );
    set(
      &mut self.keyboard_input,
      patch.keyboard_input
    );
    set(
      &mut self.debounce_ms,
      patch.debounce_ms
    );
    set(&mut self.timezone, patch.timezone);
  }

  /// Clamps numeric options and drops
  /// inconsistent ones. Never fails.
  pub fn sanitize(
    &mut self,
    has_field: bool
  ) {
    self.bound = Some(
      self.bound.unwrap_or(has_field)
        && has_field
    );
    self.first_day %= 7;
    self.first_week_of_year_min_days = self
      .first_week_of_year_min_days
      .clamp(1, 7);

    let months = self
      .number_of_months
      .clamp(1, MAX_MONTHS);
    if months != self.number_of_months {
      debug!(
        requested = self.number_of_months,
        clamped = months,
        "number_of_months out of range"
      );
      self.number_of_months = months;
    }

    if self
      .theme
      .as_deref()
      .is_some_and(|theme| {
        theme.trim().is_empty()
      })
    {
      self.theme = None;
    }

    if let (Some(min), Some(max)) =
      (self.min_date, self.max_date)
      && max < min
    {
      warn!(
        %min,
        %max,
        "min_date after max_date; \
         dropping both bounds"
      );
      self.min_date = None;
      self.max_date = None;
    }

    self.year_range =
      self.year_range.normalized();
  }
}

/// Partial options. Absent fields leave
/// the target untouched; nullable dates
/// use a double option so `Some(None)`
/// clears them.
#[derive(
  Debug, Clone, Default, Deserialize,
)]
#[serde(deny_unknown_fields)]
pub struct OptionsPatch {
  pub bound: Option<bool>,
  pub aria_label: Option<String>,
  pub position: Option<Position>,
  pub reposition: Option<bool>,
  pub format: Option<String>,
  #[serde(default, deserialize_with = "present")]
  pub default_date: Option<Option<NaiveDate>>,
  pub set_default_date: Option<bool>,
  pub first_day: Option<u32>,
  pub first_week_of_year_min_days:
    Option<u32>,
  #[serde(default, deserialize_with = "present")]
  pub min_date: Option<Option<NaiveDate>>,
  #[serde(default, deserialize_with = "present")]
  pub max_date: Option<Option<NaiveDate>>,
  pub year_order: Option<YearOrder>,
  pub year_range: Option<YearRange>,
  pub show_week_number: Option<bool>,
  pub show_today_button: Option<bool>,
  pub pick_whole_week: Option<bool>,
  #[serde(default, deserialize_with = "present")]
  pub start_range: Option<Option<NaiveDate>>,
  #[serde(default, deserialize_with = "present")]
  pub end_range: Option<Option<NaiveDate>>,
  pub is_rtl: Option<bool>,
  pub year_suffix: Option<String>,
  pub show_month_after_year: Option<bool>,
  pub show_days_in_next_and_previous_months:
    Option<bool>,
  pub enable_selection_days_in_next_and_previous_months:
    Option<bool>,
  pub convert_date_to_min_or_max_date:
    Option<bool>,
  pub number_of_months: Option<u32>,
  pub main_calendar: Option<MainCalendar>,
  pub container: Option<bool>,
  pub blur_field_on_select: Option<bool>,
  pub i18n: Option<I18nPatch>,
  #[serde(default, deserialize_with = "present")]
  pub theme: Option<Option<String>>,
  pub events: Option<BTreeSet<NaiveDate>>,
  pub disabled_days:
    Option<BTreeSet<NaiveDate>>,
  pub enabled_days:
    Option<BTreeSet<NaiveDate>>,
  pub disable_weekends: Option<bool>,
  pub keyboard_input: Option<bool>,
  pub debounce_ms: Option<u64>,
  #[serde(default, deserialize_with = "present")]
  pub timezone: Option<Option<String>>
}

#[derive(
  Debug, Clone, Default, Deserialize,
)]
#[serde(deny_unknown_fields)]
pub struct I18nPatch {
  pub previous_month: Option<String>,
  pub next_month:     Option<String>,
  pub today:          Option<String>,
  pub months:         Option<Vec<String>>,
  pub weekdays:       Option<Vec<String>>,
  pub weekdays_short: Option<Vec<String>>
}

fn present<'de, D, T>(
  deserializer: D
) -> Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>
{
  Option::<T>::deserialize(deserializer)
    .map(Some)
}

fn set<T>(
  slot: &mut T,
  incoming: Option<T>
) {
  if let Some(value) = incoming {
    *slot = value;
  }
}

fn fill_text(
  slot: &mut String,
  incoming: Option<String>
) {
  match incoming {
    | Some(value)
      if !value.trim().is_empty() =>
    {
      *slot = value;
    }
    | Some(_) => {
      trace!(
        "blank option value keeps the \
         current one"
      );
    }
    | None => {}
  }
}

fn fill_names(
  slot: &mut Vec<String>,
  incoming: Option<Vec<String>>,
  expected: usize,
  key: &str
) {
  let Some(names) = incoming else {
    return;
  };
  if names.len() == expected {
    *slot = names;
  } else {
    warn!(
      key,
      expected,
      got = names.len(),
      "ignoring name list of the wrong \
       length"
    );
  }
}

#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
  pub patch:        OptionsPatch,
  pub loaded_files: Vec<PathBuf>
}

/// Reads the config file (if any) and
/// folds `rc` overrides into it.
#[tracing::instrument(skip(overrides))]
pub fn load<I>(
  config_override: Option<&Path>,
  overrides: I
) -> anyhow::Result<LoadedConfig>
where
  I: IntoIterator<Item = (String, String)>
{
  let mut loaded_files = Vec::new();
  let mut table = toml::Table::new();

  if let Some(path) =
    resolve_config_path(config_override)?
  {
    info!(config = %path.display(), "loading config");
    let text = fs::read_to_string(&path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    table = toml::from_str(&text)
      .with_context(|| {
        format!(
          "failed to parse {}",
          path.display()
        )
      })?;
    loaded_files.push(path);
  } else {
    warn!(
      "no config file found; using \
       defaults"
    );
  }

  for (key, value) in overrides {
    apply_override(&mut table, &key, &value)?;
  }

  let mut root = toml::Value::Table(table);
  stringify_dates(&mut root);
  let patch = root
    .try_into::<OptionsPatch>()
    .context("invalid picker options")?;

  Ok(LoadedConfig {
    patch,
    loaded_files
  })
}

fn apply_override(
  table: &mut toml::Table,
  key: &str,
  raw: &str
) -> anyhow::Result<()> {
  let key = key
    .strip_prefix("rc.")
    .unwrap_or(key)
    .trim();
  let parts = key
    .split('.')
    .map(str::trim)
    .collect::<Vec<_>>();
  if parts.iter().any(|part| part.is_empty())
  {
    return Err(anyhow!(
      "invalid override key: {key}"
    ));
  }

  let value = override_value(raw);
  debug!(key, value = %value, "applying override");

  let (leaf, parents) = parts
    .split_last()
    .ok_or_else(|| {
      anyhow!("empty override key")
    })?;
  let mut current = table;
  for part in parents {
    let entry = current
      .entry(part.to_string())
      .or_insert(toml::Value::Table(
        toml::Table::new()
      ));
    current = entry
      .as_table_mut()
      .ok_or_else(|| {
        anyhow!(
          "override key {key} crosses \
           non-table value {part}"
        )
      })?;
  }
  current.insert(leaf.to_string(), value);
  Ok(())
}

/// TOML date literals are handed to
/// chrono as `YYYY-MM-DD` strings.
fn stringify_dates(value: &mut toml::Value) {
  match value {
    | toml::Value::Datetime(dt) => {
      let text = dt.to_string();
      *value = toml::Value::String(text);
    }
    | toml::Value::Array(items) => {
      items
        .iter_mut()
        .for_each(stringify_dates);
    }
    | toml::Value::Table(table) => {
      table
        .iter_mut()
        .for_each(|(_, item)| stringify_dates(item));
    }
    | _ => {}
  }
}

fn override_value(raw: &str) -> toml::Value {
  let trimmed = raw.trim();
  toml::from_str::<toml::Table>(&format!(
    "value = {trimmed}"
  ))
  .ok()
  .and_then(|mut parsed| {
    parsed.remove("value")
  })
  .unwrap_or_else(|| {
    toml::Value::String(
      trimmed.to_string()
    )
  })
}

fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    if !path.exists() {
      return Err(anyhow!(
        "config file {} does not exist",
        path.display()
      ));
    }
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(env_path) =
    std::env::var(CONFIG_ENV_VAR)
  {
    if env_path == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      env_path
    )));
  }

  let candidate = dirs::config_dir()
    .map(|dir| {
      dir.join("calpick").join(CONFIG_FILE)
    });
  Ok(candidate.filter(|path| path.exists()))
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use chrono::NaiveDate;
  use tempfile::NamedTempFile;

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
  fn position_keywords_modify_bottom_left(
  ) {
    assert_eq!(
      Position::from("top right"),
      Position {
        vertical:   Vertical::Top,
        horizontal: Horizontal::Right
      }
    );
    assert_eq!(
      Position::from("bottom left"),
      Position::default()
    );
    assert_eq!(
      Position::from("RIGHT"),
      Position {
        vertical:   Vertical::Bottom,
        horizontal: Horizontal::Right
      }
    );
  }

  #[test]
  fn year_range_normalizes() {
    assert_eq!(
      YearRange::Span([2030, 2010])
        .normalized(),
      YearRange::Span([2010, 2030])
    );
    assert_eq!(
      YearRange::Offset(-5).normalized(),
      YearRange::Offset(5)
    );
    assert_eq!(
      YearRange::Offset(0).normalized(),
      YearRange::Offset(DEFAULT_YEAR_RANGE)
    );
    assert_eq!(
      YearRange::Offset(3).years(2024),
      (2021, 2027)
    );
  }

  #[test]
  fn sanitize_clamps_and_drops_inverted_bounds(
  ) {
    let mut options = Options {
      number_of_months: 9,
      first_day: 8,
      min_date: Some(ymd(2024, 2, 1)),
      max_date: Some(ymd(2024, 1, 1)),
      theme: Some("  ".to_string()),
      ..Options::default()
    };
    options.sanitize(false);
    assert_eq!(options.number_of_months, 4);
    assert_eq!(options.first_day, 1);
    assert_eq!(options.min_date, None);
    assert_eq!(options.max_date, None);
    assert_eq!(options.theme, None);
    assert!(!options.is_bound());

    options.number_of_months = 0;
    options.bound = None;
    options.sanitize(true);
    assert_eq!(options.number_of_months, 1);
    assert!(options.is_bound());
  }

  #[test]
  fn apply_merges_nested_i18n() {
    let mut options = Options::default();
    options.apply(OptionsPatch {
      i18n: Some(I18nPatch {
        today: Some("Hoy".to_string()),
        months: Some(vec![
          "only".to_string(),
        ]),
        ..I18nPatch::default()
      }),
      format: Some(String::new()),
      min_date: Some(Some(ymd(2024, 1, 1))),
      ..OptionsPatch::default()
    });
    assert_eq!(options.i18n.today, "Hoy");
    assert_eq!(
      options.i18n.next_month,
      "Next Month"
    );
    assert_eq!(options.i18n.months.len(), 12);
    assert_eq!(options.format, "YYYY-MM-DD");
    assert_eq!(
      options.min_date,
      Some(ymd(2024, 1, 1))
    );

    options.apply(OptionsPatch {
      min_date: Some(None),
      ..OptionsPatch::default()
    });
    assert_eq!(options.min_date, None);
  }

  #[test]
  fn loads_file_and_overrides() {
    let mut file =
      NamedTempFile::new().expect("tempfile");
    writeln!(
      file,
      "number_of_months = 2\n\
       position = \"top right\"\n\
       min_date = 2024-01-10\n\
       events = [\"2024-01-15\"]\n\
       year_range = [2030, 2000]\n\
       [i18n]\n\
       today = \"Hoy\""
    )
    .expect("write config");

    let loaded = load(
      Some(file.path()),
      vec![
        (
          "rc.number_of_months".to_string(),
          "3".to_string()
        ),
        (
          "i18n.next_month".to_string(),
          "Siguiente".to_string()
        ),
        (
          "max_date".to_string(),
          "2024-02-01".to_string()
        ),
      ]
    )
    .expect("load config");

    let patch = loaded.patch;
    assert_eq!(patch.number_of_months, Some(3));
    assert_eq!(
      patch.position,
      Some(Position::from("top right"))
    );
    assert_eq!(
      patch.min_date,
      Some(Some(ymd(2024, 1, 10)))
    );
    assert_eq!(
      patch.max_date,
      Some(Some(ymd(2024, 2, 1)))
    );
    assert_eq!(
      patch.year_range,
      Some(YearRange::Span([2030, 2000]))
    );
    assert!(
      patch
        .events
        .as_ref()
        .is_some_and(|events| events
          .contains(&ymd(2024, 1, 15)))
    );
    let i18n = patch.i18n.expect("i18n");
    assert_eq!(i18n.today.as_deref(), Some("Hoy"));
    assert_eq!(
      i18n.next_month.as_deref(),
      Some("Siguiente")
    );
    assert_eq!(loaded.loaded_files.len(), 1);
  }

  #[test]
  fn bare_dates_load_from_lists() {
    let mut file =
      NamedTempFile::new().expect("tempfile");
    writeln!(
      file,
      "disabled_days = [2024-03-01, 2024-03-02]"
    )
    .expect("write config");

    let loaded =
      load(Some(file.path()), Vec::new())
        .expect("load config");
    assert_eq!(
      loaded.patch.disabled_days,
      Some(BTreeSet::from([
        ymd(2024, 3, 1),
        ymd(2024, 3, 2)
      ]))
    );
  }

  #[test]
  fn nested_dates_become_strings() {
    let table = toml::from_str::<toml::Table>(
      "[outer]\n\
       when = 2024-01-02\n\
       list = [2024-01-03]"
    )
    .expect("toml");
    let mut value = toml::Value::Table(table);
    stringify_dates(&mut value);
    assert_eq!(
      value["outer"]["when"].as_str(),
      Some("2024-01-02")
    );
    assert_eq!(
      value["outer"]["list"][0].as_str(),
      Some("2024-01-03")
    );
  }

  #[test]
  fn unknown_keys_are_rejected() {
    let mut file =
      NamedTempFile::new().expect("tempfile");
    writeln!(file, "numberOfMonths = 2")
      .expect("write config");
    let result =
      load(Some(file.path()), Vec::new());
    assert!(result.is_err());
  }

  #[test]
  fn missing_explicit_file_is_an_error() {
    let dir =
      tempfile::tempdir().expect("tempdir");
    let result = load(
      Some(&dir.path().join("absent.toml")),
      Vec::new()
    );
    assert!(result.is_err());
  }
}
