use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::{Options, YearOrder};
use crate::grid::{Bounds, DayCell, MonthGrid, WeekRow};

pub const CLASS_PREFIX: &str = "calpick";

/// Inputs for one full redraw of the calendar surface.
#[derive(Debug, Clone, Copy)]
pub struct CalendarView<'a> {
    pub options: &'a Options,
    pub bounds: &'a Bounds,
    pub grids: &'a [MonthGrid],
    /// Selection formatted for the title's aria label.
    pub current_label: &'a str,
}

/// Markup for every visible pane, one `-lendar` block each.
#[must_use]
pub fn render_html(view: &CalendarView<'_>) -> String {
    let ref_year = view.grids.first().map_or(0, |grid| grid.year);
    let mut html = String::new();
    for (pane, grid) in view.grids.iter().enumerate() {
        let title_id = title_id();
        html.push_str(&format!("<div class=\"{CLASS_PREFIX}-lendar\">"));
        html.push_str(&render_title(view, pane, grid, ref_year, &title_id));
        html.push_str(&render_table(view.options, grid, &title_id));
        html.push_str("</div>");
    }
    html
}

fn title_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{CLASS_PREFIX}-title-{}", &id[..8])
}

fn render_title(
    view: &CalendarView<'_>,
    pane: usize,
    grid: &MonthGrid,
    ref_year: i32,
    title_id: &str,
) -> String {
    let options = view.options;
    let bounds = view.bounds;
    let (year, month) = (grid.year, grid.month);
    let offset = i32::try_from(pane).unwrap_or(0);

    let mut html = format!(
        "<div id=\"{title_id}\" aria-label=\"{}\" class=\"{CLASS_PREFIX}-title\" role=\"heading\" aria-live=\"polite\">",
        escape_html(view.current_label)
    );

    let mut month_options = String::new();
    for (index, name) in (0u32..12).zip(options.i18n.months.iter()) {
        let base = i32::try_from(index).unwrap_or(0);
        let value = if year == ref_year {
            base - offset
        } else {
            12 + base - offset
        };
        month_options.push_str(&format!(
            "<option value=\"{value}\"{}{}>{}</option>",
            if index == month { " selected=\"selected\"" } else { "" },
            if bounds.month_unavailable(year, index) {
                " disabled=\"disabled\""
            } else {
                ""
            },
            escape_html(name)
        ));
    }
    let month_html = format!(
        "<div class=\"{CLASS_PREFIX}-label\">{}<select class=\"{CLASS_PREFIX}-select {CLASS_PREFIX}-select-month\" tabindex=\"-1\">{month_options}</select></div>",
        escape_html(options.i18n.month(month))
    );

    let mut year_options = String::new();
    for value in year_choices(options, bounds, year) {
        year_options.push_str(&format!(
            "<option value=\"{value}\"{}>{value}</option>",
            if value == year { " selected=\"selected\"" } else { "" }
        ));
    }
    let year_html = format!(
        "<div class=\"{CLASS_PREFIX}-label\">{year}{}<select class=\"{CLASS_PREFIX}-select {CLASS_PREFIX}-select-year\" tabindex=\"-1\">{year_options}</select></div>",
        escape_html(&options.year_suffix)
    );

    if options.show_month_after_year {
        html.push_str(&year_html);
        html.push_str(&month_html);
    } else {
        html.push_str(&month_html);
        html.push_str(&year_html);
    }

    let last = usize::try_from(options.number_of_months)
        .unwrap_or(1)
        .saturating_sub(1);
    if pane == 0 {
        let disabled = !bounds.can_page_back(year, month);
        html.push_str(&format!(
            "<button class=\"{CLASS_PREFIX}-prev{}\" type=\"button\">{}</button>",
            if disabled { " is-disabled" } else { "" },
            escape_html(&options.i18n.previous_month)
        ));
    }
    if pane == last {
        let disabled = !bounds.can_page_forward(year, month);
        html.push_str(&format!(
            "<button class=\"{CLASS_PREFIX}-next{}\" type=\"button\">{}</button>",
            if disabled { " is-disabled" } else { "" },
            escape_html(&options.i18n.next_month)
        ));
    }

    html.push_str("</div>");
    html
}

/// Years offered by the year select around `year`, limited to the bounds.
#[must_use]
pub fn year_choices(options: &Options, bounds: &Bounds, year: i32) -> Vec<i32> {
    let (low, high) = options.year_range.years(year);
    let low = low.max(bounds.min_year);
    let high = high.min(bounds.max_year);
    if low > high {
        return Vec::new();
    }
    match options.year_order {
        YearOrder::Ascending => (low..=high).collect(),
        YearOrder::Descending => (low..=high).rev().collect(),
    }
}

fn render_table(options: &Options, grid: &MonthGrid, title_id: &str) -> String {
    let mut html = format!(
        "<table cellpadding=\"0\" cellspacing=\"0\" class=\"{CLASS_PREFIX}-table\" role=\"grid\" aria-labelledby=\"{title_id}\">"
    );
    html.push_str(&render_head(options));
    html.push_str("<tbody>");
    for row in &grid.rows {
        html.push_str(&render_row(options, row));
    }
    html.push_str("</tbody>");
    if options.show_today_button {
        html.push_str(&format!(
            "<tfoot><td colspan=\"{}\"><button class=\"{CLASS_PREFIX}-set-today\">{}</button></td></tfoot>",
            if options.show_week_number { 8 } else { 7 },
            escape_html(&options.i18n.today)
        ));
    }
    html.push_str("</table>");
    html
}

fn render_head(options: &Options) -> String {
    let mut cells = Vec::with_capacity(8);
    if options.show_week_number {
        cells.push("<th></th>".to_string());
    }
    for column in 0..7 {
        cells.push(format!(
            "<th scope=\"col\"><abbr title=\"{}\">{}</abbr></th>",
            escape_html(options.i18n.weekday(column, options.first_day, false)),
            escape_html(options.i18n.weekday(column, options.first_day, true))
        ));
    }
    if options.is_rtl {
        cells.reverse();
    }
    format!("<thead><tr>{}</tr></thead>", cells.concat())
}

fn render_row(options: &Options, row: &WeekRow) -> String {
    let mut cells = row
        .cells
        .iter()
        .map(|cell| render_day(options, cell))
        .collect::<Vec<_>>();
    if let Some(week) = row.week_number {
        cells.insert(0, format!("<td class=\"{CLASS_PREFIX}-week\">{week}</td>"));
    }
    if options.is_rtl {
        cells.reverse();
    }
    format!(
        "<tr class=\"{CLASS_PREFIX}-row{}{}\">{}</tr>",
        if options.pick_whole_week { " pick-whole-week" } else { "" },
        if row.is_selected { " is-selected" } else { "" },
        cells.concat()
    )
}

fn render_day(options: &Options, cell: &DayCell) -> String {
    let mut classes = Vec::new();
    if cell.is_empty {
        if !options.show_days_in_next_and_previous_months {
            return "<td class=\"is-empty\"></td>".to_string();
        }
        classes.push("is-outside-current-month");
        if !options.enable_selection_days_in_next_and_previous_months {
            classes.push("is-selection-disabled");
        }
    }
    let flags = [
        (cell.is_disabled, "is-disabled"),
        (cell.is_today, "is-today"),
        (cell.is_selected, "is-selected"),
        (cell.has_event, "has-event"),
        (cell.is_in_range, "is-inrange"),
        (cell.is_start_range, "is-startrange"),
        (cell.is_end_range, "is-endrange"),
    ];
    classes.extend(flags.iter().filter(|(on, _)| *on).map(|(_, class)| *class));

    format!(
        "<td data-day=\"{day}\" class=\"{}\" aria-selected=\"{}\"><button class=\"{CLASS_PREFIX}-button {CLASS_PREFIX}-day\" type=\"button\" data-{CLASS_PREFIX}-year=\"{}\" data-{CLASS_PREFIX}-month=\"{}\" data-{CLASS_PREFIX}-day=\"{day}\">{day}</button></td>",
        classes.join(" "),
        cell.is_selected,
        cell.year,
        cell.month,
        day = cell.day
    )
}

#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Plain-text month grids for the terminal.
#[derive(Debug, Clone)]
pub struct TextRenderer {
    color: bool,
}

impl TextRenderer {
    #[must_use]
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    #[tracing::instrument(skip(self, options, grids))]
    pub fn print_months(&self, options: &Options, grids: &[MonthGrid]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        self.write_months(&mut out, options, grids)
    }

    pub fn write_months<W: Write>(
        &self,
        mut writer: W,
        options: &Options,
        grids: &[MonthGrid],
    ) -> anyhow::Result<()> {
        let headers = (0..7)
            .map(|column| {
                options
                    .i18n
                    .weekday(column, options.first_day, true)
                    .to_string()
            })
            .collect::<Vec<_>>();
        let width = headers
            .iter()
            .map(|header| UnicodeWidthStr::width(header.as_str()))
            .max()
            .unwrap_or(0)
            .max(3);

        for (index, grid) in grids.iter().enumerate() {
            if index > 0 {
                writeln!(writer)?;
            }
            let month = options.i18n.month(grid.month);
            if options.show_month_after_year {
                writeln!(writer, "{}{} {month}", grid.year, options.year_suffix)?;
            } else {
                writeln!(writer, "{month} {}{}", grid.year, options.year_suffix)?;
            }

            let mut head = headers.iter().map(|h| pad(h, width)).collect::<Vec<_>>();
            if options.is_rtl {
                head.reverse();
            }
            if options.show_week_number {
                head.insert(0, pad("", width));
            }
            writeln!(writer, "{}", head.join(" ").trim_end())?;

            for row in &grid.rows {
                let mut cells = row
                    .cells
                    .iter()
                    .map(|cell| self.day_text(options, cell, width))
                    .collect::<Vec<_>>();
                if options.is_rtl {
                    cells.reverse();
                }
                if let Some(week) = row.week_number {
                    cells.insert(0, pad(&format!("{week:>2}"), width));
                }
                writeln!(writer, "{}", cells.join(" ").trim_end())?;
            }
        }
        Ok(())
    }

    fn day_text(&self, options: &Options, cell: &DayCell, width: usize) -> String {
        if cell.is_empty && !options.show_days_in_next_and_previous_months {
            return pad("", width);
        }
        let marker = if self.color {
            ""
        } else if cell.is_selected {
            "*"
        } else if cell.is_today {
            "."
        } else if cell.has_event {
            "!"
        } else {
            ""
        };
        let text = pad(&format!("{:>2}{marker}", cell.day), width);
        if cell.is_selected {
            self.paint(&text, "7")
        } else if cell.is_disabled || cell.is_empty {
            self.paint(&text, "2")
        } else if cell.is_today {
            self.paint(&text, "33")
        } else if cell.has_event {
            self.paint(&text, "4")
        } else {
            text
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// Color only when stdout is a terminal.
#[must_use]
pub fn stdout_wants_color() -> bool {
    io::stdout().is_terminal()
}

fn pad(text: &str, width: usize) -> String {
    let visible = UnicodeWidthStr::width(text);
    format!("{text}{}", " ".repeat(width.saturating_sub(visible)))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::NaiveDate;

    use super::*;
    use crate::config::YearRange;
    use crate::grid::{GridContext, build_month};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn january(options: &Options, bounds: &Bounds, selected: Option<NaiveDate>) -> MonthGrid {
        let empty = BTreeSet::new();
        let ctx = GridContext {
            first_day: options.first_day,
            today: ymd(2024, 1, 15),
            selected,
            bounds,
            start_range: None,
            end_range: None,
            disable_weekends: false,
            events: &options.events,
            disabled_days: &empty,
            enabled_days: &empty,
            disable_day: None,
            select_day: None,
            show_week_number: options.show_week_number,
            week_min_days: 4,
            pick_whole_week: false,
        };
        build_month(2024, 0, &ctx)
    }

    #[test]
    fn html_marks_selection_and_buttons() {
        let options = Options {
            show_today_button: true,
            ..Options::default()
        };
        let bounds = Bounds::default();
        let grids = vec![january(&options, &bounds, Some(ymd(2024, 1, 20)))];
        let html = render_html(&CalendarView {
            options: &options,
            bounds: &bounds,
            grids: &grids,
            current_label: "01/20/2024",
        });
        assert!(html.starts_with("<div class=\"calpick-lendar\">"));
        assert!(html.contains("aria-label=\"01/20/2024\""));
        assert!(html.contains(
            "<td data-day=\"20\" class=\"is-selected\" aria-selected=\"true\">"
        ));
        assert!(html.contains("class=\"is-today\""));
        assert!(html.contains("calpick-prev\" type=\"button\">Previous Month"));
        assert!(html.contains("calpick-next\" type=\"button\">Next Month"));
        assert!(html.contains("calpick-set-today"));
        assert_eq!(html.matches("<td class=\"is-empty\"></td>").count(), 4);
    }

    #[test]
    fn month_option_values_are_pane_relative() {
        let options = Options {
            number_of_months: 2,
            ..Options::default()
        };
        let bounds = Bounds::default();
        let first = january(&options, &bounds, None);
        let mut second = first.clone();
        second.month = 1;
        let grids = vec![first, second];
        let html = render_html(&CalendarView {
            options: &options,
            bounds: &bounds,
            grids: &grids,
            current_label: "",
        });
        let second_pane = html
            .split("calpick-lendar")
            .nth(2)
            .expect("second pane");
        assert!(second_pane.contains("<option value=\"-1\">January</option>"));
        assert!(second_pane.contains("<option value=\"0\" selected=\"selected\">February"));
        assert!(!second_pane.contains("calpick-prev"));
        let first_pane = html.split("calpick-lendar").nth(1).expect("first pane");
        assert!(!first_pane.contains("calpick-next"));
    }

    #[test]
    fn bounds_disable_paging_and_months() {
        let options = Options::default();
        let mut bounds = Bounds::default();
        bounds.set_min(Some(ymd(2024, 1, 10)));
        bounds.set_max(Some(ymd(2024, 3, 1)));
        let grids = vec![january(&options, &bounds, None)];
        let html = render_html(&CalendarView {
            options: &options,
            bounds: &bounds,
            grids: &grids,
            current_label: "",
        });
        assert!(html.contains("calpick-prev is-disabled"));
        assert!(html.contains("<option value=\"3\" disabled=\"disabled\">April"));
        assert!(html.contains("<option value=\"2024\" selected=\"selected\">2024</option>"));
        assert!(!html.contains("<option value=\"2025\""));
        assert!(html.contains("<td data-day=\"9\" class=\"is-disabled\""));
    }

    #[test]
    fn year_choices_follow_order_and_bounds() {
        let mut options = Options {
            year_range: YearRange::Offset(2),
            ..Options::default()
        };
        let mut bounds = Bounds::default();
        assert_eq!(
            year_choices(&options, &bounds, 2024),
            vec![2022, 2023, 2024, 2025, 2026]
        );
        options.year_order = YearOrder::Descending;
        bounds.set_max(Some(ymd(2025, 6, 1)));
        assert_eq!(year_choices(&options, &bounds, 2024), vec![2025, 2024, 2023, 2022]);
    }

    #[test]
    fn rtl_and_week_numbers_reorder_cells() {
        let options = Options {
            is_rtl: true,
            show_week_number: true,
            ..Options::default()
        };
        let bounds = Bounds::default();
        let grids = vec![january(&options, &bounds, None)];
        let html = render_html(&CalendarView {
            options: &options,
            bounds: &bounds,
            grids: &grids,
            current_label: "",
        });
        assert!(html.contains("<thead><tr><th scope=\"col\"><abbr title=\"Saturday\">Sat"));
        assert!(html.contains("<td class=\"calpick-week\">1</td></tr>"));
    }

    #[test]
    fn labels_are_escaped() {
        assert_eq!(escape_html("<a & \"b\">"), "&lt;a &amp; &quot;b&quot;&gt;");
    }

    #[test]
    fn text_grid_marks_days_without_color() {
        let options = Options::default();
        let bounds = Bounds::default();
        let grids = vec![january(&options, &bounds, Some(ymd(2024, 1, 20)))];
        let mut out = Vec::new();
        TextRenderer::new(false)
            .write_months(&mut out, &options, &grids)
            .expect("write grid");
        let text = String::from_utf8(out).expect("utf8");
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "January 2024");
        assert_eq!(lines[1], "Sun Mon Tue Wed Thu Fri Sat");
        assert!(lines[2].ends_with(" 1   2   3   4   5   6"));
        assert!(text.contains("20*"));
        assert!(text.contains("15."));
        assert_eq!(lines.len(), 7);
    }
}
