use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use calpick_core::config;
use calpick_core::events::Key;
use calpick_core::picker::{PageDirection, Visibility};
use calpick_core::{
    ChangeOrigin, FixedClock, HeadlessHost, Hooks, OptionsPatch, Picker, PickerEvent, Target,
};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use tempfile::NamedTempFile;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

fn clock(date: NaiveDate) -> FixedClock {
    FixedClock::at(date.and_hms_opt(10, 30, 0).expect("valid time"))
}

#[test]
fn options_file_drives_a_bound_picker() {
    let mut file = NamedTempFile::new().expect("tempfile");
    writeln!(
        file,
        "first_day = 1\nmin_date = 2024-02-05\nmax_date = 2024-04-20\ndebounce_ms = 0\n\n[i18n]\ntoday = \"Now\""
    )
    .expect("write options");

    let loaded = config::load(
        Some(file.path()),
        vec![("rc.number_of_months".to_string(), "2".to_string())],
    )
    .expect("load options");
    assert_eq!(loaded.loaded_files, vec![file.path().to_path_buf()]);

    let mut picker = Picker::new(
        HeadlessHost::new().with_field(""),
        clock(ymd(2024, 1, 10)),
        loaded.patch,
        Hooks::default(),
    );
    assert_eq!(picker.options().first_day, 1);
    assert_eq!(picker.options().number_of_months, 2);
    assert_eq!(picker.visibility(), Visibility::Hidden);

    picker.handle_event(PickerEvent::FieldFocus);
    assert!(picker.is_visible());
    // today is before min_date so the view opens on the min month
    assert_eq!(picker.panes()[0].month0(), 1);
    assert_eq!(picker.panes().len(), 2);

    picker.set_date(ymd(2024, 6, 1));
    assert_eq!(picker.date(), Some(ymd(2024, 4, 20)));
    assert_eq!(
        picker.host().field.as_ref().map(|f| f.value.as_str()),
        Some("2024-04-20")
    );
}

#[test]
fn paging_rolls_over_the_year_and_reports_it() {
    let pages: Rc<RefCell<Vec<(PageDirection, u32, i32)>>> = Rc::default();
    let seen = Rc::clone(&pages);
    let hooks = Hooks::default().on_paginate(move |dir, month, year| {
        seen.borrow_mut().push((dir, month, year));
    });

    let mut picker = Picker::new(
        HeadlessHost::new(),
        clock(ymd(2023, 12, 18)),
        OptionsPatch::default(),
        hooks,
    );
    picker.next_month();
    picker.prev_month();
    picker.prev_month();

    assert_eq!(
        *pages.borrow(),
        vec![
            (PageDirection::Next, 0, 2024),
            (PageDirection::Prev, 11, 2023),
            (PageDirection::Prev, 10, 2023),
        ]
    );
}

#[test]
fn inverted_bounds_are_dropped() {
    let mut picker = Picker::new(
        HeadlessHost::new(),
        clock(ymd(2024, 5, 1)),
        OptionsPatch::default(),
        Hooks::default(),
    );
    picker.set_min_date(Some(ymd(2024, 5, 10)));
    picker.set_max_date(Some(ymd(2024, 5, 2)));
    assert_eq!(picker.options().min_date, None);
    assert_eq!(picker.options().max_date, None);
    assert_eq!(picker.bounds().min_date, None);
}

#[test]
fn open_and_close_fire_only_on_transitions() {
    let log: Rc<RefCell<Vec<&'static str>>> = Rc::default();
    let opened = Rc::clone(&log);
    let closed = Rc::clone(&log);
    let hooks = Hooks::default()
        .on_open(move || opened.borrow_mut().push("open"))
        .on_close(move || closed.borrow_mut().push("close"));

    let mut picker = Picker::new(
        HeadlessHost::new().with_field(""),
        clock(ymd(2024, 5, 1)),
        OptionsPatch::default(),
        hooks,
    );
    // construction hides a bound picker that was never shown
    assert!(log.borrow().is_empty());

    picker.show();
    picker.show();
    picker.hide();
    picker.hide();
    assert_eq!(*log.borrow(), vec!["open", "close"]);
}

#[test]
fn select_callback_runs_twice_per_pick() {
    let picks: Rc<RefCell<Vec<NaiveDateTime>>> = Rc::default();
    let seen = Rc::clone(&picks);
    let hooks = Hooks::default().on_select(move |at| seen.borrow_mut().push(at));

    let mut picker = Picker::new(
        HeadlessHost::new().with_field(""),
        clock(ymd(2024, 5, 1)),
        OptionsPatch::default(),
        hooks,
    );
    picker.handle_event(PickerEvent::FieldFocus);
    let outcome = picker.handle_event(PickerEvent::PointerDown(Target::Day(ymd(2024, 5, 9))));
    assert!(outcome.prevent_default);

    let picks = picks.borrow();
    assert_eq!(picks.len(), 2);
    assert!(picks.iter().all(|at| at.date() == ymd(2024, 5, 9)));

    let host = picker.host();
    assert_eq!(
        host.changes.last(),
        Some(&("2024-05-09".to_string(), ChangeOrigin::Picker))
    );
}

#[test]
fn own_field_changes_are_not_reparsed() {
    let picks: Rc<RefCell<usize>> = Rc::default();
    let seen = Rc::clone(&picks);
    let hooks = Hooks::default().on_select(move |_| *seen.borrow_mut() += 1);

    let mut picker = Picker::new(
        HeadlessHost::new().with_field(""),
        clock(ymd(2024, 5, 1)),
        OptionsPatch {
            debounce_ms: Some(0),
            ..OptionsPatch::default()
        },
        hooks,
    );
    picker.set_date(ymd(2024, 5, 3));
    assert_eq!(*picks.borrow(), 2);

    picker.handle_event(PickerEvent::FieldChange(ChangeOrigin::Picker));
    assert_eq!(*picks.borrow(), 2);

    picker.host_mut().type_into_field("2024-05-04");
    picker.handle_event(PickerEvent::FieldChange(ChangeOrigin::User));
    assert_eq!(*picks.borrow(), 4);
    assert_eq!(picker.date(), Some(ymd(2024, 5, 4)));
}

#[test]
fn typing_is_debounced() {
    let mut picker = Picker::new(
        HeadlessHost::new().with_field(""),
        clock(ymd(2024, 5, 1)),
        OptionsPatch {
            debounce_ms: Some(300),
            ..OptionsPatch::default()
        },
        Hooks::default(),
    );

    picker.host_mut().type_into_field("2024-05-1");
    picker.handle_event(PickerEvent::FieldChange(ChangeOrigin::User));
    picker.advance(200);
    picker.host_mut().type_into_field("2024-05-12");
    picker.handle_event(PickerEvent::FieldChange(ChangeOrigin::User));
    picker.advance(200);
    assert_eq!(picker.date(), None);

    picker.advance(100);
    assert_eq!(picker.date(), Some(ymd(2024, 5, 12)));
}

#[test]
fn refocus_cancels_the_blur_hide() {
    let mut picker = Picker::new(
        HeadlessHost::new().with_field(""),
        clock(ymd(2024, 5, 1)),
        OptionsPatch::default(),
        Hooks::default(),
    );
    picker.handle_event(PickerEvent::FieldFocus);
    picker.handle_event(PickerEvent::FieldBlur {
        focus_in_picker: false,
    });
    picker.advance(20);
    picker.handle_event(PickerEvent::FieldFocus);
    picker.advance(200);
    assert!(picker.is_visible());

    picker.handle_event(PickerEvent::FieldBlur {
        focus_in_picker: false,
    });
    picker.advance(60);
    assert!(!picker.is_visible());
}

#[test]
fn keyboard_moves_the_selection_across_months() {
    let mut picker = Picker::new(
        HeadlessHost::new().with_field("2024-01-31"),
        clock(ymd(2024, 1, 15)),
        OptionsPatch::default(),
        Hooks::default(),
    );
    picker.handle_event(PickerEvent::FieldFocus);
    assert_eq!(picker.date(), Some(ymd(2024, 1, 31)));

    picker.handle_event(PickerEvent::KeyDown(Key::Right));
    assert_eq!(picker.date(), Some(ymd(2024, 2, 1)));
    assert_eq!(picker.panes()[0].month0(), 1);

    picker.handle_event(PickerEvent::KeyDown(Key::Escape));
    assert!(!picker.is_visible());
}

#[test]
fn every_grid_is_whole_weeks_with_iso_numbers() {
    let mut picker = Picker::new(
        HeadlessHost::new(),
        clock(ymd(2020, 1, 1)),
        OptionsPatch {
            show_week_number: Some(true),
            first_day: Some(1),
            ..OptionsPatch::default()
        },
        Hooks::default(),
    );

    for _ in 0..60 {
        for grid in picker.grids() {
            let cells: Vec<_> = grid.cells().collect();
            assert_eq!(cells.len() % 7, 0);

            let own_days = cells.iter().filter(|cell| !cell.is_empty).count();
            let first = NaiveDate::from_ymd_opt(grid.year, grid.month + 1, 1).expect("first");
            let next = first
                .checked_add_months(chrono::Months::new(1))
                .expect("next month");
            let expected = usize::try_from((next - first).num_days()).expect("day count");
            assert_eq!(own_days, expected);

            for row in &grid.rows {
                let monday = row
                    .cells
                    .first()
                    .and_then(|cell| cell.date())
                    .filter(|_| !row.cells[0].is_empty);
                if let (Some(monday), Some(week)) = (monday, row.week_number) {
                    assert_eq!(week, monday.iso_week().week());
                }
            }
        }
        picker.next_month();
    }
}

#[test]
fn session_tap_selects_like_a_click() {
    let mut picker = Picker::new(
        HeadlessHost::new().with_field(""),
        clock(ymd(2024, 7, 3)),
        OptionsPatch::default(),
        Hooks::default(),
    );
    let mut out = Vec::<u8>::new();
    let count = calpick_core::session::run_script(
        &mut picker,
        "focus\ntap day 2024-07-22\nclick next\nwait 100\n",
        &mut out,
    )
    .expect("script");
    assert_eq!(count, 4);
    assert_eq!(picker.date(), Some(ymd(2024, 7, 22)));
    // the emulated mouse-down after a tap is swallowed
    assert_eq!(picker.panes()[0].month0(), 6);
    assert!(!picker.is_visible());
    assert_eq!(picker.date().map(|d| d.weekday()), Some(chrono::Weekday::Mon));
}
