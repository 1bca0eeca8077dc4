use chrono::{Datelike, NaiveDate, Weekday};
use week_sync::{WeekStatus, WeekWindow, classify, format_status_label, parse_deadline};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// Wednesday 2025-01-08; this week is 01-06..01-12, next week 01-13..01-19
fn today() -> NaiveDate {
    d(2025, 1, 8)
}

#[test]
fn week_window_always_starts_monday_and_spans_seven_days() {
    let mut date = d(2024, 12, 23);
    while date <= d(2025, 1, 19) {
        let window = WeekWindow::containing(date);
        assert_eq!(window.start().weekday(), Weekday::Mon);
        assert_eq!(window.end().weekday(), Weekday::Sun);
        assert_eq!((window.end() - window.start()).num_days(), 6);
        assert!(window.contains(date));
        assert_eq!(window.next().start(), window.end().succ_opt().unwrap());
        date = date.succ_opt().unwrap();
    }
}

#[test]
fn done_status_wins_over_any_deadline() {
    for deadline in [None, Some(d(2024, 1, 1)), Some(today()), Some(d(2030, 1, 1))] {
        assert_eq!(classify(deadline, Some("Done"), today()), WeekStatus::Completed);
    }
}

#[test]
fn done_status_is_matched_case_insensitively() {
    for status in ["done", "DONE", "dOnE"] {
        assert_eq!(classify(None, Some(status), today()), WeekStatus::Completed);
        assert_eq!(classify(Some(d(2025, 1, 9)), Some(status), today()), WeekStatus::Completed);
    }
    assert_eq!(classify(Some(d(2025, 1, 9)), Some("Done!"), today()), WeekStatus::ThisWeek);
}

#[test]
fn missing_deadline_is_not_assigned() {
    assert_eq!(classify(None, None, today()), WeekStatus::NotAssigned);
    assert_eq!(classify(None, Some("Working on it"), today()), WeekStatus::NotAssigned);
}

#[test]
fn this_week_includes_both_bounds() {
    assert_eq!(classify(Some(d(2025, 1, 6)), None, today()), WeekStatus::ThisWeek);
    assert_eq!(classify(Some(today()), None, today()), WeekStatus::ThisWeek);
    assert_eq!(classify(Some(d(2025, 1, 12)), None, today()), WeekStatus::ThisWeek);
}

#[test]
fn next_week_boundaries() {
    assert_eq!(classify(Some(d(2025, 1, 13)), None, today()), WeekStatus::NextWeek);
    assert_eq!(classify(Some(d(2025, 1, 19)), None, today()), WeekStatus::NextWeek);
    assert_eq!(classify(Some(d(2025, 1, 20)), None, today()), WeekStatus::Future);
}

#[test]
fn earlier_deadlines_are_past_due() {
    assert_eq!(classify(Some(d(2025, 1, 5)), None, today()), WeekStatus::PastDue);
    assert_eq!(classify(Some(d(2024, 12, 31)), Some("Stuck"), today()), WeekStatus::PastDue);
}

#[test]
fn sunday_today_still_uses_the_week_that_started_monday() {
    let sunday = d(2025, 1, 12);
    assert_eq!(classify(Some(d(2025, 1, 6)), None, sunday), WeekStatus::ThisWeek);
    assert_eq!(classify(Some(d(2025, 1, 13)), None, sunday), WeekStatus::NextWeek);
}

#[test]
fn year_boundary_is_handled_by_calendar_arithmetic() {
    // Monday 2024-12-30 week runs into January
    let today = d(2024, 12, 31);
    assert_eq!(classify(Some(d(2025, 1, 5)), None, today), WeekStatus::ThisWeek);
    assert_eq!(classify(Some(d(2025, 1, 6)), None, today), WeekStatus::NextWeek);
    assert_eq!(classify(Some(d(2025, 1, 13)), None, today), WeekStatus::Future);
}

#[test]
fn classification_is_total_and_deterministic() {
    let statuses = [None, Some("Done"), Some("Working on it"), Some("")];
    let mut date = d(2024, 12, 1);
    while date <= d(2025, 2, 28) {
        for status in statuses {
            let first = classify(Some(date), status, today());
            assert_eq!(first, classify(Some(date), status, today()));
            assert!(WeekStatus::ALL.contains(&first));
        }
        date = date.succ_opt().unwrap();
    }
}

#[test]
fn every_status_formats_to_its_label() {
    for status in WeekStatus::ALL {
        assert_eq!(status.to_label().label, status.label());
        assert_eq!(format_status_label(status.label()).label, status.label());
    }
    assert_eq!(WeekStatus::PastDue.to_label().label, "Past Due");
    assert_eq!(format_status_label("Something Else").label, "Something Else");
}

#[test]
fn deadline_values_from_date_columns() {
    assert_eq!(
        parse_deadline(r#"{"date":"2025-01-13","time":null}"#).unwrap(),
        Some(d(2025, 1, 13))
    );
    assert_eq!(parse_deadline("2025-01-13").unwrap(), Some(d(2025, 1, 13)));
    assert_eq!(parse_deadline("").unwrap(), None);
    assert!(parse_deadline("next tuesday").is_err());
}
