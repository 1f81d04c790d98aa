// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Datelike, NaiveDate};
use extrackr::commands::budgets::{budget_statuses, spent_in_window};
use extrackr::models::{BudgetPeriod, usage_percentage};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn ymd(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    extrackr::db::init_schema(&mut conn).unwrap();
    conn.execute("INSERT INTO users(name) VALUES('alice')", [])
        .unwrap();
    conn.execute(
        "INSERT INTO categories(name, kind) VALUES('Dining','expense')",
        [],
    )
    .unwrap();
    conn
}

fn add_expense(conn: &Connection, user_id: i64, cat_id: i64, date: &str, amount: &str) {
    conn.execute(
        "INSERT INTO transactions(user_id, kind, category_id, amount, date) VALUES(?1,'expense',?2,?3,?4)",
        params![user_id, cat_id, amount, date],
    )
    .unwrap();
}

#[test]
fn monthly_window_covers_the_full_calendar_month() {
    let (ws, we) = BudgetPeriod::Monthly.window(ymd(2024, 3, 15));
    assert_eq!(ws, ymd(2024, 3, 1));
    assert_eq!(we, ymd(2024, 4, 1));
}

#[test]
fn monthly_window_rolls_december_into_january() {
    let (ws, we) = BudgetPeriod::Monthly.window(ymd(2024, 12, 10));
    assert_eq!(ws, ymd(2024, 12, 1));
    assert_eq!(we, ymd(2025, 1, 1));
}

#[test]
fn quarterly_windows_start_on_quarter_months_only() {
    for month in 1..=12u32 {
        let (ws, _) = BudgetPeriod::Quarterly.window(ymd(2024, month, 5));
        assert!([1, 4, 7, 10].contains(&ws.month()), "month {}", month);
        assert_eq!(ws.day(), 1);
    }
}

#[test]
fn q4_window_ends_in_january_of_the_next_year() {
    let (ws, we) = BudgetPeriod::Quarterly.window(ymd(2024, 11, 5));
    assert_eq!(ws, ymd(2024, 10, 1));
    assert_eq!(we, ymd(2025, 1, 1));
}

#[test]
fn yearly_window_spans_the_calendar_year() {
    let (ws, we) = BudgetPeriod::Yearly.window(ymd(2024, 6, 30));
    assert_eq!(ws, ymd(2024, 1, 1));
    assert_eq!(we, ymd(2025, 1, 1));
}

#[test]
fn usage_percentage_guards_division_by_zero() {
    assert_eq!(usage_percentage(Decimal::ZERO, d("50")), Decimal::ZERO);
}

#[test]
fn usage_percentage_is_uncapped() {
    assert_eq!(usage_percentage(d("100"), d("250")), d("250"));
}

#[test]
fn spent_sums_only_expenses_inside_the_window() {
    let conn = setup();
    add_expense(&conn, 1, 1, "2024-12-05", "40");
    add_expense(&conn, 1, 1, "2024-12-31", "10");
    // Outside the window
    add_expense(&conn, 1, 1, "2024-11-30", "99");
    add_expense(&conn, 1, 1, "2025-01-01", "99");
    // Income in the same category never counts as spend
    conn.execute(
        "INSERT INTO transactions(user_id, kind, category_id, amount, date) VALUES(1,'income',1,'500','2024-12-10')",
        [],
    )
    .unwrap();

    let spent = spent_in_window(&conn, 1, 1, ymd(2024, 12, 1), ymd(2025, 1, 1)).unwrap();
    assert_eq!(spent, d("50"));
}

#[test]
fn spent_is_scoped_to_the_owner() {
    let conn = setup();
    conn.execute("INSERT INTO users(name) VALUES('bob')", [])
        .unwrap();
    add_expense(&conn, 2, 1, "2024-12-05", "75");

    let spent = spent_in_window(&conn, 1, 1, ymd(2024, 12, 1), ymd(2025, 1, 1)).unwrap();
    assert_eq!(spent, Decimal::ZERO);
}

#[test]
fn statuses_report_spent_remaining_and_usage() {
    let conn = setup();
    conn.execute(
        "INSERT INTO budgets(user_id, category_id, amount, period, start_date) VALUES(1,1,'200','monthly','2024-12-15')",
        [],
    )
    .unwrap();
    add_expense(&conn, 1, 1, "2024-12-03", "120");
    add_expense(&conn, 1, 1, "2024-12-20", "130");

    let statuses = budget_statuses(&conn, 1).unwrap();
    assert_eq!(statuses.len(), 1);
    let s = &statuses[0];
    // Mid-month start date still resolves to the full calendar month.
    assert_eq!(s.window_start, ymd(2024, 12, 1));
    assert_eq!(s.window_end, ymd(2025, 1, 1));
    assert_eq!(s.spent, d("250"));
    // Overspend is a meaningful negative, not an error.
    assert_eq!(s.remaining, d("-50"));
    assert_eq!(s.usage_pct, d("125"));
}

#[test]
fn empty_window_reads_as_zero_spend() {
    let conn = setup();
    conn.execute(
        "INSERT INTO budgets(user_id, category_id, amount, period, start_date) VALUES(1,1,'200','monthly','2024-12-01')",
        [],
    )
    .unwrap();
    let statuses = budget_statuses(&conn, 1).unwrap();
    assert_eq!(statuses[0].spent, Decimal::ZERO);
    assert_eq!(statuses[0].remaining, d("200"));
    assert_eq!(statuses[0].usage_pct, Decimal::ZERO);
}

#[test]
fn duplicate_budget_per_user_category_period_start_is_rejected() {
    let conn = setup();
    conn.execute(
        "INSERT INTO budgets(user_id, category_id, amount, period, start_date) VALUES(1,1,'200','monthly','2024-12-01')",
        [],
    )
    .unwrap();
    let dup = conn.execute(
        "INSERT INTO budgets(user_id, category_id, amount, period, start_date) VALUES(1,1,'300','monthly','2024-12-01')",
        [],
    );
    assert!(dup.is_err());
}
