// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use extrackr::cli;
use extrackr::commands::recurring::{AdvanceOutcome, advance_template};
use extrackr::models::Frequency;
use rusqlite::{Connection, params};

fn ymd(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    extrackr::db::init_schema(&mut conn).unwrap();
    conn.execute("INSERT INTO users(name) VALUES('alice')", [])
        .unwrap();
    conn.execute(
        "INSERT INTO categories(name, kind) VALUES('Rent','expense')",
        [],
    )
    .unwrap();
    conn
}

fn insert_template(conn: &Connection, frequency: &str, next: &str, end: Option<&str>) -> i64 {
    conn.execute(
        "INSERT INTO recurring_transactions(
            user_id, kind, category_id, amount, frequency, start_date, end_date, next_occurrence)
         VALUES(1,'expense',1,'800',?1,?2,?3,?2)",
        params![frequency, next, end],
    )
    .unwrap();
    conn.last_insert_rowid()
}

#[test]
fn frequency_steps_move_one_period() {
    assert_eq!(Frequency::Daily.advance(ymd(2025, 3, 31)), ymd(2025, 4, 1));
    assert_eq!(Frequency::Weekly.advance(ymd(2025, 3, 25)), ymd(2025, 4, 1));
    assert_eq!(Frequency::Monthly.advance(ymd(2025, 3, 15)), ymd(2025, 4, 15));
    assert_eq!(Frequency::Quarterly.advance(ymd(2025, 11, 1)), ymd(2026, 2, 1));
    assert_eq!(Frequency::Yearly.advance(ymd(2025, 3, 15)), ymd(2026, 3, 15));
}

#[test]
fn month_steps_clamp_to_the_end_of_short_months() {
    assert_eq!(Frequency::Monthly.advance(ymd(2025, 1, 31)), ymd(2025, 2, 28));
    assert_eq!(Frequency::Monthly.advance(ymd(2024, 1, 31)), ymd(2024, 2, 29));
    assert_eq!(Frequency::Quarterly.advance(ymd(2025, 8, 31)), ymd(2025, 11, 30));
}

#[test]
fn cli_add_defaults_next_occurrence_to_start_date() {
    let conn = setup();
    let m = cli::build_cli()
        .try_get_matches_from([
            "extrackr",
            "recurring",
            "add",
            "--user",
            "alice",
            "--kind",
            "expense",
            "--category",
            "Rent",
            "--amount",
            "800",
            "--frequency",
            "monthly",
            "--start",
            "2025-04-01",
        ])
        .unwrap();
    let Some(("recurring", sub)) = m.subcommand() else {
        panic!("expected recurring subcommand");
    };
    extrackr::commands::recurring::handle(&conn, sub).unwrap();

    let (next, start): (String, String) = conn
        .query_row(
            "SELECT next_occurrence, start_date FROM recurring_transactions",
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(next, start);
    assert_eq!(next, "2025-04-01");
}

#[test]
fn advance_moves_next_occurrence_forward() {
    let conn = setup();
    let id = insert_template(&conn, "monthly", "2025-03-01", None);
    let outcome = advance_template(&conn, 1, id).unwrap();
    assert_eq!(outcome, AdvanceOutcome::Advanced(ymd(2025, 4, 1)));

    let next: String = conn
        .query_row(
            "SELECT next_occurrence FROM recurring_transactions WHERE id=?1",
            params![id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(next, "2025-04-01");
}

#[test]
fn advance_past_end_date_deactivates_the_template() {
    let conn = setup();
    let id = insert_template(&conn, "monthly", "2025-03-01", Some("2025-03-15"));
    let outcome = advance_template(&conn, 1, id).unwrap();
    assert_eq!(outcome, AdvanceOutcome::Completed);

    let (next, active): (String, bool) = conn
        .query_row(
            "SELECT next_occurrence, active FROM recurring_transactions WHERE id=?1",
            params![id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(next, "2025-03-01");
    assert!(!active);
}

#[test]
fn advance_requires_ownership() {
    let conn = setup();
    conn.execute("INSERT INTO users(name) VALUES('bob')", [])
        .unwrap();
    let id = insert_template(&conn, "weekly", "2025-03-01", None);
    let err = advance_template(&conn, 2, id).unwrap_err();
    assert!(err.to_string().contains("not found"));
}
