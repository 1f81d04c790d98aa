// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{NaiveDate, NaiveDateTime};
use extrackr::commands::exporter::{
    ExportFormat, ExportRow, ReportSummary, fetch_rows, render, running_balances,
};
use extrackr::models::Kind;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn ymd(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn ts() -> NaiveDateTime {
    ymd(2025, 3, 20).and_hms_opt(9, 30, 0).unwrap()
}

fn sample_rows() -> Vec<ExportRow> {
    vec![
        ExportRow {
            date: ymd(2025, 3, 1),
            kind: Kind::Income,
            category: "Salary".into(),
            description: "payday".into(),
            amount: d("1000"),
        },
        ExportRow {
            date: ymd(2025, 3, 2),
            kind: Kind::Expense,
            category: "Dining".into(),
            description: "".into(),
            amount: d("200"),
        },
        ExportRow {
            date: ymd(2025, 3, 3),
            kind: Kind::Expense,
            category: "Rent".into(),
            description: "march".into(),
            amount: d("300"),
        },
    ]
}

#[test]
fn running_balance_adds_income_and_subtracts_expense() {
    let balances = running_balances(&sample_rows());
    assert_eq!(balances, vec![d("1000"), d("800"), d("500")]);
}

#[test]
fn summary_totals_and_date_range() {
    let rows = sample_rows();
    let s = ReportSummary::compute(&rows, ymd(2025, 3, 20));
    assert_eq!(s.income, d("1000"));
    assert_eq!(s.expenses, d("500"));
    assert_eq!(s.net_balance, d("500"));
    assert_eq!(s.count, 3);
    assert_eq!(s.date_from, ymd(2025, 3, 1));
    assert_eq!(s.date_to, ymd(2025, 3, 3));
}

#[test]
fn empty_summary_falls_back_to_today() {
    let s = ReportSummary::compute(&[], ymd(2025, 3, 20));
    assert_eq!(s.income, Decimal::ZERO);
    assert_eq!(s.count, 0);
    assert_eq!(s.date_from, ymd(2025, 3, 20));
    assert_eq!(s.date_to, ymd(2025, 3, 20));
}

#[test]
fn csv_carries_balances_and_a_totals_row() {
    let file = render(ExportFormat::Csv, &sample_rows(), "summary", "alice", "USD", ts()).unwrap();
    let text = String::from_utf8(file.bytes).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "date,type,category,description,amount,balance");
    assert_eq!(lines[1], "2025-03-01,income,Salary,payday,1000.00,1000.00");
    assert_eq!(lines[2], "2025-03-02,expense,Dining,,200.00,800.00");
    assert_eq!(lines[3], "2025-03-03,expense,Rent,march,300.00,500.00");
    // Totals reflect the raw income/expense sums, not the running balance.
    assert_eq!(lines[4], ",,,TOTALS,1000.00,500.00");
}

#[test]
fn filenames_encode_label_timestamp_and_format() {
    for (format, ext, ctype) in [
        (ExportFormat::Pdf, "pdf", "application/pdf"),
        (
            ExportFormat::Excel,
            "xlsx",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        ),
        (ExportFormat::Csv, "csv", "text/csv"),
    ] {
        let file = render(format, &sample_rows(), "monthly", "alice", "USD", ts()).unwrap();
        assert_eq!(
            file.filename,
            format!("extrackr_report_monthly_20250320_093000.{}", ext)
        );
        assert_eq!(file.content_type, ctype);
        assert!(!file.bytes.is_empty());
    }
}

#[test]
fn pdf_and_xlsx_have_their_magic_bytes() {
    let pdf = render(ExportFormat::Pdf, &sample_rows(), "summary", "alice", "USD", ts()).unwrap();
    assert_eq!(&pdf.bytes[..4], b"%PDF");

    let xlsx =
        render(ExportFormat::Excel, &sample_rows(), "summary", "alice", "USD", ts()).unwrap();
    assert_eq!(&xlsx.bytes[..2], b"PK");
}

#[test]
fn pdf_renders_for_an_empty_set() {
    let file = render(ExportFormat::Pdf, &[], "summary", "alice", "USD", ts()).unwrap();
    assert!(!file.bytes.is_empty());
}

#[test]
fn fetch_rows_is_ascending_and_bounded_inclusively() {
    let mut conn = Connection::open_in_memory().unwrap();
    extrackr::db::init_schema(&mut conn).unwrap();
    conn.execute("INSERT INTO users(name) VALUES('alice')", [])
        .unwrap();
    conn.execute(
        "INSERT INTO categories(name, kind) VALUES('Dining','expense')",
        [],
    )
    .unwrap();
    for date in ["2025-03-05", "2025-03-01", "2025-03-10"] {
        conn.execute(
            "INSERT INTO transactions(user_id, kind, category_id, amount, date) VALUES(1,'expense',1,'10',?1)",
            params![date],
        )
        .unwrap();
    }

    let rows = fetch_rows(&conn, 1, Some(ymd(2025, 3, 1)), Some(ymd(2025, 3, 5))).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].date, ymd(2025, 3, 1));
    assert_eq!(rows[1].date, ymd(2025, 3, 5));
}

#[test]
fn export_bytes_land_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let file = render(ExportFormat::Csv, &sample_rows(), "summary", "alice", "USD", ts()).unwrap();
    let path = dir.path().join(&file.filename);
    std::fs::write(&path, &file.bytes).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), file.bytes);
}
