// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use extrackr::commands::transactions::{
    TxFilter, TxUpdate, category_for_entry, delete_transaction, insert_transaction, query_rows,
    update_transaction,
};
use extrackr::models::Kind;
use extrackr::utils::parse_amount;
use rusqlite::{Connection, params};

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    extrackr::db::init_schema(&mut conn).unwrap();
    conn.execute("INSERT INTO users(name) VALUES('alice')", [])
        .unwrap();
    conn.execute("INSERT INTO users(name) VALUES('bob')", [])
        .unwrap();
    conn.execute(
        "INSERT INTO categories(name, kind) VALUES('Dining','expense')",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO categories(name, kind) VALUES('Salary','income')",
        [],
    )
    .unwrap();
    conn
}

fn add(conn: &Connection, user: i64, cat: i64, kind: &str, date: &str, amount: &str, desc: &str) {
    conn.execute(
        "INSERT INTO transactions(user_id, kind, category_id, amount, date, description)
         VALUES(?1,?2,?3,?4,?5,?6)",
        params![user, kind, cat, amount, date, desc],
    )
    .unwrap();
}

#[test]
fn listing_is_newest_first_with_id_tiebreak() {
    let conn = setup();
    add(&conn, 1, 1, "expense", "2025-01-02", "10", "a");
    add(&conn, 1, 1, "expense", "2025-01-05", "20", "b");
    add(&conn, 1, 1, "expense", "2025-01-05", "30", "c");

    let rows = query_rows(&conn, 1, &TxFilter::default()).unwrap();
    let descs: Vec<&str> = rows.iter().map(|r| r.description.as_str()).collect();
    assert_eq!(descs, vec!["c", "b", "a"]);
}

#[test]
fn listing_never_leaks_other_users_rows() {
    let conn = setup();
    add(&conn, 1, 1, "expense", "2025-01-02", "10", "mine");
    add(&conn, 2, 1, "expense", "2025-01-03", "20", "theirs");

    let rows = query_rows(&conn, 1, &TxFilter::default()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].description, "mine");
}

#[test]
fn filters_compose() {
    let conn = setup();
    add(&conn, 1, 1, "expense", "2025-01-02", "10", "coffee");
    add(&conn, 1, 1, "expense", "2025-02-10", "20", "pizza");
    add(&conn, 1, 2, "income", "2025-02-11", "900", "payday");

    let filter = TxFilter {
        kind: Some(Kind::Expense),
        date_from: Some("2025-02-01".parse().unwrap()),
        date_to: Some("2025-02-28".parse().unwrap()),
        ..Default::default()
    };
    let rows = query_rows(&conn, 1, &filter).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].description, "pizza");
}

#[test]
fn search_matches_description_and_category_name() {
    let conn = setup();
    add(&conn, 1, 1, "expense", "2025-01-02", "10", "team lunch");
    add(&conn, 1, 2, "income", "2025-01-03", "900", "");

    let by_desc = query_rows(
        &conn,
        1,
        &TxFilter {
            search: Some("LUNCH".into()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(by_desc.len(), 1);
    assert_eq!(by_desc[0].description, "team lunch");

    let by_cat = query_rows(
        &conn,
        1,
        &TxFilter {
            search: Some("salar".into()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(by_cat.len(), 1);
    assert_eq!(by_cat[0].category, "Salary");
}

#[test]
fn limit_is_respected() {
    let conn = setup();
    for i in 1..=5 {
        add(&conn, 1, 1, "expense", &format!("2025-01-0{}", i), "10", "");
    }
    let rows = query_rows(
        &conn,
        1,
        &TxFilter {
            limit: Some(2),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].date, "2025-01-05");
}

#[test]
fn amounts_below_a_cent_are_rejected() {
    assert!(parse_amount("0").is_err());
    assert!(parse_amount("-5").is_err());
    assert!(parse_amount("0.009").is_err());
    assert_eq!(parse_amount("0.01").unwrap(), "0.01".parse().unwrap());
}

#[test]
fn category_kind_must_match_entry_kind() {
    let conn = setup();
    let err = category_for_entry(&conn, "Salary", Kind::Expense).unwrap_err();
    assert!(err.to_string().contains("income category"));

    let ok = category_for_entry(&conn, "Dining", Kind::Expense).unwrap();
    assert_eq!(ok.name, "Dining");
}

#[test]
fn inactive_categories_take_no_new_entries() {
    let conn = setup();
    conn.execute("UPDATE categories SET active=0 WHERE name='Dining'", [])
        .unwrap();
    let err = category_for_entry(&conn, "Dining", Kind::Expense).unwrap_err();
    assert!(err.to_string().contains("inactive"));
}

#[test]
fn editing_someone_elses_row_reads_as_not_found() {
    let conn = setup();
    let id = insert_transaction(
        &conn,
        1,
        Kind::Expense,
        1,
        "10".parse().unwrap(),
        None,
        "2025-01-02".parse().unwrap(),
    )
    .unwrap();

    let err = update_transaction(&conn, 2, id, &TxUpdate::default()).unwrap_err();
    assert!(err.to_string().contains("not found"));

    let err = delete_transaction(&conn, 2, id).unwrap_err();
    assert!(err.to_string().contains("not found"));

    // The owner still sees it.
    assert_eq!(query_rows(&conn, 1, &TxFilter::default()).unwrap().len(), 1);
}

#[test]
fn changing_kind_revalidates_the_kept_category() {
    let conn = setup();
    let id = insert_transaction(
        &conn,
        1,
        Kind::Expense,
        1,
        "10".parse().unwrap(),
        None,
        "2025-01-02".parse().unwrap(),
    )
    .unwrap();

    let err = update_transaction(
        &conn,
        1,
        id,
        &TxUpdate {
            kind: Some(Kind::Income),
            ..Default::default()
        },
    )
    .unwrap_err();
    assert!(err.to_string().contains("expense category"));
}

#[test]
fn edit_updates_fields_and_bumps_updated_at() {
    let conn = setup();
    let id = insert_transaction(
        &conn,
        1,
        Kind::Expense,
        1,
        "10".parse().unwrap(),
        Some("old"),
        "2025-01-02".parse().unwrap(),
    )
    .unwrap();
    conn.execute(
        "UPDATE transactions SET updated_at='2000-01-01 00:00:00' WHERE id=?1",
        params![id],
    )
    .unwrap();

    update_transaction(
        &conn,
        1,
        id,
        &TxUpdate {
            amount: Some("25".parse().unwrap()),
            description: Some("new".into()),
            ..Default::default()
        },
    )
    .unwrap();

    let (amount, desc, updated): (String, String, String) = conn
        .query_row(
            "SELECT amount, description, updated_at FROM transactions WHERE id=?1",
            params![id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!(amount, "25");
    assert_eq!(desc, "new");
    assert_ne!(updated, "2000-01-01 00:00:00");
}
