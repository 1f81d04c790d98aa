// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::TrackerError;
use crate::models::{Category, Kind};
use crate::utils::{
    category_by_name, id_for_user, maybe_print_json, parse_amount, parse_date, pretty_table,
};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("edit", sub)) => edit(conn, sub)?,
        Some(("rm", sub)) => rm(conn, sub)?,
        _ => {}
    }
    Ok(())
}

/// Resolve a category for a new entry of the given kind. The pairing rule is
/// enforced here, not in the schema: an expense entry cannot sit under an
/// income category, and inactive categories take no new entries.
pub fn category_for_entry(conn: &Connection, name: &str, kind: Kind) -> Result<Category> {
    let cat = category_by_name(conn, name)?;
    if !cat.active {
        return Err(TrackerError::InactiveCategory(cat.name).into());
    }
    if cat.kind != kind {
        return Err(TrackerError::KindMismatch {
            category: cat.name,
            category_kind: cat.kind.as_str().to_string(),
            entry_kind: kind.as_str().to_string(),
        }
        .into());
    }
    Ok(cat)
}

pub fn insert_transaction(
    conn: &Connection,
    user_id: i64,
    kind: Kind,
    category_id: i64,
    amount: Decimal,
    description: Option<&str>,
    date: NaiveDate,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions(user_id, kind, category_id, amount, description, date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user_id,
            kind.as_str(),
            category_id,
            amount.to_string(),
            description,
            date.to_string()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let kind = Kind::parse(sub.get_one::<String>("kind").unwrap())?;
    let amount = parse_amount(sub.get_one::<String>("amount").unwrap())?;
    let date = match sub.get_one::<String>("date") {
        Some(s) => parse_date(s)?,
        None => chrono::Local::now().date_naive(),
    };
    let description = sub.get_one::<String>("description").map(|s| s.as_str());
    let cat = category_for_entry(conn, sub.get_one::<String>("category").unwrap(), kind)?;

    insert_transaction(conn, user_id, kind, cat.id, amount, description, date)?;
    println!(
        "Recorded {} {} in '{}' on {}",
        kind.as_str(),
        amount,
        cat.name,
        date
    );
    Ok(())
}

#[derive(Debug, Default)]
pub struct TxFilter {
    pub kind: Option<Kind>,
    pub category: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub search: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub date: String,
    pub kind: String,
    pub category: String,
    pub amount: String,
    pub description: String,
}

/// User-scoped listing, newest first (date, then creation time, then id).
pub fn query_rows(conn: &Connection, user_id: i64, filter: &TxFilter) -> Result<Vec<TransactionRow>> {
    let mut sql = String::from(
        "SELECT t.id, t.date, t.kind, c.name, t.amount, t.description
         FROM transactions t JOIN categories c ON t.category_id=c.id
         WHERE t.user_id=?",
    );
    let mut params_vec: Vec<String> = vec![user_id.to_string()];

    if let Some(kind) = filter.kind {
        sql.push_str(" AND t.kind=?");
        params_vec.push(kind.as_str().into());
    }
    if let Some(cat) = &filter.category {
        sql.push_str(" AND c.name=?");
        params_vec.push(cat.clone());
    }
    if let Some(from) = filter.date_from {
        sql.push_str(" AND t.date>=?");
        params_vec.push(from.to_string());
    }
    if let Some(to) = filter.date_to {
        sql.push_str(" AND t.date<=?");
        params_vec.push(to.to_string());
    }
    if let Some(term) = &filter.search {
        sql.push_str(" AND (LOWER(IFNULL(t.description,'')) LIKE ? OR LOWER(c.name) LIKE ?)");
        let pat = format!("%{}%", term.to_lowercase());
        params_vec.push(pat.clone());
        params_vec.push(pat);
    }
    sql.push_str(" ORDER BY t.date DESC, t.created_at DESC, t.id DESC");
    if let Some(limit) = filter.limit {
        sql.push_str(" LIMIT ?");
        params_vec.push(limit.to_string());
    }

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::ToSql> = params_vec
        .iter()
        .map(|s| s as &dyn rusqlite::ToSql)
        .collect();
    let mut rows = stmt.query(rusqlite::params_from_iter(params))?;

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        let date: String = r.get(1)?;
        let kind: String = r.get(2)?;
        let category: String = r.get(3)?;
        let amount: String = r.get(4)?;
        let description: Option<String> = r.get(5)?;
        data.push(TransactionRow {
            id,
            date,
            kind,
            category,
            amount,
            description: description.unwrap_or_default(),
        });
    }
    Ok(data)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let filter = TxFilter {
        kind: sub
            .get_one::<String>("kind")
            .map(|s| Kind::parse(s))
            .transpose()?,
        category: sub.get_one::<String>("category").cloned(),
        date_from: sub
            .get_one::<String>("from")
            .map(|s| parse_date(s))
            .transpose()?,
        date_to: sub
            .get_one::<String>("to")
            .map(|s| parse_date(s))
            .transpose()?,
        search: sub.get_one::<String>("search").cloned(),
        limit: sub.get_one::<usize>("limit").copied(),
    };
    let data = query_rows(conn, user_id, &filter)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date.clone(),
                    r.kind.clone(),
                    r.category.clone(),
                    r.amount.clone(),
                    r.description.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Date", "Kind", "Category", "Amount", "Description"],
                rows,
            )
        );
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct TxUpdate {
    pub kind: Option<Kind>,
    pub category: Option<String>,
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
}

/// Edit a transaction the user owns. A row owned by someone else reports the
/// same "not found" as a missing row. The effective kind/category pairing is
/// re-validated against the fields left unchanged.
pub fn update_transaction(
    conn: &Connection,
    user_id: i64,
    id: i64,
    up: &TxUpdate,
) -> Result<()> {
    let found: Option<(String, i64)> = conn
        .query_row(
            "SELECT kind, category_id FROM transactions WHERE id=?1 AND user_id=?2",
            params![id, user_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    let Some((old_kind_s, old_cat_id)) = found else {
        return Err(TrackerError::NotFound("Transaction").into());
    };

    let kind = match up.kind {
        Some(k) => k,
        None => Kind::parse(&old_kind_s)?,
    };
    let category_id = match &up.category {
        Some(name) => category_for_entry(conn, name, kind)?.id,
        None => {
            // Kind may have changed out from under the kept category.
            let cat_name: String = conn.query_row(
                "SELECT name FROM categories WHERE id=?1",
                params![old_cat_id],
                |r| r.get(0),
            )?;
            let cat = category_by_name(conn, &cat_name)?;
            if cat.kind != kind {
                return Err(TrackerError::KindMismatch {
                    category: cat.name,
                    category_kind: cat.kind.as_str().to_string(),
                    entry_kind: kind.as_str().to_string(),
                }
                .into());
            }
            old_cat_id
        }
    };

    conn.execute(
        "UPDATE transactions SET
            kind=?1,
            category_id=?2,
            amount=COALESCE(?3, amount),
            date=COALESCE(?4, date),
            description=COALESCE(?5, description),
            updated_at=datetime('now')
         WHERE id=?6 AND user_id=?7",
        params![
            kind.as_str(),
            category_id,
            up.amount.map(|a| a.to_string()),
            up.date.map(|d| d.to_string()),
            up.description,
            id,
            user_id
        ],
    )?;
    Ok(())
}

pub fn delete_transaction(conn: &Connection, user_id: i64, id: i64) -> Result<()> {
    let n = conn.execute(
        "DELETE FROM transactions WHERE id=?1 AND user_id=?2",
        params![id, user_id],
    )?;
    if n == 0 {
        return Err(TrackerError::NotFound("Transaction").into());
    }
    Ok(())
}

fn edit(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let id = *sub.get_one::<i64>("id").unwrap();
    let up = TxUpdate {
        kind: sub
            .get_one::<String>("kind")
            .map(|s| Kind::parse(s))
            .transpose()?,
        category: sub.get_one::<String>("category").cloned(),
        amount: sub
            .get_one::<String>("amount")
            .map(|s| parse_amount(s))
            .transpose()?,
        date: sub
            .get_one::<String>("date")
            .map(|s| parse_date(s))
            .transpose()?,
        description: sub.get_one::<String>("description").cloned(),
    };
    update_transaction(conn, user_id, id, &up)?;
    println!("Updated transaction {}", id);
    Ok(())
}

fn rm(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let id = *sub.get_one::<i64>("id").unwrap();
    if !sub.get_flag("yes") {
        return Err(
            TrackerError::ConfirmationRequired(format!("transaction {}", id)).into(),
        );
    }
    delete_transaction(conn, user_id, id)?;
    println!("Removed transaction {}", id);
    Ok(())
}
