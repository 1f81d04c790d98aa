// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::transactions::category_for_entry;
use crate::errors::TrackerError;
use crate::models::{Frequency, Kind};
use crate::utils::{id_for_user, maybe_print_json, parse_amount, parse_date, pretty_table};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("edit", sub)) => edit(conn, sub)?,
        Some(("rm", sub)) => rm(conn, sub)?,
        Some(("advance", sub)) => advance(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let kind = Kind::parse(sub.get_one::<String>("kind").unwrap())?;
    let amount = parse_amount(sub.get_one::<String>("amount").unwrap())?;
    let frequency = Frequency::parse(sub.get_one::<String>("frequency").unwrap())?;
    let start = match sub.get_one::<String>("start") {
        Some(s) => parse_date(s)?,
        None => chrono::Local::now().date_naive(),
    };
    let end = sub
        .get_one::<String>("end")
        .map(|s| parse_date(s))
        .transpose()?;
    // No first occurrence given means the template starts at its start date.
    let next = match sub.get_one::<String>("next") {
        Some(s) => parse_date(s)?,
        None => start,
    };
    let description = sub.get_one::<String>("description");
    let cat = category_for_entry(conn, sub.get_one::<String>("category").unwrap(), kind)?;

    conn.execute(
        "INSERT INTO recurring_transactions(
            user_id, kind, category_id, amount, description, frequency,
            start_date, end_date, next_occurrence)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            user_id,
            kind.as_str(),
            cat.id,
            amount.to_string(),
            description,
            frequency.as_str(),
            start.to_string(),
            end.map(|d| d.to_string()),
            next.to_string()
        ],
    )?;
    println!(
        "Recurring {} {} in '{}' every {}, next on {}",
        kind.as_str(),
        amount,
        cat.name,
        frequency.as_str(),
        next
    );
    Ok(())
}

#[derive(Serialize)]
pub struct RecurringRow {
    pub id: i64,
    pub next_occurrence: String,
    pub kind: String,
    pub category: String,
    pub amount: String,
    pub frequency: String,
    pub start_date: String,
    pub end_date: String,
    pub active: bool,
}

pub fn query_rows(conn: &Connection, user_id: i64) -> Result<Vec<RecurringRow>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.next_occurrence, r.kind, c.name, r.amount, r.frequency,
                r.start_date, r.end_date, r.active
         FROM recurring_transactions r JOIN categories c ON r.category_id=c.id
         WHERE r.user_id=?1
         ORDER BY r.next_occurrence, r.id",
    )?;
    let rows = stmt.query_map(params![user_id], |r| {
        Ok(RecurringRow {
            id: r.get(0)?,
            next_occurrence: r.get(1)?,
            kind: r.get(2)?,
            category: r.get(3)?,
            amount: r.get(4)?,
            frequency: r.get(5)?,
            end_date: r.get::<_, Option<String>>(7)?.unwrap_or_default(),
            start_date: r.get(6)?,
            active: r.get(8)?,
        })
    })?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    Ok(data)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let data = query_rows(conn, user_id)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.next_occurrence.clone(),
                    r.kind.clone(),
                    r.category.clone(),
                    r.amount.clone(),
                    r.frequency.clone(),
                    r.end_date.clone(),
                    if r.active { "yes" } else { "no" }.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Next", "Kind", "Category", "Amount", "Frequency", "End", "Active"],
                rows,
            )
        );
    }
    Ok(())
}

fn edit(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let id = *sub.get_one::<i64>("id").unwrap();
    let amount = sub
        .get_one::<String>("amount")
        .map(|s| parse_amount(s))
        .transpose()?;
    let frequency = sub
        .get_one::<String>("frequency")
        .map(|s| Frequency::parse(s))
        .transpose()?;
    let end = sub
        .get_one::<String>("end")
        .map(|s| parse_date(s))
        .transpose()?;
    let next = sub
        .get_one::<String>("next")
        .map(|s| parse_date(s))
        .transpose()?;
    let active = sub
        .get_one::<String>("active")
        .map(|s| match s.as_str() {
            "true" => Ok(1i64),
            "false" => Ok(0i64),
            other => Err(anyhow::anyhow!(
                "Invalid --active '{}', expected true|false",
                other
            )),
        })
        .transpose()?;

    let n = conn.execute(
        "UPDATE recurring_transactions SET
            amount=COALESCE(?1, amount),
            description=COALESCE(?2, description),
            frequency=COALESCE(?3, frequency),
            end_date=COALESCE(?4, end_date),
            next_occurrence=COALESCE(?5, next_occurrence),
            active=COALESCE(?6, active),
            updated_at=datetime('now')
         WHERE id=?7 AND user_id=?8",
        params![
            amount.map(|a| a.to_string()),
            sub.get_one::<String>("description"),
            frequency.map(|f| f.as_str()),
            end.map(|d| d.to_string()),
            next.map(|d| d.to_string()),
            active,
            id,
            user_id
        ],
    )?;
    if n == 0 {
        return Err(TrackerError::NotFound("Recurring transaction").into());
    }
    println!("Updated recurring transaction {}", id);
    Ok(())
}

fn rm(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let id = *sub.get_one::<i64>("id").unwrap();
    if !sub.get_flag("yes") {
        return Err(
            TrackerError::ConfirmationRequired(format!("recurring transaction {}", id)).into(),
        );
    }
    let n = conn.execute(
        "DELETE FROM recurring_transactions WHERE id=?1 AND user_id=?2",
        params![id, user_id],
    )?;
    if n == 0 {
        return Err(TrackerError::NotFound("Recurring transaction").into());
    }
    println!("Removed recurring transaction {}", id);
    Ok(())
}

/// Outcome of one manual advance step. There is no scheduler here; the
/// caller owns the cadence.
#[derive(Debug, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Advanced(NaiveDate),
    Completed,
}

pub fn advance_template(conn: &Connection, user_id: i64, id: i64) -> Result<AdvanceOutcome> {
    let found: Option<(String, String, Option<String>)> = conn
        .query_row(
            "SELECT next_occurrence, frequency, end_date
             FROM recurring_transactions WHERE id=?1 AND user_id=?2 AND active=1",
            params![id, user_id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()?;
    let Some((next_s, freq_s, end_s)) = found else {
        return Err(TrackerError::NotFound("Recurring transaction").into());
    };
    let current = NaiveDate::parse_from_str(&next_s, "%Y-%m-%d")?;
    let frequency = Frequency::parse(&freq_s)?;
    let next = frequency.advance(current);

    if let Some(end_s) = end_s {
        let end = NaiveDate::parse_from_str(&end_s, "%Y-%m-%d")?;
        if next > end {
            conn.execute(
                "UPDATE recurring_transactions SET active=0, updated_at=datetime('now')
                 WHERE id=?1 AND user_id=?2",
                params![id, user_id],
            )?;
            return Ok(AdvanceOutcome::Completed);
        }
    }
    conn.execute(
        "UPDATE recurring_transactions SET next_occurrence=?1, updated_at=datetime('now')
         WHERE id=?2 AND user_id=?3",
        params![next.to_string(), id, user_id],
    )?;
    Ok(AdvanceOutcome::Advanced(next))
}

fn advance(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let id = *sub.get_one::<i64>("id").unwrap();
    match advance_template(conn, user_id, id)? {
        AdvanceOutcome::Advanced(next) => {
            println!("Recurring transaction {} advanced to {}", id, next)
        }
        AdvanceOutcome::Completed => {
            println!("Recurring transaction {} passed its end date; deactivated", id)
        }
    }
    Ok(())
}
