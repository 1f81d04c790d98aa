// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::transactions::category_for_entry;
use crate::errors::TrackerError;
use crate::models::{BudgetPeriod, BudgetStatus, Kind, usage_percentage};
use crate::utils::{id_for_user, maybe_print_json, parse_amount, parse_date, pretty_table};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

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

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let amount = parse_amount(sub.get_one::<String>("amount").unwrap())?;
    let period = BudgetPeriod::parse(sub.get_one::<String>("period").unwrap())?;
    let start = match sub.get_one::<String>("start") {
        Some(s) => parse_date(s)?,
        None => chrono::Local::now().date_naive(),
    };
    let end = sub
        .get_one::<String>("end")
        .map(|s| parse_date(s))
        .transpose()?;
    // Budgets cap spending, so only expense categories qualify.
    let cat = category_for_entry(conn, sub.get_one::<String>("category").unwrap(), Kind::Expense)?;

    conn.execute(
        "INSERT INTO budgets(user_id, category_id, amount, period, start_date, end_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user_id,
            cat.id,
            amount.to_string(),
            period.as_str(),
            start.to_string(),
            end.map(|d| d.to_string())
        ],
    )?;
    println!(
        "Budget set: '{}' {} per {} from {}",
        cat.name,
        amount,
        period.as_str(),
        start
    );
    Ok(())
}

/// Sum of the user's expense transactions in the category over
/// `[window_start, window_end)`. An empty window reads as zero.
pub fn spent_in_window(
    conn: &Connection,
    user_id: i64,
    category_id: i64,
    window_start: NaiveDate,
    window_end: NaiveDate,
) -> Result<Decimal> {
    let mut stmt = conn.prepare(
        "SELECT amount FROM transactions
         WHERE user_id=?1 AND category_id=?2 AND kind='expense' AND date>=?3 AND date<?4",
    )?;
    let mut rows = stmt.query(params![
        user_id,
        category_id,
        window_start.to_string(),
        window_end.to_string()
    ])?;
    let mut total = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        let amt_s: String = r.get(0)?;
        let amt = amt_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid amount '{}' in transactions", amt_s))?;
        total += amt;
    }
    Ok(total)
}

/// Usage accounting for every active budget the user owns.
pub fn budget_statuses(conn: &Connection, user_id: i64) -> Result<Vec<BudgetStatus>> {
    let mut stmt = conn.prepare(
        "SELECT b.id, c.name, b.category_id, b.amount, b.period, b.start_date
         FROM budgets b JOIN categories c ON b.category_id=c.id
         WHERE b.user_id=?1 AND b.active=1
         ORDER BY b.start_date DESC, c.name",
    )?;
    let rows = stmt.query_map(params![user_id], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, i64>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, String>(5)?,
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (id, category, category_id, amount_s, period_s, start_s) = row?;
        let amount = amount_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid amount '{}' in budgets", amount_s))?;
        let period = BudgetPeriod::parse(&period_s)?;
        let start = NaiveDate::parse_from_str(&start_s, "%Y-%m-%d")?;
        let (window_start, window_end) = period.window(start);
        let spent = spent_in_window(conn, user_id, category_id, window_start, window_end)?;
        let remaining = amount - spent;
        out.push(BudgetStatus {
            id,
            category,
            amount,
            period,
            window_start,
            window_end,
            spent,
            remaining,
            usage_pct: usage_percentage(amount, spent),
        });
    }
    Ok(out)
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let statuses = budget_statuses(conn, user_id)?;
    if !maybe_print_json(json_flag, jsonl_flag, &statuses)? {
        let rows: Vec<Vec<String>> = statuses
            .iter()
            .map(|s| {
                vec![
                    s.id.to_string(),
                    s.category.clone(),
                    s.period.as_str().to_string(),
                    format!("{} .. {}", s.window_start, s.window_end),
                    format!("{:.2}", s.amount),
                    format!("{:.2}", s.spent),
                    format!("{:.2}", s.remaining),
                    format!("{:.1}%", s.usage_pct.round_dp(1)),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Id", "Category", "Period", "Window", "Budget", "Spent", "Remaining", "Usage"],
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
    let period = sub
        .get_one::<String>("period")
        .map(|s| BudgetPeriod::parse(s))
        .transpose()?;
    let start = sub
        .get_one::<String>("start")
        .map(|s| parse_date(s))
        .transpose()?;
    let end = sub
        .get_one::<String>("end")
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
        "UPDATE budgets SET
            amount=COALESCE(?1, amount),
            period=COALESCE(?2, period),
            start_date=COALESCE(?3, start_date),
            end_date=COALESCE(?4, end_date),
            active=COALESCE(?5, active),
            updated_at=datetime('now')
         WHERE id=?6 AND user_id=?7",
        params![
            amount.map(|a| a.to_string()),
            period.map(|p| p.as_str()),
            start.map(|d| d.to_string()),
            end.map(|d| d.to_string()),
            active,
            id,
            user_id
        ],
    )?;
    if n == 0 {
        return Err(TrackerError::NotFound("Budget").into());
    }
    println!("Updated budget {}", id);
    Ok(())
}

fn rm(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let id = *sub.get_one::<i64>("id").unwrap();
    if !sub.get_flag("yes") {
        return Err(TrackerError::ConfirmationRequired(format!("budget {}", id)).into());
    }
    let n = conn.execute(
        "DELETE FROM budgets WHERE id=?1 AND user_id=?2",
        params![id, user_id],
    )?;
    if n == 0 {
        return Err(TrackerError::NotFound("Budget").into());
    }
    println!("Removed budget {}", id);
    Ok(())
}
