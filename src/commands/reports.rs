// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Kind;
use crate::utils::{first_of_month, id_for_user, maybe_print_json, pretty_table};
use anyhow::{Context, Result, anyhow};
use chrono::{Datelike, Duration, NaiveDate};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Chart endpoints all answer with `{ "data": [...] }`.
#[derive(Serialize)]
pub struct ChartPayload<'a, T: Serialize> {
    pub data: &'a [T],
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let today = chrono::Local::now().date_naive();
    match m.subcommand() {
        Some(("stats", sub)) => stats_cmd(conn, sub, today)?,
        Some(("monthly-trend", sub)) => monthly_trend_cmd(conn, sub, today)?,
        Some(("category-breakdown", sub)) => category_breakdown_cmd(conn, sub, today)?,
        Some(("weekly-trend", sub)) => weekly_trend_cmd(conn, sub, today)?,
        _ => {}
    }
    Ok(())
}

fn sum_kind(
    conn: &Connection,
    user_id: i64,
    kind: Kind,
    from: Option<NaiveDate>,
    to_excl: Option<NaiveDate>,
) -> Result<Decimal> {
    let mut sql = String::from(
        "SELECT amount FROM transactions WHERE user_id=? AND kind=?",
    );
    let mut params_vec: Vec<String> = vec![user_id.to_string(), kind.as_str().to_string()];
    if let Some(from) = from {
        sql.push_str(" AND date>=?");
        params_vec.push(from.to_string());
    }
    if let Some(to) = to_excl {
        sql.push_str(" AND date<?");
        params_vec.push(to.to_string());
    }
    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::ToSql> = params_vec
        .iter()
        .map(|s| s as &dyn rusqlite::ToSql)
        .collect();
    let mut rows = stmt.query(rusqlite::params_from_iter(params))?;
    let mut total = Decimal::ZERO;
    while let Some(r) = rows.next()? {
        let s: String = r.get(0)?;
        total += s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid amount '{}' in transactions", s))?;
    }
    Ok(total)
}

#[derive(Serialize)]
pub struct Stats {
    pub income: Decimal,
    pub expenses: Decimal,
    pub net_balance: Decimal,
    pub income_change: Decimal,
    pub expense_change: Decimal,
}

fn change_pct(current: Decimal, previous: Decimal) -> Decimal {
    if previous <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (current - previous) / previous * Decimal::ONE_HUNDRED
}

/// Current calendar month totals with percentage change against the
/// previous month.
pub fn stats(conn: &Connection, user_id: i64, today: NaiveDate) -> Result<Stats> {
    let month_start = first_of_month(today.year(), today.month());
    let prev_start = if today.month() == 1 {
        first_of_month(today.year() - 1, 12)
    } else {
        first_of_month(today.year(), today.month() - 1)
    };

    let income = sum_kind(conn, user_id, Kind::Income, Some(month_start), None)?;
    let expenses = sum_kind(conn, user_id, Kind::Expense, Some(month_start), None)?;
    let prev_income = sum_kind(
        conn,
        user_id,
        Kind::Income,
        Some(prev_start),
        Some(month_start),
    )?;
    let prev_expenses = sum_kind(
        conn,
        user_id,
        Kind::Expense,
        Some(prev_start),
        Some(month_start),
    )?;

    Ok(Stats {
        income,
        expenses,
        net_balance: income - expenses,
        income_change: change_pct(income, prev_income),
        expense_change: change_pct(expenses, prev_expenses),
    })
}

fn stats_cmd(conn: &Connection, sub: &clap::ArgMatches, today: NaiveDate) -> Result<()> {
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let s = stats(conn, user_id, today)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &s)? {
        let rows = vec![vec![
            format!("{:.2}", s.income),
            format!("{:.2}", s.expenses),
            format!("{:.2}", s.net_balance),
            format!("{:.1}%", s.income_change.round_dp(1)),
            format!("{:.1}%", s.expense_change.round_dp(1)),
        ]];
        println!(
            "{}",
            pretty_table(
                &["Income", "Expenses", "Net", "Income vs prev", "Expenses vs prev"],
                rows,
            )
        );
    }
    Ok(())
}

#[derive(Serialize)]
pub struct MonthBucket {
    pub month: String,
    pub income: Decimal,
    pub expenses: Decimal,
}

/// Income and expense sums for each of the last `months` calendar months
/// including the current one, oldest first. Months with no rows are emitted
/// zero-filled rather than skipped.
pub fn monthly_trend(
    conn: &Connection,
    user_id: i64,
    months: usize,
    today: NaiveDate,
) -> Result<Vec<MonthBucket>> {
    let mut keys: Vec<(i32, u32)> = Vec::with_capacity(months);
    let (mut y, mut m) = (today.year(), today.month());
    for _ in 0..months {
        keys.push((y, m));
        if m == 1 {
            y -= 1;
            m = 12;
        } else {
            m -= 1;
        }
    }
    keys.reverse();

    // One pass over the covered range, grouped per month in Rust.
    let mut totals: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
    if let Some(&(fy, fm)) = keys.first() {
        let from = first_of_month(fy, fm);
        let mut stmt = conn.prepare(
            "SELECT substr(date,1,7), kind, amount FROM transactions
             WHERE user_id=?1 AND date>=?2",
        )?;
        let mut rows = stmt.query(params![user_id, from.to_string()])?;
        while let Some(r) = rows.next()? {
            let month: String = r.get(0)?;
            let kind: String = r.get(1)?;
            let amt_s: String = r.get(2)?;
            let amt = amt_s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid amount '{}' in transactions", amt_s))?;
            let entry = totals
                .entry(month)
                .or_insert((Decimal::ZERO, Decimal::ZERO));
            if kind == "income" {
                entry.0 += amt;
            } else {
                entry.1 += amt;
            }
        }
    }

    let mut out = Vec::with_capacity(months);
    for (y, m) in keys {
        let key = format!("{:04}-{:02}", y, m);
        let (income, expenses) = totals.get(&key).copied().unwrap_or((Decimal::ZERO, Decimal::ZERO));
        out.push(MonthBucket {
            month: first_of_month(y, m).format("%b %Y").to_string(),
            income,
            expenses,
        });
    }
    Ok(out)
}

fn monthly_trend_cmd(conn: &Connection, sub: &clap::ArgMatches, today: NaiveDate) -> Result<()> {
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let months = sub.get_one::<usize>("months").copied().unwrap_or(12);
    let data = monthly_trend(conn, user_id, months, today)?;
    print_buckets(sub, &data, |b| {
        vec![
            b.month.clone(),
            format!("{:.2}", b.income),
            format!("{:.2}", b.expenses),
        ]
    }, &["Month", "Income", "Expenses"])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakdownWindow {
    CurrentMonth,
    LastMonth,
    Last3Months,
    AllTime,
}

impl BreakdownWindow {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "current-month" => Ok(Self::CurrentMonth),
            "last-month" => Ok(Self::LastMonth),
            "last-3-months" => Ok(Self::Last3Months),
            "all-time" => Ok(Self::AllTime),
            other => Err(anyhow!(
                "Invalid window '{}', expected current-month|last-month|last-3-months|all-time",
                other
            )),
        }
    }

    fn bounds(&self, today: NaiveDate) -> (Option<NaiveDate>, Option<NaiveDate>) {
        let month_start = first_of_month(today.year(), today.month());
        match self {
            Self::CurrentMonth => (Some(month_start), None),
            Self::LastMonth => {
                let prev_start = if today.month() == 1 {
                    first_of_month(today.year() - 1, 12)
                } else {
                    first_of_month(today.year(), today.month() - 1)
                };
                (Some(prev_start), Some(month_start))
            }
            // Trailing 90 days rather than a calendar boundary.
            Self::Last3Months => (Some(today - Duration::days(90)), None),
            Self::AllTime => (None, None),
        }
    }
}

#[derive(Serialize)]
pub struct CategoryBucket {
    pub category: String,
    pub amount: Decimal,
    pub count: i64,
}

/// Expense totals per category over the window, largest first. Categories
/// with no matching rows do not appear.
pub fn category_breakdown(
    conn: &Connection,
    user_id: i64,
    window: BreakdownWindow,
    today: NaiveDate,
) -> Result<Vec<CategoryBucket>> {
    let (from, to_excl) = window.bounds(today);
    let mut sql = String::from(
        "SELECT c.name, t.amount FROM transactions t
         JOIN categories c ON t.category_id=c.id
         WHERE t.user_id=? AND t.kind='expense'",
    );
    let mut params_vec: Vec<String> = vec![user_id.to_string()];
    if let Some(from) = from {
        sql.push_str(" AND t.date>=?");
        params_vec.push(from.to_string());
    }
    if let Some(to) = to_excl {
        sql.push_str(" AND t.date<?");
        params_vec.push(to.to_string());
    }

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::ToSql> = params_vec
        .iter()
        .map(|s| s as &dyn rusqlite::ToSql)
        .collect();
    let mut rows = stmt.query(rusqlite::params_from_iter(params))?;

    let mut agg: HashMap<String, (Decimal, i64)> = HashMap::new();
    while let Some(r) = rows.next()? {
        let cat: String = r.get(0)?;
        let amt_s: String = r.get(1)?;
        let amt = amt_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid amount '{}' in transactions", amt_s))?;
        let entry = agg.entry(cat).or_insert((Decimal::ZERO, 0));
        entry.0 += amt;
        entry.1 += 1;
    }

    let mut items: Vec<CategoryBucket> = agg
        .into_iter()
        .map(|(category, (amount, count))| CategoryBucket {
            category,
            amount,
            count,
        })
        .collect();
    items.sort_by(|a, b| b.amount.cmp(&a.amount));
    Ok(items)
}

fn category_breakdown_cmd(
    conn: &Connection,
    sub: &clap::ArgMatches,
    today: NaiveDate,
) -> Result<()> {
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let window = match sub.get_one::<String>("window") {
        Some(s) => BreakdownWindow::parse(s)?,
        None => BreakdownWindow::CurrentMonth,
    };
    let data = category_breakdown(conn, user_id, window, today)?;
    print_buckets(sub, &data, |b| {
        vec![
            b.category.clone(),
            format!("{:.2}", b.amount),
            b.count.to_string(),
        ]
    }, &["Category", "Spent", "Count"])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendWindow {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
}

impl TrendWindow {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "1month" => Ok(Self::OneMonth),
            "3months" => Ok(Self::ThreeMonths),
            "6months" => Ok(Self::SixMonths),
            "1year" => Ok(Self::OneYear),
            other => Err(anyhow!(
                "Invalid window '{}', expected 1month|3months|6months|1year",
                other
            )),
        }
    }

    fn days_back(&self) -> i64 {
        match self {
            Self::OneMonth => 30,
            Self::ThreeMonths => 90,
            Self::SixMonths => 180,
            Self::OneYear => 365,
        }
    }
}

#[derive(Serialize)]
pub struct WeekBucket {
    pub week: String,
    pub amount: Decimal,
    pub count: i64,
}

/// Sums of one kind grouped by (year, week-of-year), chronological. The
/// bucket label comes from the first transaction date seen in that week.
pub fn weekly_trend(
    conn: &Connection,
    user_id: i64,
    kind: Kind,
    window: TrendWindow,
    today: NaiveDate,
) -> Result<Vec<WeekBucket>> {
    let from = today - Duration::days(window.days_back());
    let mut stmt = conn.prepare(
        "SELECT date, amount FROM transactions
         WHERE user_id=?1 AND kind=?2 AND date>=?3
         ORDER BY date, id",
    )?;
    let mut rows = stmt.query(params![user_id, kind.as_str(), from.to_string()])?;

    // Keys like 2025-07 (zero-padded week) sort chronologically as strings.
    let mut buckets: BTreeMap<String, WeekBucket> = BTreeMap::new();
    while let Some(r) = rows.next()? {
        let date_s: String = r.get(0)?;
        let amt_s: String = r.get(1)?;
        let date = NaiveDate::parse_from_str(&date_s, "%Y-%m-%d")?;
        let amt = amt_s
            .parse::<Decimal>()
            .with_context(|| format!("Invalid amount '{}' in transactions", amt_s))?;
        let key = date.format("%Y-%W").to_string();
        let entry = buckets.entry(key).or_insert_with(|| WeekBucket {
            week: date.format("%b %d").to_string(),
            amount: Decimal::ZERO,
            count: 0,
        });
        entry.amount += amt;
        entry.count += 1;
    }
    Ok(buckets.into_values().collect())
}

fn weekly_trend_cmd(conn: &Connection, sub: &clap::ArgMatches, today: NaiveDate) -> Result<()> {
    let user_id = id_for_user(conn, sub.get_one::<String>("user").unwrap())?;
    let kind = match sub.get_one::<String>("kind") {
        Some(s) => Kind::parse(s)?,
        None => Kind::Expense,
    };
    let window = match sub.get_one::<String>("window") {
        Some(s) => TrendWindow::parse(s)?,
        None => TrendWindow::SixMonths,
    };
    let data = weekly_trend(conn, user_id, kind, window, today)?;
    print_buckets(sub, &data, |b| {
        vec![
            b.week.clone(),
            format!("{:.2}", b.amount),
            b.count.to_string(),
        ]
    }, &["Week", "Amount", "Count"])
}

fn print_buckets<T: Serialize>(
    sub: &clap::ArgMatches,
    data: &[T],
    to_row: impl Fn(&T) -> Vec<String>,
    headers: &[&str],
) -> Result<()> {
    if sub.get_flag("json") {
        println!(
            "{}",
            serde_json::to_string_pretty(&ChartPayload { data })?
        );
        return Ok(());
    }
    if sub.get_flag("jsonl") {
        maybe_print_json(false, true, &data)?;
        return Ok(());
    }
    let rows: Vec<Vec<String>> = data.iter().map(to_row).collect();
    println!("{}", pretty_table(headers, rows));
    Ok(())
}
