// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, anyhow};
use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::{add_months, first_of_month};

/// Income/expense classification shared by transactions, recurring
/// templates, and categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Income,
    Expense,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Income => "income",
            Kind::Expense => "expense",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "income" => Ok(Kind::Income),
            "expense" => Ok(Kind::Expense),
            other => Err(anyhow!("Invalid kind '{}', expected income|expense", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Monthly,
    Quarterly,
    Yearly,
}

impl BudgetPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetPeriod::Monthly => "monthly",
            BudgetPeriod::Quarterly => "quarterly",
            BudgetPeriod::Yearly => "yearly",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "monthly" => Ok(BudgetPeriod::Monthly),
            "quarterly" => Ok(BudgetPeriod::Quarterly),
            "yearly" => Ok(BudgetPeriod::Yearly),
            other => Err(anyhow!(
                "Invalid period '{}', expected monthly|quarterly|yearly",
                other
            )),
        }
    }

    /// Half-open date window `[start, end)` of the calendar period that
    /// contains `start_date`. A mid-period start date still resolves to the
    /// full calendar period, so historical reports stay stable.
    pub fn window(&self, start_date: NaiveDate) -> (NaiveDate, NaiveDate) {
        let year = start_date.year();
        match self {
            BudgetPeriod::Monthly => {
                let ws = first_of_month(year, start_date.month());
                (ws, add_months(ws, 1))
            }
            BudgetPeriod::Yearly => {
                let ws = first_of_month(year, 1);
                (ws, first_of_month(year + 1, 1))
            }
            BudgetPeriod::Quarterly => {
                let quarter = (start_date.month() - 1) / 3;
                let ws = first_of_month(year, quarter * 3 + 1);
                (ws, add_months(ws, 3))
            }
        }
    }
}

/// Recurrence cadence of a transaction template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Yearly => "yearly",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "quarterly" => Ok(Frequency::Quarterly),
            "yearly" => Ok(Frequency::Yearly),
            other => Err(anyhow!(
                "Invalid frequency '{}', expected daily|weekly|monthly|quarterly|yearly",
                other
            )),
        }
    }

    /// Next occurrence after `date`. Month-based steps clamp to the last
    /// valid day of the target month (Jan 31 -> Feb 28).
    pub fn advance(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Frequency::Daily => date + Duration::days(1),
            Frequency::Weekly => date + Duration::days(7),
            Frequency::Monthly => add_months(date, 1),
            Frequency::Quarterly => add_months(date, 3),
            Frequency::Yearly => add_months(date, 12),
        }
    }
}

/// Budget usage percentage, uncapped. A zero budget amount reads as 0%
/// regardless of spend.
pub fn usage_percentage(amount: Decimal, spent: Decimal) -> Decimal {
    if amount.is_zero() {
        return Decimal::ZERO;
    }
    spent / amount * Decimal::ONE_HUNDRED
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub currency: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub kind: Kind,
    pub icon: Option<String>,
    pub color: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub kind: Kind,
    pub category_id: i64,
    pub amount: Decimal,
    pub description: Option<String>,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurringTransaction {
    pub id: i64,
    pub user_id: i64,
    pub kind: Kind,
    pub category_id: i64,
    pub amount: Decimal,
    pub description: Option<String>,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub next_occurrence: NaiveDate,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub amount: Decimal,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub active: bool,
}

/// One budget with its usage accounting for the period containing
/// `start_date`.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetStatus {
    pub id: i64,
    pub category: String,
    pub amount: Decimal,
    pub period: BudgetPeriod,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub spent: Decimal,
    pub remaining: Decimal,
    pub usage_pct: Decimal,
}
