// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::Kind;
use crate::utils::{id_for_user, parse_date, user_currency};
use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, NaiveDateTime};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Color, Format, Workbook};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("report", sub)) => export_report(conn, sub),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Excel,
    Csv,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pdf" => Ok(Self::Pdf),
            "excel" => Ok(Self::Excel),
            "csv" => Ok(Self::Csv),
            other => Err(anyhow!("Unknown format: {} (use pdf|excel|csv)", other)),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Excel => "xlsx",
            Self::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            Self::Csv => "text/csv",
        }
    }
}

/// A rendered attachment. Nothing about an export is persisted.
pub struct ExportFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ExportRow {
    pub date: NaiveDate,
    pub kind: Kind,
    pub category: String,
    pub description: String,
    pub amount: Decimal,
}

/// Header totals shared by every output format.
#[derive(Debug, Clone)]
pub struct ReportSummary {
    pub income: Decimal,
    pub expenses: Decimal,
    pub net_balance: Decimal,
    pub count: usize,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

impl ReportSummary {
    pub fn compute(rows: &[ExportRow], today: NaiveDate) -> Self {
        let mut income = Decimal::ZERO;
        let mut expenses = Decimal::ZERO;
        for r in rows {
            match r.kind {
                Kind::Income => income += r.amount,
                Kind::Expense => expenses += r.amount,
            }
        }
        let date_from = rows.iter().map(|r| r.date).min().unwrap_or(today);
        let date_to = rows.iter().map(|r| r.date).max().unwrap_or(today);
        ReportSummary {
            income,
            expenses,
            net_balance: income - expenses,
            count: rows.len(),
            date_from,
            date_to,
        }
    }
}

/// The user's transactions in ascending date order, optionally bounded by
/// inclusive from/to dates.
pub fn fetch_rows(
    conn: &Connection,
    user_id: i64,
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
) -> Result<Vec<ExportRow>> {
    let mut sql = String::from(
        "SELECT t.date, t.kind, c.name, t.description, t.amount
         FROM transactions t JOIN categories c ON t.category_id=c.id
         WHERE t.user_id=?",
    );
    let mut params_vec: Vec<String> = vec![user_id.to_string()];
    if let Some(from) = date_from {
        sql.push_str(" AND t.date>=?");
        params_vec.push(from.to_string());
    }
    if let Some(to) = date_to {
        sql.push_str(" AND t.date<=?");
        params_vec.push(to.to_string());
    }
    sql.push_str(" ORDER BY t.date, t.id");

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::ToSql> = params_vec
        .iter()
        .map(|s| s as &dyn rusqlite::ToSql)
        .collect();
    let mut rows = stmt.query(rusqlite::params_from_iter(params))?;

    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let date_s: String = r.get(0)?;
        let kind_s: String = r.get(1)?;
        let category: String = r.get(2)?;
        let description: Option<String> = r.get(3)?;
        let amt_s: String = r.get(4)?;
        out.push(ExportRow {
            date: NaiveDate::parse_from_str(&date_s, "%Y-%m-%d")?,
            kind: Kind::parse(&kind_s)?,
            category,
            description: description.unwrap_or_default(),
            amount: amt_s
                .parse::<Decimal>()
                .with_context(|| format!("Invalid amount '{}' in transactions", amt_s))?,
        });
    }
    Ok(out)
}

/// Running balance alongside each row, walked in the given (ascending date)
/// order: income adds, expense subtracts.
pub fn running_balances(rows: &[ExportRow]) -> Vec<Decimal> {
    let mut balance = Decimal::ZERO;
    rows.iter()
        .map(|r| {
            match r.kind {
                Kind::Income => balance += r.amount,
                Kind::Expense => balance -= r.amount,
            }
            balance
        })
        .collect()
}

pub fn render(
    format: ExportFormat,
    rows: &[ExportRow],
    label: &str,
    user: &str,
    currency: &str,
    generated: NaiveDateTime,
) -> Result<ExportFile> {
    let summary = ReportSummary::compute(rows, generated.date());
    let bytes = match format {
        ExportFormat::Pdf => render_pdf(rows, &summary, label, user, currency, generated)?,
        ExportFormat::Excel => render_excel(rows, &summary, label, user, generated)?,
        ExportFormat::Csv => render_csv(rows, &summary)?,
    };
    Ok(ExportFile {
        filename: format!(
            "extrackr_report_{}_{}.{}",
            label,
            generated.format("%Y%m%d_%H%M%S"),
            format.extension()
        ),
        content_type: format.content_type().to_string(),
        bytes,
    })
}

fn render_csv(rows: &[ExportRow], summary: &ReportSummary) -> Result<Vec<u8>> {
    let balances = running_balances(rows);
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(["date", "type", "category", "description", "amount", "balance"])?;
    for (r, bal) in rows.iter().zip(&balances) {
        wtr.write_record([
            r.date.to_string(),
            r.kind.as_str().to_string(),
            r.category.clone(),
            r.description.clone(),
            format!("{:.2}", r.amount),
            format!("{:.2}", bal),
        ])?;
    }
    // Totals carry the unmodified income/expense sums, not the balance.
    wtr.write_record([
        String::new(),
        String::new(),
        String::new(),
        "TOTALS".to_string(),
        format!("{:.2}", summary.income),
        format!("{:.2}", summary.expenses),
    ])?;
    Ok(wtr.into_inner()?)
}

fn render_excel(
    rows: &[ExportRow],
    summary: &ReportSummary,
    label: &str,
    user: &str,
    generated: NaiveDateTime,
) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Financial Report")?;

    let title = Format::new().set_bold().set_font_size(16);
    let section = Format::new().set_bold().set_font_size(14);
    let header = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(0x366092));
    let money = Format::new().set_num_format("$#,##0.00");
    let money_income = Format::new()
        .set_num_format("$#,##0.00")
        .set_background_color(Color::RGB(0xD5E8D4));
    let money_expense = Format::new()
        .set_num_format("$#,##0.00")
        .set_background_color(Color::RGB(0xF8CECC));
    let bold = Format::new().set_bold();
    let bold_money = Format::new().set_bold().set_num_format("$#,##0.00");

    sheet.merge_range(0, 0, 0, 5, "extrackr Financial Report", &title)?;
    sheet.write_string(1, 0, format!("User: {}", user))?;
    sheet.write_string(2, 0, format!("Report Type: {}", label))?;
    sheet.write_string(
        3,
        0,
        format!("Generated: {}", generated.format("%Y-%m-%d %H:%M:%S")),
    )?;

    sheet.write_string_with_format(5, 0, "Summary", &section)?;
    sheet.write_string(6, 0, "Total Income:")?;
    sheet.write_number_with_format(6, 1, summary.income.to_f64().unwrap_or_default(), &money)?;
    sheet.write_string(7, 0, "Total Expenses:")?;
    sheet.write_number_with_format(7, 1, summary.expenses.to_f64().unwrap_or_default(), &money)?;
    sheet.write_string(8, 0, "Net Balance:")?;
    sheet.write_number_with_format(
        8,
        1,
        summary.net_balance.to_f64().unwrap_or_default(),
        &money,
    )?;

    let header_row: u32 = 10;
    for (col, name) in ["Date", "Type", "Category", "Description", "Amount", "Balance"]
        .iter()
        .enumerate()
    {
        sheet.write_string_with_format(header_row, col as u16, *name, &header)?;
    }

    let balances = running_balances(rows);
    let mut row_idx = header_row + 1;
    for (r, bal) in rows.iter().zip(&balances) {
        sheet.write_string(row_idx, 0, r.date.to_string())?;
        sheet.write_string(row_idx, 1, r.kind.as_str())?;
        sheet.write_string(row_idx, 2, r.category.as_str())?;
        sheet.write_string(row_idx, 3, r.description.as_str())?;
        let amount_fmt = match r.kind {
            Kind::Income => &money_income,
            Kind::Expense => &money_expense,
        };
        sheet.write_number_with_format(
            row_idx,
            4,
            r.amount.to_f64().unwrap_or_default(),
            amount_fmt,
        )?;
        sheet.write_number_with_format(row_idx, 5, bal.to_f64().unwrap_or_default(), &money)?;
        row_idx += 1;
    }

    sheet.write_string_with_format(row_idx, 3, "TOTALS", &bold)?;
    sheet.write_number_with_format(
        row_idx,
        4,
        summary.income.to_f64().unwrap_or_default(),
        &bold_money,
    )?;
    sheet.write_number_with_format(
        row_idx,
        5,
        summary.expenses.to_f64().unwrap_or_default(),
        &bold_money,
    )?;

    sheet.set_column_width(0, 12)?;
    sheet.set_column_width(2, 18)?;
    sheet.set_column_width(3, 32)?;
    sheet.set_column_width(4, 14)?;
    sheet.set_column_width(5, 14)?;

    let bytes = workbook.save_to_buffer()?;
    Ok(bytes)
}

fn render_pdf(
    rows: &[ExportRow],
    summary: &ReportSummary,
    label: &str,
    user: &str,
    currency: &str,
    generated: NaiveDateTime,
) -> Result<Vec<u8>> {
    const PAGE_W: f32 = 210.0;
    const PAGE_H: f32 = 297.0;
    const MARGIN: f32 = 15.0;
    const LINE: f32 = 6.0;

    let (doc, first_page, first_layer) =
        PdfDocument::new("extrackr Financial Report", Mm(PAGE_W), Mm(PAGE_H), "report");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow!("PDF font: {}", e))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| anyhow!("PDF font: {}", e))?;

    let mut layer = doc.get_page(first_page).get_layer(first_layer);
    let mut y = PAGE_H - MARGIN;

    let mut line = |layer: &mut printpdf::PdfLayerReference,
                    y: &mut f32,
                    text: String,
                    size: f32,
                    font: &IndirectFontRef| {
        layer.use_text(text, size, Mm(MARGIN), Mm(*y), font);
        *y -= LINE;
    };

    line(&mut layer, &mut y, "extrackr Financial Report".into(), 16.0, &bold);
    line(&mut layer, &mut y, format!("User: {}", user), 10.0, &font);
    line(&mut layer, &mut y, format!("Report Type: {}", label), 10.0, &font);
    line(
        &mut layer,
        &mut y,
        format!("Generated: {}", generated.format("%Y-%m-%d %H:%M:%S")),
        10.0,
        &font,
    );
    line(
        &mut layer,
        &mut y,
        format!("Period: {} to {}", summary.date_from, summary.date_to),
        10.0,
        &font,
    );
    y -= LINE;

    line(&mut layer, &mut y, "Summary".into(), 14.0, &bold);
    line(
        &mut layer,
        &mut y,
        format!("Total Income: {} {:.2}", currency, summary.income),
        10.0,
        &font,
    );
    line(
        &mut layer,
        &mut y,
        format!("Total Expenses: {} {:.2}", currency, summary.expenses),
        10.0,
        &font,
    );
    line(
        &mut layer,
        &mut y,
        format!("Net Balance: {} {:.2}", currency, summary.net_balance),
        10.0,
        &font,
    );
    line(
        &mut layer,
        &mut y,
        format!("Transactions: {}", summary.count),
        10.0,
        &font,
    );
    y -= LINE;

    line(&mut layer, &mut y, "Transactions".into(), 14.0, &bold);
    for r in rows {
        if y < MARGIN + LINE {
            let (page, page_layer) = doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "report");
            layer = doc.get_page(page).get_layer(page_layer);
            y = PAGE_H - MARGIN;
        }
        let sign = match r.kind {
            Kind::Income => "+",
            Kind::Expense => "-",
        };
        line(
            &mut layer,
            &mut y,
            format!(
                "{}  {:<8} {:<20} {}{:.2}  {}",
                r.date,
                r.kind.as_str(),
                r.category,
                sign,
                r.amount,
                r.description
            ),
            9.0,
            &font,
        );
    }

    doc.save_to_bytes().map_err(|e| anyhow!("PDF save: {}", e))
}

fn export_report(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let user = sub.get_one::<String>("user").unwrap();
    let user_id = id_for_user(conn, user)?;
    let format = match sub.get_one::<String>("format") {
        Some(s) => ExportFormat::parse(&s.to_lowercase())?,
        None => ExportFormat::Pdf,
    };
    let label = sub
        .get_one::<String>("label")
        .map(|s| s.as_str())
        .unwrap_or("summary");
    let date_from = sub
        .get_one::<String>("from")
        .map(|s| parse_date(s))
        .transpose()?;
    let date_to = sub
        .get_one::<String>("to")
        .map(|s| parse_date(s))
        .transpose()?;

    let rows = fetch_rows(conn, user_id, date_from, date_to)?;
    let currency = user_currency(conn, user_id)?;
    let generated = chrono::Local::now().naive_local();
    let file = render(format, &rows, label, user, &currency, generated)?;

    let out = sub
        .get_one::<String>("out")
        .cloned()
        .unwrap_or_else(|| file.filename.clone());
    std::fs::write(&out, &file.bytes)
        .with_context(|| format!("Write export to {}", out))?;
    println!(
        "Exported {} rows ({}) to {}",
        rows.len(),
        file.content_type,
        out
    );
    Ok(())
}
