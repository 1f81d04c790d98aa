// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::TrackerError;
use crate::models::Kind;
use crate::utils::{category_by_name, pretty_table};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, params};

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
    let name = sub.get_one::<String>("name").unwrap();
    let kind = Kind::parse(sub.get_one::<String>("kind").unwrap())?;
    let icon = sub.get_one::<String>("icon");
    let color = sub
        .get_one::<String>("color")
        .map(|s| s.as_str())
        .unwrap_or("#3B82F6");
    conn.execute(
        "INSERT INTO categories(name, kind, icon, color) VALUES (?1, ?2, ?3, ?4)",
        params![name, kind.as_str(), icon, color],
    )?;
    println!("Added {} category '{}'", kind.as_str(), name);
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let all = sub.get_flag("all");
    let sql = if all {
        "SELECT name, kind, icon, color, active FROM categories ORDER BY name"
    } else {
        "SELECT name, kind, icon, color, active FROM categories WHERE active=1 ORDER BY name"
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, Option<String>>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, bool>(4)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (n, k, i, c, a) = row?;
        data.push(vec![
            n,
            k,
            i.unwrap_or_default(),
            c,
            if a { "yes" } else { "no" }.to_string(),
        ]);
    }
    println!(
        "{}",
        pretty_table(&["Name", "Kind", "Icon", "Color", "Active"], data)
    );
    Ok(())
}

// The kind is fixed at creation; only display metadata and the active flag
// can change.
fn edit(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap();
    let cat = category_by_name(conn, name)?;
    if let Some(icon) = sub.get_one::<String>("icon") {
        conn.execute(
            "UPDATE categories SET icon=?1 WHERE id=?2",
            params![icon, cat.id],
        )?;
    }
    if let Some(color) = sub.get_one::<String>("color") {
        conn.execute(
            "UPDATE categories SET color=?1 WHERE id=?2",
            params![color, cat.id],
        )?;
    }
    if let Some(active) = sub.get_one::<String>("active") {
        let flag = match active.as_str() {
            "true" => 1,
            "false" => 0,
            other => return Err(anyhow!("Invalid --active '{}', expected true|false", other)),
        };
        conn.execute(
            "UPDATE categories SET active=?1 WHERE id=?2",
            params![flag, cat.id],
        )?;
    }
    println!("Updated category '{}'", name);
    Ok(())
}

fn rm(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap();
    let cat = category_by_name(conn, name)?;
    if !sub.get_flag("yes") {
        let used: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE category_id=?1",
            params![cat.id],
            |r| r.get(0),
        )?;
        return Err(TrackerError::ConfirmationRequired(format!(
            "category '{}' referenced by {} transactions",
            name, used
        ))
        .into());
    }
    conn.execute("DELETE FROM categories WHERE id=?1", params![cat.id])?;
    println!("Removed category '{}'", name);
    Ok(())
}
