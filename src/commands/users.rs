// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::TrackerError;
use crate::utils::{id_for_user, pretty_table};
use anyhow::Result;
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("register", sub)) => register(conn, sub)?,
        Some(("show", sub)) => show(conn, sub)?,
        Some(("update", sub)) => update(conn, sub)?,
        Some(("list", _)) => list(conn)?,
        Some(("rm", sub)) => rm(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn register(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap();
    let phone = sub.get_one::<String>("phone");
    let ccy = sub
        .get_one::<String>("currency")
        .map(|s| s.to_uppercase())
        .unwrap_or_else(|| "USD".to_string());
    let avatar = sub.get_one::<String>("avatar");
    conn.execute(
        "INSERT INTO users(name, phone, currency, avatar) VALUES (?1, ?2, ?3, ?4)",
        params![name, phone, ccy, avatar],
    )?;
    println!("Registered user '{}' ({})", name, ccy);
    Ok(())
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap();
    let id = id_for_user(conn, name)?;
    let (phone, ccy, avatar, created): (Option<String>, String, Option<String>, String) = conn
        .query_row(
            "SELECT phone, currency, avatar, created_at FROM users WHERE id=?1",
            params![id],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )?;
    let rows = vec![vec![
        name.clone(),
        phone.unwrap_or_default(),
        ccy,
        avatar.unwrap_or_default(),
        created,
    ]];
    println!(
        "{}",
        pretty_table(&["Name", "Phone", "Currency", "Avatar", "Created"], rows)
    );
    Ok(())
}

fn update(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap();
    let id = id_for_user(conn, name)?;
    if let Some(phone) = sub.get_one::<String>("phone") {
        conn.execute("UPDATE users SET phone=?1 WHERE id=?2", params![phone, id])?;
    }
    if let Some(ccy) = sub.get_one::<String>("currency") {
        conn.execute(
            "UPDATE users SET currency=?1 WHERE id=?2",
            params![ccy.to_uppercase(), id],
        )?;
    }
    if let Some(avatar) = sub.get_one::<String>("avatar") {
        conn.execute(
            "UPDATE users SET avatar=?1 WHERE id=?2",
            params![avatar, id],
        )?;
    }
    println!("Updated profile for '{}'", name);
    Ok(())
}

fn list(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare("SELECT name, currency, created_at FROM users ORDER BY name")?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
        ))
    })?;
    let mut data = Vec::new();
    for row in rows {
        let (n, c, cr) = row?;
        data.push(vec![n, c, cr]);
    }
    println!("{}", pretty_table(&["Name", "Currency", "Created"], data));
    Ok(())
}

fn rm(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let name = sub.get_one::<String>("name").unwrap();
    let id = id_for_user(conn, name)?;
    if !sub.get_flag("yes") {
        let owned: i64 = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM transactions WHERE user_id=?1)
                  + (SELECT COUNT(*) FROM budgets WHERE user_id=?1)
                  + (SELECT COUNT(*) FROM recurring_transactions WHERE user_id=?1)",
            params![id],
            |r| r.get(0),
        )?;
        return Err(TrackerError::ConfirmationRequired(format!(
            "user '{}' and {} owned rows",
            name, owned
        ))
        .into());
    }
    // FK cascades take the owned rows with the user; shared categories stay.
    conn.execute("DELETE FROM users WHERE id=?1", params![id])?;
    println!("Removed user '{}' and everything they owned", name);
    Ok(())
}
