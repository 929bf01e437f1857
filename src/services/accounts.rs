// Copyright (c) 2025 Ledgerbook Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use crate::db;
use crate::error::{Error, Result};
use crate::models::{Account, NewAccount};
use crate::utils::sum_amounts;

const SELECT: &str =
    "SELECT id, name, type, icon, initial_balance, currency FROM accounts WHERE is_deleted = 0";

fn read_account(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Account, String)> {
    let raw_balance: String = row.get(4)?;
    Ok((
        Account {
            id: row.get(0)?,
            name: row.get(1)?,
            r#type: row.get(2)?,
            icon: row.get(3)?,
            initial_balance: Decimal::ZERO,
            currency: row.get(5)?,
        },
        raw_balance,
    ))
}

fn finish(pair: (Account, String)) -> Result<Account> {
    let (mut account, raw) = pair;
    account.initial_balance = raw.parse::<Decimal>()?;
    Ok(account)
}

/// All active accounts ordered by id.
pub fn get_all(conn: &Connection) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(&format!("{SELECT} ORDER BY id"))?;
    let rows = stmt.query_map([], read_account)?;
    let mut accounts = Vec::new();
    for row in rows {
        accounts.push(finish(row?)?);
    }
    Ok(accounts)
}

pub fn get_by_id(conn: &Connection, account_id: i64) -> Result<Option<Account>> {
    let found = conn
        .query_row(&format!("{SELECT} AND id = ?1"), params![account_id], read_account)
        .optional()?;
    found.map(finish).transpose()
}

/// Current balance: initial balance plus income minus expense over
/// non-deleted transactions, exact decimal. Zero when the account is gone.
pub fn get_balance(conn: &Connection, account_id: i64) -> Result<Decimal> {
    let Some(account) = get_by_id(conn, account_id)? else {
        return Ok(Decimal::ZERO);
    };

    let income = sum_amounts(
        conn,
        "SELECT amount FROM transactions \
         WHERE is_deleted = 0 AND account_id = ?1 AND type = 'income'",
        &[&account_id],
    )?;
    let expense = sum_amounts(
        conn,
        "SELECT amount FROM transactions \
         WHERE is_deleted = 0 AND account_id = ?1 AND type = 'expense'",
        &[&account_id],
    )?;

    Ok(account.initial_balance + income - expense)
}

pub fn create(conn: &Connection, input: &NewAccount) -> Result<Account> {
    let name = validate_name(&input.name)?;
    if input.initial_balance < Decimal::ZERO {
        return Err(Error::validation("initial balance cannot be negative"));
    }
    ensure_unique_name(conn, &name, None)?;

    conn.execute(
        "INSERT INTO accounts(name, type, icon, initial_balance, currency) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            name,
            input.r#type,
            input.icon.trim(),
            input.initial_balance.to_string(),
            input.currency
        ],
    )?;

    Ok(Account {
        id: conn.last_insert_rowid(),
        name,
        r#type: input.r#type,
        icon: input.icon.trim().to_string(),
        initial_balance: input.initial_balance,
        currency: input.currency.clone(),
    })
}

/// Returns `None` when the id does not exist.
pub fn update(conn: &Connection, account_id: i64, input: &NewAccount) -> Result<Option<Account>> {
    if get_by_id(conn, account_id)?.is_none() {
        return Ok(None);
    }

    let name = validate_name(&input.name)?;
    if input.initial_balance < Decimal::ZERO {
        return Err(Error::validation("initial balance cannot be negative"));
    }
    ensure_unique_name(conn, &name, Some(account_id))?;

    conn.execute(
        "UPDATE accounts SET name = ?1, type = ?2, icon = ?3, initial_balance = ?4, \
         currency = ?5, updated_at = datetime('now') WHERE id = ?6 AND is_deleted = 0",
        params![
            name,
            input.r#type,
            input.icon.trim(),
            input.initial_balance.to_string(),
            input.currency,
            account_id
        ],
    )?;

    get_by_id(conn, account_id)
}

/// Soft delete. Refused (false) while any non-deleted transaction still
/// references the account.
pub fn delete(conn: &Connection, account_id: i64) -> Result<bool> {
    if has_transactions(conn, account_id)? {
        return Ok(false);
    }
    db::soft_delete(conn, "accounts", account_id)
}

pub fn has_transactions(conn: &Connection, account_id: i64) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM transactions WHERE account_id = ?1 AND is_deleted = 0)",
        params![account_id],
        |r| r.get(0),
    )?;
    Ok(exists)
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("account name cannot be empty"));
    }
    if trimmed.chars().count() > 50 {
        return Err(Error::validation("account name cannot exceed 50 characters"));
    }
    Ok(trimmed.to_string())
}

fn ensure_unique_name(conn: &Connection, name: &str, exclude_id: Option<i64>) -> Result<()> {
    let duplicate: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM accounts \
         WHERE is_deleted = 0 AND name = ?1 AND id != IFNULL(?2, -1))",
        params![name, exclude_id],
        |r| r.get(0),
    )?;
    if duplicate {
        return Err(Error::validation("account name already exists"));
    }
    Ok(())
}
