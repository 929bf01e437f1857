// Copyright (c) 2025 Ledgerbook Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, ToSql, params};
use rust_decimal::Decimal;

use crate::db;
use crate::error::{Error, Result};
use crate::models::{NewTransaction, TransactionRecord};

const MAX_NOTE_CHARS: usize = 500;
const DEFAULT_PAGE_SIZE: u32 = 20;

/// Filter for paged transaction listings. All criteria are optional and
/// compose with AND; date and amount ranges are inclusive.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category_id: Option<i64>,
    pub account_id: Option<i64>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    /// Case-insensitive substring match on the note.
    pub keyword: Option<String>,
    /// 1-based; zero is treated as the first page.
    pub page: u32,
    /// Zero falls back to 20.
    pub page_size: u32,
}

const SELECT: &str = "SELECT t.id, t.date, t.type, t.amount, t.category_id, c.name, \
                      t.account_id, a.name, t.note \
                      FROM transactions t \
                      LEFT JOIN categories c ON t.category_id = c.id AND c.is_deleted = 0 \
                      LEFT JOIN accounts a ON t.account_id = a.id AND a.is_deleted = 0 \
                      WHERE t.is_deleted = 0";

fn read_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<(TransactionRecord, String)> {
    let raw_amount: String = row.get(3)?;
    Ok((
        TransactionRecord {
            id: row.get(0)?,
            date: row.get(1)?,
            r#type: row.get(2)?,
            amount: Decimal::ZERO,
            category_id: row.get(4)?,
            category_name: row.get(5)?,
            account_id: row.get(6)?,
            account_name: row.get(7)?,
            note: row.get(8)?,
        },
        raw_amount,
    ))
}

fn finish(pair: (TransactionRecord, String)) -> Result<TransactionRecord> {
    let (mut record, raw) = pair;
    record.amount = raw.parse::<Decimal>()?;
    Ok(record)
}

/// Filtered page of transactions, newest first, plus the total match count.
pub fn get_paged(
    conn: &Connection,
    filter: &TransactionFilter,
) -> Result<(Vec<TransactionRecord>, i64)> {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(start) = filter.start_date {
        clauses.push(format!("t.date >= ?{}", values.len() + 1));
        values.push(Box::new(start));
    }
    if let Some(end) = filter.end_date {
        clauses.push(format!("t.date <= ?{}", values.len() + 1));
        values.push(Box::new(end));
    }
    if let Some(category_id) = filter.category_id {
        clauses.push(format!("t.category_id = ?{}", values.len() + 1));
        values.push(Box::new(category_id));
    }
    if let Some(account_id) = filter.account_id {
        clauses.push(format!("t.account_id = ?{}", values.len() + 1));
        values.push(Box::new(account_id));
    }
    // Amounts live in TEXT columns; compare numerically, not lexically.
    if let Some(min) = filter.min_amount {
        clauses.push(format!("CAST(t.amount AS REAL) >= CAST(?{} AS REAL)", values.len() + 1));
        values.push(Box::new(min.to_string()));
    }
    if let Some(max) = filter.max_amount {
        clauses.push(format!("CAST(t.amount AS REAL) <= CAST(?{} AS REAL)", values.len() + 1));
        values.push(Box::new(max.to_string()));
    }
    if let Some(keyword) = filter.keyword.as_deref() {
        let keyword = keyword.trim();
        if !keyword.is_empty() {
            clauses.push(format!("lower(IFNULL(t.note, '')) LIKE ?{}", values.len() + 1));
            values.push(Box::new(format!("%{}%", keyword.to_lowercase())));
        }
    }

    let where_tail = if clauses.is_empty() {
        String::new()
    } else {
        format!(" AND {}", clauses.join(" AND "))
    };

    let count_sql = format!(
        "SELECT COUNT(*) FROM transactions t WHERE t.is_deleted = 0{where_tail}"
    );
    let total: i64 = conn.query_row(
        &count_sql,
        rusqlite::params_from_iter(values.iter()),
        |r| r.get(0),
    )?;

    let page = filter.page.max(1);
    let page_size = if filter.page_size == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        filter.page_size
    };
    let offset = i64::from(page - 1) * i64::from(page_size);

    let page_sql = format!(
        "{SELECT}{where_tail} ORDER BY t.date DESC, t.id DESC LIMIT ?{} OFFSET ?{}",
        values.len() + 1,
        values.len() + 2
    );
    values.push(Box::new(i64::from(page_size)));
    values.push(Box::new(offset));

    let mut stmt = conn.prepare(&page_sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), read_record)?;
    let mut records = Vec::new();
    for row in rows {
        records.push(finish(row?)?);
    }
    Ok((records, total))
}

pub fn get_by_id(conn: &Connection, id: i64) -> Result<Option<TransactionRecord>> {
    let found = conn
        .query_row(&format!("{SELECT} AND t.id = ?1"), params![id], read_record)
        .optional()?;
    found.map(finish).transpose()
}

pub fn create(conn: &Connection, input: &NewTransaction) -> Result<TransactionRecord> {
    validate(input)?;
    conn.execute(
        "INSERT INTO transactions(date, type, amount, category_id, account_id, note) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            input.date,
            input.r#type,
            input.amount.to_string(),
            input.category_id,
            input.account_id,
            input.note
        ],
    )?;
    let id = conn.last_insert_rowid();
    get_by_id(conn, id)?.ok_or(Error::Db(rusqlite::Error::QueryReturnedNoRows))
}

/// Returns `None` when the id does not exist.
pub fn update(
    conn: &Connection,
    id: i64,
    input: &NewTransaction,
) -> Result<Option<TransactionRecord>> {
    if get_by_id(conn, id)?.is_none() {
        return Ok(None);
    }
    validate(input)?;
    conn.execute(
        "UPDATE transactions SET date = ?1, type = ?2, amount = ?3, category_id = ?4, \
         account_id = ?5, note = ?6, updated_at = datetime('now') \
         WHERE id = ?7 AND is_deleted = 0",
        params![
            input.date,
            input.r#type,
            input.amount.to_string(),
            input.category_id,
            input.account_id,
            input.note,
            id
        ],
    )?;
    get_by_id(conn, id)
}

/// Soft delete; false when the id does not exist.
pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
    db::soft_delete(conn, "transactions", id)
}

fn validate(input: &NewTransaction) -> Result<()> {
    if input.amount <= Decimal::ZERO {
        return Err(Error::validation("amount must be greater than 0"));
    }
    if let Some(note) = input.note.as_deref() {
        if note.chars().count() > MAX_NOTE_CHARS {
            return Err(Error::validation("note cannot exceed 500 characters"));
        }
    }
    Ok(())
}
