// Copyright (c) 2025 Ledgerbook Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use csv::{Terminator, WriterBuilder};
use log::debug;
use rusqlite::{Connection, ToSql};

use crate::error::Result;
use crate::models::TransactionType;

/// UTF-8 byte-order mark; spreadsheet tools need it to pick the encoding.
pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

pub const CSV_HEADER: [&str; 6] = ["日期", "類型", "金額", "分類", "帳戶", "備註"];

pub(crate) fn type_label(r#type: TransactionType) -> &'static str {
    match r#type {
        TransactionType::Income => "收入",
        TransactionType::Expense => "支出",
    }
}

/// Serializes non-deleted transactions to RFC 4180 CSV bytes: BOM prefix,
/// fixed localized header, CRLF row terminators, fields quoted whenever they
/// contain a comma, quote, or newline. The optional date range is inclusive
/// on both ends; rows are ordered by date then id.
pub fn export_transactions(
    conn: &Connection,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<Vec<u8>> {
    let mut sql = String::from(
        "SELECT t.date, t.type, t.amount, IFNULL(c.name, ''), IFNULL(a.name, ''), t.note \
         FROM transactions t \
         LEFT JOIN categories c ON t.category_id = c.id AND c.is_deleted = 0 \
         LEFT JOIN accounts a ON t.account_id = a.id AND a.is_deleted = 0 \
         WHERE t.is_deleted = 0",
    );
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();
    if let Some(start) = start_date {
        sql.push_str(&format!(" AND t.date >= ?{}", values.len() + 1));
        values.push(Box::new(start));
    }
    if let Some(end) = end_date {
        sql.push_str(&format!(" AND t.date <= ?{}", values.len() + 1));
        values.push(Box::new(end));
    }
    sql.push_str(" ORDER BY t.date, t.id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), |row| {
        Ok((
            row.get::<_, NaiveDate>(0)?,
            row.get::<_, TransactionType>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
        ))
    })?;

    let mut buf = UTF8_BOM.to_vec();
    {
        let mut wtr = WriterBuilder::new()
            .terminator(Terminator::CRLF)
            .from_writer(&mut buf);
        wtr.write_record(CSV_HEADER)?;
        let mut exported = 0u32;
        for row in rows {
            let (date, r#type, amount, category, account, note) = row?;
            wtr.write_record([
                date.format("%Y-%m-%d").to_string(),
                type_label(r#type).to_string(),
                amount,
                category,
                account,
                note.unwrap_or_default(),
            ])?;
            exported += 1;
        }
        wtr.flush()?;
        debug!("exported {exported} transactions");
    }
    Ok(buf)
}
