// Copyright (c) 2025 Ledgerbook Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Datelike, Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, ToSql};
use rust_decimal::Decimal;

use crate::error::{Error, Result};

static ISO_DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// Parses a date against the exact `YYYY-MM-DD` pattern. Rejects variants
/// chrono alone would tolerate, such as unpadded months.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let trimmed = s.trim();
    if !ISO_DATE_RE.is_match(trimmed) {
        return Err(Error::validation("invalid date format, use YYYY-MM-DD"));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| Error::validation("invalid date format, use YYYY-MM-DD"))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    Ok(s.trim().parse::<Decimal>()?)
}

/// First and last day of a calendar month. Bounds per the report contract:
/// year 1..=9999, month 1..=12.
pub fn month_range(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate)> {
    if !(1..=9999).contains(&year) {
        return Err(Error::validation("year must be between 1 and 9999"));
    }
    if !(1..=12).contains(&month) {
        return Err(Error::validation("month must be between 1 and 12"));
    }
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::validation("year must be between 1 and 9999"))?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    // Chrono dates reach year 262142, so the bounds check above guarantees
    // the following month resolves.
    let end = next_month
        .ok_or_else(|| Error::validation("year must be between 1 and 9999"))?
        - Days::new(1);
    Ok((start, end))
}

/// Monday..Sunday of the ISO week containing the reference date.
pub fn week_range(reference: NaiveDate) -> (NaiveDate, NaiveDate) {
    let days_since_monday = reference.weekday().num_days_from_monday();
    let start = reference - Days::new(u64::from(days_since_monday));
    (start, start + Days::new(6))
}

/// Sums a single decimal TEXT column selected by `sql`. Amounts are stored
/// as canonical decimal text and summed here rather than in SQLite so the
/// result keeps exact decimal precision.
pub(crate) fn sum_amounts(conn: &Connection, sql: &str, params: &[&dyn ToSql]) -> Result<Decimal> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut total = Decimal::ZERO;
    while let Some(row) = rows.next()? {
        let raw: String = row.get(0)?;
        total += raw.parse::<Decimal>()?;
    }
    Ok(total)
}
