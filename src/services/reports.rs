// Copyright (c) 2025 Ledgerbook Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::{BTreeMap, HashMap};

use rusqlite::{Connection, params};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::Result;
use crate::models::{CategoryExpense, DailyTrend, MonthlySummary, TransactionType};
use crate::utils::{month_range, sum_amounts};

const UNCATEGORIZED_NAME: &str = "未分類";
const DEFAULT_CATEGORY_COLOR: &str = "#6C757D";

/// Income/expense totals for a calendar month. `has_data` is true when the
/// month holds at least one non-deleted transaction of either type.
pub fn monthly_summary(conn: &Connection, year: i32, month: u32) -> Result<MonthlySummary> {
    let (start, end) = month_range(year, month)?;

    let total_income = sum_amounts(
        conn,
        "SELECT amount FROM transactions \
         WHERE is_deleted = 0 AND type = 'income' AND date >= ?1 AND date <= ?2",
        &[&start, &end],
    )?;
    let total_expense = sum_amounts(
        conn,
        "SELECT amount FROM transactions \
         WHERE is_deleted = 0 AND type = 'expense' AND date >= ?1 AND date <= ?2",
        &[&start, &end],
    )?;
    let has_data: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM transactions \
         WHERE is_deleted = 0 AND date >= ?1 AND date <= ?2)",
        params![start, end],
        |r| r.get(0),
    )?;

    Ok(MonthlySummary {
        year,
        month,
        balance: total_income - total_expense,
        total_income,
        total_expense,
        has_data,
    })
}

/// Per-category expense breakdown for a month, sorted descending by amount.
///
/// Every slice but the last carries round(amount/total*100, 2dp,
/// half-away-from-zero); the last slice absorbs the remainder so the column
/// sums to exactly 100. The remainder landing on the smallest slice depends
/// on the descending sort, so the ordering here is part of the contract.
pub fn category_breakdown(conn: &Connection, year: i32, month: u32) -> Result<Vec<CategoryExpense>> {
    let (start, end) = month_range(year, month)?;

    let mut stmt = conn.prepare(
        "SELECT IFNULL(c.name, ?3), \
         CASE WHEN c.color IS NULL OR c.color = '' THEN ?4 ELSE c.color END, t.amount \
         FROM transactions t \
         LEFT JOIN categories c ON t.category_id = c.id AND c.is_deleted = 0 \
         WHERE t.is_deleted = 0 AND t.type = 'expense' AND t.date >= ?1 AND t.date <= ?2",
    )?;
    let rows = stmt.query_map(
        params![start, end, UNCATEGORIZED_NAME, DEFAULT_CATEGORY_COLOR],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        },
    )?;

    // Group in first-seen order; the stable sort below keeps that order for
    // equal amounts.
    let mut groups: Vec<(String, String, Decimal)> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    for row in rows {
        let (name, color, raw_amount) = row?;
        let amount = raw_amount.parse::<Decimal>()?;
        let key = (name.clone(), color.clone());
        match index.get(&key) {
            Some(&i) => groups[i].2 += amount,
            None => {
                index.insert(key, groups.len());
                groups.push((name, color, amount));
            }
        }
    }

    if groups.is_empty() {
        return Ok(Vec::new());
    }

    groups.sort_by(|a, b| b.2.cmp(&a.2));
    let total: Decimal = groups.iter().map(|g| g.2).sum();

    let hundred = Decimal::from(100);
    let mut allocated = Decimal::ZERO;
    let mut breakdown = Vec::with_capacity(groups.len());
    for (i, (name, color, amount)) in groups.iter().enumerate() {
        let percentage = if i == groups.len() - 1 {
            (hundred - allocated).max(Decimal::ZERO)
        } else {
            (*amount / total * hundred)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        };
        allocated += percentage;
        breakdown.push(CategoryExpense {
            name: name.clone(),
            color: color.clone(),
            amount: *amount,
            percentage,
        });
    }

    Ok(breakdown)
}

/// Per-day income/expense sums for a month, ascending by date. Days without
/// any transaction are omitted, not zero-filled.
pub fn daily_trends(conn: &Connection, year: i32, month: u32) -> Result<Vec<DailyTrend>> {
    let (start, end) = month_range(year, month)?;

    let mut stmt = conn.prepare(
        "SELECT date, type, amount FROM transactions \
         WHERE is_deleted = 0 AND date >= ?1 AND date <= ?2",
    )?;
    let rows = stmt.query_map(params![start, end], |row| {
        Ok((
            row.get::<_, chrono::NaiveDate>(0)?,
            row.get::<_, TransactionType>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut days: BTreeMap<chrono::NaiveDate, (Decimal, Decimal)> = BTreeMap::new();
    for row in rows {
        let (date, r#type, raw_amount) = row?;
        let amount = raw_amount.parse::<Decimal>()?;
        let entry = days.entry(date).or_insert((Decimal::ZERO, Decimal::ZERO));
        match r#type {
            TransactionType::Income => entry.0 += amount,
            TransactionType::Expense => entry.1 += amount,
        }
    }

    Ok(days
        .into_iter()
        .map(|(date, (income, expense))| DailyTrend { date, income, expense })
        .collect())
}
