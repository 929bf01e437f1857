// Copyright (c) 2025 Ledgerbook Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Datelike, Local, NaiveDate};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use crate::db;
use crate::error::{Error, Result};
use crate::models::{Budget, BudgetPeriod, BudgetProgress, BudgetStatus, NewBudget};
use crate::utils::{month_range, sum_amounts, week_range};

const SELECT: &str =
    "SELECT id, category_id, amount, period, start_date FROM budgets WHERE is_deleted = 0";

fn read_budget(row: &rusqlite::Row<'_>) -> rusqlite::Result<(Budget, String)> {
    let raw_amount: String = row.get(2)?;
    Ok((
        Budget {
            id: row.get(0)?,
            category_id: row.get(1)?,
            amount: Decimal::ZERO,
            period: row.get(3)?,
            start_date: row.get(4)?,
        },
        raw_amount,
    ))
}

fn finish(pair: (Budget, String)) -> Result<Budget> {
    let (mut budget, raw) = pair;
    budget.amount = raw.parse::<Decimal>()?;
    Ok(budget)
}

pub fn get_by_id(conn: &Connection, budget_id: i64) -> Result<Option<Budget>> {
    let found = conn
        .query_row(&format!("{SELECT} AND id = ?1"), params![budget_id], read_budget)
        .optional()?;
    found.map(finish).transpose()
}

/// Resolves the rolling window a budget is measured against.
///
/// Monthly windows span the reference date's calendar month, weekly windows
/// the Monday..Sunday ISO week containing it. A budget start date inside the
/// window raises the effective start; the end date is never moved. Week
/// start is fixed to Monday, matching the report views this feeds.
pub fn resolve_period_range(
    period: BudgetPeriod,
    reference: NaiveDate,
    budget_start: NaiveDate,
) -> (NaiveDate, NaiveDate) {
    let (natural_start, end) = match period {
        BudgetPeriod::Monthly => {
            // Reference date is a valid calendar date, so its month resolves.
            month_range(reference.year(), reference.month())
                .unwrap_or((reference, reference))
        }
        BudgetPeriod::Weekly => week_range(reference),
    };
    (natural_start.max(budget_start), end)
}

/// Progress for every active budget, joined to its expense category and
/// ordered by category sort order then category id. Budgets whose start date
/// lies beyond the resolved window are not yet active and are skipped.
pub fn get_all_with_progress(
    conn: &Connection,
    reference_date: Option<NaiveDate>,
) -> Result<Vec<BudgetProgress>> {
    let reference = reference_date.unwrap_or_else(|| Local::now().date_naive());
    let mut stmt = conn.prepare(
        "SELECT b.id, b.category_id, b.amount, b.period, b.start_date, c.name, c.icon \
         FROM budgets b \
         JOIN categories c ON b.category_id = c.id AND c.is_deleted = 0 AND c.type = 'expense' \
         WHERE b.is_deleted = 0 \
         ORDER BY c.sort_order, c.id",
    )?;
    let rows = stmt.query_map([], |row| {
        let pair = read_budget(row)?;
        let name: String = row.get(5)?;
        let icon: String = row.get(6)?;
        Ok((pair, name, icon))
    })?;

    let mut results = Vec::new();
    for row in rows {
        let (pair, name, icon) = row?;
        let budget = finish(pair)?;
        if let Some(progress) = build_progress(conn, &budget, name, icon, reference)? {
            results.push(progress);
        }
    }
    Ok(results)
}

/// Progress for the budget watching `category_id`, or `None` when the
/// category has no budget. When both a monthly and a weekly budget exist the
/// monthly one wins; ties fall to the lowest budget id.
pub fn check_status(
    conn: &Connection,
    category_id: i64,
    reference_date: Option<NaiveDate>,
) -> Result<Option<BudgetProgress>> {
    let reference = reference_date.unwrap_or_else(|| Local::now().date_naive());
    let found = conn
        .query_row(
            "SELECT b.id, b.category_id, b.amount, b.period, b.start_date, c.name, c.icon \
             FROM budgets b \
             JOIN categories c ON b.category_id = c.id AND c.is_deleted = 0 AND c.type = 'expense' \
             WHERE b.is_deleted = 0 AND b.category_id = ?1 \
             ORDER BY CASE b.period WHEN 'monthly' THEN 0 ELSE 1 END, b.id \
             LIMIT 1",
            params![category_id],
            |row| {
                let pair = read_budget(row)?;
                let name: String = row.get(5)?;
                let icon: String = row.get(6)?;
                Ok((pair, name, icon))
            },
        )
        .optional()?;

    let Some((pair, name, icon)) = found else {
        return Ok(None);
    };
    let budget = finish(pair)?;
    build_progress(conn, &budget, name, icon, reference)
}

fn build_progress(
    conn: &Connection,
    budget: &Budget,
    category_name: String,
    category_icon: String,
    reference: NaiveDate,
) -> Result<Option<BudgetProgress>> {
    let (period_start, period_end) =
        resolve_period_range(budget.period, reference, budget.start_date);
    if budget.start_date > period_end {
        return Ok(None);
    }

    let spent_amount = sum_amounts(
        conn,
        "SELECT amount FROM transactions \
         WHERE is_deleted = 0 AND type = 'expense' AND category_id = ?1 \
         AND date >= ?2 AND date <= ?3",
        &[&budget.category_id, &period_start, &period_end],
    )?;

    let usage_rate = if budget.amount <= Decimal::ZERO {
        Decimal::ZERO
    } else {
        spent_amount / budget.amount * Decimal::from(100)
    };

    Ok(Some(BudgetProgress {
        budget_id: budget.id,
        category_id: budget.category_id,
        category_name,
        category_icon,
        budget_amount: budget.amount,
        spent_amount,
        usage_rate,
        status: resolve_status(usage_rate),
        period: budget.period,
        start_date: budget.start_date,
    }))
}

fn resolve_status(usage_rate: Decimal) -> BudgetStatus {
    if usage_rate < Decimal::from(80) {
        BudgetStatus::Normal
    } else if usage_rate <= Decimal::from(100) {
        BudgetStatus::Warning
    } else {
        BudgetStatus::Exceeded
    }
}

pub fn create(conn: &Connection, input: &NewBudget) -> Result<Budget> {
    validate_expense_category(conn, input.category_id)?;
    ensure_unique(conn, input.category_id, input.period, None)?;
    if input.amount <= Decimal::ZERO {
        return Err(Error::validation("budget amount must be greater than 0"));
    }

    let start_date = input.start_date.unwrap_or_else(default_start_date);
    conn.execute(
        "INSERT INTO budgets(category_id, amount, period, start_date) VALUES (?1, ?2, ?3, ?4)",
        params![input.category_id, input.amount.to_string(), input.period, start_date],
    )?;

    Ok(Budget {
        id: conn.last_insert_rowid(),
        category_id: input.category_id,
        amount: input.amount,
        period: input.period,
        start_date,
    })
}

/// Returns `None` when the id does not exist. An absent start date keeps the
/// stored one.
pub fn update(conn: &Connection, budget_id: i64, input: &NewBudget) -> Result<Option<Budget>> {
    let Some(existing) = get_by_id(conn, budget_id)? else {
        return Ok(None);
    };

    validate_expense_category(conn, input.category_id)?;
    ensure_unique(conn, input.category_id, input.period, Some(budget_id))?;
    if input.amount <= Decimal::ZERO {
        return Err(Error::validation("budget amount must be greater than 0"));
    }

    let start_date = input.start_date.unwrap_or(existing.start_date);
    conn.execute(
        "UPDATE budgets SET category_id = ?1, amount = ?2, period = ?3, start_date = ?4, \
         updated_at = datetime('now') WHERE id = ?5 AND is_deleted = 0",
        params![
            input.category_id,
            input.amount.to_string(),
            input.period,
            start_date,
            budget_id
        ],
    )?;

    get_by_id(conn, budget_id)
}

/// Soft delete; false when the id does not exist.
pub fn delete(conn: &Connection, budget_id: i64) -> Result<bool> {
    db::soft_delete(conn, "budgets", budget_id)
}

fn default_start_date() -> NaiveDate {
    let today = Local::now().date_naive();
    today.with_day(1).unwrap_or(today)
}

fn validate_expense_category(conn: &Connection, category_id: i64) -> Result<()> {
    let is_expense: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories \
         WHERE id = ?1 AND is_deleted = 0 AND type = 'expense')",
        params![category_id],
        |r| r.get(0),
    )?;
    if !is_expense {
        return Err(Error::validation("budget only supports expense categories"));
    }
    Ok(())
}

fn ensure_unique(
    conn: &Connection,
    category_id: i64,
    period: BudgetPeriod,
    exclude_id: Option<i64>,
) -> Result<()> {
    let duplicate: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM budgets \
         WHERE is_deleted = 0 AND category_id = ?1 AND period = ?2 AND id != IFNULL(?3, -1))",
        params![category_id, period, exclude_id],
        |r| r.get(0),
    )?;
    if duplicate {
        return Err(Error::validation(
            "budget for this category and period already exists",
        ));
    }
    Ok(())
}
