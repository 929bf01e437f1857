// Copyright (c) 2025 Ledgerbook Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::{Connection, OptionalExtension, params};

use crate::db;
use crate::error::{Error, Result};
use crate::models::{Category, NewCategory, TransactionType};

const SELECT: &str = "SELECT id, name, icon, type, color, sort_order, is_default \
                      FROM categories WHERE is_deleted = 0";

fn read_category(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        icon: row.get(2)?,
        r#type: row.get(3)?,
        color: row.get(4)?,
        sort_order: row.get(5)?,
        is_default: row.get(6)?,
    })
}

/// All active categories, expense and income, ordered by type then sort order.
pub fn get_all(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(&format!("{SELECT} ORDER BY type, sort_order"))?;
    let rows = stmt.query_map([], read_category)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn get_by_type(conn: &Connection, r#type: TransactionType) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(&format!("{SELECT} AND type = ?1 ORDER BY sort_order"))?;
    let rows = stmt.query_map(params![r#type], read_category)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub fn get_by_id(conn: &Connection, category_id: i64) -> Result<Option<Category>> {
    Ok(conn
        .query_row(&format!("{SELECT} AND id = ?1"), params![category_id], read_category)
        .optional()?)
}

pub fn create(conn: &Connection, input: &NewCategory) -> Result<Category> {
    let name = validate_name(&input.name)?;
    ensure_unique_name(conn, input.r#type, &name, None)?;

    let sort_order = if input.sort_order > 0 {
        input.sort_order
    } else {
        next_sort_order(conn, input.r#type, None)?
    };

    conn.execute(
        "INSERT INTO categories(name, icon, type, color, sort_order, is_default) \
         VALUES (?1, ?2, ?3, ?4, ?5, 0)",
        params![
            name,
            input.icon.trim(),
            input.r#type,
            normalize_color(input.color.as_deref()),
            sort_order
        ],
    )?;

    Ok(Category {
        id: conn.last_insert_rowid(),
        name,
        icon: input.icon.trim().to_string(),
        r#type: input.r#type,
        color: normalize_color(input.color.as_deref()),
        sort_order,
        is_default: false,
    })
}

/// Returns `None` when the id does not exist.
pub fn update(conn: &Connection, category_id: i64, input: &NewCategory) -> Result<Option<Category>> {
    if get_by_id(conn, category_id)?.is_none() {
        return Ok(None);
    }

    let name = validate_name(&input.name)?;
    ensure_unique_name(conn, input.r#type, &name, Some(category_id))?;

    let sort_order = if input.sort_order > 0 {
        input.sort_order
    } else {
        next_sort_order(conn, input.r#type, Some(category_id))?
    };

    conn.execute(
        "UPDATE categories SET name = ?1, icon = ?2, type = ?3, color = ?4, sort_order = ?5, \
         updated_at = datetime('now') WHERE id = ?6 AND is_deleted = 0",
        params![
            name,
            input.icon.trim(),
            input.r#type,
            normalize_color(input.color.as_deref()),
            sort_order,
            category_id
        ],
    )?;

    get_by_id(conn, category_id)
}

/// Soft delete. Refused (false) for default categories and for categories
/// still referenced by non-deleted transactions; use [`delete_and_migrate`]
/// for the latter.
pub fn delete(conn: &Connection, category_id: i64) -> Result<bool> {
    let Some(category) = get_by_id(conn, category_id)? else {
        return Ok(false);
    };
    if category.is_default || has_transactions(conn, category_id)? {
        return Ok(false);
    }
    db::soft_delete(conn, "categories", category_id)
}

/// Reassigns every non-deleted transaction of `category_id` to
/// `target_category_id` (same type required), then soft deletes the source.
/// One storage transaction; false on any precondition failure.
pub fn delete_and_migrate(
    conn: &mut Connection,
    category_id: i64,
    target_category_id: i64,
) -> Result<bool> {
    if category_id == target_category_id {
        return Ok(false);
    }

    let Some(source) = get_by_id(conn, category_id)? else {
        return Ok(false);
    };
    if source.is_default {
        return Ok(false);
    }
    let Some(target) = get_by_id(conn, target_category_id)? else {
        return Ok(false);
    };
    if target.r#type != source.r#type {
        return Ok(false);
    }

    let tx = conn.transaction()?;
    tx.execute(
        "UPDATE transactions SET category_id = ?1, updated_at = datetime('now') \
         WHERE category_id = ?2 AND is_deleted = 0",
        params![target_category_id, category_id],
    )?;
    db::soft_delete(&tx, "categories", category_id)?;
    tx.commit()?;
    Ok(true)
}

pub fn has_transactions(conn: &Connection, category_id: i64) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM transactions WHERE category_id = ?1 AND is_deleted = 0)",
        params![category_id],
        |r| r.get(0),
    )?;
    Ok(exists)
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation("category name cannot be empty"));
    }
    if trimmed.chars().count() > 50 {
        return Err(Error::validation("category name cannot exceed 50 characters"));
    }
    Ok(trimmed.to_string())
}

fn ensure_unique_name(
    conn: &Connection,
    r#type: TransactionType,
    name: &str,
    exclude_id: Option<i64>,
) -> Result<()> {
    let duplicate: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories \
         WHERE is_deleted = 0 AND type = ?1 AND name = ?2 AND id != IFNULL(?3, -1))",
        params![r#type, name, exclude_id],
        |r| r.get(0),
    )?;
    if duplicate {
        return Err(Error::validation("category name already exists"));
    }
    Ok(())
}

fn next_sort_order(
    conn: &Connection,
    r#type: TransactionType,
    exclude_id: Option<i64>,
) -> Result<i64> {
    let max: Option<i64> = conn.query_row(
        "SELECT MAX(sort_order) FROM categories \
         WHERE is_deleted = 0 AND type = ?1 AND id != IFNULL(?2, -1)",
        params![r#type, exclude_id],
        |r| r.get(0),
    )?;
    Ok(max.unwrap_or(0) + 1)
}

fn normalize_color(color: Option<&str>) -> Option<String> {
    color
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}
