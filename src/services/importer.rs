// Copyright (c) 2025 Ledgerbook Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use csv::ReaderBuilder;
use log::{debug, info};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::{ImportError, ImportResult, TransactionType};
use crate::sanitize::sanitize_text;
use crate::services::exporter::UTF8_BOM;
use crate::utils::parse_date;

pub const MAX_IMPORT_FILE_SIZE: u64 = 5 * 1024 * 1024;
pub const MAX_IMPORT_ROWS: u32 = 10_000;

const EXPECTED_FIELDS: usize = 6;

/// A category referenced by a pending row: either one that already exists in
/// the store, or one synthesized during this import and persisted with the
/// batch. Pending rows reference the placeholder by index because no id
/// exists before the final write.
#[derive(Clone, Copy)]
enum CategoryRef {
    Existing(i64),
    Pending(usize),
}

struct PendingCategory {
    name: String,
    r#type: TransactionType,
    icon: &'static str,
    color: &'static str,
}

struct PendingRow {
    date: NaiveDate,
    r#type: TransactionType,
    amount: Decimal,
    category: CategoryRef,
    account_id: i64,
    note: Option<String>,
}

/// Reads and imports a CSV file, taking the declared file size from the
/// filesystem metadata.
pub fn import_transactions_from_path(conn: &mut Connection, path: &Path) -> Result<ImportResult> {
    let declared_size = fs::metadata(path)?.len();
    if declared_size > MAX_IMPORT_FILE_SIZE {
        return Ok(size_rejection());
    }
    let data = fs::read(path)?;
    import_transactions(conn, &data)
}

/// Parses an uploaded CSV payload and imports the valid rows.
///
/// Row failures are isolated: each appends a line-numbered error and the
/// stream continues. Only the size cap, the row cap, and an empty file are
/// batch-fatal, and all of them leave the store untouched. Rows that pass
/// validation are persisted together in one storage transaction after the
/// whole stream has been consumed, so a failure anywhere before that point
/// has no side effects.
pub fn import_transactions(conn: &mut Connection, data: &[u8]) -> Result<ImportResult> {
    let mut result = ImportResult::default();
    if data.len() as u64 > MAX_IMPORT_FILE_SIZE {
        return Ok(size_rejection());
    }

    let data = data.strip_prefix(UTF8_BOM.as_slice()).unwrap_or(data);
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);
    let mut records = rdr.byte_records();

    // The first record is the header; it is consumed without validation.
    match records.next() {
        Some(header) => {
            header?;
        }
        None => {
            result.errors.push(file_error("no valid data"));
            return Ok(result);
        }
    }

    let account_lookup = load_account_lookup(conn)?;
    let mut category_lookup = load_category_lookup(conn)?;
    let mut pending_categories: Vec<PendingCategory> = Vec::new();
    let mut pending_rows: Vec<PendingRow> = Vec::new();

    for record in records {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());

        // Whitespace-only lines do not count as data rows.
        if record.len() == 1
            && record
                .get(0)
                .is_none_or(|f| f.iter().all(u8::is_ascii_whitespace))
        {
            continue;
        }

        result.total_rows += 1;
        if result.total_rows > MAX_IMPORT_ROWS {
            result.success_count = 0;
            result.failed_count = result.total_rows;
            result.errors.push(ImportError {
                line,
                message: "CSV import cannot exceed 10,000 rows".to_string(),
            });
            return Ok(result);
        }

        if record.len() != EXPECTED_FIELDS {
            row_failed(&mut result, line, "incorrect field count, expected 6");
            continue;
        }
        let fields: Vec<String> = record
            .iter()
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect();

        let date = match parse_date(&fields[0]) {
            Ok(date) => date,
            Err(_) => {
                row_failed(&mut result, line, "invalid date format, use YYYY-MM-DD");
                continue;
            }
        };

        let Some(r#type) = parse_type_token(&fields[1]) else {
            row_failed(&mut result, line, "invalid transaction type");
            continue;
        };

        let amount = match fields[2].trim().parse::<Decimal>() {
            Ok(amount) if amount > Decimal::ZERO => amount,
            _ => {
                row_failed(&mut result, line, "amount must be greater than 0");
                continue;
            }
        };

        let category_name = sanitize_text(&fields[3]);
        if category_name.is_empty() {
            row_failed(&mut result, line, "category cannot be empty");
            continue;
        }

        let account_name = sanitize_text(&fields[4]);
        if account_name.is_empty() {
            row_failed(&mut result, line, "account cannot be empty");
            continue;
        }
        let Some(&account_id) = account_lookup.get(&account_name.to_lowercase()) else {
            row_failed(&mut result, line, &format!("account not found: {account_name}"));
            continue;
        };

        let category_key = (r#type, category_name.to_lowercase());
        let category = *category_lookup.entry(category_key).or_insert_with(|| {
            let (icon, color) = default_category_style(r#type);
            pending_categories.push(PendingCategory {
                name: category_name,
                r#type,
                icon,
                color,
            });
            CategoryRef::Pending(pending_categories.len() - 1)
        });

        let note = sanitize_text(&fields[5]);
        pending_rows.push(PendingRow {
            date,
            r#type,
            amount,
            category,
            account_id,
            note: (!note.is_empty()).then_some(note),
        });
        result.success_count += 1;
    }

    if result.total_rows == 0 {
        result.errors.push(file_error("no valid data"));
        return Ok(result);
    }

    if result.success_count > 0 {
        persist(conn, &pending_categories, &pending_rows)?;
    }
    info!(
        "imported {} of {} rows ({} failed)",
        result.success_count, result.total_rows, result.failed_count
    );
    Ok(result)
}

/// Writes synthesized categories and validated rows as one atomic batch.
fn persist(
    conn: &mut Connection,
    pending_categories: &[PendingCategory],
    pending_rows: &[PendingRow],
) -> Result<()> {
    let tx = conn.transaction()?;

    let mut category_ids = Vec::with_capacity(pending_categories.len());
    for category in pending_categories {
        tx.execute(
            "INSERT INTO categories(name, icon, type, color, sort_order, is_default) \
             VALUES (?1, ?2, ?3, ?4, 0, 0)",
            params![category.name, category.icon, category.r#type, category.color],
        )?;
        category_ids.push(tx.last_insert_rowid());
    }

    for row in pending_rows {
        let category_id = match row.category {
            CategoryRef::Existing(id) => id,
            CategoryRef::Pending(index) => category_ids[index],
        };
        tx.execute(
            "INSERT INTO transactions(date, type, amount, category_id, account_id, note) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.date,
                row.r#type,
                row.amount.to_string(),
                category_id,
                row.account_id,
                row.note
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

// Lookup keys are folded in Rust, not with SQLite's lower(), which only
// handles ASCII; the row probes use the same folding.
fn load_account_lookup(conn: &Connection) -> Result<HashMap<String, i64>> {
    let mut stmt = conn.prepare("SELECT name, id FROM accounts WHERE is_deleted = 0")?;
    let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?;
    let mut lookup = HashMap::new();
    for row in rows {
        let (name, id) = row?;
        lookup.insert(name.to_lowercase(), id);
    }
    Ok(lookup)
}

fn load_category_lookup(
    conn: &Connection,
) -> Result<HashMap<(TransactionType, String), CategoryRef>> {
    let mut stmt = conn.prepare("SELECT type, name, id FROM categories WHERE is_deleted = 0")?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, TransactionType>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, i64>(2)?,
        ))
    })?;
    let mut lookup = HashMap::new();
    for row in rows {
        let (r#type, name, id) = row?;
        lookup.insert((r#type, name.to_lowercase()), CategoryRef::Existing(id));
    }
    Ok(lookup)
}

/// Accepts the localized and English type tokens, case-insensitively.
fn parse_type_token(token: &str) -> Option<TransactionType> {
    let token = token.trim();
    if token == "收入" || token.eq_ignore_ascii_case("income") {
        Some(TransactionType::Income)
    } else if token == "支出" || token.eq_ignore_ascii_case("expense") {
        Some(TransactionType::Expense)
    } else {
        None
    }
}

fn default_category_style(r#type: TransactionType) -> (&'static str, &'static str) {
    match r#type {
        TransactionType::Income => ("💰", "#4CAF50"),
        TransactionType::Expense => ("📎", "#7C8798"),
    }
}

fn row_failed(result: &mut ImportResult, line: u64, message: &str) {
    debug!("import row at line {line} failed: {message}");
    result.failed_count += 1;
    result.errors.push(ImportError {
        line,
        message: message.to_string(),
    });
}

fn file_error(message: &str) -> ImportError {
    ImportError {
        line: 0,
        message: message.to_string(),
    }
}

fn size_rejection() -> ImportResult {
    ImportResult {
        errors: vec![file_error("CSV file size cannot exceed 5MB")],
        ..ImportResult::default()
    }
}
