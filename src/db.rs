// Copyright (c) 2025 Ledgerbook Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::info;
use once_cell::sync::Lazy;
use rusqlite::{Connection, params};
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("dev.ledgerbook", "Ledgerbook", "ledgerbook"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("ledgerbook.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    seed_defaults(&conn)?;
    Ok(conn)
}

/// Creates the schema. Every entity carries soft-delete and audit columns;
/// `created_at`/`updated_at` are stamped by SQL defaults on insert, updates
/// and soft deletes touch `updated_at` through the helpers below. Uniqueness
/// invariants only apply among non-deleted rows, hence the partial indexes.
pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS accounts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('cash','bank','credit_card','e_payment')),
        icon TEXT NOT NULL DEFAULT '',
        initial_balance TEXT NOT NULL DEFAULT '0',
        currency TEXT NOT NULL DEFAULT 'TWD',
        is_deleted INTEGER NOT NULL DEFAULT 0,
        deleted_at TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_accounts_name
        ON accounts(name) WHERE is_deleted = 0;

    CREATE TABLE IF NOT EXISTS categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        icon TEXT NOT NULL DEFAULT '',
        type TEXT NOT NULL CHECK(type IN ('income','expense')),
        color TEXT,
        sort_order INTEGER NOT NULL DEFAULT 0,
        is_default INTEGER NOT NULL DEFAULT 0,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        deleted_at TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_categories_type_name
        ON categories(type, name) WHERE is_deleted = 0;

    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('income','expense')),
        amount TEXT NOT NULL,
        category_id INTEGER NOT NULL,
        account_id INTEGER NOT NULL,
        note TEXT,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        deleted_at TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE RESTRICT,
        FOREIGN KEY(account_id) REFERENCES accounts(id) ON DELETE RESTRICT
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
    CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions(category_id);
    CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id);

    CREATE TABLE IF NOT EXISTS budgets(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        category_id INTEGER NOT NULL,
        amount TEXT NOT NULL,
        period TEXT NOT NULL CHECK(period IN ('monthly','weekly')),
        start_date TEXT NOT NULL,
        is_deleted INTEGER NOT NULL DEFAULT 0,
        deleted_at TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(category_id) REFERENCES categories(id) ON DELETE RESTRICT
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_budgets_category_period
        ON budgets(category_id, period) WHERE is_deleted = 0;
    "#,
    )?;
    Ok(())
}

const DEFAULT_EXPENSE_CATEGORIES: &[(&str, &str, &str)] = &[
    ("餐飲", "🍽️", "#FF6384"),
    ("交通", "🚗", "#36A2EB"),
    ("娛樂", "🎮", "#FFCE56"),
    ("購物", "🛒", "#4BC0C0"),
    ("居住", "🏠", "#9966FF"),
    ("醫療", "🏥", "#FF9F40"),
    ("教育", "📚", "#C9CBCF"),
    ("其他", "📎", "#7C8798"),
];

const DEFAULT_INCOME_CATEGORIES: &[(&str, &str, &str)] = &[
    ("薪資", "💰", "#4CAF50"),
    ("獎金", "🎁", "#8BC34A"),
    ("投資收益", "📈", "#00BCD4"),
    ("其他收入", "💵", "#009688"),
];

const DEFAULT_ACCOUNTS: &[(&str, &str, &str)] = &[
    ("現金", "cash", "💵"),
    ("銀行帳戶", "bank", "🏦"),
    ("信用卡", "credit_card", "💳"),
];

/// Seeds default categories and accounts. Idempotent: each table is only
/// seeded while it is completely empty (deleted rows included).
pub fn seed_defaults(conn: &Connection) -> Result<()> {
    let category_count: i64 = conn.query_row("SELECT COUNT(*) FROM categories", [], |r| r.get(0))?;
    if category_count == 0 {
        for (order, (name, icon, color)) in DEFAULT_EXPENSE_CATEGORIES.iter().enumerate() {
            conn.execute(
                "INSERT INTO categories(name, icon, type, color, sort_order, is_default) \
                 VALUES (?1, ?2, 'expense', ?3, ?4, 1)",
                params![name, icon, color, order as i64 + 1],
            )?;
        }
        for (order, (name, icon, color)) in DEFAULT_INCOME_CATEGORIES.iter().enumerate() {
            conn.execute(
                "INSERT INTO categories(name, icon, type, color, sort_order, is_default) \
                 VALUES (?1, ?2, 'income', ?3, ?4, 1)",
                params![name, icon, color, order as i64 + 1],
            )?;
        }
        info!("seeded {} default categories", DEFAULT_EXPENSE_CATEGORIES.len() + DEFAULT_INCOME_CATEGORIES.len());
    }

    let account_count: i64 = conn.query_row("SELECT COUNT(*) FROM accounts", [], |r| r.get(0))?;
    if account_count == 0 {
        for (name, kind, icon) in DEFAULT_ACCOUNTS {
            conn.execute(
                "INSERT INTO accounts(name, type, icon, initial_balance, currency) \
                 VALUES (?1, ?2, ?3, '0', 'TWD')",
                params![name, kind, icon],
            )?;
        }
        info!("seeded {} default accounts", DEFAULT_ACCOUNTS.len());
    }
    Ok(())
}

/// Flips the soft-delete flag and stamps `deleted_at`. The generic mechanism
/// every service delete goes through; rows are never physically removed.
/// Returns false when the id does not exist or is already deleted.
pub(crate) fn soft_delete(conn: &Connection, table: &str, id: i64) -> crate::Result<bool> {
    let changed = conn.execute(
        &format!(
            "UPDATE {table} SET is_deleted = 1, deleted_at = datetime('now'), \
             updated_at = datetime('now') WHERE id = ?1 AND is_deleted = 0"
        ),
        params![id],
    )?;
    Ok(changed > 0)
}
