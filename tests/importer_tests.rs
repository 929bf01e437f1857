// Copyright (c) 2025 Ledgerbook Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use ledgerbook::models::{AccountType, NewAccount, TransactionType};
use ledgerbook::services::importer::{
    MAX_IMPORT_FILE_SIZE, import_transactions, import_transactions_from_path,
};
use ledgerbook::services::transactions::{self, TransactionFilter};
use ledgerbook::services::{accounts, categories};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::io::Write;

const HEADER: &str = "日期,類型,金額,分類,帳戶,備註";

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    ledgerbook::db::init_schema(&mut conn).unwrap();
    accounts::create(
        &conn,
        &NewAccount {
            name: "現金".to_string(),
            r#type: AccountType::Cash,
            icon: "💵".to_string(),
            initial_balance: Decimal::ZERO,
            currency: "TWD".to_string(),
        },
    )
    .unwrap();
    conn
}

fn csv(rows: &[&str]) -> Vec<u8> {
    let mut out = String::from(HEADER);
    for row in rows {
        out.push('\n');
        out.push_str(row);
    }
    out.into_bytes()
}

fn stored_count(conn: &Connection) -> i64 {
    transactions::get_paged(conn, &TransactionFilter::default()).unwrap().1
}

#[test]
fn one_bad_row_does_not_block_the_good_one() {
    let mut conn = setup();
    let data = csv(&[
        "2026/01/15,支出,100,餐飲,現金,lunch",
        "2026-01-16,支出,250,餐飲,現金,dinner",
    ]);

    let result = import_transactions(&mut conn, &data).unwrap();
    assert_eq!(result.total_rows, 2);
    assert_eq!(result.success_count, 1);
    assert_eq!(result.failed_count, 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].line, 2);
    assert!(result.errors[0].message.contains("invalid date format"));
    assert_eq!(stored_count(&conn), 1);
}

#[test]
fn unknown_categories_are_synthesized_once_per_import() {
    let mut conn = setup();
    let data = csv(&[
        "2026-01-15,支出,100,寵物用品,現金,",
        "2026-01-16,支出,80,寵物用品,現金,",
        "2026-01-17,收入,500,寵物用品,現金,",
    ]);

    let result = import_transactions(&mut conn, &data).unwrap();
    assert_eq!(result.success_count, 3);

    // One expense and one income category; name uniqueness is per type.
    let expense = categories::get_by_type(&conn, TransactionType::Expense).unwrap();
    let income = categories::get_by_type(&conn, TransactionType::Income).unwrap();
    assert_eq!(expense.len(), 1);
    assert_eq!(income.len(), 1);
    assert_eq!(expense[0].name, "寵物用品");
    assert_eq!(expense[0].color.as_deref(), Some("#7C8798"));
    assert_eq!(income[0].color.as_deref(), Some("#4CAF50"));
    assert!(!expense[0].is_default);
}

#[test]
fn existing_categories_are_matched_case_insensitively() {
    let mut conn = setup();
    categories::create(
        &conn,
        &ledgerbook::models::NewCategory {
            name: "Dining".to_string(),
            icon: "🍽️".to_string(),
            r#type: TransactionType::Expense,
            color: None,
            sort_order: 0,
        },
    )
    .unwrap();

    let data = csv(&["2026-01-15,支出,100,DINING,現金,"]);
    let result = import_transactions(&mut conn, &data).unwrap();
    assert_eq!(result.success_count, 1);
    assert_eq!(categories::get_by_type(&conn, TransactionType::Expense).unwrap().len(), 1);
}

#[test]
fn account_matching_folds_non_ascii_case() {
    let mut conn = setup();
    accounts::create(
        &conn,
        &NewAccount {
            name: "CAFÉ".to_string(),
            r#type: AccountType::Bank,
            icon: "🏦".to_string(),
            initial_balance: Decimal::ZERO,
            currency: "TWD".to_string(),
        },
    )
    .unwrap();

    let data = csv(&["2026-01-15,支出,100,餐飲,Café,"]);
    let result = import_transactions(&mut conn, &data).unwrap();
    assert_eq!(result.success_count, 1);
    assert_eq!(result.failed_count, 0);
    assert_eq!(stored_count(&conn), 1);
}

#[test]
fn category_matching_folds_non_ascii_case() {
    let mut conn = setup();
    categories::create(
        &conn,
        &ledgerbook::models::NewCategory {
            name: "CAFÉ".to_string(),
            icon: "☕".to_string(),
            r#type: TransactionType::Expense,
            color: None,
            sort_order: 0,
        },
    )
    .unwrap();

    // Must reuse the stored category, not synthesize a colliding duplicate.
    let data = csv(&["2026-01-15,支出,100,Café,現金,", "2026-01-16,支出,50,CAFÉ,現金,"]);
    let result = import_transactions(&mut conn, &data).unwrap();
    assert_eq!(result.success_count, 2);
    assert_eq!(categories::get_by_type(&conn, TransactionType::Expense).unwrap().len(), 1);
}

#[test]
fn unknown_account_fails_the_row_with_its_name() {
    let mut conn = setup();
    let data = csv(&["2026-01-15,支出,100,餐飲,不存在的帳戶,"]);

    let result = import_transactions(&mut conn, &data).unwrap();
    assert_eq!(result.failed_count, 1);
    assert!(result.errors[0].message.contains("account not found: 不存在的帳戶"));
    assert_eq!(stored_count(&conn), 0);
}

#[test]
fn english_type_tokens_are_accepted_case_insensitively() {
    let mut conn = setup();
    let data = csv(&[
        "2026-01-15,Expense,100,餐飲,現金,",
        "2026-01-16,INCOME,500,薪資,現金,",
        "2026-01-17,transfer,10,餐飲,現金,",
    ]);

    let result = import_transactions(&mut conn, &data).unwrap();
    assert_eq!(result.success_count, 2);
    assert_eq!(result.failed_count, 1);
    assert!(result.errors[0].message.contains("invalid transaction type"));
}

#[test]
fn field_count_and_amount_errors_are_reported_per_row() {
    let mut conn = setup();
    let data = csv(&[
        "2026-01-15,支出,100,餐飲,現金",
        "2026-01-16,支出,-5,餐飲,現金,",
        "2026-01-17,支出,abc,餐飲,現金,",
        "2026-01-18,支出,20,,現金,",
        "2026-01-19,支出,20,餐飲,,",
    ]);

    let result = import_transactions(&mut conn, &data).unwrap();
    assert_eq!(result.total_rows, 5);
    assert_eq!(result.failed_count, 5);
    let messages: Vec<&str> = result.errors.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(
        messages,
        [
            "incorrect field count, expected 6",
            "amount must be greater than 0",
            "amount must be greater than 0",
            "category cannot be empty",
            "account cannot be empty",
        ]
    );
}

#[test]
fn header_only_and_empty_payloads_report_no_valid_data() {
    let mut conn = setup();

    let result = import_transactions(&mut conn, HEADER.as_bytes()).unwrap();
    assert_eq!(result.total_rows, 0);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].line, 0);
    assert_eq!(result.errors[0].message, "no valid data");

    let result = import_transactions(&mut conn, b"").unwrap();
    assert_eq!(result.errors[0].message, "no valid data");
}

#[test]
fn blank_lines_do_not_count_as_rows() {
    let mut conn = setup();
    let data = csv(&["", "2026-01-15,支出,100,餐飲,現金,", "   ", ""]);

    let result = import_transactions(&mut conn, &data).unwrap();
    assert_eq!(result.total_rows, 1);
    assert_eq!(result.success_count, 1);
}

#[test]
fn bom_prefixed_payloads_import_cleanly() {
    let mut conn = setup();
    let mut data = vec![0xEF, 0xBB, 0xBF];
    data.extend_from_slice(&csv(&["2026-01-15,支出,100,餐飲,現金,"]));

    let result = import_transactions(&mut conn, &data).unwrap();
    assert_eq!(result.success_count, 1);
}

#[test]
fn quoted_multiline_notes_survive_the_round_trip() {
    let mut conn = setup();
    let data = csv(&["2026-01-15,支出,100,餐飲,現金,\"first line\nsecond, \"\"quoted\"\"\""]);

    let result = import_transactions(&mut conn, &data).unwrap();
    assert_eq!(result.success_count, 1);

    let (page, _) = transactions::get_paged(&conn, &TransactionFilter::default()).unwrap();
    assert_eq!(page[0].note.as_deref(), Some("first line\nsecond, \"quoted\""));
}

#[test]
fn markup_is_stripped_from_text_fields() {
    let mut conn = setup();
    let data = csv(&[
        "2026-01-15,支出,100,<script>alert(1)</script>餐飲,現金,<b>lunch</b> at work",
    ]);

    let result = import_transactions(&mut conn, &data).unwrap();
    assert_eq!(result.success_count, 1);

    let expense = categories::get_by_type(&conn, TransactionType::Expense).unwrap();
    assert_eq!(expense[0].name, "餐飲");
    let (page, _) = transactions::get_paged(&conn, &TransactionFilter::default()).unwrap();
    assert_eq!(page[0].note.as_deref(), Some("lunch at work"));
}

#[test]
fn row_cap_aborts_without_persisting_anything() {
    let mut conn = setup();
    let mut rows = Vec::with_capacity(10_001);
    for i in 0..10_001 {
        rows.push(format!("2026-01-15,支出,1,餐飲,現金,row {i}"));
    }
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
    let data = csv(&refs);

    let result = import_transactions(&mut conn, &data).unwrap();
    assert_eq!(result.success_count, 0);
    assert_eq!(result.failed_count, result.total_rows);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.contains("10,000"));
    assert_eq!(stored_count(&conn), 0);
    assert!(categories::get_by_type(&conn, TransactionType::Expense).unwrap().is_empty());
}

#[test]
fn oversized_payloads_are_rejected_up_front() {
    let mut conn = setup();
    let data = vec![b'a'; (MAX_IMPORT_FILE_SIZE + 1) as usize];

    let result = import_transactions(&mut conn, &data).unwrap();
    assert_eq!(result.total_rows, 0);
    assert_eq!(result.errors[0].message, "CSV file size cannot exceed 5MB");
    assert_eq!(stored_count(&conn), 0);
}

#[test]
fn import_from_path_reads_the_file() {
    let mut conn = setup();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("import.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(&csv(&["2026-01-15,支出,42,餐飲,現金,"])).unwrap();

    let result = import_transactions_from_path(&mut conn, &path).unwrap();
    assert_eq!(result.success_count, 1);
    assert_eq!(stored_count(&conn), 1);
}

#[test]
fn failed_rows_are_not_persisted_alongside_good_ones() {
    let mut conn = setup();
    let data = csv(&[
        "2026-01-15,支出,100,餐飲,現金,keep",
        "bad-date,支出,100,餐飲,現金,drop",
        "2026-01-17,支出,60,餐飲,現金,keep too",
    ]);

    let result = import_transactions(&mut conn, &data).unwrap();
    assert_eq!(result.success_count, 2);
    assert_eq!(result.failed_count, 1);
    assert_eq!(result.errors[0].line, 3);
    assert_eq!(stored_count(&conn), 2);
}
