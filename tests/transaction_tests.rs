// Copyright (c) 2025 Ledgerbook Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use ledgerbook::models::{AccountType, NewAccount, NewCategory, NewTransaction, TransactionType};
use ledgerbook::services::transactions::{self, TransactionFilter};
use ledgerbook::services::{accounts, categories};
use rusqlite::Connection;
use rust_decimal::Decimal;

struct Fixture {
    conn: Connection,
    account_id: i64,
    dining_id: i64,
    salary_id: i64,
}

fn setup() -> Fixture {
    let mut conn = Connection::open_in_memory().unwrap();
    ledgerbook::db::init_schema(&mut conn).unwrap();
    let account = accounts::create(
        &conn,
        &NewAccount {
            name: "Cash".to_string(),
            r#type: AccountType::Cash,
            icon: "💵".to_string(),
            initial_balance: Decimal::ZERO,
            currency: "TWD".to_string(),
        },
    )
    .unwrap();
    let dining = categories::create(
        &conn,
        &NewCategory {
            name: "Dining".to_string(),
            icon: "🍽️".to_string(),
            r#type: TransactionType::Expense,
            color: None,
            sort_order: 0,
        },
    )
    .unwrap();
    let salary = categories::create(
        &conn,
        &NewCategory {
            name: "Salary".to_string(),
            icon: "💰".to_string(),
            r#type: TransactionType::Income,
            color: None,
            sort_order: 0,
        },
    )
    .unwrap();
    Fixture {
        conn,
        account_id: account.id,
        dining_id: dining.id,
        salary_id: salary.id,
    }
}

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

impl Fixture {
    fn add(&self, date: &str, r#type: TransactionType, amount: &str, note: Option<&str>) -> i64 {
        let category_id = match r#type {
            TransactionType::Income => self.salary_id,
            TransactionType::Expense => self.dining_id,
        };
        transactions::create(
            &self.conn,
            &NewTransaction {
                date: date.parse().unwrap(),
                r#type,
                amount: dec(amount),
                category_id,
                account_id: self.account_id,
                note: note.map(str::to_string),
            },
        )
        .unwrap()
        .id
    }
}

#[test]
fn create_joins_category_and_account_names() {
    let fx = setup();
    let id = fx.add("2026-02-14", TransactionType::Expense, "120.5", Some("lunch"));

    let record = transactions::get_by_id(&fx.conn, id).unwrap().unwrap();
    assert_eq!(record.amount, dec("120.5"));
    assert_eq!(record.category_name.as_deref(), Some("Dining"));
    assert_eq!(record.account_name.as_deref(), Some("Cash"));
    assert_eq!(record.note.as_deref(), Some("lunch"));
}

#[test]
fn create_validates_amount_and_note_length() {
    let fx = setup();
    let err = transactions::create(
        &fx.conn,
        &NewTransaction {
            date: "2026-02-14".parse().unwrap(),
            r#type: TransactionType::Expense,
            amount: Decimal::ZERO,
            category_id: fx.dining_id,
            account_id: fx.account_id,
            note: None,
        },
    )
    .unwrap_err();
    assert!(err.to_string().contains("amount must be greater than 0"));

    let long_note = "字".repeat(501);
    let err = transactions::create(
        &fx.conn,
        &NewTransaction {
            date: "2026-02-14".parse().unwrap(),
            r#type: TransactionType::Expense,
            amount: dec("1"),
            category_id: fx.dining_id,
            account_id: fx.account_id,
            note: Some(long_note),
        },
    )
    .unwrap_err();
    assert!(err.to_string().contains("note cannot exceed 500 characters"));
}

#[test]
fn paging_orders_newest_first_and_reports_full_count() {
    let fx = setup();
    for day in 1..=5 {
        fx.add(&format!("2026-03-{day:02}"), TransactionType::Expense, "10", None);
    }

    let filter = TransactionFilter {
        page: 1,
        page_size: 2,
        ..TransactionFilter::default()
    };
    let (page, total) = transactions::get_paged(&fx.conn, &filter).unwrap();
    assert_eq!(total, 5);
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].date, "2026-03-05".parse().unwrap());
    assert_eq!(page[1].date, "2026-03-04".parse().unwrap());

    let (last_page, _) = transactions::get_paged(
        &fx.conn,
        &TransactionFilter {
            page: 3,
            page_size: 2,
            ..TransactionFilter::default()
        },
    )
    .unwrap();
    assert_eq!(last_page.len(), 1);
    assert_eq!(last_page[0].date, "2026-03-01".parse().unwrap());
}

#[test]
fn filters_compose_with_and() {
    let fx = setup();
    fx.add("2026-03-01", TransactionType::Expense, "50", Some("Taxi home"));
    fx.add("2026-03-02", TransactionType::Expense, "150", Some("taxi airport"));
    fx.add("2026-03-10", TransactionType::Expense, "150", Some("groceries"));
    fx.add("2026-03-02", TransactionType::Income, "150", Some("taxi refund"));

    let filter = TransactionFilter {
        start_date: Some("2026-03-02".parse().unwrap()),
        end_date: Some("2026-03-31".parse().unwrap()),
        category_id: Some(fx.dining_id),
        min_amount: Some(dec("100")),
        max_amount: Some(dec("200")),
        keyword: Some("TAXI".to_string()),
        ..TransactionFilter::default()
    };
    let (page, total) = transactions::get_paged(&fx.conn, &filter).unwrap();
    assert_eq!(total, 1);
    assert_eq!(page[0].note.as_deref(), Some("taxi airport"));
}

#[test]
fn amount_bounds_are_inclusive() {
    let fx = setup();
    fx.add("2026-03-01", TransactionType::Expense, "99.99", None);
    fx.add("2026-03-02", TransactionType::Expense, "100", None);
    fx.add("2026-03-03", TransactionType::Expense, "250.5", None);

    let (_, total) = transactions::get_paged(
        &fx.conn,
        &TransactionFilter {
            min_amount: Some(dec("100")),
            max_amount: Some(dec("250.5")),
            ..TransactionFilter::default()
        },
    )
    .unwrap();
    assert_eq!(total, 2);
}

#[test]
fn zero_page_values_fall_back_to_defaults() {
    let fx = setup();
    for day in 1..=25 {
        fx.add(&format!("2026-03-{day:02}"), TransactionType::Expense, "1", None);
    }

    let (page, total) = transactions::get_paged(&fx.conn, &TransactionFilter::default()).unwrap();
    assert_eq!(total, 25);
    assert_eq!(page.len(), 20);
}

#[test]
fn update_replaces_fields_and_missing_id_returns_none() {
    let fx = setup();
    let id = fx.add("2026-03-01", TransactionType::Expense, "50", None);

    let updated = transactions::update(
        &fx.conn,
        id,
        &NewTransaction {
            date: "2026-03-09".parse().unwrap(),
            r#type: TransactionType::Income,
            amount: dec("75.25"),
            category_id: fx.salary_id,
            account_id: fx.account_id,
            note: Some("adjusted".to_string()),
        },
    )
    .unwrap()
    .unwrap();
    assert_eq!(updated.amount, dec("75.25"));
    assert_eq!(updated.r#type, TransactionType::Income);
    assert_eq!(updated.note.as_deref(), Some("adjusted"));

    let missing = transactions::update(
        &fx.conn,
        9999,
        &NewTransaction {
            date: "2026-03-09".parse().unwrap(),
            r#type: TransactionType::Expense,
            amount: dec("1"),
            category_id: fx.dining_id,
            account_id: fx.account_id,
            note: None,
        },
    )
    .unwrap();
    assert!(missing.is_none());
}

#[test]
fn deleted_transactions_leave_listings_and_counts() {
    let fx = setup();
    let keep = fx.add("2026-03-01", TransactionType::Expense, "10", None);
    let drop = fx.add("2026-03-02", TransactionType::Expense, "20", None);

    assert!(transactions::delete(&fx.conn, drop).unwrap());
    assert!(!transactions::delete(&fx.conn, drop).unwrap());
    assert!(transactions::get_by_id(&fx.conn, drop).unwrap().is_none());

    let (page, total) = transactions::get_paged(&fx.conn, &TransactionFilter::default()).unwrap();
    assert_eq!(total, 1);
    assert_eq!(page[0].id, keep);
}
