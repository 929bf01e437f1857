// Copyright (c) 2025 Ledgerbook Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::ToSql;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "income" => Some(TransactionType::Income),
            "expense" => Some(TransactionType::Expense),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Cash,
    Bank,
    CreditCard,
    EPayment,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Cash => "cash",
            AccountType::Bank => "bank",
            AccountType::CreditCard => "credit_card",
            AccountType::EPayment => "e_payment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(AccountType::Cash),
            "bank" => Some(AccountType::Bank),
            "credit_card" => Some(AccountType::CreditCard),
            "e_payment" => Some(AccountType::EPayment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    Monthly,
    Weekly,
}

impl BudgetPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetPeriod::Monthly => "monthly",
            BudgetPeriod::Weekly => "weekly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "monthly" => Some(BudgetPeriod::Monthly),
            "weekly" => Some(BudgetPeriod::Weekly),
            _ => None,
        }
    }
}

macro_rules! sql_str_enum {
    ($ty:ident) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(self.as_str().into())
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()
                    .and_then(|s| $ty::parse(s).ok_or(FromSqlError::InvalidType))
            }
        }
    };
}

sql_str_enum!(TransactionType);
sql_str_enum!(AccountType);
sql_str_enum!(BudgetPeriod);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub r#type: AccountType,
    pub icon: String,
    pub initial_balance: Decimal,
    pub currency: String,
}

/// Input for account create/update. `id` is assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub r#type: AccountType,
    pub icon: String,
    pub initial_balance: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub r#type: TransactionType,
    pub color: Option<String>,
    pub sort_order: i64,
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub icon: String,
    pub r#type: TransactionType,
    pub color: Option<String>,
    /// Auto-assigned as max+1 within the type when not positive.
    pub sort_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub date: NaiveDate,
    pub r#type: TransactionType,
    pub amount: Decimal,
    pub category_id: i64,
    pub account_id: i64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub r#type: TransactionType,
    pub amount: Decimal,
    pub category_id: i64,
    pub account_id: i64,
    pub note: Option<String>,
}

/// Transaction row joined to its category/account display names.
/// Names are `None` when the referenced row is soft-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub date: NaiveDate,
    pub r#type: TransactionType,
    pub amount: Decimal,
    pub category_id: i64,
    pub category_name: Option<String>,
    pub account_id: i64,
    pub account_name: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub category_id: i64,
    pub amount: Decimal,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBudget {
    pub category_id: i64,
    pub amount: Decimal,
    pub period: BudgetPeriod,
    /// Defaults to the first day of the current month when absent.
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Normal,
    Warning,
    Exceeded,
}

impl BudgetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetStatus::Normal => "normal",
            BudgetStatus::Warning => "warning",
            BudgetStatus::Exceeded => "exceeded",
        }
    }
}

/// Budget evaluated against the spend of its resolved period.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetProgress {
    pub budget_id: i64,
    pub category_id: i64,
    pub category_name: String,
    pub category_icon: String,
    pub budget_amount: Decimal,
    pub spent_amount: Decimal,
    /// spent / budget * 100, unrounded. May exceed 100.
    pub usage_rate: Decimal,
    pub status: BudgetStatus,
    pub period: BudgetPeriod,
    pub start_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub balance: Decimal,
    pub has_data: bool,
}

/// One slice of the monthly expense pie. Percentages across a breakdown
/// always sum to exactly 100; rounding drift lands on the last slice.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryExpense {
    pub name: String,
    pub color: String,
    pub amount: Decimal,
    pub percentage: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyTrend {
    pub date: NaiveDate,
    pub income: Decimal,
    pub expense: Decimal,
}

/// Outcome of a CSV import run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportResult {
    pub total_rows: u32,
    pub success_count: u32,
    pub failed_count: u32,
    pub errors: Vec<ImportError>,
}

/// Row-level import failure. Line numbers are 1-based physical lines and
/// point at the start of the record, so a quoted multi-line row is reported
/// at its first line; line 0 marks file-level errors.
#[derive(Debug, Clone, Serialize)]
pub struct ImportError {
    pub line: u64,
    pub message: String,
}
