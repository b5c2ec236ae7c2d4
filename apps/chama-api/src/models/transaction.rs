use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::schema::transactions;
use crate::error::UnknownVariant;

/// Kind of group-level ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Contribution,
    Withdrawal,
    Loan,
    Expense,
    Dividend,
    Other,
}

impl TransactionType {
    pub const ALL: [TransactionType; 6] = [
        TransactionType::Contribution,
        TransactionType::Withdrawal,
        TransactionType::Loan,
        TransactionType::Expense,
        TransactionType::Dividend,
        TransactionType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Contribution => "contribution",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Loan => "loan",
            TransactionType::Expense => "expense",
            TransactionType::Dividend => "dividend",
            TransactionType::Other => "other",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransactionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "transaction type",
                value: s.to_string(),
            })
    }
}

/// Group-level ledger entry, not tied to an individual member.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = transactions)]
pub struct Transaction {
    pub id: i64,
    pub chama_id: String,
    pub transaction_type: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub purpose: String,
    pub description: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = transactions)]
pub struct NewTransaction<'a> {
    pub id: i64,
    pub chama_id: &'a str,
    pub transaction_type: &'a str,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub purpose: &'a str,
    pub description: &'a str,
    pub created_by: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}
