//! Transaction domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::{self, parse_date, parse_positive_amount};
use super::result::{Error, Result};

/// Income or expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    #[default]
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Sign shown in front of the amount in lists
    pub fn sign(&self) -> char {
        match self {
            Self::Income => '+',
            Self::Expense => '-',
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(Error::validation(format!(
                "Unknown transaction type '{}'. Use income or expense",
                other
            ))),
        }
    }
}

/// A dated income/expense record as stored in the `transactions` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(with = "money::amount")]
    pub amount: Decimal,
    pub category: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(with = "money::date")]
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Fields a user supplies when adding or editing a transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionDraft {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    #[serde(with = "money::amount")]
    pub amount: Decimal,
    pub category: String,
    pub description: String,
    #[serde(with = "money::date")]
    pub date: NaiveDate,
}

/// Raw form input for a transaction, before parsing
#[derive(Debug, Clone, Default)]
pub struct TransactionInput {
    pub kind: Option<String>,
    pub amount: String,
    pub category: String,
    pub description: Option<String>,
    pub date: Option<String>,
}

impl TransactionDraft {
    /// Parse form input. Type defaults to expense and date to `today`.
    pub fn parse(input: &TransactionInput, today: NaiveDate) -> Result<Self> {
        let kind = match input.kind.as_deref() {
            Some(k) if !k.trim().is_empty() => k.parse()?,
            _ => TransactionKind::default(),
        };

        let amount = parse_positive_amount(&input.amount)?;

        let category = input.category.trim();
        if category.is_empty() {
            return Err(Error::validation("Please select a category"));
        }

        let date = match input.date.as_deref() {
            Some(d) if !d.trim().is_empty() => parse_date(d.trim())
                .ok_or_else(|| Error::validation("Invalid date format. Use YYYY-MM-DD"))?,
            _ => today,
        };

        Ok(Self {
            kind,
            amount,
            category: category.to_string(),
            description: input
                .description
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string(),
            date,
        })
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    #[test]
    fn test_parse_defaults() {
        let draft = TransactionDraft::parse(
            &TransactionInput {
                amount: "12000".to_string(),
                category: "Rent".to_string(),
                ..Default::default()
            },
            today(),
        )
        .unwrap();

        assert_eq!(draft.kind, TransactionKind::Expense);
        assert_eq!(draft.date, today());
        assert_eq!(draft.description, "");
        assert_eq!(draft.amount, Decimal::new(12000, 0));
    }

    #[test]
    fn test_parse_rejects_bad_amount() {
        for amount in ["", "abc", "0", "-5"] {
            let err = TransactionDraft::parse(
                &TransactionInput {
                    amount: amount.to_string(),
                    category: "Rent".to_string(),
                    ..Default::default()
                },
                today(),
            )
            .unwrap_err();
            assert!(err.to_string().contains("valid amount"), "amount {:?}", amount);
        }
    }

    #[test]
    fn test_parse_requires_category() {
        let err = TransactionDraft::parse(
            &TransactionInput {
                amount: "10".to_string(),
                category: "   ".to_string(),
                ..Default::default()
            },
            today(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Please select a category"));
    }

    #[test]
    fn test_row_roundtrip_from_backend() {
        let json = r#"{
            "id": "t1", "user_id": "u1", "type": "income", "amount": 85000,
            "category": "Salary", "description": null, "date": "2025-01-01",
            "created_at": "2025-01-01T08:00:00.123456+00:00"
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.kind, TransactionKind::Income);
        assert_eq!(tx.description, "");
        assert!(tx.created_at.is_some());
        assert_eq!(tx.amount, Decimal::new(85000, 0));
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Income".parse::<TransactionKind>().unwrap(), TransactionKind::Income);
        assert!("transfer".parse::<TransactionKind>().is_err());
    }
}
