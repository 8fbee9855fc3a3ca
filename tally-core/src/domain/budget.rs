//! Budget domain model and spend tracking

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::{self, parse_positive_amount};
use super::result::{Error, Result};
use super::transaction::{Transaction, TransactionKind};

/// Budget window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    Weekly,
    #[default]
    Monthly,
}

impl BudgetPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// First day counted towards the budget when looking back from `today`
    pub fn window_start(&self, today: NaiveDate) -> NaiveDate {
        match self {
            Self::Weekly => today - Duration::days(7),
            Self::Monthly => today
                .checked_sub_months(Months::new(1))
                .unwrap_or(today - Duration::days(30)),
        }
    }
}

impl fmt::Display for BudgetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BudgetPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(Error::validation(format!(
                "Unknown budget period '{}'. Use weekly or monthly",
                other
            ))),
        }
    }
}

/// A per-category spending cap, as stored in the `budgets` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: String,
    pub user_id: String,
    pub category: String,
    #[serde(with = "money::amount")]
    pub amount: Decimal,
    #[serde(default)]
    pub period: BudgetPeriod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Fields a user supplies when creating or editing a budget
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetDraft {
    pub category: String,
    #[serde(with = "money::amount")]
    pub amount: Decimal,
    pub period: BudgetPeriod,
}

impl BudgetDraft {
    /// Parse form input; the period defaults to monthly
    pub fn parse(category: &str, amount: &str, period: Option<&str>) -> Result<Self> {
        let category = category.trim();
        if category.is_empty() {
            return Err(Error::validation("Please select a category"));
        }

        let amount = parse_positive_amount(amount)?;

        let period = match period {
            Some(p) if !p.trim().is_empty() => p.parse()?,
            _ => BudgetPeriod::default(),
        };

        Ok(Self {
            category: category.to_string(),
            amount,
            period,
        })
    }
}

/// Spend against a budget
#[derive(Debug, Clone, Serialize)]
pub struct BudgetProgress {
    pub budget: Budget,
    #[serde(with = "money::amount")]
    pub spent: Decimal,
    pub percentage: f64,
    pub over_budget: bool,
}

impl BudgetProgress {
    /// Compute spend for a budget over its window ending at `today`
    pub fn compute(budget: &Budget, transactions: &[Transaction], today: NaiveDate) -> Self {
        let start = budget.period.window_start(today);

        let spent: Decimal = transactions
            .iter()
            .filter(|t| {
                t.kind == TransactionKind::Expense
                    && t.category == budget.category
                    && t.date >= start
            })
            .fold(Decimal::ZERO, |acc, t| acc.saturating_add(t.amount));

        let percentage = if budget.amount.is_zero() {
            0.0
        } else {
            match spent
                .checked_div(budget.amount)
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            {
                Some(p) => p.to_f64().unwrap_or(0.0),
                // Ratio outside Decimal range; f64 has the headroom
                None => {
                    let spent = spent.to_f64().unwrap_or(f64::MAX);
                    let cap = budget.amount.to_f64().unwrap_or(f64::MAX);
                    spent / cap * 100.0
                }
            }
        };

        Self {
            budget: budget.clone(),
            spent,
            percentage,
            over_budget: percentage > 100.0,
        }
    }

    /// Progress bar fill, capped at 100
    pub fn bar(&self) -> f64 {
        self.percentage.min(100.0)
    }
}
