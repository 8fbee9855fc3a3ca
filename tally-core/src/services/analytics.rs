//! Analytics service - totals, spending by category and monthly trends

use std::sync::Arc;

use chrono::{Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::money;
use crate::domain::result::Result;
use crate::domain::{Transaction, TransactionKind};
use crate::ports::{decode_rows, Backend, TableQuery};
use crate::services::session::SessionManager;

const TABLE: &str = "transactions";
pub const DEFAULT_TREND_MONTHS: u32 = 6;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    #[serde(with = "money::amount")]
    pub total_income: Decimal,
    #[serde(with = "money::amount")]
    pub total_expense: Decimal,
    #[serde(with = "money::amount")]
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySpending {
    pub category: String,
    #[serde(with = "money::amount")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTrend {
    /// `YYYY-MM`
    pub month: String,
    #[serde(with = "money::amount")]
    pub income: Decimal,
    #[serde(with = "money::amount")]
    pub expense: Decimal,
}

#[derive(Debug, Deserialize)]
struct SpendingRow {
    category: String,
    #[serde(with = "money::amount")]
    amount: Decimal,
}

#[derive(Debug, Deserialize)]
struct TrendRow {
    #[serde(with = "money::date")]
    date: NaiveDate,
    #[serde(with = "money::amount")]
    amount: Decimal,
    // Raw string so unknown kinds still count, as expense
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// Income, expense and balance over `transactions`. Totals saturate at the
/// `Decimal` bounds.
pub fn summary(transactions: &[Transaction]) -> Summary {
    let mut result = Summary::default();
    for t in transactions {
        let total = match t.kind {
            TransactionKind::Income => &mut result.total_income,
            TransactionKind::Expense => &mut result.total_expense,
        };
        *total = total.saturating_add(t.amount);
    }
    result.balance = result.total_income.saturating_sub(result.total_expense);
    result
}

pub struct AnalyticsService {
    backend: Arc<dyn Backend>,
    session: Arc<SessionManager>,
}

impl AnalyticsService {
    pub fn new(backend: Arc<dyn Backend>, session: Arc<SessionManager>) -> Self {
        Self { backend, session }
    }

    /// Expense totals per category, in the order categories first appear
    pub async fn spending_by_category(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<CategorySpending>> {
        let (token, user_id) = self.session.authenticated().await?;
        let mut query = TableQuery::from(TABLE)
            .select("category,amount")
            .eq("user_id", user_id)
            .eq("type", TransactionKind::Expense.as_str());
        if let Some(start) = start {
            query = query.gte("date", start.format("%Y-%m-%d").to_string());
        }
        if let Some(end) = end {
            query = query.lte("date", end.format("%Y-%m-%d").to_string());
        }

        let rows: Vec<SpendingRow> = decode_rows(self.backend.select(&token, &query).await?)?;
        let mut totals: Vec<CategorySpending> = Vec::new();
        for row in rows {
            match totals.iter_mut().find(|c| c.category == row.category) {
                Some(entry) => entry.amount = entry.amount.saturating_add(row.amount),
                None => totals.push(CategorySpending {
                    category: row.category,
                    amount: row.amount,
                }),
            }
        }
        Ok(totals)
    }

    /// Income and expense per month over the last `months` months
    pub async fn monthly_trends(&self, months: u32) -> Result<Vec<MonthlyTrend>> {
        self.monthly_trends_since(months, Utc::now().date_naive())
            .await
    }

    async fn monthly_trends_since(&self, months: u32, today: NaiveDate) -> Result<Vec<MonthlyTrend>> {
        let (token, user_id) = self.session.authenticated().await?;
        let start = today
            .checked_sub_months(Months::new(months))
            .unwrap_or(NaiveDate::MIN);
        let query = TableQuery::from(TABLE)
            .select("date,amount,type")
            .eq("user_id", user_id)
            .gte("date", start.format("%Y-%m-%d").to_string())
            .order("date", true);

        let rows: Vec<TrendRow> = decode_rows(self.backend.select(&token, &query).await?)?;
        Ok(group_by_month(&rows))
    }
}

fn group_by_month(rows: &[TrendRow]) -> Vec<MonthlyTrend> {
    let mut trends: Vec<MonthlyTrend> = Vec::new();
    for row in rows {
        let month = row.date.format("%Y-%m").to_string();
        let index = match trends.iter().position(|t| t.month == month) {
            Some(i) => i,
            None => {
                trends.push(MonthlyTrend {
                    month,
                    income: Decimal::ZERO,
                    expense: Decimal::ZERO,
                });
                trends.len() - 1
            }
        };
        let trend = &mut trends[index];
        if row.kind.as_deref() == Some(TransactionKind::Income.as_str()) {
            trend.income = trend.income.saturating_add(row.amount);
        } else {
            trend.expense = trend.expense.saturating_add(row.amount);
        }
    }
    trends
}
