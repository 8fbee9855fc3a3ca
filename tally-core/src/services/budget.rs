//! Budget service - per-category spending caps and their progress

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;

use crate::domain::result::{Error, Result};
use crate::domain::{Budget, BudgetDraft, BudgetProgress, Transaction};
use crate::ports::{decode_rows, first_row, Backend, TableQuery};
use crate::services::session::SessionManager;

const TABLE: &str = "budgets";

pub struct BudgetService {
    backend: Arc<dyn Backend>,
    session: Arc<SessionManager>,
}

impl BudgetService {
    pub fn new(backend: Arc<dyn Backend>, session: Arc<SessionManager>) -> Self {
        Self { backend, session }
    }

    /// All budgets, most recently created first
    pub async fn list(&self) -> Result<Vec<Budget>> {
        let (token, user_id) = self.session.authenticated().await?;
        let query = TableQuery::from(TABLE)
            .eq("user_id", user_id)
            .order("created_at", false);
        decode_rows(self.backend.select(&token, &query).await?)
    }

    pub async fn add(&self, draft: &BudgetDraft) -> Result<Budget> {
        let (token, user_id) = self.session.authenticated().await?;
        let mut row = serde_json::to_value(draft)?;
        row["user_id"] = json!(user_id);
        first_row(self.backend.insert(&token, TABLE, row).await?)
    }

    pub async fn update(&self, id: &str, draft: &BudgetDraft) -> Result<Budget> {
        let (token, user_id) = self.session.authenticated().await?;
        let query = TableQuery::from(TABLE).eq("id", id).eq("user_id", user_id);

        let rows = self
            .backend
            .update(&token, &query, serde_json::to_value(draft)?)
            .await?;
        if rows.is_empty() {
            return Err(Error::not_found(format!("budget {}", id)));
        }
        first_row(rows)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let (token, user_id) = self.session.authenticated().await?;
        let query = TableQuery::from(TABLE).eq("id", id).eq("user_id", user_id);
        self.backend.delete(&token, &query).await
    }
}

/// Spending against each budget as of `today`
pub fn progress(budgets: &[Budget], transactions: &[Transaction], today: NaiveDate) -> Vec<BudgetProgress> {
    budgets
        .iter()
        .map(|b| BudgetProgress::compute(b, transactions, today))
        .collect()
}
