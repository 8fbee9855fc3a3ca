//! Transaction service - the user's income and expense records

use std::sync::Arc;

use serde_json::{json, Value as JsonValue};
use tracing::debug;

use crate::domain::result::{Error, Result};
use crate::domain::{Transaction, TransactionDraft};
use crate::ports::{decode_rows, first_row, Backend, TableQuery};
use crate::services::session::SessionManager;

const TABLE: &str = "transactions";

pub struct TransactionService {
    backend: Arc<dyn Backend>,
    session: Arc<SessionManager>,
}

impl TransactionService {
    pub fn new(backend: Arc<dyn Backend>, session: Arc<SessionManager>) -> Self {
        Self { backend, session }
    }

    /// All transactions, newest date first
    pub async fn list(&self) -> Result<Vec<Transaction>> {
        let (token, user_id) = self.session.authenticated().await?;
        let query = TableQuery::from(TABLE)
            .eq("user_id", user_id)
            .order("date", false);
        decode_rows(self.backend.select(&token, &query).await?)
    }

    pub async fn add(&self, draft: &TransactionDraft) -> Result<Transaction> {
        let (token, user_id) = self.session.authenticated().await?;
        let mut row = draft_row(draft)?;
        row["user_id"] = json!(user_id);

        let rows = self.backend.insert(&token, TABLE, row).await?;
        let created: Transaction = first_row(rows)?;
        debug!(id = %created.id, "transaction added");
        Ok(created)
    }

    pub async fn update(&self, id: &str, draft: &TransactionDraft) -> Result<Transaction> {
        let (token, user_id) = self.session.authenticated().await?;
        let query = TableQuery::from(TABLE).eq("id", id).eq("user_id", user_id);

        let rows = self.backend.update(&token, &query, draft_row(draft)?).await?;
        if rows.is_empty() {
            return Err(Error::not_found(format!("transaction {}", id)));
        }
        first_row(rows)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let (token, user_id) = self.session.authenticated().await?;
        let query = TableQuery::from(TABLE).eq("id", id).eq("user_id", user_id);
        self.backend.delete(&token, &query).await
    }
}

fn draft_row(draft: &TransactionDraft) -> Result<JsonValue> {
    Ok(serde_json::to_value(draft)?)
}
