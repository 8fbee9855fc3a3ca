//! Category service

use std::sync::Arc;

use serde_json::json;

use crate::domain::result::{Error, Result};
use crate::domain::Category;
use crate::ports::{decode_rows, first_row, Backend, TableQuery};
use crate::services::session::SessionManager;

const TABLE: &str = "categories";

pub struct CategoryService {
    backend: Arc<dyn Backend>,
    session: Arc<SessionManager>,
}

impl CategoryService {
    pub fn new(backend: Arc<dyn Backend>, session: Arc<SessionManager>) -> Self {
        Self { backend, session }
    }

    /// Categories sorted by name
    pub async fn list(&self) -> Result<Vec<Category>> {
        let (token, user_id) = self.session.authenticated().await?;
        let query = TableQuery::from(TABLE)
            .eq("user_id", user_id)
            .order("name", true);
        decode_rows(self.backend.select(&token, &query).await?)
    }

    pub async fn add(&self, name: &str) -> Result<Category> {
        let name = Category::normalize_name(name)?;
        let (token, user_id) = self.session.authenticated().await?;
        let row = json!({ "user_id": user_id, "name": name });
        first_row(self.backend.insert(&token, TABLE, row).await?)
    }

    pub async fn rename(&self, id: &str, name: &str) -> Result<Category> {
        let name = Category::normalize_name(name)?;
        let (token, user_id) = self.session.authenticated().await?;
        let query = TableQuery::from(TABLE).eq("id", id).eq("user_id", user_id);

        let rows = self.backend.update(&token, &query, json!({ "name": name })).await?;
        if rows.is_empty() {
            return Err(Error::not_found(format!("category {}", id)));
        }
        first_row(rows)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let (token, user_id) = self.session.authenticated().await?;
        let query = TableQuery::from(TABLE).eq("id", id).eq("user_id", user_id);
        self.backend.delete(&token, &query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::supabase_mock::{signed_in, MockConfig, MockSupabaseServer, MOCK_USER_ID};
    use tempfile::{tempdir, TempDir};

    fn service(config: MockConfig) -> (MockSupabaseServer, CategoryService, TempDir) {
        let server = MockSupabaseServer::start(config).unwrap();
        let dir = tempdir().unwrap();
        let (backend, session) = signed_in(&server, dir.path());
        (server, CategoryService::new(backend, session), dir)
    }

    #[tokio::test]
    async fn test_blank_name_never_reaches_backend() {
        let (server, svc, _dir) = service(MockConfig::default());
        let err = svc.add("   ").await.unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Category name is required");
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn test_add_and_list() {
        let (server, svc, _dir) = service(MockConfig {
            rows: vec![json!({ "id": "c1", "user_id": MOCK_USER_ID, "name": "Rent" })],
            ..Default::default()
        });

        let created = svc.add("  Groceries ").await.unwrap();
        assert_eq!(created.name, "Groceries");

        let listed = svc.list().await.unwrap();
        assert_eq!(listed[0].name, "Rent");
        let req = server.last_request("GET", "/rest/v1/categories").unwrap();
        assert!(req.path.contains("order=name.asc"));
    }

    #[tokio::test]
    async fn test_rename_sends_only_name() {
        let (server, svc, _dir) = service(MockConfig::default());
        let renamed = svc.rename("c1", "Food").await.unwrap();
        assert_eq!(renamed.name, "Food");

        let req = server.last_request("PATCH", "/rest/v1/categories").unwrap();
        assert_eq!(req.body_json(), json!({ "name": "Food" }));
    }
}
