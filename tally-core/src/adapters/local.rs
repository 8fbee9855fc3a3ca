//! Local demo backend on DuckDB
//!
//! Stands in for the hosted service when demo mode is on. Implements the
//! same three ports:
//! - auth: users with Argon2id password hashes, opaque random tokens
//! - tables: rows kept as JSON documents, scoped to the token's user
//! - storage: objects written under a directory, served as `file://` URLs

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use argon2::password_hash::Output;
use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use duckdb::{params, Connection};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{Map, Value as JsonValue};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{Session, User, UserMetadata};
use crate::migrations::MIGRATIONS;
use crate::ports::{
    AuthProvider, Backend, OAuthProvider, ObjectStorage, SignUpResponse, TableQuery, TableStore,
    UserChanges,
};
use crate::services::MigrationService;

pub const DEMO_DB_FILE: &str = "demo.duckdb";
pub const DEMO_STORAGE_DIR: &str = "demo-storage";

const TOKEN_LEN: usize = 40;
const SESSION_TTL_SECS: i64 = 3600;

/// Argon2id cost for demo accounts (19 MiB, 2 passes)
const ARGON2_MEMORY_KIB: u32 = 19_456;
const ARGON2_TIME_COST: u32 = 2;
const ARGON2_PARALLELISM: u32 = 1;
const ARGON2_HASH_LEN: usize = 32;

const OAUTH_UNAVAILABLE: &str = "OAuth sign-in is not available in demo mode";

fn rls_violation() -> Error {
    Error::backend(403, "new row violates row-level security policy")
}

fn random_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn derive_hash(password: &str, salt: &[u8]) -> Result<Vec<u8>> {
    let params = argon2::Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_TIME_COST,
        ARGON2_PARALLELISM,
        Some(ARGON2_HASH_LEN),
    )
    .map_err(|e| Error::Other(format!("Failed to create argon2 params: {:?}", e)))?;

    let argon2 = argon2::Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut hash = vec![0u8; ARGON2_HASH_LEN];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut hash)
        .map_err(|e| Error::Other(format!("Failed to hash password: {:?}", e)))?;
    Ok(hash)
}

fn hash_password(password: &str, salt: &[u8]) -> Result<String> {
    Ok(base64::engine::general_purpose::STANDARD.encode(derive_hash(password, salt)?))
}

/// Check `password` against a stored hash. `Output` equality is constant-time.
fn verify_password(password: &str, salt: &[u8], expected: &str) -> Result<bool> {
    let expected = base64::engine::general_purpose::STANDARD
        .decode(expected)
        .map_err(|e| Error::database(format!("Corrupt password hash: {}", e)))?;
    let expected = Output::new(&expected)
        .map_err(|e| Error::database(format!("Corrupt password hash: {}", e)))?;
    let actual = Output::new(&derive_hash(password, salt)?)
        .map_err(|e| Error::Other(format!("Failed to hash password: {}", e)))?;
    Ok(actual == expected)
}

/// Column naming the owning user. Profiles are keyed by the user id itself.
fn owner_column(table: &str) -> &'static str {
    if table == "profiles" {
        "id"
    } else {
        "user_id"
    }
}

/// DuckDB-backed demo backend
pub struct LocalBackend {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    storage_dir: PathBuf,
}

impl LocalBackend {
    /// Open (or create) the demo database and storage directory under `dir`
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let storage_dir = dir.join(DEMO_STORAGE_DIR);
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = dir.join(DEMO_DB_FILE);
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_with_flags(&db_path, config)?;

        let result = MigrationService::new(&conn, MIGRATIONS).run_pending()?;
        if !result.applied.is_empty() {
            debug!(applied = ?result.applied, "demo backend migrated");
        }

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            storage_dir,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    /// Number of registered demo users
    pub fn user_count(&self) -> Result<i64> {
        let conn = self.lock()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM local_users", [], |row| row.get(0))?)
    }

    fn find_user_by_email(conn: &Connection, email: &str) -> Result<Option<(User, String, String)>> {
        let mut stmt = conn.prepare(
            "SELECT user_id, email, user_metadata, password_salt, password_hash
             FROM local_users WHERE email = ?",
        )?;
        let row = stmt
            .query_map([email], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .next()
            .transpose()?;

        match row {
            Some((id, email, metadata, salt, hash)) => {
                let user = User {
                    id,
                    email,
                    user_metadata: serde_json::from_str(&metadata)?,
                };
                Ok(Some((user, salt, hash)))
            }
            None => Ok(None),
        }
    }

    fn find_user_by_id(conn: &Connection, user_id: &str) -> Result<User> {
        let mut stmt =
            conn.prepare("SELECT user_id, email, user_metadata FROM local_users WHERE user_id = ?")?;
        let row = stmt
            .query_map([user_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .next()
            .transpose()?;

        let (id, email, metadata) = row.ok_or_else(|| Error::backend(404, "User not found"))?;
        Ok(User {
            id,
            email,
            user_metadata: serde_json::from_str(&metadata)?,
        })
    }

    fn issue_session(conn: &Connection, user: User) -> Result<Session> {
        let access_token = random_token();
        let refresh_token = random_token();
        let expires_at = Utc::now().timestamp() + SESSION_TTL_SECS;

        conn.execute(
            "INSERT INTO local_sessions (access_token, refresh_token, user_id, expires_at)
             VALUES (?, ?, ?, ?)",
            params![&access_token, &refresh_token, &user.id, expires_at],
        )?;

        Ok(Session {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: SESSION_TTL_SECS,
            expires_at: Some(expires_at),
            user,
        })
    }

    /// Resolve the user behind an access token
    fn user_for_token(conn: &Connection, access_token: &str) -> Result<User> {
        let mut stmt = conn.prepare(
            "SELECT user_id, expires_at, revoked FROM local_sessions WHERE access_token = ?",
        )?;
        let row = stmt
            .query_map([access_token], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, bool>(2)?,
                ))
            })?
            .next()
            .transpose()?;

        match row {
            Some((_, _, true)) | None => Err(Error::backend(401, "Invalid JWT")),
            Some((_, expires_at, false)) if expires_at <= Utc::now().timestamp() => {
                Err(Error::backend(401, "JWT expired"))
            }
            Some((user_id, _, false)) => Self::find_user_by_id(conn, &user_id),
        }
    }

    fn load_rows(conn: &Connection, table: &str, owner_id: &str) -> Result<Vec<(String, JsonValue)>> {
        let mut stmt = conn.prepare(
            "SELECT row_id, data FROM local_rows
             WHERE table_name = ? AND owner_id = ?
             ORDER BY inserted_seq",
        )?;
        let rows = stmt.query_map([table, owner_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (row_id, data) = row?;
            result.push((row_id, serde_json::from_str(&data)?));
        }
        Ok(result)
    }

    fn row_exists(conn: &Connection, table: &str, row_id: &str) -> Result<Option<String>> {
        let mut stmt =
            conn.prepare("SELECT owner_id FROM local_rows WHERE table_name = ? AND row_id = ?")?;
        let owner = stmt
            .query_map([table, row_id], |row| row.get::<_, String>(0))?
            .next()
            .transpose()?;
        Ok(owner)
    }

    /// Fill defaults and enforce ownership on a row about to be written
    fn prepare_row(table: &str, row: JsonValue, user_id: &str) -> Result<Map<String, JsonValue>> {
        let JsonValue::Object(mut map) = row else {
            return Err(Error::validation("Row must be a JSON object"));
        };

        let owner_col = owner_column(table);
        match map.get(owner_col).and_then(JsonValue::as_str) {
            Some(owner) if owner != user_id => return Err(rls_violation()),
            Some(_) => {}
            None => {
                map.insert(owner_col.to_string(), JsonValue::String(user_id.to_string()));
            }
        }
        if let Some(owner) = map.get("user_id").and_then(JsonValue::as_str) {
            if owner != user_id {
                return Err(rls_violation());
            }
        }

        if !matches!(map.get("id"), Some(JsonValue::String(_))) {
            map.insert("id".to_string(), JsonValue::String(Uuid::new_v4().to_string()));
        }
        if !map.contains_key("created_at") {
            map.insert(
                "created_at".to_string(),
                JsonValue::String(Utc::now().to_rfc3339()),
            );
        }
        Ok(map)
    }

    fn row_id(map: &Map<String, JsonValue>) -> String {
        map.get("id")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string()
    }

    fn write_row(
        conn: &Connection,
        table: &str,
        user_id: &str,
        map: Map<String, JsonValue>,
        upsert: bool,
    ) -> Result<JsonValue> {
        let row_id = Self::row_id(&map);

        match Self::row_exists(conn, table, &row_id)? {
            Some(owner) if owner != user_id => Err(rls_violation()),
            Some(_) if !upsert => Err(Error::backend(
                409,
                "duplicate key value violates unique constraint",
            )),
            Some(_) => {
                let existing = Self::load_rows(conn, table, user_id)?
                    .into_iter()
                    .find(|(id, _)| *id == row_id)
                    .map(|(_, row)| row);
                let mut merged = match existing {
                    Some(JsonValue::Object(m)) => m,
                    _ => Map::new(),
                };
                for (k, v) in map {
                    if k == "created_at" && merged.contains_key("created_at") {
                        continue;
                    }
                    merged.insert(k, v);
                }
                let value = JsonValue::Object(merged);
                conn.execute(
                    "UPDATE local_rows SET data = ? WHERE table_name = ? AND row_id = ?",
                    params![value.to_string(), table, &row_id],
                )?;
                Ok(value)
            }
            None => {
                let value = JsonValue::Object(map);
                conn.execute(
                    "INSERT INTO local_rows (table_name, row_id, owner_id, data) VALUES (?, ?, ?, ?)",
                    params![table, &row_id, user_id, value.to_string()],
                )?;
                Ok(value)
            }
        }
    }

    fn object_path(&self, bucket: &str, path: &str) -> Result<PathBuf> {
        let mut full = self.storage_dir.join(bucket);
        for part in path.split('/').filter(|p| !p.is_empty()) {
            if part == ".." || part == "." {
                return Err(Error::validation("Invalid object path"));
            }
            full.push(part);
        }
        Ok(full)
    }
}

#[async_trait]
impl AuthProvider for LocalBackend {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
        _redirect_to: &str,
    ) -> Result<SignUpResponse> {
        let email = email.trim().to_lowercase();
        let conn = self.lock()?;

        if Self::find_user_by_email(&conn, &email)?.is_some() {
            return Err(Error::backend(422, "User already registered"));
        }

        let salt: [u8; 16] = rand::thread_rng().gen();
        let hash = hash_password(password, &salt)?;
        let user_id = Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO local_users (user_id, email, password_salt, password_hash, user_metadata, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                &user_id,
                &email,
                base64::engine::general_purpose::STANDARD.encode(salt),
                hash,
                serde_json::to_string(metadata)?,
                Utc::now().to_rfc3339(),
            ],
        )?;

        let user = User {
            id: user_id,
            email,
            user_metadata: metadata.clone(),
        };
        let session = Self::issue_session(&conn, user.clone())?;
        Ok(SignUpResponse {
            user: Some(user),
            session: Some(session),
        })
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let conn = self.lock()?;
        let invalid = || Error::backend(400, "Invalid login credentials");

        let (user, salt, expected) =
            Self::find_user_by_email(&conn, &email.trim().to_lowercase())?.ok_or_else(invalid)?;
        let salt = base64::engine::general_purpose::STANDARD
            .decode(salt)
            .map_err(|e| Error::database(format!("Corrupt password salt: {}", e)))?;

        if !verify_password(password, &salt, &expected)? {
            return Err(invalid());
        }
        Self::issue_session(&conn, user)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT user_id FROM local_sessions WHERE refresh_token = ? AND NOT revoked",
        )?;
        let user_id = stmt
            .query_map([refresh_token], |row| row.get::<_, String>(0))?
            .next()
            .transpose()?
            .ok_or_else(|| {
                Error::backend(400, "Invalid Refresh Token: Refresh Token Not Found")
            })?;

        conn.execute(
            "UPDATE local_sessions SET revoked = TRUE WHERE refresh_token = ?",
            [refresh_token],
        )?;
        let user = Self::find_user_by_id(&conn, &user_id)?;
        Self::issue_session(&conn, user)
    }

    async fn exchange_code(&self, _auth_code: &str, _code_verifier: &str) -> Result<Session> {
        Err(Error::Auth(OAUTH_UNAVAILABLE.to_string()))
    }

    async fn sign_out(&self, access_token: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE local_sessions SET revoked = TRUE WHERE access_token = ?",
            [access_token],
        )?;
        Ok(())
    }

    async fn recover_password(&self, _email: &str, _redirect_to: &str) -> Result<()> {
        // No mail in demo mode. Succeeds for any address, as the hosted service does.
        debug!("demo password recovery requested");
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<User> {
        let conn = self.lock()?;
        Self::user_for_token(&conn, access_token)
    }

    async fn update_user(&self, access_token: &str, changes: &UserChanges) -> Result<User> {
        let conn = self.lock()?;
        let user = Self::user_for_token(&conn, access_token)?;

        if let Some(email) = &changes.email {
            let email = email.trim().to_lowercase();
            if let Some((other, _, _)) = Self::find_user_by_email(&conn, &email)? {
                if other.id != user.id {
                    return Err(Error::backend(
                        422,
                        "A user with this email address has already been registered",
                    ));
                }
            }
            conn.execute(
                "UPDATE local_users SET email = ? WHERE user_id = ?",
                params![&email, &user.id],
            )?;
        }

        if let Some(password) = &changes.password {
            let salt: [u8; 16] = rand::thread_rng().gen();
            let hash = hash_password(password, &salt)?;
            conn.execute(
                "UPDATE local_users SET password_salt = ?, password_hash = ? WHERE user_id = ?",
                params![
                    base64::engine::general_purpose::STANDARD.encode(salt),
                    hash,
                    &user.id
                ],
            )?;
        }

        Self::find_user_by_id(&conn, &user.id)
    }

    fn authorize_url(
        &self,
        _provider: OAuthProvider,
        _redirect_to: &str,
        _code_challenge: &str,
    ) -> Result<String> {
        Err(Error::Auth(OAUTH_UNAVAILABLE.to_string()))
    }
}

#[async_trait]
impl TableStore for LocalBackend {
    async fn select(&self, access_token: &str, query: &TableQuery) -> Result<Vec<JsonValue>> {
        let conn = self.lock()?;
        let user = Self::user_for_token(&conn, access_token)?;

        let mut rows: Vec<JsonValue> = Self::load_rows(&conn, &query.table, &user.id)?
            .into_iter()
            .map(|(_, row)| row)
            .filter(|row| query.matches(row))
            .collect();
        query.sort(&mut rows);

        Ok(rows.into_iter().map(|row| query.project(row)).collect())
    }

    async fn insert(&self, access_token: &str, table: &str, row: JsonValue) -> Result<Vec<JsonValue>> {
        let conn = self.lock()?;
        let user = Self::user_for_token(&conn, access_token)?;
        let map = Self::prepare_row(table, row, &user.id)?;
        Ok(vec![Self::write_row(&conn, table, &user.id, map, false)?])
    }

    async fn upsert(&self, access_token: &str, table: &str, row: JsonValue) -> Result<Vec<JsonValue>> {
        let conn = self.lock()?;
        let user = Self::user_for_token(&conn, access_token)?;
        let map = Self::prepare_row(table, row, &user.id)?;
        Ok(vec![Self::write_row(&conn, table, &user.id, map, true)?])
    }

    async fn update(
        &self,
        access_token: &str,
        query: &TableQuery,
        patch: JsonValue,
    ) -> Result<Vec<JsonValue>> {
        let JsonValue::Object(patch) = patch else {
            return Err(Error::validation("Patch must be a JSON object"));
        };

        let conn = self.lock()?;
        let user = Self::user_for_token(&conn, access_token)?;
        let owner_col = owner_column(&query.table);

        let mut updated = Vec::new();
        for (row_id, row) in Self::load_rows(&conn, &query.table, &user.id)? {
            if !query.matches(&row) {
                continue;
            }
            let JsonValue::Object(mut map) = row else {
                continue;
            };
            for (k, v) in &patch {
                map.insert(k.clone(), v.clone());
            }
            if map.get(owner_col).and_then(JsonValue::as_str) != Some(user.id.as_str()) {
                return Err(rls_violation());
            }

            let value = JsonValue::Object(map);
            conn.execute(
                "UPDATE local_rows SET data = ? WHERE table_name = ? AND row_id = ?",
                params![value.to_string(), &query.table, &row_id],
            )?;
            updated.push(query.project(value));
        }
        Ok(updated)
    }

    async fn delete(&self, access_token: &str, query: &TableQuery) -> Result<()> {
        let conn = self.lock()?;
        let user = Self::user_for_token(&conn, access_token)?;

        for (row_id, row) in Self::load_rows(&conn, &query.table, &user.id)? {
            if query.matches(&row) {
                conn.execute(
                    "DELETE FROM local_rows WHERE table_name = ? AND row_id = ?",
                    params![&query.table, &row_id],
                )?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for LocalBackend {
    async fn upload(
        &self,
        access_token: &str,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
        upsert: bool,
    ) -> Result<()> {
        {
            let conn = self.lock()?;
            Self::user_for_token(&conn, access_token)?;
        }

        let target = self.object_path(bucket, path)?;
        if target.exists() && !upsert {
            return Err(Error::backend(409, "The resource already exists"));
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, bytes)?;
        debug!(bucket, "stored demo object");
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> Result<String> {
        let root = self.storage_dir.canonicalize()?;
        let mut full = root.join(bucket);
        for part in path.split('/').filter(|p| !p.is_empty()) {
            full.push(part);
        }
        Url::from_file_path(&full)
            .map(|u| u.to_string())
            .map_err(|_| Error::Other(format!("Cannot build file URL for {}", full.display())))
    }
}

impl Backend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    fn is_demo(&self) -> bool {
        true
    }
}
