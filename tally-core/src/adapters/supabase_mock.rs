//! Mock Supabase server for testing
//!
//! A small threaded HTTP server answering the auth, rest and storage routes
//! the client uses, so the hosted adapter and the services on top of it can
//! be exercised without a real project:
//! - POST /auth/v1/token?grant_type=password|refresh_token|pkce returns a session
//! - POST /auth/v1/signup returns a session (auto-confirm) or a bare user
//! - GET|PUT /auth/v1/user returns the user
//! - GET|POST|PATCH|DELETE /rest/v1/{table} echoes rows
//! - POST /storage/v1/object/{bucket}/{path} accepts uploads
//!
//! Every request is recorded for assertions.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use chrono::Utc;
use serde_json::{json, Value as JsonValue};

use crate::adapters::supabase::SupabaseClient;
use crate::domain::{Session, User};
use crate::ports::Backend;
use crate::services::session::{AuthEvent, SessionManager, SESSION_FILE};

pub const MOCK_PASSWORD: &str = "Secret123";
pub const MOCK_USER_ID: &str = "11111111-2222-3333-4444-555555555555";

/// Configuration for mock behaviour
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Sign-up returns a session instead of requiring email confirmation
    pub auto_confirm: bool,
    /// Seconds until issued sessions expire
    pub expires_in: i64,
    /// Refresh-token grants fail with 400
    pub fail_refresh: bool,
    /// Every request answers 429
    pub rate_limit: bool,
    /// Rows returned by table reads
    pub rows: Vec<JsonValue>,
    /// Updates match nothing
    pub empty_updates: bool,
    /// Inserts into this table fail with 409
    pub fail_table: Option<String>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            auto_confirm: true,
            expires_in: 3600,
            fail_refresh: false,
            rate_limit: false,
            rows: Vec::new(),
            empty_updates: false,
            fail_table: None,
        }
    }
}

/// A request as seen by the mock
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Raw header block, lower-cased
    pub headers: String,
    pub body: String,
}

impl RecordedRequest {
    pub fn body_json(&self) -> JsonValue {
        serde_json::from_str(&self.body).unwrap_or(JsonValue::Null)
    }

    pub fn has_header(&self, name: &str, value: &str) -> bool {
        self.headers
            .contains(&format!("{}: {}", name.to_lowercase(), value.to_lowercase()))
    }
}

/// Mock server handle; stops on drop
pub struct MockSupabaseServer {
    port: u16,
    running: Arc<AtomicBool>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockSupabaseServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let requests = Arc::new(Mutex::new(Vec::new()));

        listener.set_nonblocking(true)?;

        let running_clone = running.clone();
        let requests_clone = requests.clone();
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        let log = requests_clone.clone();
                        thread::spawn(move || handle_connection(stream, &cfg, &log));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            requests,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// The most recent request whose path starts with `prefix`
    pub fn last_request(&self, method: &str, prefix: &str) -> Option<RecordedRequest> {
        self.requests()
            .into_iter()
            .rev()
            .find(|r| r.method == method && r.path.starts_with(prefix))
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockSupabaseServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut data = Vec::new();
    let mut buffer = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            return None;
        }
        data.extend_from_slice(&buffer[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&data[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while data.len() < header_end + content_length {
        let n = stream.read(&mut buffer).ok()?;
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buffer[..n]);
    }

    let mut first = head.lines().next().unwrap_or("").split_whitespace();
    let method = first.next()?.to_string();
    let path = first.next()?.to_string();
    let body_end = data.len().min(header_end + content_length);

    Some(RecordedRequest {
        method,
        path,
        headers: head.to_lowercase(),
        body: String::from_utf8_lossy(&data[header_end..body_end]).to_string(),
    })
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig, log: &Mutex<Vec<RecordedRequest>>) {
    let _ = stream.set_nonblocking(false);
    let Some(request) = read_request(&mut stream) else {
        send_response(&mut stream, 400, "Bad Request", r#"{"error":"Invalid request"}"#);
        return;
    };
    if let Ok(mut requests) = log.lock() {
        requests.push(request.clone());
    }

    if config.rate_limit {
        send_response(&mut stream, 429, "Too Many Requests", "{}");
        return;
    }

    if !request.headers.contains("apikey: ") {
        send_response(&mut stream, 401, "Unauthorized", r#"{"message":"No API key found in request"}"#);
        return;
    }

    let (route, query) = request
        .path
        .split_once('?')
        .unwrap_or((request.path.as_str(), ""));
    let body = request.body_json();

    match (request.method.as_str(), route) {
        ("POST", "/auth/v1/token") => {
            if query.contains("grant_type=password") {
                if body["password"] == MOCK_PASSWORD {
                    let email = body["email"].as_str().unwrap_or_default();
                    send_json(&mut stream, 200, &session_json(email, config.expires_in));
                } else {
                    send_response(
                        &mut stream,
                        400,
                        "Bad Request",
                        r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
                    );
                }
            } else if query.contains("grant_type=refresh_token") {
                if config.fail_refresh {
                    send_response(
                        &mut stream,
                        400,
                        "Bad Request",
                        r#"{"error":"invalid_grant","error_description":"Invalid Refresh Token: Refresh Token Not Found"}"#,
                    );
                } else {
                    let mut session = session_json("mock@example.com", 3600);
                    session["access_token"] = json!("refreshed-access");
                    session["refresh_token"] = json!("refreshed-refresh");
                    send_json(&mut stream, 200, &session);
                }
            } else if query.contains("grant_type=pkce") {
                if body["code_verifier"].as_str().unwrap_or_default().is_empty() {
                    send_response(
                        &mut stream,
                        400,
                        "Bad Request",
                        r#"{"error":"invalid_request","error_description":"code verifier missing"}"#,
                    );
                } else {
                    send_json(&mut stream, 200, &session_json("oauth@example.com", 3600));
                }
            } else {
                send_response(&mut stream, 400, "Bad Request", r#"{"msg":"unsupported grant type"}"#);
            }
        }
        ("POST", "/auth/v1/signup") => {
            let email = body["email"].as_str().unwrap_or_default();
            let mut user = user_json(email);
            user["user_metadata"] = body["data"].clone();
            if config.auto_confirm {
                let mut session = session_json(email, config.expires_in);
                session["user"] = user;
                send_json(&mut stream, 200, &session);
            } else {
                send_json(&mut stream, 200, &user);
            }
        }
        ("POST", "/auth/v1/logout") => send_response(&mut stream, 204, "No Content", ""),
        ("POST", "/auth/v1/recover") => send_response(&mut stream, 200, "OK", "{}"),
        ("GET", "/auth/v1/user") => send_json(&mut stream, 200, &user_json("mock@example.com")),
        ("PUT", "/auth/v1/user") => {
            let email = body["email"].as_str().unwrap_or("mock@example.com");
            send_json(&mut stream, 200, &user_json(email));
        }
        (method, r) if r.starts_with("/rest/v1/") => {
            let table = &r["/rest/v1/".len()..];
            handle_table(&mut stream, config, method, table, body);
        }
        ("POST", r) if r.starts_with("/storage/v1/object/") => {
            let key = &r["/storage/v1/object/".len()..];
            send_json(&mut stream, 200, &json!({ "Key": key }));
        }
        _ => send_response(&mut stream, 404, "Not Found", r#"{"message":"Endpoint not found"}"#),
    }
}

fn handle_table(stream: &mut TcpStream, config: &MockConfig, method: &str, table: &str, body: JsonValue) {
    match method {
        "GET" => send_json(stream, 200, &JsonValue::Array(config.rows.clone())),
        "POST" => {
            if config.fail_table.as_deref() == Some(table) {
                send_response(
                    stream,
                    409,
                    "Conflict",
                    r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#,
                );
                return;
            }
            let mut row = body;
            if row.get("id").is_none() {
                row["id"] = json!(format!("{}-1", table));
            }
            send_json(stream, 201, &json!([row]));
        }
        "PATCH" => {
            if config.empty_updates {
                send_json(stream, 200, &json!([]));
            } else {
                let mut row = body;
                row["id"] = json!(format!("{}-1", table));
                send_json(stream, 200, &json!([row]));
            }
        }
        "DELETE" => send_response(stream, 204, "No Content", ""),
        _ => send_response(stream, 405, "Method Not Allowed", r#"{"message":"Method not allowed"}"#),
    }
}

fn user_json(email: &str) -> JsonValue {
    json!({
        "id": MOCK_USER_ID,
        "aud": "authenticated",
        "email": email,
        "user_metadata": { "full_name": "Mock User" },
    })
}

/// Client for `server` with a signed-in mock user whose token is "tok"
pub fn signed_in(server: &MockSupabaseServer, dir: &Path) -> (Arc<dyn Backend>, Arc<SessionManager>) {
    let backend: Arc<dyn Backend> =
        Arc::new(SupabaseClient::new(&server.base_url(), "anon").unwrap());
    let session = Arc::new(SessionManager::new(backend.clone(), &dir.join(SESSION_FILE)).unwrap());
    session
        .set(
            Session {
                access_token: "tok".to_string(),
                refresh_token: "ref".to_string(),
                token_type: "bearer".to_string(),
                expires_in: 3600,
                expires_at: Some(Utc::now().timestamp() + 3600),
                user: User::new(MOCK_USER_ID, "mock@example.com"),
            },
            AuthEvent::SignedIn,
        )
        .unwrap();
    (backend, session)
}

fn session_json(email: &str, expires_in: i64) -> JsonValue {
    json!({
        "access_token": "mock-access",
        "refresh_token": "mock-refresh",
        "token_type": "bearer",
        "expires_in": expires_in,
        "expires_at": Utc::now().timestamp() + expires_in,
        "user": user_json(email),
    })
}

fn send_json(stream: &mut TcpStream, status: u16, body: &JsonValue) {
    let text = match status {
        200 => "OK",
        201 => "Created",
        _ => "Unknown",
    };
    send_response(stream, status, text, &body.to_string());
}

fn send_response(stream: &mut TcpStream, status: u16, status_text: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserMetadata;
    use crate::ports::{AuthProvider, ObjectStorage, TableQuery, TableStore, UserChanges};

    fn client(server: &MockSupabaseServer) -> SupabaseClient {
        SupabaseClient::new(&server.base_url(), "anon-key").unwrap()
    }

    #[tokio::test]
    async fn test_password_sign_in() {
        let server = MockSupabaseServer::start(MockConfig::default()).unwrap();
        let session = client(&server)
            .sign_in_with_password("a@b.co", MOCK_PASSWORD)
            .await
            .unwrap();

        assert_eq!(session.access_token, "mock-access");
        assert_eq!(session.user.email, "a@b.co");

        let req = server.last_request("POST", "/auth/v1/token").unwrap();
        assert!(req.path.contains("grant_type=password"));
        assert!(req.has_header("apikey", "anon-key"));
        assert!(req.has_header("authorization", "Bearer anon-key"));
    }

    #[tokio::test]
    async fn test_bad_credentials_surface_remote_message() {
        let server = MockSupabaseServer::start(MockConfig::default()).unwrap();
        let err = client(&server)
            .sign_in_with_password("a@b.co", "wrong")
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert_eq!(err.to_string(), "Invalid login credentials");
    }

    #[tokio::test]
    async fn test_rate_limit_message() {
        let server = MockSupabaseServer::start(MockConfig {
            rate_limit: true,
            ..Default::default()
        })
        .unwrap();
        let err = client(&server).get_user("tok").await.unwrap_err();
        assert!(err.to_string().contains("Rate limit exceeded"));
    }

    #[tokio::test]
    async fn test_sign_up_sends_metadata_and_redirect() {
        let server = MockSupabaseServer::start(MockConfig {
            auto_confirm: false,
            ..Default::default()
        })
        .unwrap();
        let metadata = UserMetadata {
            full_name: Some("Ada Lovelace".to_string()),
            avatar_url: None,
        };
        let outcome = client(&server)
            .sign_up("ada@example.com", "Secret123", &metadata, "http://localhost:5173/dashboard")
            .await
            .unwrap();

        assert!(outcome.session.is_none());
        let req = server.last_request("POST", "/auth/v1/signup").unwrap();
        assert!(req.path.contains("redirect_to=http%3A%2F%2Flocalhost%3A5173%2Fdashboard"));
        let body = req.body_json();
        assert_eq!(body["data"]["full_name"], "Ada Lovelace");
        assert!(body["data"]["avatar_url"].is_null());
    }

    #[tokio::test]
    async fn test_table_requests_use_postgrest_syntax() {
        let server = MockSupabaseServer::start(MockConfig {
            rows: vec![json!({"id": "t1"})],
            ..Default::default()
        })
        .unwrap();
        let c = client(&server);

        let rows = c
            .select(
                "user-token",
                &TableQuery::from("transactions").eq("user_id", "u1").order("date", false),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        let req = server.last_request("GET", "/rest/v1/transactions").unwrap();
        assert!(req.path.contains("user_id=eq.u1"));
        assert!(req.path.contains("order=date.desc"));
        assert!(req.has_header("authorization", "Bearer user-token"));

        c.upsert("user-token", "profiles", json!({"id": "u1"})).await.unwrap();
        let req = server.last_request("POST", "/rest/v1/profiles").unwrap();
        assert!(req.has_header("prefer", "resolution=merge-duplicates,return=representation"));

        c.delete("user-token", &TableQuery::from("budgets").eq("id", "b1"))
            .await
            .unwrap();
        let req = server.last_request("DELETE", "/rest/v1/budgets").unwrap();
        assert!(req.path.contains("id=eq.b1"));
        assert!(!req.path.contains("select="));
    }

    #[tokio::test]
    async fn test_update_user_and_upload() {
        let server = MockSupabaseServer::start(MockConfig::default()).unwrap();
        let c = client(&server);

        let user = c
            .update_user(
                "tok",
                &UserChanges {
                    email: Some("new@example.com".to_string()),
                    password: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(user.email, "new@example.com");
        let req = server.last_request("PUT", "/auth/v1/user").unwrap();
        assert!(req.body_json().get("password").is_none());

        c.upload("tok", "avatars", "u1/avatar-1.png", vec![1, 2, 3], "image/png", true)
            .await
            .unwrap();
        let req = server
            .last_request("POST", "/storage/v1/object/avatars/u1/avatar-1.png")
            .unwrap();
        assert!(req.has_header("x-upsert", "true"));
        assert!(req.has_header("content-type", "image/png"));
    }
}
