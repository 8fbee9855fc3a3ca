//! Session manager - holds, persists and refreshes the auth session
//!
//! The session is kept as JSON in the tally directory so a later process can
//! pick it up. Access tokens close to expiry are refreshed transparently.
//! Auth state changes are broadcast to subscribers.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tracing::{debug, warn};

use crate::domain::result::{Error, Result};
use crate::domain::{Session, User};
use crate::ports::Backend;

pub const SESSION_FILE: &str = "session.json";
pub const DEMO_SESSION_FILE: &str = "demo-session.json";
const CODE_VERIFIER_FILE: &str = "code_verifier";

/// Refresh when the access token expires within this many seconds
pub const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

pub struct SessionManager {
    backend: Arc<dyn Backend>,
    session_path: PathBuf,
    verifier_path: PathBuf,
    current: Mutex<Option<Session>>,
    // Held across the refresh request; a refresh token is single-use
    refreshing: AsyncMutex<()>,
    events: broadcast::Sender<AuthEvent>,
}

impl SessionManager {
    /// Restore any persisted session from `session_path`
    pub fn new(backend: Arc<dyn Backend>, session_path: &Path) -> Result<Self> {
        let current = match std::fs::read_to_string(session_path) {
            Ok(content) => match serde_json::from_str::<Session>(&content) {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!(error = %e, "ignoring unreadable session file");
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let verifier_path = session_path
            .parent()
            .map(|p| p.join(CODE_VERIFIER_FILE))
            .unwrap_or_else(|| PathBuf::from(CODE_VERIFIER_FILE));
        let (events, _) = broadcast::channel(16);

        Ok(Self {
            backend,
            session_path: session_path.to_path_buf(),
            verifier_path,
            current: Mutex::new(current),
            refreshing: AsyncMutex::new(()),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub fn session_path(&self) -> &Path {
        &self.session_path
    }

    /// The stored session, without refreshing it
    pub fn current(&self) -> Option<Session> {
        self.current.lock().ok().and_then(|s| s.clone())
    }

    /// Store a new session and announce it
    pub fn set(&self, session: Session, event: AuthEvent) -> Result<()> {
        let session = session.with_expiry();
        self.persist(&session)?;
        {
            let mut current = self
                .current
                .lock()
                .map_err(|e| Error::Other(format!("Lock poisoned: {}", e)))?;
            *current = Some(session);
        }
        self.emit(event);
        Ok(())
    }

    /// Replace the user on the stored session
    pub fn update_user(&self, user: User) -> Result<()> {
        match self.current() {
            Some(mut session) => {
                session.user = user;
                self.set(session, AuthEvent::UserUpdated)
            }
            None => Err(Error::NotAuthenticated),
        }
    }

    /// Forget the session locally
    pub fn clear(&self) -> Result<()> {
        {
            let mut current = self
                .current
                .lock()
                .map_err(|e| Error::Other(format!("Lock poisoned: {}", e)))?;
            *current = None;
        }
        match std::fs::remove_file(&self.session_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    /// Current access token, refreshed first if it is about to expire
    ///
    /// A failed refresh clears the session. Concurrent callers share one
    /// refresh.
    pub async fn access_token(&self) -> Result<Option<String>> {
        match self.current() {
            None => return Ok(None),
            Some(session) if !session.expires_within(REFRESH_MARGIN_SECS) => {
                return Ok(Some(session.access_token))
            }
            Some(_) => {}
        }

        let _guard = self.refreshing.lock().await;
        // Another caller may have refreshed (or cleared) while we waited
        let Some(session) = self.current() else {
            return Ok(None);
        };
        if !session.expires_within(REFRESH_MARGIN_SECS) {
            return Ok(Some(session.access_token));
        }

        debug!("refreshing access token");
        match self.backend.refresh_session(&session.refresh_token).await {
            Ok(fresh) => {
                let token = fresh.access_token.clone();
                self.set(fresh, AuthEvent::TokenRefreshed)?;
                Ok(Some(token))
            }
            Err(e) => {
                warn!(error = %e, "session refresh failed, signing out locally");
                self.clear()?;
                Ok(None)
            }
        }
    }

    /// `(access_token, user_id)` for the signed-in user
    pub async fn authenticated(&self) -> Result<(String, String)> {
        let token = self.access_token().await?.ok_or(Error::NotAuthenticated)?;
        let user_id = self
            .current()
            .map(|s| s.user.id)
            .ok_or(Error::NotAuthenticated)?;
        Ok((token, user_id))
    }

    /// Remember the PKCE verifier until the redirect comes back
    pub fn store_code_verifier(&self, verifier: &str) -> Result<()> {
        write_private(&self.verifier_path, verifier.as_bytes())
    }

    /// Take the stored PKCE verifier, removing it
    pub fn take_code_verifier(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.verifier_path) {
            Ok(verifier) => {
                std::fs::remove_file(&self.verifier_path)?;
                Ok(Some(verifier.trim().to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self, session: &Session) -> Result<()> {
        let content = serde_json::to_string_pretty(session)?;
        write_private(&self.session_path, content.as_bytes())
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Write a file readable only by the current user
fn write_private(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}
