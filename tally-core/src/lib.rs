//! Tally Core - Business logic for a personal budget tracker
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Transaction, Budget, Category, Profile)
//! - **ports**: Trait definitions for external dependencies (auth, tables, storage)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (Supabase REST, local DuckDB demo backend)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::local::LocalBackend;
use adapters::supabase::SupabaseClient;
use config::Config;
use ports::Backend;
use services::session::{DEMO_SESSION_FILE, SESSION_FILE};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{Budget, Category, Session, Transaction, User, UserProfile};

/// Main context for Tally operations
///
/// Holds the configuration, the active backend (hosted or demo), the
/// session and all services built on them.
pub struct TallyContext {
    pub config: Config,
    pub tally_dir: PathBuf,
    pub backend: Arc<dyn Backend>,
    pub session: Arc<SessionManager>,
    pub auth_service: AuthService,
    pub transaction_service: TransactionService,
    pub budget_service: BudgetService,
    pub category_service: CategoryService,
    pub profile_service: ProfileService,
    pub analytics_service: AnalyticsService,
}

impl TallyContext {
    /// Create a context for the tally directory
    ///
    /// Demo mode opens the local backend; otherwise the hosted backend
    /// settings must be present.
    pub fn new(tally_dir: &Path) -> Result<Self> {
        let config = Config::load(tally_dir)?;

        let (backend, session_file): (Arc<dyn Backend>, &str) = if config.demo_mode {
            let local = LocalBackend::open(tally_dir).context("Failed to open demo backend")?;
            (Arc::new(local), DEMO_SESSION_FILE)
        } else {
            let settings = config.backend_settings()?;
            let client = SupabaseClient::new(&settings.url, &settings.anon_key)?;
            (Arc::new(client), SESSION_FILE)
        };

        let session = Arc::new(
            SessionManager::new(Arc::clone(&backend), &tally_dir.join(session_file))
                .context("Failed to restore session")?,
        );

        let auth_service = AuthService::new(Arc::clone(&backend), Arc::clone(&session), &config);
        let transaction_service = TransactionService::new(Arc::clone(&backend), Arc::clone(&session));
        let budget_service = BudgetService::new(Arc::clone(&backend), Arc::clone(&session));
        let category_service = CategoryService::new(Arc::clone(&backend), Arc::clone(&session));
        let profile_service = ProfileService::new(Arc::clone(&backend), Arc::clone(&session));
        let analytics_service = AnalyticsService::new(Arc::clone(&backend), Arc::clone(&session));

        Ok(Self {
            config,
            tally_dir: tally_dir.to_path_buf(),
            backend,
            session,
            auth_service,
            transaction_service,
            budget_service,
            category_service,
            profile_service,
            analytics_service,
        })
    }

    /// `supabase` or `local`
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}
