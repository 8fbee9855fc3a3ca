//! Demo service - manage demo mode
//!
//! Demo mode swaps the hosted backend for a local DuckDB one seeded with a
//! sample account, so the app can be tried without a project or a network.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;

use crate::adapters::demo;
use crate::adapters::local::{LocalBackend, DEMO_DB_FILE, DEMO_STORAGE_DIR};
use crate::config::Config;
use crate::ports::Backend;
use crate::services::session::{AuthEvent, SessionManager, DEMO_SESSION_FILE};

/// Demo service for managing demo mode
pub struct DemoService {
    tally_dir: PathBuf,
}

impl DemoService {
    pub fn new(tally_dir: &Path) -> Self {
        Self {
            tally_dir: tally_dir.to_path_buf(),
        }
    }

    pub fn is_enabled(&self) -> Result<bool> {
        let config = Config::load(&self.tally_dir)?;
        Ok(config.demo_mode)
    }

    /// Enable demo mode
    ///
    /// Any previous demo data is wiped, then a fresh local backend is seeded
    /// and the demo user is signed in.
    pub async fn enable(&self) -> Result<()> {
        self.remove_demo_data()?;

        let mut config = Config::load(&self.tally_dir).unwrap_or_default();
        config.enable_demo_mode();
        config.save(&self.tally_dir)?;

        let backend: Arc<dyn Backend> = Arc::new(
            LocalBackend::open(&self.tally_dir).context("Failed to create demo backend")?,
        );
        let session = demo::seed(backend.as_ref(), Utc::now().date_naive())
            .await
            .map_err(|e| anyhow!("Failed to seed demo data: {}", e))?;

        let sessions = SessionManager::new(backend, &self.tally_dir.join(DEMO_SESSION_FILE))?;
        sessions.set(session, AuthEvent::SignedIn)?;
        Ok(())
    }

    /// Disable demo mode, deleting the demo data when `clean` is set
    pub fn disable(&self, clean: bool) -> Result<()> {
        let mut config = Config::load(&self.tally_dir).unwrap_or_default();
        config.disable_demo_mode();
        config.save(&self.tally_dir)?;

        if clean {
            self.remove_demo_data()?;
        }
        Ok(())
    }

    fn remove_demo_data(&self) -> Result<()> {
        let db = self.tally_dir.join(DEMO_DB_FILE);
        let wal = self.tally_dir.join(format!("{}.wal", DEMO_DB_FILE));
        for file in [db, wal, self.tally_dir.join(DEMO_SESSION_FILE)] {
            if file.exists() {
                std::fs::remove_file(&file)?;
            }
        }

        let storage = self.tally_dir.join(DEMO_STORAGE_DIR);
        if storage.exists() {
            std::fs::remove_dir_all(&storage)?;
        }
        Ok(())
    }
}
