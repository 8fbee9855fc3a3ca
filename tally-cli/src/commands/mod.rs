//! CLI command implementations

pub mod auth;
pub mod budget;
pub mod category;
pub mod demo;
pub mod logs;
pub mod profile;
pub mod report;
pub mod setup;
pub mod status;
pub mod tx;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use dialoguer::{Input, Password};
use tally_core::config::Config;
use tally_core::domain::forms::{Form, FormSchema};
use tally_core::domain::DEFAULT_CURRENCY;
use tally_core::services::{EntryPoint, LogEvent, LoggingService};
use tally_core::TallyContext;

use crate::output;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let tally_dir = get_tally_dir().ok()?;
    LoggingService::new(&tally_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

fn backend_label() -> &'static str {
    let demo = get_tally_dir()
        .ok()
        .and_then(|dir| Config::load(&dir).ok())
        .map(|c| c.demo_mode)
        .unwrap_or(false);
    if demo {
        "local"
    } else {
        "supabase"
    }
}

/// Log a finished command, ignoring any errors (logging should never break the app)
pub fn log_command(logger: &Option<LoggingService>, command: &str) {
    if let Some(l) = logger {
        let _ = l.log_command(command, backend_label());
    }
}

pub fn log_failure(logger: &Option<LoggingService>, command: &str, error: &anyhow::Error) {
    if let Some(l) = logger {
        let event = LogEvent::new("command_failed")
            .with_command(command)
            .with_backend(backend_label())
            .with_error(error.to_string());
        let _ = l.log(event);
    }
}

/// Get the tally directory from `TALLY_DIR` or `~/.tally`
pub fn get_tally_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("TALLY_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".tally"))
        .ok_or_else(|| anyhow!("Could not find home directory. Set TALLY_DIR."))
}

/// Get or create the tally context
pub fn get_context() -> Result<TallyContext> {
    let tally_dir = get_tally_dir()?;
    std::fs::create_dir_all(&tally_dir)
        .with_context(|| format!("Failed to create tally directory: {:?}", tally_dir))?;
    let ctx = TallyContext::new(&tally_dir).context("Failed to initialize tally context")?;
    tracing::debug!(backend = ctx.backend_name(), dir = %tally_dir.display(), "context ready");
    Ok(ctx)
}

/// Preferred display currency of the signed-in user
pub async fn display_currency(ctx: &TallyContext) -> String {
    match ctx.profile_service.load_form().await {
        Ok(form) => form.currency,
        Err(_) => DEFAULT_CURRENCY.to_string(),
    }
}

/// Prompt for every field of a form, re-asking a field until it passes
pub fn fill_form<S: FormSchema>() -> Result<S> {
    let mut form = Form::<S>::new();

    for &field in S::fields() {
        loop {
            let value = if S::is_secret(field) {
                Password::new().with_prompt(S::label(field)).interact()?
            } else {
                Input::<String>::new()
                    .with_prompt(S::label(field))
                    .allow_empty(true)
                    .interact_text()?
            };
            form.change(field, value);
            form.blur(field);

            match form.visible_error(field) {
                Some(err) => output::error(err),
                None => break,
            }
        }
    }

    // Later fields can invalidate earlier ones (confirm password)
    form.submit().map_err(|e| anyhow!(e.to_string()))
}
