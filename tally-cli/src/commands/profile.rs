//! Profile commands

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Password;
use tally_core::domain::validation::{validate_email, validate_new_password};
use tally_core::domain::{ProfileUpdate, Theme};

use super::get_context;
use crate::output::{self, spin};

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Show your profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change profile fields
    Update {
        /// New sign-in email
        #[arg(long)]
        email: Option<String>,
        /// Prompt for a new password
        #[arg(long)]
        password: bool,
        #[arg(long)]
        name: Option<String>,
        /// ISO currency code, e.g. LKR
        #[arg(long)]
        currency: Option<String>,
        #[arg(long)]
        language: Option<String>,
        /// light or dark
        #[arg(long)]
        theme: Option<String>,
    },
    /// Upload a new avatar image
    Avatar { file: PathBuf },
}

impl ProfileCommands {
    /// Whether output was requested as JSON
    pub fn json(&self) -> bool {
        matches!(self, ProfileCommands::Show { json: true })
    }
}

pub async fn run(command: ProfileCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        ProfileCommands::Show { json } => {
            let form = spin("Loading profile...", ctx.profile_service.load_form()).await?;
            let email = ctx.session.current().map(|s| s.user.email).unwrap_or_default();

            if json {
                let mut value = serde_json::to_value(&form)?;
                value["email"] = serde_json::json!(email);
                output::print_json(&value)?;
                return Ok(());
            }

            println!("{}", "Profile".bold());
            let mut table = output::create_table();
            table.add_row(vec!["Email".to_string(), email]);
            table.add_row(vec!["Name".to_string(), form.full_name]);
            table.add_row(vec!["Currency".to_string(), form.currency]);
            table.add_row(vec!["Language".to_string(), form.language]);
            table.add_row(vec!["Theme".to_string(), form.theme.to_string()]);
            table.add_row(vec!["Avatar".to_string(), form.avatar_url]);
            println!("{}", table);
        }
        ProfileCommands::Update { email, password, name, currency, language, theme } => {
            if let Some(err) = email.as_deref().and_then(validate_email) {
                bail!(err);
            }
            let password = if password {
                let value = Password::new()
                    .with_prompt("New password")
                    .with_confirmation("Confirm password", "Passwords do not match")
                    .interact()?;
                if let Some(err) = validate_new_password(&value) {
                    bail!(err);
                }
                Some(value)
            } else {
                None
            };
            let theme = theme.map(|t| t.parse::<Theme>()).transpose()?;

            let update = ProfileUpdate {
                email,
                password,
                full_name: name,
                currency,
                language,
                theme,
                ..Default::default()
            };
            spin("Saving profile...", ctx.profile_service.update(update)).await?;
            output::success("Profile updated successfully!");
        }
        ProfileCommands::Avatar { file } => {
            let file_name = file
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow!("Invalid file path: {:?}", file))?
                .to_string();
            let bytes =
                std::fs::read(&file).with_context(|| format!("Failed to read {:?}", file))?;

            let url = spin("Uploading...", async {
                let url = ctx.profile_service.upload_avatar(&file_name, bytes).await?;
                ctx.profile_service
                    .update(ProfileUpdate {
                        avatar_url: Some(url.clone()),
                        ..Default::default()
                    })
                    .await?;
                Ok::<_, tally_core::Error>(url)
            })
            .await?;
            output::success("Avatar updated");
            println!("{}", url);
        }
    }
    Ok(())
}
