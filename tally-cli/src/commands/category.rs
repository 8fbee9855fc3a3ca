//! Category commands

use anyhow::Result;
use clap::Subcommand;
use dialoguer::Confirm;

use super::get_context;
use crate::output::{self, spin};

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// List categories
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a category
    Add { name: String },
    /// Rename a category
    Rename { id: String, name: String },
    /// Delete a category
    Delete {
        id: String,
        /// Skip confirmation
        #[arg(long, short)]
        yes: bool,
    },
}

impl CategoryCommands {
    /// Whether output was requested as JSON
    pub fn json(&self) -> bool {
        matches!(self, CategoryCommands::List { json: true })
    }
}

pub async fn run(command: CategoryCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        CategoryCommands::List { json } => {
            let categories = spin("Loading categories...", ctx.category_service.list()).await?;
            if json {
                output::print_json(&categories)?;
                return Ok(());
            }
            if categories.is_empty() {
                println!("No categories yet. Add one with 'tally category add <name>'.");
                return Ok(());
            }
            let mut table = output::create_table();
            table.set_header(vec!["ID", "Name"]);
            for c in &categories {
                table.add_row(vec![c.id.as_str(), c.name.as_str()]);
            }
            println!("{}", table);
        }
        CategoryCommands::Add { name } => {
            let created = spin("Saving...", ctx.category_service.add(&name)).await?;
            output::success(&format!("Category '{}' added", created.name));
        }
        CategoryCommands::Rename { id, name } => {
            let renamed = spin("Saving...", ctx.category_service.rename(&id, &name)).await?;
            output::success(&format!("Category renamed to '{}'", renamed.name));
        }
        CategoryCommands::Delete { id, yes } => {
            let confirmed = yes
                || Confirm::new()
                    .with_prompt("Delete this category? Existing transactions keep their label.")
                    .default(false)
                    .interact()?;
            if !confirmed {
                output::info("Cancelled");
                return Ok(());
            }
            spin("Deleting...", ctx.category_service.delete(&id)).await?;
            output::success("Category deleted");
        }
    }
    Ok(())
}
