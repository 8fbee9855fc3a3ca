//! Budget commands

use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::{Confirm, Input};
use tally_core::domain::BudgetDraft;
use tally_core::services::budget;

use super::tx::pick_category;
use super::{display_currency, get_context};
use crate::output::{self, format_amount, progress_bar, spin};

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Show budgets with spend for the current period
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a budget
    Add {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        /// weekly or monthly (default monthly)
        #[arg(long)]
        period: Option<String>,
    },
    /// Edit a budget; unspecified fields keep their value
    Edit {
        id: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        period: Option<String>,
    },
    /// Delete a budget
    Delete {
        id: String,
        /// Skip confirmation
        #[arg(long, short)]
        yes: bool,
    },
}

impl BudgetCommands {
    /// Whether output was requested as JSON
    pub fn json(&self) -> bool {
        matches!(self, BudgetCommands::List { json: true })
    }
}

pub async fn run(command: BudgetCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        BudgetCommands::List { json } => {
            // Sequential: a refresh token can be redeemed only once
            let budgets = spin("Loading budgets...", ctx.budget_service.list()).await?;
            let transactions = spin("Loading transactions...", ctx.transaction_service.list()).await?;
            let rows = budget::progress(&budgets, &transactions, Utc::now().date_naive());

            if json {
                output::print_json(&rows)?;
                return Ok(());
            }
            if rows.is_empty() {
                println!("No budgets yet. Create one with 'tally budget add'.");
                return Ok(());
            }

            let currency = display_currency(&ctx).await;
            let mut table = output::create_table();
            table.set_header(vec!["ID", "Category", "Period", "Spent", "Budget", "Progress"]);
            for row in &rows {
                let bar = format!("{} {:.0}%", progress_bar(row.bar()), row.percentage);
                let bar = if row.over_budget {
                    format!("{} {}", bar.red(), "over budget".red().bold())
                } else {
                    bar.green().to_string()
                };
                table.add_row(vec![
                    row.budget.id.clone(),
                    row.budget.category.clone(),
                    row.budget.period.to_string(),
                    format_amount(row.spent, &currency),
                    format_amount(row.budget.amount, &currency),
                    bar,
                ]);
            }
            println!("{}", table);
        }
        BudgetCommands::Add { category, amount, period } => {
            let category = match category {
                Some(c) => c,
                None => pick_category(&ctx).await?,
            };
            let amount = match amount {
                Some(a) => a,
                None => Input::new().with_prompt("Budget amount").interact_text()?,
            };
            let draft = BudgetDraft::parse(&category, &amount, period.as_deref())?;

            let created = spin("Saving...", ctx.budget_service.add(&draft)).await?;
            output::success(&format!("Budget created ({})", created.id));
        }
        BudgetCommands::Edit { id, category, amount, period } => {
            let existing = spin("Loading budgets...", ctx.budget_service.list())
                .await?
                .into_iter()
                .find(|b| b.id == id)
                .ok_or_else(|| anyhow!("Budget not found: {}", id))?;

            let draft = BudgetDraft::parse(
                &category.unwrap_or(existing.category),
                &amount.unwrap_or_else(|| existing.amount.to_string()),
                Some(&period.unwrap_or_else(|| existing.period.to_string())),
            )?;

            spin("Saving...", ctx.budget_service.update(&id, &draft)).await?;
            output::success("Budget updated");
        }
        BudgetCommands::Delete { id, yes } => {
            let confirmed = yes
                || Confirm::new()
                    .with_prompt("Are you sure you want to delete this budget?")
                    .default(false)
                    .interact()?;
            if !confirmed {
                output::info("Cancelled");
                return Ok(());
            }
            spin("Deleting...", ctx.budget_service.delete(&id)).await?;
            output::success("Budget deleted");
        }
    }
    Ok(())
}
