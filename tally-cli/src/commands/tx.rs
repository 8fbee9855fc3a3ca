//! Transaction commands

use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::Subcommand;
use dialoguer::{Confirm, Input, Select};
use tally_core::domain::{Transaction, TransactionDraft, TransactionInput};
use tally_core::TallyContext;

use super::{display_currency, get_context};
use crate::output::{self, format_signed, spin};

#[derive(Subcommand)]
pub enum TxCommands {
    /// List transactions, newest first
    List {
        /// Show at most this many
        #[arg(long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a transaction (prompts for anything not given)
    Add {
        /// income or expense (default expense)
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// YYYY-MM-DD (default today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Edit a transaction; unspecified fields keep their value
    Edit {
        id: String,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete a transaction
    Delete {
        id: String,
        /// Skip confirmation
        #[arg(long, short)]
        yes: bool,
    },
}

impl TxCommands {
    /// Whether output was requested as JSON
    pub fn json(&self) -> bool {
        matches!(self, TxCommands::List { json: true, .. })
    }
}

pub async fn run(command: TxCommands) -> Result<()> {
    let ctx = get_context()?;
    let today = Utc::now().date_naive();

    match command {
        TxCommands::List { limit, json } => {
            let mut transactions = spin("Loading transactions...", ctx.transaction_service.list()).await?;
            if let Some(limit) = limit {
                transactions.truncate(limit);
            }
            if json {
                output::print_json(&transactions)?;
                return Ok(());
            }
            if transactions.is_empty() {
                println!("No transactions yet. Add one with 'tally tx add'.");
                return Ok(());
            }
            let currency = display_currency(&ctx).await;
            print_transactions(&transactions, &currency);
        }
        TxCommands::Add { kind, amount, category, description, date } => {
            let amount = match amount {
                Some(a) => a,
                None => Input::new().with_prompt("Amount").interact_text()?,
            };
            let category = match category {
                Some(c) => c,
                None => pick_category(&ctx).await?,
            };
            let input = TransactionInput { kind, amount, category, description, date };
            let draft = TransactionDraft::parse(&input, today)?;

            let created = spin("Saving...", ctx.transaction_service.add(&draft)).await?;
            output::success(&format!("Transaction added ({})", created.id));
        }
        TxCommands::Edit { id, kind, amount, category, description, date } => {
            let existing = spin("Loading transactions...", ctx.transaction_service.list())
                .await?
                .into_iter()
                .find(|t| t.id == id)
                .ok_or_else(|| anyhow!("Transaction not found: {}", id))?;

            let input = TransactionInput {
                kind: Some(kind.unwrap_or_else(|| existing.kind.to_string())),
                amount: amount.unwrap_or_else(|| existing.amount.to_string()),
                category: category.unwrap_or(existing.category),
                description: Some(description.unwrap_or(existing.description)),
                date: Some(date.unwrap_or_else(|| existing.date.to_string())),
            };
            let draft = TransactionDraft::parse(&input, today)?;

            spin("Saving...", ctx.transaction_service.update(&id, &draft)).await?;
            output::success("Transaction updated");
        }
        TxCommands::Delete { id, yes } => {
            let confirmed = yes
                || Confirm::new()
                    .with_prompt("Are you sure you want to delete this transaction?")
                    .default(false)
                    .interact()?;
            if !confirmed {
                output::info("Cancelled");
                return Ok(());
            }
            spin("Deleting...", ctx.transaction_service.delete(&id)).await?;
            output::success("Transaction deleted");
        }
    }
    Ok(())
}

/// Choose one of the user's categories, or type a new name when there are none
pub(super) async fn pick_category(ctx: &TallyContext) -> Result<String> {
    let categories = ctx.category_service.list().await?;
    if categories.is_empty() {
        return Ok(Input::new().with_prompt("Category").interact_text()?);
    }

    let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
    let index = Select::new()
        .with_prompt("Category")
        .items(&names)
        .default(0)
        .interact()?;
    Ok(names[index].to_string())
}

fn print_transactions(transactions: &[Transaction], currency: &str) {
    let mut table = output::create_table();
    table.set_header(vec!["ID", "Date", "Type", "Category", "Description", "Amount"]);
    for t in transactions {
        table.add_row(vec![
            t.id.clone(),
            t.date.to_string(),
            t.kind.to_string(),
            t.category.clone(),
            t.description.clone(),
            format_signed(t.kind, t.amount, currency),
        ]);
    }
    println!("{}", table);
    println!("{} transaction(s)", transactions.len());
}
