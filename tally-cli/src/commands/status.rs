//! Status command - totals and recent transactions

use anyhow::Result;
use colored::Colorize;
use serde_json::json;
use tally_core::services::analytics;

use super::{display_currency, get_context};
use crate::output::{self, format_amount, format_signed, spin};

const RECENT: usize = 5;

pub async fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let Some(current) = ctx.auth_service.current_user().await? else {
        if json {
            output::print_json_error(&tally_core::Error::NotAuthenticated.to_string());
            return Ok(());
        }
        output::warning("Not signed in. Run 'tally login' or 'tally demo on'.");
        return Ok(());
    };

    let transactions = spin("Loading...", ctx.transaction_service.list()).await?;
    let summary = analytics::summary(&transactions);
    let recent: Vec<_> = transactions.iter().take(RECENT).collect();

    if json {
        let value = json!({
            "backend": ctx.backend_name(),
            "email": current.user.email,
            "summary": summary,
            "transactions": transactions.len(),
            "recent": recent,
        });
        output::print_json(&value)?;
        return Ok(());
    }

    let currency = display_currency(&ctx).await;
    let name = current
        .profile
        .as_ref()
        .and_then(|p| p.full_name.clone())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| current.user.email.clone());

    println!("{}", format!("Welcome back, {}", name).bold());
    println!("Backend: {}", ctx.backend_name());
    println!();

    let mut table = output::create_table();
    table.add_row(vec!["Total income", &format_amount(summary.total_income, &currency)]);
    table.add_row(vec!["Total expenses", &format_amount(summary.total_expense, &currency)]);
    table.add_row(vec!["Balance", &format_amount(summary.balance, &currency)]);
    table.add_row(vec!["Transactions", &transactions.len().to_string()]);
    println!("{}", table);

    if recent.is_empty() {
        println!();
        println!("No transactions yet. Add one with 'tally tx add'.");
        return Ok(());
    }

    println!();
    println!("{}", "Recent transactions".bold());
    let mut table = output::create_table();
    table.set_header(vec!["Date", "Category", "Description", "Amount"]);
    for t in recent {
        table.add_row(vec![
            t.date.to_string(),
            t.category.clone(),
            t.description.clone(),
            format_signed(t.kind, t.amount, &currency),
        ]);
    }
    println!("{}", table);
    Ok(())
}
