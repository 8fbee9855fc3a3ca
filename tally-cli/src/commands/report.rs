//! Report commands - spending by category and monthly trends

use anyhow::{anyhow, Result};
use clap::Subcommand;
use tally_core::domain::money::parse_date;
use tally_core::services::analytics::DEFAULT_TREND_MONTHS;

use super::{display_currency, get_context};
use crate::output::{self, format_amount, spin};

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Expense totals per category
    Spending {
        /// First day to include (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// Last day to include (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Income and expenses per month
    Trends {
        /// Number of months back from today
        #[arg(long, default_value_t = DEFAULT_TREND_MONTHS)]
        months: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl ReportCommands {
    /// Whether output was requested as JSON
    pub fn json(&self) -> bool {
        matches!(
            self,
            ReportCommands::Spending { json: true, .. } | ReportCommands::Trends { json: true, .. }
        )
    }
}

fn date_arg(value: Option<String>) -> Result<Option<chrono::NaiveDate>> {
    value
        .map(|v| parse_date(v.trim()).ok_or_else(|| anyhow!("Invalid date '{}'. Use YYYY-MM-DD", v)))
        .transpose()
}

pub async fn run(command: ReportCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        ReportCommands::Spending { start, end, json } => {
            let (start, end) = (date_arg(start)?, date_arg(end)?);
            let rows = spin(
                "Loading spending...",
                ctx.analytics_service.spending_by_category(start, end),
            )
            .await?;

            if json {
                output::print_json(&rows)?;
                return Ok(());
            }
            if rows.is_empty() {
                println!("No expenses in this period.");
                return Ok(());
            }

            let currency = display_currency(&ctx).await;
            let mut table = output::create_table();
            table.set_header(vec!["Category", "Spent"]);
            for row in &rows {
                table.add_row(vec![row.category.clone(), format_amount(row.amount, &currency)]);
            }
            println!("{}", table);
        }
        ReportCommands::Trends { months, json } => {
            let rows = spin("Loading trends...", ctx.analytics_service.monthly_trends(months)).await?;

            if json {
                output::print_json(&rows)?;
                return Ok(());
            }
            if rows.is_empty() {
                println!("No transactions in the last {} month(s).", months);
                return Ok(());
            }

            let currency = display_currency(&ctx).await;
            let mut table = output::create_table();
            table.set_header(vec!["Month", "Income", "Expenses", "Net"]);
            for row in &rows {
                table.add_row(vec![
                    row.month.clone(),
                    format_amount(row.income, &currency),
                    format_amount(row.expense, &currency),
                    format_amount(row.income.saturating_sub(row.expense), &currency),
                ]);
            }
            println!("{}", table);
        }
    }
    Ok(())
}
