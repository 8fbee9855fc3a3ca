//! Output formatting utilities

use std::future::Future;
use std::time::Duration;

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use serde::Serialize;
use tally_core::domain::money::round_cents;
use tally_core::domain::TransactionKind;
use tally_core::OperationResult;

pub fn success(msg: &str) {
    println!("{}", msg.green());
}

pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Print `data` inside the `{success, data, error}` envelope
pub fn print_json<T: Serialize>(data: T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&OperationResult::ok(data))?);
    Ok(())
}

/// Print a failure in the same envelope, `data` left null
pub fn print_json_error(message: &str) {
    let envelope = OperationResult::<()>::fail(message);
    match serde_json::to_string_pretty(&envelope) {
        Ok(text) => println!("{}", text),
        Err(_) => error(message),
    }
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Await `future` behind a spinner (only when stderr is a terminal)
pub async fn spin<F: Future>(message: &str, future: F) -> F::Output {
    if atty::isnt(atty::Stream::Stderr) {
        return future.await;
    }

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    let result = future.await;
    spinner.finish_and_clear();
    result
}

/// `12,345.50 LKR`
pub fn format_amount(amount: Decimal, currency: &str) -> String {
    let rounded = round_cents(amount);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::new();
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}{}.{} {}", if negative { "-" } else { "" }, grouped, frac, currency)
}

/// Amount with its income/expense sign, coloured
pub fn format_signed(kind: TransactionKind, amount: Decimal, currency: &str) -> String {
    let text = format!("{}{}", kind.sign(), format_amount(amount, currency));
    match kind {
        TransactionKind::Income => text.green().to_string(),
        TransactionKind::Expense => text.red().to_string(),
    }
}

/// Ten-cell progress bar for a percentage already capped at 100
pub fn progress_bar(percent: f64) -> String {
    let filled = ((percent / 10.0).round() as usize).min(10);
    format!("{}{}", "█".repeat(filled), "░".repeat(10 - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Decimal::new(1234550, 2), "LKR"), "12,345.50 LKR");
        assert_eq!(format_amount(Decimal::new(85000, 0), "USD"), "85,000.00 USD");
        assert_eq!(format_amount(Decimal::new(-999, 1), "LKR"), "-99.90 LKR");
        assert_eq!(format_amount(Decimal::ZERO, "LKR"), "0.00 LKR");
    }

    #[test]
    fn test_failure_envelope_shape() {
        let value = serde_json::to_value(OperationResult::<()>::fail("User not authenticated")).unwrap();
        assert_eq!(value["success"], serde_json::json!(false));
        assert!(value["data"].is_null());
        assert_eq!(value["error"], serde_json::json!("User not authenticated"));
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0), "░░░░░░░░░░");
        assert_eq!(progress_bar(80.0), "████████░░");
        assert_eq!(progress_bar(100.0), "██████████");
    }
}
