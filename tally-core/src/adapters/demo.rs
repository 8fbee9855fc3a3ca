//! Demo data provider
//!
//! Sample account used by demo mode:
//! - a demo user with a profile
//! - five categories
//! - five transactions dated today
//! - three monthly budgets
//!
//! Seeding goes through the port traits so the rows pass the same ownership
//! checks as anything a user writes.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::json;
use tracing::info;

use crate::domain::result::Result;
use crate::domain::{
    BudgetDraft, BudgetPeriod, Session, TransactionDraft, TransactionKind, UserMetadata,
    DEFAULT_CURRENCY, DEFAULT_LANGUAGE,
};
use crate::ports::Backend;

pub const DEMO_EMAIL: &str = "demo@budget.local";
pub const DEMO_PASSWORD: &str = "Demo1234";
pub const DEMO_FULL_NAME: &str = "Demo User";

pub const DEMO_CATEGORIES: &[&str] = &["Salary", "Rent", "Groceries", "Transport", "Freelance"];

/// Sample transactions, all dated `today`
pub fn demo_transactions(today: NaiveDate) -> Vec<TransactionDraft> {
    let tx = |kind, amount, category: &str, description: &str| TransactionDraft {
        kind,
        amount: Decimal::new(amount, 0),
        category: category.to_string(),
        description: description.to_string(),
        date: today,
    };

    vec![
        tx(TransactionKind::Income, 85000, "Salary", "Monthly salary"),
        tx(TransactionKind::Expense, 12000, "Rent", "Apartment rent"),
        tx(TransactionKind::Expense, 3200, "Groceries", "Weekly groceries"),
        tx(TransactionKind::Income, 4500, "Freelance", "Logo design"),
        tx(TransactionKind::Expense, 1800, "Transport", "Bus pass"),
    ]
}

pub fn demo_budgets() -> Vec<BudgetDraft> {
    [("Rent", 15000), ("Groceries", 6000), ("Transport", 3500)]
        .into_iter()
        .map(|(category, amount)| BudgetDraft {
            category: category.to_string(),
            amount: Decimal::new(amount, 0),
            period: BudgetPeriod::Monthly,
        })
        .collect()
}

/// Create the demo user and its data on `backend`, returning the signed-in session
pub async fn seed(backend: &dyn Backend, today: NaiveDate) -> Result<Session> {
    let metadata = UserMetadata {
        full_name: Some(DEMO_FULL_NAME.to_string()),
        avatar_url: None,
    };
    backend.sign_up(DEMO_EMAIL, DEMO_PASSWORD, &metadata, "").await?;
    let session = backend.sign_in_with_password(DEMO_EMAIL, DEMO_PASSWORD).await?;
    let token = session.access_token.as_str();
    let user_id = session.user.id.as_str();

    backend
        .upsert(
            token,
            "profiles",
            json!({
                "id": user_id,
                "email": DEMO_EMAIL,
                "full_name": DEMO_FULL_NAME,
                "currency": DEFAULT_CURRENCY,
                "language": DEFAULT_LANGUAGE,
                "theme": "light",
            }),
        )
        .await?;

    for name in DEMO_CATEGORIES {
        backend
            .insert(token, "categories", json!({ "user_id": user_id, "name": name }))
            .await?;
    }

    let transactions = demo_transactions(today);
    for draft in &transactions {
        let mut row = serde_json::to_value(draft)?;
        row["user_id"] = json!(user_id);
        backend.insert(token, "transactions", row).await?;
    }

    let budgets = demo_budgets();
    for draft in &budgets {
        let mut row = serde_json::to_value(draft)?;
        row["user_id"] = json!(user_id);
        backend.insert(token, "budgets", row).await?;
    }

    info!(
        categories = DEMO_CATEGORIES.len(),
        transactions = transactions.len(),
        budgets = budgets.len(),
        "demo data seeded"
    );
    Ok(session)
}
