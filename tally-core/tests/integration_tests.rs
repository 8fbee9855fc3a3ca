//! End-to-end tests against the local demo backend
//!
//! Each test enables demo mode in a fresh directory, then drives the
//! services through `TallyContext` the way the CLI does.

use chrono::Utc;
use rust_decimal::Decimal;
use tempfile::TempDir;

use tally_core::domain::{
    BudgetDraft, ProfileUpdate, Theme, TransactionDraft, TransactionInput, TransactionKind,
};
use tally_core::services::{analytics, budget, DemoService};
use tally_core::{Error, TallyContext};

async fn demo_context() -> (TempDir, TallyContext) {
    let dir = TempDir::new().unwrap();
    DemoService::new(dir.path()).enable().await.unwrap();
    let ctx = TallyContext::new(dir.path()).unwrap();
    (dir, ctx)
}

fn draft(kind: &str, amount: &str, category: &str) -> TransactionDraft {
    TransactionDraft::parse(
        &TransactionInput {
            kind: Some(kind.to_string()),
            amount: amount.to_string(),
            category: category.to_string(),
            description: None,
            date: None,
        },
        Utc::now().date_naive(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_demo_mode_is_signed_in_with_seed_data() {
    let (_dir, ctx) = demo_context().await;
    assert_eq!(ctx.backend_name(), "local");

    let current = ctx.auth_service.current_user().await.unwrap().unwrap();
    assert_eq!(current.user.email, "demo@budget.local");
    assert_eq!(
        current.profile.unwrap().full_name.as_deref(),
        Some("Demo User")
    );

    let txs = ctx.transaction_service.list().await.unwrap();
    assert_eq!(txs.len(), 5);
    let summary = analytics::summary(&txs);
    assert_eq!(summary.total_income, Decimal::new(89500, 0));
    assert_eq!(summary.total_expense, Decimal::new(17000, 0));
    assert_eq!(summary.balance, Decimal::new(72500, 0));

    let names: Vec<String> = ctx
        .category_service
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, ["Freelance", "Groceries", "Rent", "Salary", "Transport"]);
}

#[tokio::test]
async fn test_transaction_lifecycle() {
    let (_dir, ctx) = demo_context().await;
    let svc = &ctx.transaction_service;

    let created = svc.add(&draft("expense", "250.75", "Transport")).await.unwrap();
    assert_eq!(created.amount, Decimal::new(25075, 2));
    assert_eq!(created.kind, TransactionKind::Expense);
    assert_eq!(svc.list().await.unwrap().len(), 6);

    let updated = svc
        .update(&created.id, &draft("income", "300", "Freelance"))
        .await
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.kind, TransactionKind::Income);
    assert_eq!(updated.category, "Freelance");

    svc.delete(&created.id).await.unwrap();
    assert_eq!(svc.list().await.unwrap().len(), 5);

    let err = svc
        .update(&created.id, &draft("income", "1", "Freelance"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn test_budget_progress_from_seed() {
    let (_dir, ctx) = demo_context().await;

    let budgets = ctx.budget_service.list().await.unwrap();
    assert_eq!(budgets.len(), 3);
    let txs = ctx.transaction_service.list().await.unwrap();
    let progress = budget::progress(&budgets, &txs, Utc::now().date_naive());

    let rent = progress.iter().find(|p| p.budget.category == "Rent").unwrap();
    assert_eq!(rent.spent, Decimal::new(12000, 0));
    assert!((rent.percentage - 80.0).abs() < 1e-9);
    assert!(!rent.over_budget);

    let new_cap = BudgetDraft::parse("Rent", "10000", Some("weekly")).unwrap();
    let updated = ctx.budget_service.update(&rent.budget.id, &new_cap).await.unwrap();
    let over = budget::progress(&[updated], &txs, Utc::now().date_naive());
    assert!(over[0].over_budget);
    assert_eq!(over[0].bar(), 100.0);
}

#[tokio::test]
async fn test_analytics_from_seed() {
    let (_dir, ctx) = demo_context().await;

    let spending = ctx
        .analytics_service
        .spending_by_category(None, None)
        .await
        .unwrap();
    let names: Vec<&str> = spending.iter().map(|s| s.category.as_str()).collect();
    assert_eq!(names, ["Rent", "Groceries", "Transport"]);

    let trends = ctx.analytics_service.monthly_trends(6).await.unwrap();
    assert_eq!(trends.len(), 1);
    assert_eq!(trends[0].month, Utc::now().format("%Y-%m").to_string());
    assert_eq!(trends[0].income, Decimal::new(89500, 0));
    assert_eq!(trends[0].expense, Decimal::new(17000, 0));
}

#[tokio::test]
async fn test_profile_update_and_avatar() {
    let (_dir, ctx) = demo_context().await;
    let svc = &ctx.profile_service;

    let form = svc.load_form().await.unwrap();
    assert_eq!(form.currency, "LKR");
    assert_eq!(form.theme, Theme::Light);

    let url = svc.upload_avatar("me.png", vec![0x89, b'P', b'N', b'G']).await.unwrap();
    assert!(url.starts_with("file://"));
    assert!(url.ends_with(".png"));

    let profile = svc
        .update(ProfileUpdate {
            avatar_url: Some(url.clone()),
            currency: Some("usd".to_string()),
            theme: Some(Theme::Dark),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(profile.currency.as_deref(), Some("USD"));
    assert_eq!(profile.avatar_url.as_deref(), Some(url.as_str()));
    assert_eq!(profile.full_name.as_deref(), Some("Demo User"));
    assert!(profile.updated_at.is_some());
}

#[tokio::test]
async fn test_users_only_see_their_own_rows() {
    let (_dir, ctx) = demo_context().await;
    let demo_user = ctx.session.current().unwrap().user.id;

    ctx.auth_service.sign_out().await.unwrap();
    assert!(matches!(
        ctx.transaction_service.list().await,
        Err(Error::NotAuthenticated)
    ));

    let response = ctx
        .auth_service
        .sign_up("other@example.com", "Other1234", "Other Person")
        .await
        .unwrap();
    assert!(response.session.is_some());
    assert_ne!(ctx.session.current().unwrap().user.id, demo_user);
    assert!(ctx.transaction_service.list().await.unwrap().is_empty());
    assert!(ctx.category_service.list().await.unwrap().is_empty());

    ctx.auth_service.sign_in("demo@budget.local", "Demo1234").await.unwrap();
    assert_eq!(ctx.transaction_service.list().await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let (_dir, ctx) = demo_context().await;
    let err = ctx
        .auth_service
        .sign_in("demo@budget.local", "wrong")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid login credentials");
}
