//! Auth commands - sign up, sign in, sign out and password recovery

use anyhow::{anyhow, bail, Result};
use colored::Colorize;
use tally_core::domain::forms::{
    ForgotPasswordField, ForgotPasswordForm, Form, LoginForm, ResetPasswordForm, SignUpForm,
};
use tally_core::ports::OAuthProvider;
use tally_core::services::AuthEvent;

use super::{fill_form, get_context};
use crate::output::{self, spin};

pub async fn sign_up() -> Result<()> {
    let ctx = get_context()?;
    let form = fill_form::<SignUpForm>()?;

    let response = spin(
        "Creating account...",
        ctx.auth_service
            .sign_up(&form.email, &form.password, &form.full_name),
    )
    .await?;

    if response.session.is_some() {
        output::success("Account created. You are signed in.");
    } else {
        println!("{}", "Check Your Email!".bold());
        println!("We have sent a confirmation link to {}", form.email.trim());
        println!("Open the link, then run 'tally complete <url>' with the address it opens.");
    }
    Ok(())
}

pub async fn login() -> Result<()> {
    let ctx = get_context()?;
    let form = fill_form::<LoginForm>()?;

    let session = spin(
        "Signing in...",
        ctx.auth_service.sign_in(&form.email, &form.password),
    )
    .await?;
    output::success(&format!("Signed in as {}", session.user.email));
    Ok(())
}

pub fn login_google() -> Result<()> {
    let ctx = get_context()?;
    if ctx.backend.is_demo() {
        bail!("Google sign-in is not available in demo mode");
    }

    let url = ctx.auth_service.start_oauth(OAuthProvider::Google)?;
    println!("Open this URL in your browser to sign in with Google:");
    println!();
    println!("  {}", url.cyan());
    println!();
    println!("Then run 'tally complete <url>' with the address the browser lands on.");
    Ok(())
}

pub async fn complete(redirect_url: &str) -> Result<()> {
    let ctx = get_context()?;
    let event = spin("Completing sign-in...", ctx.auth_service.complete_redirect(redirect_url)).await?;

    match event {
        AuthEvent::PasswordRecovery => {
            output::success("Recovery link accepted");
            println!("Run 'tally reset-password' to choose a new password.");
        }
        _ => {
            let email = ctx.session.current().map(|s| s.user.email).unwrap_or_default();
            output::success(&format!("Signed in as {}", email));
        }
    }
    Ok(())
}

pub async fn logout() -> Result<()> {
    let ctx = get_context()?;
    if !ctx.auth_service.is_signed_in() {
        output::info("Not signed in");
        return Ok(());
    }

    // The local session is gone even when the remote call fails
    if let Err(e) = spin("Signing out...", ctx.auth_service.sign_out()).await {
        output::warning(&format!("Signed out locally ({})", e));
        return Ok(());
    }
    output::success("Signed out");
    Ok(())
}

pub async fn forgot_password(email: Option<String>) -> Result<()> {
    let ctx = get_context()?;
    let form = match email {
        Some(email) => {
            let mut form = Form::<ForgotPasswordForm>::new();
            form.change(ForgotPasswordField::Email, email);
            form.submit().map_err(|e| anyhow!(e.to_string()))?
        }
        None => fill_form::<ForgotPasswordForm>()?,
    };

    spin(
        "Sending reset link...",
        ctx.auth_service.request_password_reset(&form.email),
    )
    .await?;

    println!("{}", "Check Your Email".bold());
    println!("We've sent a password reset link to {}", form.email.trim());
    println!("Please check your email inbox (and spam folder) for the password reset link.");
    println!("Then run 'tally reset-password --link <url>'.");
    Ok(())
}

pub async fn reset_password(link: Option<String>) -> Result<()> {
    let ctx = get_context()?;
    if let Some(link) = link {
        spin("Checking link...", ctx.auth_service.complete_redirect(&link)).await?;
    }
    if !ctx.auth_service.is_signed_in() {
        bail!("Open the reset link first: tally reset-password --link <url>");
    }

    let form = fill_form::<ResetPasswordForm>()?;
    spin(
        "Updating password...",
        ctx.auth_service.update_password(&form.password),
    )
    .await?;
    output::success("Password updated successfully!");
    Ok(())
}
