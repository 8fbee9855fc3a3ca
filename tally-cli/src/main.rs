//! Tally CLI - personal budgeting in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod output;

use commands::{auth, budget, category, demo, logs, profile, report, setup, status, tx};

/// Tally - personal budgeting in your terminal
#[derive(Parser)]
#[command(name = "tally", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the hosted backend
    Setup {
        /// Project URL, e.g. https://xyz.supabase.co
        #[arg(long)]
        url: Option<String>,
        /// Public anon key of the project
        #[arg(long)]
        anon_key: Option<String>,
        /// Web app URL used for email and OAuth redirects
        #[arg(long)]
        site_url: Option<String>,
    },

    /// Create an account
    Signup,

    /// Sign in with email and password, or with Google
    Login {
        /// Sign in with Google in the browser
        #[arg(long)]
        google: bool,
    },

    /// Finish a browser sign-in or an email link
    Complete {
        /// URL the browser landed on
        redirect_url: String,
    },

    /// Sign out
    Logout,

    /// Email a password reset link
    ForgotPassword {
        /// Account email
        #[arg(long)]
        email: Option<String>,
    },

    /// Set a new password
    ResetPassword {
        /// Recovery link from the reset email
        #[arg(long)]
        link: Option<String>,
    },

    /// Show totals and recent transactions
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage transactions
    Tx {
        #[command(subcommand)]
        command: tx::TxCommands,
    },

    /// Manage budgets
    Budget {
        #[command(subcommand)]
        command: budget::BudgetCommands,
    },

    /// Manage categories
    Category {
        #[command(subcommand)]
        command: category::CategoryCommands,
    },

    /// View and edit your profile
    Profile {
        #[command(subcommand)]
        command: profile::ProfileCommands,
    },

    /// Spending and trend reports
    Report {
        #[command(subcommand)]
        command: report::ReportCommands,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    /// Name recorded in the event log; never includes arguments
    fn name(&self) -> &'static str {
        match self {
            Commands::Setup { .. } => "setup",
            Commands::Signup => "signup",
            Commands::Login { .. } => "login",
            Commands::Complete { .. } => "complete",
            Commands::Logout => "logout",
            Commands::ForgotPassword { .. } => "forgot-password",
            Commands::ResetPassword { .. } => "reset-password",
            Commands::Status { .. } => "status",
            Commands::Tx { .. } => "tx",
            Commands::Budget { .. } => "budget",
            Commands::Category { .. } => "category",
            Commands::Profile { .. } => "profile",
            Commands::Report { .. } => "report",
            Commands::Demo { .. } => "demo",
            Commands::Logs { .. } => "logs",
        }
    }

    fn json(&self) -> bool {
        match self {
            Commands::Status { json } => *json,
            Commands::Tx { command } => command.json(),
            Commands::Budget { command } => command.json(),
            Commands::Category { command } => command.json(),
            Commands::Profile { command } => command.json(),
            Commands::Report { command } => command.json(),
            Commands::Logs { command } => command.json(),
            _ => false,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TALLY_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let name = cli.command.name();
    let json = cli.command.json();

    let logger = commands::get_logger();
    let result = run(cli).await;

    match result {
        Ok(()) => {
            commands::log_command(&logger, name);
            ExitCode::SUCCESS
        }
        Err(e) => {
            commands::log_failure(&logger, name, &e);
            if json {
                output::print_json_error(&format!("{:#}", e));
            } else {
                output::error(&format!("{:#}", e));
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Setup { url, anon_key, site_url } => setup::run(url, anon_key, site_url),
        Commands::Signup => auth::sign_up().await,
        Commands::Login { google } => {
            if google {
                auth::login_google()
            } else {
                auth::login().await
            }
        }
        Commands::Complete { redirect_url } => auth::complete(&redirect_url).await,
        Commands::Logout => auth::logout().await,
        Commands::ForgotPassword { email } => auth::forgot_password(email).await,
        Commands::ResetPassword { link } => auth::reset_password(link).await,
        Commands::Status { json } => status::run(json).await,
        Commands::Tx { command } => tx::run(command).await,
        Commands::Budget { command } => budget::run(command).await,
        Commands::Category { command } => category::run(command).await,
        Commands::Profile { command } => profile::run(command).await,
        Commands::Report { command } => report::run(command).await,
        Commands::Demo { command } => demo::run(command).await,
        Commands::Logs { command } => logs::run(command),
    }
}
