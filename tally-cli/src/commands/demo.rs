//! Demo command - manage demo mode

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use tally_core::adapters::demo::DEMO_EMAIL;
use tally_core::services::DemoService;

use super::get_tally_dir;
use crate::output::spin;

#[derive(Subcommand)]
pub enum DemoCommands {
    /// Enable demo mode with a freshly seeded local database
    #[command(name = "on")]
    On,
    /// Disable demo mode
    #[command(name = "off")]
    Off {
        /// Also delete the demo database and session
        #[arg(long)]
        clean: bool,
    },
    /// Show demo mode status
    Status,
}

pub async fn run(command: Option<DemoCommands>) -> Result<()> {
    let tally_dir = get_tally_dir()?;
    std::fs::create_dir_all(&tally_dir)?;
    let demo_service = DemoService::new(&tally_dir);

    match command {
        Some(DemoCommands::On) => {
            spin("Seeding demo data...", demo_service.enable()).await?;
            println!("{}", "Demo mode enabled".green());
            println!("Signed in as {}. Run 'tally status' to see the demo budget.", DEMO_EMAIL);
            Ok(())
        }
        Some(DemoCommands::Off { clean }) => {
            demo_service.disable(clean)?;
            println!("{}", "Demo mode disabled".yellow());
            if clean {
                println!("Demo data deleted.");
            }
            Ok(())
        }
        Some(DemoCommands::Status) | None => {
            if demo_service.is_enabled()? {
                println!("Demo mode is {}", "ON".green());
            } else {
                println!("Demo mode is {}", "OFF".yellow());
            }
            Ok(())
        }
    }
}
