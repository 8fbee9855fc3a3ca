//! Setup command - configure the hosted backend

use anyhow::{bail, Result};
use dialoguer::Input;
use tally_core::config::Config;

use super::get_tally_dir;
use crate::output;

pub fn run(url: Option<String>, anon_key: Option<String>, site_url: Option<String>) -> Result<()> {
    let tally_dir = get_tally_dir()?;
    let mut config = Config::load(&tally_dir).unwrap_or_default();

    let url = match url {
        Some(u) => u,
        None => Input::new().with_prompt("Project URL").interact_text()?,
    };
    let anon_key = match anon_key {
        Some(k) => k,
        None => Input::new().with_prompt("Anon key").interact_text()?,
    };

    let parsed = url::Url::parse(url.trim());
    if !matches!(parsed.as_ref().map(|u| u.scheme()), Ok("http") | Ok("https")) {
        bail!("Invalid project URL: {}", url.trim());
    }
    if anon_key.trim().is_empty() {
        bail!("Anon key is required");
    }

    config.set_backend(&url, &anon_key);
    if let Some(site) = site_url {
        config.set_site_url(&site);
    }
    config.save(&tally_dir)?;

    output::success("Backend configured");
    if config.demo_mode {
        output::warning("Demo mode is on. Run 'tally demo off' to use the hosted backend.");
    } else {
        println!("Run 'tally signup' or 'tally login' to continue.");
    }
    Ok(())
}
