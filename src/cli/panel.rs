use anyhow::Result;
use std::path::PathBuf;

use super::config::Config;
use super::run::load_panel;

/// Print the loaded panel
pub fn run(panel: Option<PathBuf>, config: Option<PathBuf>) -> Result<()> {
    let config = Config::load(config.as_deref())?;
    let panel = load_panel(config.panel(panel).as_deref())?;
    println!("{}", panel);
    Ok(())
}
