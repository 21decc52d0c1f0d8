//! Config command implementation.

use crate::config::Settings;
use anyhow::Result;
use std::path::PathBuf;

/// Print the effective configuration as TOML.
pub fn run_show_config(settings: &Settings) -> Result<()> {
    let toml_str = toml::to_string_pretty(settings)
        .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))?;
    println!("{}", toml_str);
    Ok(())
}

/// Print the configuration file path in use.
pub fn run_config_path(override_path: Option<&PathBuf>) -> Result<()> {
    let config_path = override_path
        .cloned()
        .unwrap_or_else(Settings::default_config_path);
    println!("{}", config_path.display());
    Ok(())
}
