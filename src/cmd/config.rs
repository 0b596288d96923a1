//! Configuration view and validation commands: `jobwatch config`.

use anyhow::{Context, Result};
use jobwatch::config::{CONFIG_FILE_NAME, JobwatchConfig, PROJECT_CONFIG_DIR};
use std::path::{Path, PathBuf};

use super::super::ConfigCommands;

pub fn cmd_config(explicit: Option<&Path>, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("jobwatch configuration");
            println!("======================");
            println!();

            let path = JobwatchConfig::locate(explicit).filter(|p| p.exists());
            let mut config = match &path {
                Some(p) => {
                    println!("Config file: {}", p.display());
                    JobwatchConfig::load(p)?
                }
                None => {
                    println!("No {} found, using defaults.", CONFIG_FILE_NAME);
                    JobwatchConfig::default()
                }
            };
            config.apply_env();
            println!();
            println!("Effective values (with env overrides):");
            println!();
            print!("{}", config.to_toml()?);
            println!();

            if path.is_none() {
                println!("Run 'jobwatch config init' to create a {}.", CONFIG_FILE_NAME);
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let Some(path) = JobwatchConfig::locate(explicit).filter(|p| p.exists()) else {
                println!("No {} found. Using defaults (valid).", CONFIG_FILE_NAME);
                return Ok(());
            };

            let config = JobwatchConfig::load(&path)?;
            let warnings = config.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            let path = explicit
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_DIR).join(CONFIG_FILE_NAME));
            if path.exists() {
                println!("{} already exists at {}", CONFIG_FILE_NAME, path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            JobwatchConfig::default()
                .save(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;

            println!("Created {} at {}", CONFIG_FILE_NAME, path.display());
            println!();
            println!("You can now customize:");
            println!("  - [monitor] timeout_ms, namespace");
            println!("  - [ui] mode, verbose");
            println!("  - [callback] port");
            println!("  - [logging] level, format, file");
            println!();
        }
    }

    Ok(())
}
