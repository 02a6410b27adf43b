//! Configuration management CLI commands.
//!
//! Provides `config get`, `config set`, `config list`, `config path` and
//! `config init` for viewing and modifying engine settings.

use std::path::Path;

use clap::Subcommand;
use hipstile::config::{format_size, ConfigKey, EngineConfig};

use super::common::print_header;
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., cache.budget_mb)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., loader.max_concurrent)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,

    /// Write a configuration file with the current (or default) values
    Init,
}

/// Run a config subcommand against the file at `path`.
pub fn run(command: ConfigCommands, path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => run_get(&key, path),
        ConfigCommands::Set { key, value } => run_set(&key, &value, path),
        ConfigCommands::List => run_list(path),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommands::Init => run_init(path),
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'hipstile config list' to see available keys.",
            key
        ))
    })
}

fn run_get(key: &str, path: &Path) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let config = EngineConfig::load_from(path)?;
    println!("{}", config_key.get(&config));
    Ok(())
}

fn run_set(key: &str, value: &str, path: &Path) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let mut config = EngineConfig::load_from(path)?;
    config_key.set(&mut config, value)?;
    config.save_to(path)?;

    println!("Set {} = {}", config_key.name(), config_key.get(&config));
    Ok(())
}

fn run_list(path: &Path) -> Result<(), CliError> {
    let config = EngineConfig::load_from(path)?;

    print_header("Configuration Settings");
    println!();

    let mut current_section = "";
    for key in ConfigKey::all() {
        let section = key.section();
        if section != current_section {
            if !current_section.is_empty() {
                println!();
            }
            println!("[{}]", section);
            current_section = section;
        }
        println!("  {} = {}", key.key_name(), key.get(&config));
    }

    println!();
    println!(
        "Cache budget: {}",
        format_size(config.cache_config().budget_bytes)
    );
    Ok(())
}

fn run_init(path: &Path) -> Result<(), CliError> {
    // Keep any values already present; fill in the rest.
    let config = EngineConfig::load_from(path)?;
    config.save_to(path)?;

    println!("Configuration file: {}", path.display());
    println!();
    println!("Edit this file to customize cache, loader and render settings.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_then_get() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");

        run(
            ConfigCommands::Set {
                key: "render.split_order".to_string(),
                value: "5".to_string(),
            },
            &path,
        )
        .unwrap();
        assert_eq!(EngineConfig::load_from(&path).unwrap().render.split_order, 5);
    }

    #[test]
    fn test_unknown_key() {
        let dir = TempDir::new().unwrap();
        let result = run(
            ConfigCommands::Get {
                key: "render.colour".to_string(),
            },
            &dir.path().join("config.ini"),
        );
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_init_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub/config.ini");
        run(ConfigCommands::Init, &path).unwrap();
        assert!(path.exists());
    }
}
