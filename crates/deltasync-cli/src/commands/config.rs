//! Config command - View and manage DeltaSync configuration
//!
//! Provides the `deltasync config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Sets individual configuration values via dot-notation keys
//! 3. Validates the configuration file and reports errors
//! 4. Writes a default configuration file

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use deltasync_core::config::Config;

use crate::output::{get_formatter, OutputFormat};

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "sync.window_size")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    /// Execute the config command against the file at `config_path`
    pub fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => execute_show(config_path, format),
            ConfigCommand::Set { key, value } => execute_set(config_path, key, value, format),
            ConfigCommand::Validate => execute_validate(config_path, format),
            ConfigCommand::Init { force } => execute_init(config_path, *force, format),
        }
    }
}

fn execute_show(config_path: &Path, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let config = Config::load_or_default(config_path);

    info!(config_path = %config_path.display(), "Showing configuration");

    if format.is_json() {
        let json =
            serde_json::to_value(&config).context("Failed to serialize configuration to JSON")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Configuration ({})", config_path.display()));
        formatter.info("");

        let yaml =
            serde_yaml::to_string(&config).context("Failed to serialize configuration to YAML")?;
        for line in yaml.lines() {
            formatter.info(line);
        }
    }

    Ok(())
}

fn execute_set(config_path: &Path, key: &str, value: &str, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let mut config = Config::load_or_default(config_path);

    info!(%key, %value, "Setting configuration value");

    if let Err(e) = apply_config_value(&mut config, key, value) {
        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": false,
                "key": key,
                "value": value,
                "error": e.to_string(),
            }));
        } else {
            formatter.error(&format!("Failed to set '{}': {}", key, e));
            formatter.info("");
            formatter.info("Supported keys:");
            formatter.info("  account.username   - Account name used to log in");
            formatter.info("  sync.window_size   - Message changes per sync round");
            formatter.info("  cache.state_dir    - Directory for persisted state");
            formatter.info("  cache.persist      - true|false");
            formatter.info("  logging.level      - trace|debug|info|warn|error");
            formatter.info("  logging.format     - text|json");
        }
        return Ok(());
    }

    let errors = config.validate();
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": false,
                "key": key,
                "value": value,
                "errors": messages,
            }));
        } else {
            formatter.error(&format!(
                "Invalid value for '{}': {}",
                key,
                messages.join("; ")
            ));
        }
        return Ok(());
    }

    save(config_path, &config)?;

    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "key": key,
            "value": value,
            "config_path": config_path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Set {} = {}", key, value));
        formatter.info(&format!("Saved to {}", config_path.display()));
    }
    Ok(())
}

fn execute_validate(config_path: &Path, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);

    if !config_path.exists() {
        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "valid": false,
                "config_path": config_path.display().to_string(),
                "errors": ["Configuration file not found. Using defaults."],
            }));
        } else {
            formatter.info(&format!(
                "Configuration file not found at {}",
                config_path.display()
            ));
            formatter.info("Using default configuration. Run 'deltasync config init' to create one.");
        }
        return Ok(());
    }

    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "valid": false,
                    "config_path": config_path.display().to_string(),
                    "errors": [format!("Failed to parse configuration: {}", e)],
                }));
            } else {
                formatter.error(&format!("Failed to parse configuration: {}", e));
                formatter.info(&format!("File: {}", config_path.display()));
            }
            return Ok(());
        }
    };

    info!(config_path = %config_path.display(), "Validating configuration");

    let errors = config.validate();
    if format.is_json() {
        let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        formatter.print_json(&serde_json::json!({
            "valid": errors.is_empty(),
            "config_path": config_path.display().to_string(),
            "errors": error_strings,
        }));
    } else if errors.is_empty() {
        formatter.success("Configuration is valid");
        formatter.info(&format!("File: {}", config_path.display()));
    } else {
        formatter.error(&format!(
            "Configuration has {} error{}:",
            errors.len(),
            if errors.len() == 1 { "" } else { "s" }
        ));
        formatter.info(&format!("File: {}", config_path.display()));
        formatter.info("");
        for error in &errors {
            formatter.info(&format!("  {} - {}", error.field, error.message));
        }
    }

    Ok(())
}

fn execute_init(config_path: &Path, force: bool, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);

    if config_path.exists() && !force {
        formatter.error(&format!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        ));
        return Ok(());
    }

    save(config_path, &Config::default())?;

    if format.is_json() {
        formatter.print_json(&serde_json::json!({
            "success": true,
            "config_path": config_path.display().to_string(),
        }));
    } else {
        formatter.success(&format!("Wrote {}", config_path.display()));
    }
    Ok(())
}

fn save(config_path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    std::fs::write(config_path, yaml).context("Failed to write configuration file")?;
    Ok(())
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "account.username" => {
            config.account.username = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.to_string())
            };
        }
        "sync.window_size" => {
            config.sync.window_size = value
                .parse::<u32>()
                .context("Expected a positive integer for sync.window_size")?;
        }
        "cache.state_dir" => {
            config.cache.state_dir = PathBuf::from(value);
        }
        "cache.persist" => {
            config.cache.persist = value
                .parse::<bool>()
                .context("Expected true or false for cache.persist")?;
        }
        "logging.level" => {
            config.logging.level = value.to_string();
        }
        "logging.format" => {
            config.logging.format = value.to_string();
        }
        _ => {
            anyhow::bail!("Unknown configuration key: '{}'", key);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_apply_account_username() {
        let mut config = Config::default();
        apply_config_value(&mut config, "account.username", "me@example.com").unwrap();
        assert_eq!(config.account.username.as_deref(), Some("me@example.com"));

        apply_config_value(&mut config, "account.username", "none").unwrap();
        assert_eq!(config.account.username, None);
    }

    #[test]
    fn test_apply_window_size() {
        let mut config = Config::default();
        apply_config_value(&mut config, "sync.window_size", "1000").unwrap();
        assert_eq!(config.sync.window_size, 1000);
        assert!(apply_config_value(&mut config, "sync.window_size", "-5").is_err());
    }

    #[test]
    fn test_apply_cache_values() {
        let mut config = Config::default();
        apply_config_value(&mut config, "cache.state_dir", "/var/lib/deltasync").unwrap();
        apply_config_value(&mut config, "cache.persist", "false").unwrap();
        assert_eq!(config.cache.state_dir, PathBuf::from("/var/lib/deltasync"));
        assert!(!config.cache.persist);
        assert!(apply_config_value(&mut config, "cache.persist", "maybe").is_err());
    }

    #[test]
    fn test_apply_logging_values() {
        let mut config = Config::default();
        apply_config_value(&mut config, "logging.level", "debug").unwrap();
        apply_config_value(&mut config, "logging.format", "json").unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_apply_unknown_key_fails() {
        let mut config = Config::default();
        assert!(apply_config_value(&mut config, "sync.root", "/tmp").is_err());
    }

    #[test]
    fn test_set_persists_valid_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        execute_set(&path, "sync.window_size", "512", OutputFormat::Json).unwrap();

        assert_eq!(Config::load(&path).unwrap().sync.window_size, 512);
    }

    #[test]
    fn test_set_rejects_invalid_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");

        execute_set(&path, "sync.window_size", "0", OutputFormat::Json).unwrap();

        assert!(!path.exists());
    }

    #[test]
    fn test_init_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");

        execute_init(&path, false, OutputFormat::Json).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.sync.window_size, 256);

        std::fs::write(&path, "sync:\n  window_size: 9\n").unwrap();
        execute_init(&path, false, OutputFormat::Json).unwrap();
        assert_eq!(Config::load(&path).unwrap().sync.window_size, 9);

        execute_init(&path, true, OutputFormat::Json).unwrap();
        assert_eq!(Config::load(&path).unwrap().sync.window_size, 256);
    }
}
