// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use orgchart_core::domain::config::{DirectoryConfig, OrgChartConfig};

const MINIMAL_TEMPLATE: &str = include_str!("../../../templates/config-minimal.yaml");
const EXAMPLES_TEMPLATE: &str = include_str!("../../../templates/config-with-examples.yaml");

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./orgchart-config.yaml)
        #[arg(short, long, default_value = "./orgchart-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(&output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = OrgChartConfig::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. ORGCHART_CONFIG_PATH: {}",
            std::env::var("ORGCHART_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./orgchart-config.yaml");
        println!("  4. ~/.orgchart/config.yaml");
        println!("  5. /etc/orgchart/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    println!("{}", "Directory:".bold());
    match &config.spec.directory {
        DirectoryConfig::Memory { roster_path } => {
            println!("  Backend: memory");
            match roster_path {
                Some(path) => println!("  Roster: {}", path.display()),
                None => println!("  Roster: {}", "(not persisted)".dimmed()),
            }
        }
        DirectoryConfig::Postgres { max_connections, .. } => {
            // The connection string may carry credentials.
            println!("  Backend: postgres");
            println!("  Connection: {}", "(set)".dimmed());
            println!("  Max connections: {}", max_connections);
        }
    }
    println!();

    println!("{}", "Transactions:".bold());
    println!("  Max retries: {}", config.spec.transactions.max_retries);
    println!("  Retry delay: {}ms", config.spec.transactions.retry_delay_ms);
    println!();

    println!("{}", "Logging:".bold());
    println!("  Level: {}", config.spec.observability.logging.level);
    println!("  Format: {}", config.spec.observability.logging.format);
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = OrgChartConfig::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: &Path, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        EXAMPLES_TEMPLATE
    } else {
        MINIMAL_TEMPLATE
    };

    std::fs::write(output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_templates_are_valid() {
        for template in [MINIMAL_TEMPLATE, EXAMPLES_TEMPLATE] {
            let config = OrgChartConfig::from_yaml_str(template).unwrap();
            config.validate().unwrap();
            assert!(matches!(config.spec.directory, DirectoryConfig::Memory { .. }));
        }
    }

    #[tokio::test]
    async fn test_generate_writes_loadable_file() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("orgchart-config.yaml");

        generate(&output, true).await.unwrap();

        let config = OrgChartConfig::from_yaml_file(&output).unwrap();
        assert_eq!(config.metadata.name, "orgchart-dev");
        assert_eq!(config.spec.transactions.max_retries, 3);
    }
}
