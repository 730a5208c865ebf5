// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Org Chart CLI
//!
//! The `orgchart` binary drives the hierarchy engine against the configured
//! directory: an in-memory roster persisted as JSON, or PostgreSQL.
//!
//! ## Commands
//!
//! - `orgchart employee create|get|update|delete|promote|demote|transfer|chain|profile|list|search|subordinates`
//! - `orgchart manager list|delete` - Manager listing and reassigning deletion
//! - `orgchart department list|members` - Department queries
//! - `orgchart config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use orgchart_cli::commands::{self, ConfigCommand, DepartmentCommand, EmployeeCommand, ManagerCommand};
use orgchart_cli::embedded::EmbeddedService;
use orgchart_core::domain::config::OrgChartConfig;
use orgchart_core::HierarchyError;

/// Org chart - reporting hierarchy management
#[derive(Parser)]
#[command(name = "orgchart")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "ORGCHART_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); defaults to the config value
    #[arg(long, global = true, env = "ORGCHART_LOG_LEVEL")]
    log_level: Option<String>,

    /// Roster file for the memory backend (overrides spec.directory.roster_path)
    #[arg(long, global = true, value_name = "FILE")]
    roster: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Employee operations
    #[command(name = "employee")]
    Employee {
        #[command(subcommand)]
        command: EmployeeCommand,
    },

    /// Manager operations
    #[command(name = "manager")]
    Manager {
        #[command(subcommand)]
        command: ManagerCommand,
    },

    /// Department queries
    #[command(name = "department")]
    Department {
        #[command(subcommand)]
        command: DepartmentCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        match err.downcast_ref::<HierarchyError>() {
            Some(hierarchy) => eprintln!(
                "{} {}",
                format!("error[{}]:", hierarchy.kind()).red().bold(),
                hierarchy
            ),
            None => eprintln!("{} {:#}", "error:".red().bold(), err),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = OrgChartConfig::load_or_default(cli.config.clone());

    // Logging comes up before config errors are reported, so a broken file
    // still gets the default format.
    let logging = config
        .as_ref()
        .map(|c| c.spec.observability.logging.clone())
        .unwrap_or_default();
    let level = cli.log_level.clone().unwrap_or(logging.level);
    init_logging(&level, &logging.format)?;

    let Some(command) = cli.command else {
        eprintln!("{}", "No command specified. Use --help for usage.".yellow());
        std::process::exit(1);
    };

    match command {
        Commands::Config { command } => commands::config::handle_command(command, cli.config).await,
        Commands::Employee { command } => {
            let embedded = embedded_service(config, cli.roster).await?;
            commands::employee::handle_command(command, &embedded).await
        }
        Commands::Manager { command } => {
            let embedded = embedded_service(config, cli.roster).await?;
            commands::manager::handle_command(command, &embedded).await
        }
        Commands::Department { command } => {
            let embedded = embedded_service(config, cli.roster).await?;
            commands::department::handle_command(command, &embedded).await
        }
    }
}

async fn embedded_service(
    config: Result<OrgChartConfig>,
    roster: Option<PathBuf>,
) -> Result<EmbeddedService> {
    let config = config.context("Failed to load configuration")?;
    config
        .validate()
        .context("Configuration validation failed")?;
    EmbeddedService::new(&config, roster).await
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str, format: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if format == "json" {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}
