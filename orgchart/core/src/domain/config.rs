// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Org-chart Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) covering:
// - Directory backend selection (in-memory roster or PostgreSQL)
// - Transaction retry policy for serialization conflicts
// - Logging settings consumed by the CLI

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::directory::{PostgresConfig, StorageBackend};

pub const API_VERSION: &str = "orgchart/v1";
pub const KIND: &str = "OrgChartConfig";

/// Top-level configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgChartConfig {
    /// API version (must be "orgchart/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "OrgChartConfig")
    pub kind: String,

    pub metadata: ConfigMetadata,

    #[serde(default)]
    pub spec: OrgChartSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Human-readable deployment name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgChartSpec {
    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub transactions: TransactionConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum DirectoryConfig {
    Memory {
        /// JSON roster loaded at startup and written back after mutations
        #[serde(default, skip_serializing_if = "Option::is_none")]
        roster_path: Option<PathBuf>,
    },
    Postgres {
        connection_string: String,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        DirectoryConfig::Memory { roster_path: None }
    }
}

impl DirectoryConfig {
    pub fn storage_backend(&self) -> StorageBackend {
        match self {
            DirectoryConfig::Memory { .. } => StorageBackend::InMemory,
            DirectoryConfig::Postgres { connection_string, max_connections } => {
                StorageBackend::PostgreSQL(PostgresConfig {
                    connection_string: connection_string.clone(),
                    max_connections: *max_connections,
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionConfig {
    /// Extra attempts after a serialization conflict
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

impl TransactionConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (compact, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_max_connections() -> u32 {
    5
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

impl Default for OrgChartConfig {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ConfigMetadata {
                name: "orgchart".to_string(),
                labels: None,
            },
            spec: OrgChartSpec::default(),
        }
    }
}

impl OrgChartConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. ORGCHART_CONFIG_PATH environment variable
    /// 2. ./orgchart-config.yaml (working directory)
    /// 3. ~/.orgchart/config.yaml (user home)
    /// 4. /etc/orgchart/config.yaml (Unix)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("ORGCHART_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./orgchart-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".orgchart").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        {
            let system_config = PathBuf::from("/etc/orgchart/config.yaml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::debug!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("ORGCHART_DATABASE_URL") {
            tracing::info!("Environment override: ORGCHART_DATABASE_URL (postgres backend)");
            let max_connections = match &self.spec.directory {
                DirectoryConfig::Postgres { max_connections, .. } => *max_connections,
                DirectoryConfig::Memory { .. } => default_max_connections(),
            };
            self.spec.directory = DirectoryConfig::Postgres {
                connection_string: url,
                max_connections,
            };
        }

        if let Ok(val) = std::env::var("ORGCHART_MAX_RETRIES") {
            match val.parse::<u32>() {
                Ok(retries) => {
                    tracing::info!("Environment override: ORGCHART_MAX_RETRIES={}", retries);
                    self.spec.transactions.max_retries = retries;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for ORGCHART_MAX_RETRIES: '{}'. Expected an integer. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if let DirectoryConfig::Postgres { connection_string, max_connections } = &self.spec.directory {
            if connection_string.is_empty() {
                anyhow::bail!("spec.directory.connection_string cannot be empty");
            }
            if *max_connections == 0 {
                anyhow::bail!("spec.directory.max_connections must be at least 1");
            }
        }

        match self.spec.observability.logging.format.as_str() {
            "compact" | "json" => {}
            other => anyhow::bail!("Unsupported log format: '{}'. Use 'compact' or 'json'", other),
        }

        Ok(())
    }
}
