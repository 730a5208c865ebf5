// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Directory Factory - Application Layer
//!
//! Creates the concrete [`Directory`] selected by configuration, keeping the
//! domain layer free of infrastructure types.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Wire a configured storage backend into the hierarchy service

use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::domain::config::DirectoryConfig;
use crate::domain::directory::{Directory, StorageBackend};
use crate::domain::employee::Employee;
use crate::infrastructure::db::Database;
use crate::infrastructure::repositories::postgres_employee::PostgresDirectory;
use crate::infrastructure::repositories::InMemoryDirectory;

/// A constructed directory plus what is needed to persist it afterwards.
pub enum DirectoryHandle {
    Memory {
        directory: InMemoryDirectory,
        roster_path: Option<PathBuf>,
    },
    Postgres(Arc<PostgresDirectory>),
}

impl DirectoryHandle {
    pub fn directory(&self) -> Arc<dyn Directory> {
        match self {
            DirectoryHandle::Memory { directory, .. } => Arc::new(directory.clone()),
            DirectoryHandle::Postgres(directory) => directory.clone(),
        }
    }

    /// Write the in-memory roster back to disk. PostgreSQL commits as it goes,
    /// so this is a no-op there, as it is for a memory directory with no path.
    pub async fn persist(&self) -> Result<()> {
        if let DirectoryHandle::Memory {
            directory,
            roster_path: Some(path),
        } = self
        {
            save_roster(path, &directory.snapshot().await)?;
        }
        Ok(())
    }
}

/// Build the directory described by `config`. A memory roster file that does
/// not exist yet starts an empty directory; PostgreSQL gets its schema
/// created if missing.
pub async fn create_directory(config: &DirectoryConfig) -> Result<DirectoryHandle> {
    match (config, config.storage_backend()) {
        (DirectoryConfig::Memory { roster_path }, _) => {
            let directory = match roster_path {
                Some(path) if path.exists() => {
                    let roster = load_roster(path)?;
                    info!(path = %path.display(), employees = roster.len(), "Loaded roster");
                    InMemoryDirectory::from_roster(roster)
                        .with_context(|| format!("Invalid roster in {}", path.display()))?
                }
                _ => InMemoryDirectory::new(),
            };
            Ok(DirectoryHandle::Memory {
                directory,
                roster_path: roster_path.clone(),
            })
        }
        (DirectoryConfig::Postgres { .. }, StorageBackend::PostgreSQL(pg)) => {
            let db = Database::new(&pg).await?;
            let directory = PostgresDirectory::new(db.get_pool().clone());
            directory
                .ensure_schema()
                .await
                .context("Failed to prepare employees schema")?;
            info!(max_connections = pg.max_connections, "Connected PostgreSQL directory");
            Ok(DirectoryHandle::Postgres(Arc::new(directory)))
        }
        (DirectoryConfig::Postgres { .. }, StorageBackend::InMemory) => {
            anyhow::bail!("postgres directory config resolved to an in-memory backend")
        }
    }
}

pub fn load_roster(path: &Path) -> Result<Vec<Employee>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read roster file: {}", path.display()))?;
    let roster: Vec<Employee> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse roster JSON: {}", path.display()))?;
    Ok(roster)
}

pub fn save_roster(path: &Path, roster: &[Employee]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create roster directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(roster).context("Failed to serialize roster")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write roster file: {}", path.display()))?;
    debug!(path = %path.display(), employees = roster.len(), "Saved roster");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::directory::DirectoryTransaction;
    use crate::domain::employee::NewEmployee;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_directory_without_roster_starts_empty() {
        let handle = create_directory(&DirectoryConfig::default()).await.unwrap();
        let mut tx = handle.directory().begin().await.unwrap();
        assert!(tx.find_all().await.unwrap().is_empty());
        drop(tx);
        handle.persist().await.unwrap();
    }

    #[tokio::test]
    async fn test_roster_survives_persist_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("roster.json");
        let config = DirectoryConfig::Memory {
            roster_path: Some(path.clone()),
        };

        let handle = create_directory(&config).await.unwrap();
        {
            let directory = handle.directory();
            let mut tx = directory.begin().await.unwrap();
            tx.save(&Employee::from_new(NewEmployee {
                name: "Ada".to_string(),
                email: "ada@corp.test".to_string(),
                department: None,
                salary: None,
                is_manager: true,
                manager_id: None,
            }))
            .await
            .unwrap();
            tx.commit().await.unwrap();
        }
        handle.persist().await.unwrap();
        assert!(path.exists());

        let reloaded = create_directory(&config).await.unwrap();
        let mut tx = reloaded.directory().begin().await.unwrap();
        let all = tx.find_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].email, "ada@corp.test");
    }

    #[test]
    fn test_corrupt_roster_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("roster.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_roster(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse roster JSON"));
    }
}
