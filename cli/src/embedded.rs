// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Embedded service construction
//!
//! Builds the directory and hierarchy service in-process for one CLI
//! invocation.

use anyhow::Result;
use std::path::PathBuf;
use tracing::debug;

use orgchart_core::application::directory_factory::{create_directory, DirectoryHandle};
use orgchart_core::application::hierarchy_service::StandardHierarchyService;
use orgchart_core::application::transaction::RetryPolicy;
use orgchart_core::domain::config::{DirectoryConfig, OrgChartConfig};

pub struct EmbeddedService {
    handle: DirectoryHandle,
    service: StandardHierarchyService,
}

impl EmbeddedService {
    /// `roster_override` replaces the configured roster path when the memory
    /// backend is in use and is ignored otherwise.
    pub async fn new(config: &OrgChartConfig, roster_override: Option<PathBuf>) -> Result<Self> {
        let mut directory_config = config.spec.directory.clone();
        if let (DirectoryConfig::Memory { roster_path }, Some(path)) =
            (&mut directory_config, roster_override)
        {
            *roster_path = Some(path);
        }

        let handle = create_directory(&directory_config).await?;
        let retry = RetryPolicy::from(&config.spec.transactions);
        debug!(max_retries = retry.max_retries, "Hierarchy service ready");
        let service = StandardHierarchyService::new(handle.directory()).with_retry_policy(retry);

        Ok(Self { handle, service })
    }

    pub fn service(&self) -> &StandardHierarchyService {
        &self.service
    }

    /// Flush state after a mutating command.
    pub async fn persist(&self) -> Result<()> {
        self.handle.persist().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgchart_core::domain::employee::NewEmployee;
    use orgchart_core::HierarchyService;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_roster_override_persists_between_invocations() {
        let dir = TempDir::new().unwrap();
        let roster = dir.path().join("roster.json");
        let config = OrgChartConfig::default();

        let first = EmbeddedService::new(&config, Some(roster.clone())).await.unwrap();
        let boss = first
            .service()
            .create_employee(NewEmployee {
                name: "Grace".to_string(),
                email: "grace@corp.test".to_string(),
                department: Some("Research".to_string()),
                salary: None,
                is_manager: true,
                manager_id: None,
            })
            .await
            .unwrap();
        first.persist().await.unwrap();

        let second = EmbeddedService::new(&config, Some(roster)).await.unwrap();
        let managers = second.service().get_all_managers().await.unwrap();
        assert_eq!(managers.len(), 1);
        assert_eq!(managers[0].id, boss.id);
    }
}
