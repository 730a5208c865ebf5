// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use orgchart_core::domain::employee::EmployeeId;
use orgchart_core::HierarchyService;

use super::print_json;
use crate::embedded::EmbeddedService;

#[derive(Subcommand)]
pub enum ManagerCommand {
    /// List employees holding the manager role
    List,

    /// Delete a manager, moving its reports to the least-loaded remaining manager
    Delete {
        #[arg(value_name = "ID")]
        id: EmployeeId,
    },
}

pub async fn handle_command(command: ManagerCommand, embedded: &EmbeddedService) -> Result<()> {
    let service = embedded.service();

    match command {
        ManagerCommand::List => print_json(&service.get_all_managers().await?),
        ManagerCommand::Delete { id } => {
            let plan = service.delete_manager(id).await?;
            embedded.persist().await?;

            if plan.is_noop() {
                eprintln!("{}", format!("✓ Manager {} deleted (no reports)", id).green());
            } else {
                let target = plan
                    .replacement
                    .map_or_else(|| "no manager".to_string(), |m| format!("manager {}", m));
                eprintln!(
                    "{}",
                    format!(
                        "✓ Manager {} deleted; {} report(s) moved to {}",
                        id,
                        plan.subordinates.len(),
                        target
                    )
                    .green()
                );
            }
            print_json(&plan)
        }
    }
}
