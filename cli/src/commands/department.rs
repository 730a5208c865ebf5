// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;
use clap::Subcommand;

use orgchart_core::HierarchyService;

use super::print_json;
use crate::embedded::EmbeddedService;

#[derive(Subcommand)]
pub enum DepartmentCommand {
    /// List distinct department names
    List,

    /// List employees in a department
    Members {
        #[arg(value_name = "DEPARTMENT")]
        department: String,
    },
}

pub async fn handle_command(command: DepartmentCommand, embedded: &EmbeddedService) -> Result<()> {
    let service = embedded.service();

    match command {
        DepartmentCommand::List => print_json(&service.get_all_departments().await?),
        DepartmentCommand::Members { department } => {
            print_json(&service.get_employees_by_department(&department).await?)
        }
    }
}
