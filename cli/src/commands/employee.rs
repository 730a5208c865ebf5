// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Employee commands
//!
//! Commands: create, get, update, delete, promote, demote, transfer, chain,
//! profile, list, search, subordinates

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use orgchart_core::domain::employee::{EmployeeId, EmployeePatch, NewEmployee, SearchCriteria};
use orgchart_core::HierarchyService;

use super::print_json;
use crate::embedded::EmbeddedService;

#[derive(Subcommand)]
pub enum EmployeeCommand {
    /// Create an employee
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        department: Option<String>,

        #[arg(long)]
        salary: Option<f64>,

        /// Manager to report to
        #[arg(long, value_name = "ID")]
        manager: Option<EmployeeId>,

        /// Create with the manager role
        #[arg(long)]
        is_manager: bool,
    },

    /// Show an employee by id or email
    Get {
        #[arg(value_name = "ID", required_unless_present = "email")]
        id: Option<EmployeeId>,

        #[arg(long, conflicts_with = "id")]
        email: Option<String>,
    },

    /// Update employee fields; unspecified fields keep their value
    Update {
        #[arg(value_name = "ID")]
        id: EmployeeId,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        department: Option<String>,

        #[arg(long)]
        salary: Option<f64>,

        #[arg(long, value_name = "ID", conflicts_with = "no_manager")]
        manager: Option<EmployeeId>,

        /// Remove the manager reference
        #[arg(long)]
        no_manager: bool,

        /// Set the role flag directly (no subordinate check; prefer `demote`)
        #[arg(long, value_name = "BOOL")]
        is_manager: Option<bool>,
    },

    /// Delete a non-manager employee
    Delete {
        #[arg(value_name = "ID")]
        id: EmployeeId,
    },

    /// Grant the manager role
    Promote {
        #[arg(value_name = "ID")]
        id: EmployeeId,
    },

    /// Revoke the manager role (requires no direct reports)
    Demote {
        #[arg(value_name = "ID")]
        id: EmployeeId,
    },

    /// Move an employee under a new manager, or to the top level
    Transfer {
        #[arg(value_name = "ID")]
        id: EmployeeId,

        /// New manager; omit to make the employee a root
        #[arg(long, value_name = "MANAGER_ID")]
        to: Option<EmployeeId>,
    },

    /// Print the chain of command from the employee up to the root
    Chain {
        #[arg(value_name = "ID")]
        id: EmployeeId,
    },

    /// Show an employee with report count and manager summary
    Profile {
        #[arg(value_name = "ID")]
        id: EmployeeId,
    },

    /// List all employees
    List,

    /// Search employees; all given filters must match
    Search {
        /// Case-insensitive substring of name or email
        #[arg(value_name = "TERM", conflicts_with_all = ["name", "department", "min_salary", "max_salary", "managers"])]
        term: Option<String>,

        /// Case-insensitive substring of the name
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        department: Option<String>,

        #[arg(long)]
        min_salary: Option<f64>,

        #[arg(long)]
        max_salary: Option<f64>,

        /// Filter on the manager role
        #[arg(long, value_name = "BOOL")]
        managers: Option<bool>,
    },

    /// List direct reports of a manager
    Subordinates {
        #[arg(value_name = "ID")]
        id: EmployeeId,
    },
}

pub async fn handle_command(command: EmployeeCommand, embedded: &EmbeddedService) -> Result<()> {
    let service = embedded.service();

    match command {
        EmployeeCommand::Create {
            name,
            email,
            department,
            salary,
            manager,
            is_manager,
        } => {
            let employee = service
                .create_employee(NewEmployee {
                    name,
                    email,
                    department,
                    salary,
                    is_manager,
                    manager_id: manager,
                })
                .await?;
            embedded.persist().await?;
            eprintln!("{}", format!("✓ Employee {} created", employee.id).green());
            print_json(&employee)
        }
        EmployeeCommand::Get { id, email } => {
            let employee = match (id, email) {
                (_, Some(email)) => service.get_employee_by_email(&email).await?,
                (Some(id), None) => service.get_employee(id).await?,
                (None, None) => anyhow::bail!("Provide an employee id or --email"),
            };
            print_json(&employee)
        }
        EmployeeCommand::Update {
            id,
            name,
            email,
            department,
            salary,
            manager,
            no_manager,
            is_manager,
        } => {
            let patch = EmployeePatch {
                name,
                email,
                department,
                salary,
                is_manager,
                manager_id: if no_manager { Some(None) } else { manager.map(Some) },
            };

            let employee = service.patch_employee(id, patch).await?;
            embedded.persist().await?;
            eprintln!("{}", format!("✓ Employee {} updated", id).green());
            print_json(&employee)
        }
        EmployeeCommand::Delete { id } => {
            service.delete_employee_by_id(id).await?;
            embedded.persist().await?;
            eprintln!("{}", format!("✓ Employee {} deleted", id).green());
            Ok(())
        }
        EmployeeCommand::Promote { id } => {
            let employee = service.promote_to_manager(id).await?;
            embedded.persist().await?;
            eprintln!("{}", format!("✓ Employee {} promoted to manager", id).green());
            print_json(&employee)
        }
        EmployeeCommand::Demote { id } => {
            let employee = service.demote_from_manager(id).await?;
            embedded.persist().await?;
            eprintln!("{}", format!("✓ Employee {} demoted", id).green());
            print_json(&employee)
        }
        EmployeeCommand::Transfer { id, to } => {
            let employee = service.transfer_employee(id, to).await?;
            embedded.persist().await?;
            let target = to.map_or_else(|| "top level".to_string(), |m| format!("manager {}", m));
            eprintln!("{}", format!("✓ Employee {} moved to {}", id, target).green());
            print_json(&employee)
        }
        EmployeeCommand::Chain { id } => {
            let chain = service.get_reporting_hierarchy(id).await?;
            for (depth, employee) in chain.iter().enumerate() {
                eprintln!(
                    "{}{} {}",
                    "  ".repeat(depth),
                    employee.name.bold(),
                    format!("({})", employee.id).dimmed()
                );
            }
            print_json(&chain)
        }
        EmployeeCommand::Profile { id } => print_json(&service.get_employee_profile(id).await?),
        EmployeeCommand::List => print_json(&service.get_all_employees().await?),
        EmployeeCommand::Search {
            term,
            name,
            department,
            min_salary,
            max_salary,
            managers,
        } => {
            let found = match term {
                Some(term) => service.search_by_name_or_email(&term).await?,
                None => {
                    service
                        .search_employees(SearchCriteria {
                            name,
                            department,
                            min_salary,
                            max_salary,
                            is_manager: managers,
                        })
                        .await?
                }
            };
            print_json(&found)
        }
        EmployeeCommand::Subordinates { id } => print_json(&service.get_subordinates(id).await?),
    }
}
