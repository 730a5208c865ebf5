// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Validation Engine
//!
//! Decides whether a proposed manager assignment, promotion or demotion is
//! legal against the current directory state. It keeps no state of its own
//! and re-reads the directory on every check, so callers run it inside the
//! same transaction as the write it guards.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Read-only integrity checks for the reporting graph

use std::collections::HashSet;
use tracing::debug;

use crate::domain::directory::DirectoryTransaction;
use crate::domain::employee::{Employee, EmployeeId};
use crate::domain::hierarchy::HierarchyError;

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationEngine;

impl ValidationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Check that `manager_id` may become the manager of `employee_id`.
    ///
    /// `employee_id` may be [`EmployeeId::UNASSIGNED`] for an employee that
    /// is not persisted yet. `None` means "no manager" and always passes.
    /// Checks run in order and stop at the first failure: the manager exists,
    /// is flagged as a manager, is not the employee itself, and does not have
    /// the employee anywhere in its chain of command.
    pub async fn validate_manager_assignment(
        &self,
        tx: &mut dyn DirectoryTransaction,
        employee_id: EmployeeId,
        manager_id: Option<EmployeeId>,
    ) -> Result<(), HierarchyError> {
        let Some(manager_id) = manager_id else {
            return Ok(());
        };

        let manager = tx
            .find_by_id(manager_id)
            .await?
            .ok_or_else(|| HierarchyError::not_found(manager_id))?;

        if !manager.is_manager {
            return Err(HierarchyError::InvalidRole(manager_id));
        }

        if employee_id == manager_id {
            return Err(HierarchyError::CycleDetected(format!(
                "employee {} cannot be their own manager",
                employee_id
            )));
        }

        if self.is_in_chain_of_command(tx, employee_id, manager_id).await? {
            return Err(HierarchyError::CycleDetected(format!(
                "employee {} cannot have manager {} (creates a cycle in the hierarchy)",
                employee_id, manager_id
            )));
        }

        Ok(())
    }

    /// Whether `target` is `start` or one of its ancestors.
    ///
    /// Stops without error at a root, at a dangling reference, or when a node
    /// repeats (a pre-existing cycle not involving `target`).
    pub async fn is_in_chain_of_command(
        &self,
        tx: &mut dyn DirectoryTransaction,
        target: EmployeeId,
        start: EmployeeId,
    ) -> Result<bool, HierarchyError> {
        let mut visited = HashSet::new();
        let mut current = Some(start);

        while let Some(id) = current {
            if id == target {
                return Ok(true);
            }
            if !visited.insert(id) {
                debug!(employee_id = %id, "Chain walk revisited a node; stopping");
                break;
            }
            current = match tx.find_by_id(id).await? {
                Some(employee) => employee.manager_id,
                None => None,
            };
        }

        Ok(false)
    }

    /// The employee must exist and must not already be a manager. Returns the
    /// loaded record.
    pub async fn validate_promotion(
        &self,
        tx: &mut dyn DirectoryTransaction,
        employee_id: EmployeeId,
    ) -> Result<Employee, HierarchyError> {
        let employee = load(tx, employee_id).await?;
        if employee.is_manager {
            return Err(HierarchyError::AlreadyManager(employee_id));
        }
        Ok(employee)
    }

    /// The employee must exist and currently be a manager. Returns the loaded
    /// record; the subordinate check is left to the caller.
    pub async fn validate_demotion(
        &self,
        tx: &mut dyn DirectoryTransaction,
        employee_id: EmployeeId,
    ) -> Result<Employee, HierarchyError> {
        let employee = load(tx, employee_id).await?;
        if !employee.is_manager {
            return Err(HierarchyError::NotManager(employee_id));
        }
        Ok(employee)
    }
}

pub(crate) async fn load(
    tx: &mut dyn DirectoryTransaction,
    id: EmployeeId,
) -> Result<Employee, HierarchyError> {
    tx.find_by_id(id)
        .await?
        .ok_or_else(|| HierarchyError::not_found(id))
}
