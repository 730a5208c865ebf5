// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Manager Removal
//!
//! The two phases of removing a manager. [`plan_manager_removal`] reads the
//! directory and decides who inherits the reports; [`apply_reassignment_plan`]
//! performs the writes. The service runs both against the same transaction,
//! so the plan cannot go stale between the phases.
//!
//! Managers below the removed one in the hierarchy are never candidates:
//! handing a subordinate to one of its own descendants would close a loop.

use tracing::debug;

use crate::application::validation_engine::{load, ValidationEngine};
use crate::domain::directory::DirectoryTransaction;
use crate::domain::employee::EmployeeId;
use crate::domain::hierarchy::{
    choose_replacement, HierarchyError, ReassignmentPlan, ReplacementCandidate,
};

pub async fn plan_manager_removal(
    validation: &ValidationEngine,
    tx: &mut dyn DirectoryTransaction,
    manager_id: EmployeeId,
) -> Result<ReassignmentPlan, HierarchyError> {
    load(tx, manager_id).await?;

    let subordinates: Vec<EmployeeId> = tx
        .find_subordinates(manager_id)
        .await?
        .into_iter()
        .map(|e| e.id)
        .collect();

    if subordinates.is_empty() {
        return Ok(ReassignmentPlan {
            manager_id,
            replacement: None,
            subordinates,
        });
    }

    let mut candidates = Vec::new();
    for manager in tx.find_all_managers().await? {
        if validation
            .is_in_chain_of_command(tx, manager_id, manager.id)
            .await?
        {
            continue;
        }
        let subordinate_count = tx.count_subordinates(manager.id).await?;
        candidates.push(ReplacementCandidate {
            id: manager.id,
            subordinate_count,
        });
    }

    let replacement = choose_replacement(manager_id, &candidates);
    debug!(
        manager_id = %manager_id,
        candidates = candidates.len(),
        replacement = ?replacement,
        "Planned manager removal"
    );

    Ok(ReassignmentPlan {
        manager_id,
        replacement,
        subordinates,
    })
}

/// Move every listed subordinate to the replacement, then delete the manager.
/// Each move is re-validated; any failure aborts the whole plan.
pub async fn apply_reassignment_plan(
    validation: &ValidationEngine,
    tx: &mut dyn DirectoryTransaction,
    plan: &ReassignmentPlan,
) -> Result<(), HierarchyError> {
    for &subordinate_id in &plan.subordinates {
        validation
            .validate_manager_assignment(tx, subordinate_id, plan.replacement)
            .await?;
        let mut subordinate = load(tx, subordinate_id).await?;
        subordinate.manager_id = plan.replacement;
        tx.save(&subordinate).await?;
    }

    tx.delete_by_id(plan.manager_id).await?;
    Ok(())
}
