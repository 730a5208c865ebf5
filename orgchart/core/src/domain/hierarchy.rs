// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Reporting Hierarchy Rules
//!
//! Error vocabulary of the integrity engine and the pure half of manager
//! removal. Removing a manager is modelled as a two-phase plan: the
//! [`ReassignmentPlan`] is decided from a snapshot of candidate managers
//! (see [`choose_replacement`]) and then applied by the application service
//! inside the same directory transaction.
//!
//! ## Replacement Policy
//!
//! The replacement for a removed manager is the remaining manager with the
//! fewest direct reports. Ties go to the lowest [`EmployeeId`], so the result
//! does not depend on the order in which a backend returns rows.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use crate::domain::directory::DirectoryError;
use crate::domain::employee::EmployeeId;

#[derive(Debug, Error)]
pub enum HierarchyError {
    #[error("Employee not found: {0}")]
    NotFound(String),

    #[error("Employee {0} is not designated as a manager")]
    InvalidRole(EmployeeId),

    #[error("Circular manager reference: {0}")]
    CycleDetected(String),

    #[error("Employee {0} is already a manager")]
    AlreadyManager(EmployeeId),

    #[error("Employee {0} is not a manager")]
    NotManager(EmployeeId),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Reporting graph is corrupt: {0}")]
    GraphCorruption(String),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl HierarchyError {
    pub fn not_found(id: EmployeeId) -> Self {
        HierarchyError::NotFound(format!("id {}", id))
    }

    /// Stable machine-readable kind, for outer layers mapping errors to
    /// status codes.
    pub fn kind(&self) -> &'static str {
        match self {
            HierarchyError::NotFound(_) => "not_found",
            HierarchyError::InvalidRole(_) => "invalid_role",
            HierarchyError::CycleDetected(_) => "cycle_detected",
            HierarchyError::AlreadyManager(_) => "already_manager",
            HierarchyError::NotManager(_) => "not_manager",
            HierarchyError::InvalidOperation(_) => "invalid_operation",
            HierarchyError::GraphCorruption(_) => "graph_corruption",
            HierarchyError::Directory(DirectoryError::RecordNotFound(_)) => "not_found",
            HierarchyError::Directory(DirectoryError::DuplicateEmail(_)) => "duplicate_email",
            HierarchyError::Directory(DirectoryError::Conflict(_)) => "conflict",
            HierarchyError::Directory(_) => "directory",
        }
    }

    pub(crate) fn is_retryable(&self) -> bool {
        matches!(self, HierarchyError::Directory(e) if e.is_retryable())
    }
}

/// A manager that could take over the reports of a removed manager, with its
/// current number of direct reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplacementCandidate {
    pub id: EmployeeId,
    pub subordinate_count: usize,
}

/// Decided outcome of removing a manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignmentPlan {
    pub manager_id: EmployeeId,
    /// New manager for every former report; `None` leaves them managerless.
    pub replacement: Option<EmployeeId>,
    pub subordinates: Vec<EmployeeId>,
}

impl ReassignmentPlan {
    pub fn is_noop(&self) -> bool {
        self.subordinates.is_empty()
    }
}

/// Pick the replacement for `removed` among `candidates`: fewest reports,
/// then lowest id. `removed` itself is never chosen.
pub fn choose_replacement(
    removed: EmployeeId,
    candidates: &[ReplacementCandidate],
) -> Option<EmployeeId> {
    candidates
        .iter()
        .filter(|c| c.id != removed)
        .min_by_key(|c| (c.subordinate_count, c.id))
        .map(|c| c.id)
}
