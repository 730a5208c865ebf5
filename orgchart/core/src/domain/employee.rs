// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Employee Aggregate
//!
//! The single entity of the reporting hierarchy. The manager relation is an
//! id reference (`manager_id`) resolved through the [`Directory`]; there are
//! no in-memory back-pointers, and the number of direct reports is always
//! derived by query (see [`EmployeeProfile`]).
//!
//! [`Directory`]: crate::domain::directory::Directory

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Directory-assigned employee identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmployeeId(pub i64);

impl EmployeeId {
    /// Sentinel for a record that has not been persisted yet. The directory
    /// replaces it with a real id on insert.
    pub const UNASSIGNED: EmployeeId = EmployeeId(0);

    pub fn is_assigned(&self) -> bool {
        *self != Self::UNASSIGNED
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EmployeeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<f64>,
    pub is_manager: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<EmployeeId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    /// Build an unsaved record from creation input. Timestamps are provisional
    /// until the directory stamps them on insert.
    pub fn from_new(new: NewEmployee) -> Self {
        let now = Utc::now();
        Self {
            id: EmployeeId::UNASSIGNED,
            name: new.name,
            email: new.email,
            department: new.department,
            salary: new.salary,
            is_manager: new.is_manager,
            manager_id: new.manager_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_root(&self) -> bool {
        self.manager_id.is_none()
    }

    /// Overwrite every mutable field with the values carried by `update`.
    /// `id` and `created_at` never change.
    pub fn apply(&mut self, update: EmployeeUpdate) {
        self.name = update.name;
        self.email = update.email;
        self.department = update.department;
        self.salary = update.salary;
        self.is_manager = update.is_manager;
        self.manager_id = update.manager_id;
    }
}

/// Creation input. `is_manager` must be stated explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub salary: Option<f64>,
    pub is_manager: bool,
    #[serde(default)]
    pub manager_id: Option<EmployeeId>,
}

/// Full replacement of an employee's mutable fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeUpdate {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub salary: Option<f64>,
    pub is_manager: bool,
    #[serde(default)]
    pub manager_id: Option<EmployeeId>,
}

impl From<&Employee> for EmployeeUpdate {
    fn from(employee: &Employee) -> Self {
        Self {
            name: employee.name.clone(),
            email: employee.email.clone(),
            department: employee.department.clone(),
            salary: employee.salary,
            is_manager: employee.is_manager,
            manager_id: employee.manager_id,
        }
    }
}

/// Partial change to an employee. `None` keeps the stored value; for
/// `manager_id`, `Some(None)` clears the reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeePatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub salary: Option<f64>,
    pub is_manager: Option<bool>,
    pub manager_id: Option<Option<EmployeeId>>,
}

impl EmployeePatch {
    /// Full update that leaves every unset field as `current` has it.
    pub fn merge_into(self, current: &Employee) -> EmployeeUpdate {
        let base = EmployeeUpdate::from(current);
        EmployeeUpdate {
            name: self.name.unwrap_or(base.name),
            email: self.email.unwrap_or(base.email),
            department: self.department.or(base.department),
            salary: self.salary.or(base.salary),
            is_manager: self.is_manager.unwrap_or(base.is_manager),
            manager_id: self.manager_id.unwrap_or(base.manager_id),
        }
    }
}

/// Lightweight view of a manager, embedded in [`EmployeeProfile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerSummary {
    pub id: EmployeeId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

impl From<&Employee> for ManagerSummary {
    fn from(employee: &Employee) -> Self {
        Self {
            id: employee.id,
            name: employee.name.clone(),
            email: employee.email.clone(),
            department: employee.department.clone(),
        }
    }
}

/// An employee together with values derived from the current directory
/// state at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeProfile {
    #[serde(flatten)]
    pub employee: Employee,
    pub num_subordinates: usize,
    pub manager: Option<ManagerSummary>,
}

/// Filters for directory-wide search. Every populated filter must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    /// Case-insensitive substring of the employee name
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub min_salary: Option<f64>,
    #[serde(default)]
    pub max_salary: Option<f64>,
    #[serde(default)]
    pub is_manager: Option<bool>,
}

impl SearchCriteria {
    pub fn matches(&self, employee: &Employee) -> bool {
        if let Some(name) = &self.name {
            if !employee.name.to_lowercase().contains(&name.to_lowercase()) {
                return false;
            }
        }
        if let Some(department) = &self.department {
            if employee.department.as_deref() != Some(department.as_str()) {
                return false;
            }
        }
        if let Some(min) = self.min_salary {
            if !employee.salary.is_some_and(|s| s >= min) {
                return false;
            }
        }
        if let Some(max) = self.max_salary {
            if !employee.salary.is_some_and(|s| s <= max) {
                return false;
            }
        }
        if let Some(flag) = self.is_manager {
            if employee.is_manager != flag {
                return false;
            }
        }
        true
    }
}

/// Case-insensitive substring match on name or email.
pub fn matches_name_or_email(employee: &Employee, term: &str) -> bool {
    let term = term.to_lowercase();
    employee.name.to_lowercase().contains(&term) || employee.email.to_lowercase().contains(&term)
}
