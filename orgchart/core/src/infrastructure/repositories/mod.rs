// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Directory Implementations
//!
//! Infrastructure implementations of the [`Directory`] contract defined in the
//! domain layer.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve employee records
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! - **PostgresDirectory** - `SERIALIZABLE` transactions over the `employees` table
//! - **InMemoryDirectory** - exclusive async lock per transaction over a
//!   `BTreeMap`; writes are staged on a working copy and swapped in on commit
//!
//! # Usage
//!
//! ```no_run
//! use orgchart_core::domain::directory::{Directory, DirectoryTransaction};
//! use orgchart_core::infrastructure::repositories::InMemoryDirectory;
//!
//! # async fn demo() -> Result<(), orgchart_core::domain::directory::DirectoryError> {
//! let directory = InMemoryDirectory::new();
//! let mut tx = directory.begin().await?;
//! let managers = tx.find_all_managers().await?;
//! tx.commit().await?;
//! # Ok(()) }
//! ```

pub mod postgres_employee;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::domain::directory::{Directory, DirectoryError, DirectoryTransaction};
use crate::domain::employee::{Employee, EmployeeId};

#[derive(Debug, Clone, Default)]
struct DirectoryState {
    employees: BTreeMap<EmployeeId, Employee>,
    last_id: i64,
}

impl DirectoryState {
    fn check_email_free(&self, email: &str, owner: EmployeeId) -> Result<(), DirectoryError> {
        let taken = self
            .employees
            .values()
            .any(|e| e.email == email && e.id != owner);
        if taken {
            return Err(DirectoryError::DuplicateEmail(email.to_string()));
        }
        Ok(())
    }
}

/// In-process directory. Clones share the same underlying state.
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<Mutex<DirectoryState>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a directory with previously exported records. Ids are kept;
    /// new inserts continue after the highest one.
    pub fn from_roster(employees: Vec<Employee>) -> Result<Self, DirectoryError> {
        let mut state = DirectoryState::default();
        for employee in employees {
            if !employee.id.is_assigned() {
                return Err(DirectoryError::Serialization(format!(
                    "roster entry '{}' has no id",
                    employee.email
                )));
            }
            state.check_email_free(&employee.email, employee.id)?;
            state.last_id = state.last_id.max(employee.id.0);
            state.employees.insert(employee.id, employee);
        }
        Ok(Self {
            state: Arc::new(Mutex::new(state)),
        })
    }

    /// Committed records ordered by id.
    pub async fn snapshot(&self) -> Vec<Employee> {
        let state = self.state.lock().await;
        state.employees.values().cloned().collect()
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn begin(&self) -> Result<Box<dyn DirectoryTransaction>, DirectoryError> {
        let guard = self.state.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(InMemoryTransaction {
            guard: Some(guard),
            working,
        }))
    }
}

/// Holds the directory lock for its whole lifetime, which makes every
/// transaction serializable. Dropping it without commit releases the lock and
/// discards `working`.
pub struct InMemoryTransaction {
    guard: Option<OwnedMutexGuard<DirectoryState>>,
    working: DirectoryState,
}

impl InMemoryTransaction {
    fn state(&mut self) -> Result<&mut DirectoryState, DirectoryError> {
        if self.guard.is_none() {
            return Err(DirectoryError::TransactionClosed);
        }
        Ok(&mut self.working)
    }

    fn select<F>(&mut self, predicate: F) -> Result<Vec<Employee>, DirectoryError>
    where
        F: Fn(&Employee) -> bool,
    {
        Ok(self
            .state()?
            .employees
            .values()
            .filter(|e| predicate(e))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DirectoryTransaction for InMemoryTransaction {
    async fn find_by_id(&mut self, id: EmployeeId) -> Result<Option<Employee>, DirectoryError> {
        Ok(self.state()?.employees.get(&id).cloned())
    }

    async fn find_by_email(&mut self, email: &str) -> Result<Option<Employee>, DirectoryError> {
        Ok(self
            .state()?
            .employees
            .values()
            .find(|e| e.email == email)
            .cloned())
    }

    async fn find_all(&mut self) -> Result<Vec<Employee>, DirectoryError> {
        self.select(|_| true)
    }

    async fn find_all_managers(&mut self) -> Result<Vec<Employee>, DirectoryError> {
        self.select(|e| e.is_manager)
    }

    async fn find_subordinates(&mut self, manager_id: EmployeeId) -> Result<Vec<Employee>, DirectoryError> {
        self.select(|e| e.manager_id == Some(manager_id))
    }

    async fn find_by_department(&mut self, department: &str) -> Result<Vec<Employee>, DirectoryError> {
        self.select(|e| e.department.as_deref() == Some(department))
    }

    async fn find_departments(&mut self) -> Result<Vec<String>, DirectoryError> {
        let departments: BTreeSet<String> = self
            .state()?
            .employees
            .values()
            .filter_map(|e| e.department.clone())
            .collect();
        Ok(departments.into_iter().collect())
    }

    async fn exists_by_email(&mut self, email: &str) -> Result<bool, DirectoryError> {
        Ok(self.state()?.employees.values().any(|e| e.email == email))
    }

    async fn save(&mut self, employee: &Employee) -> Result<Employee, DirectoryError> {
        let state = self.state()?;
        state.check_email_free(&employee.email, employee.id)?;

        let now = Utc::now();
        let mut stored = employee.clone();
        stored.updated_at = now;

        if stored.id.is_assigned() {
            let existing = state
                .employees
                .get(&stored.id)
                .ok_or(DirectoryError::RecordNotFound(stored.id))?;
            stored.created_at = existing.created_at;
        } else {
            state.last_id += 1;
            stored.id = EmployeeId(state.last_id);
            stored.created_at = now;
        }

        state.employees.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn delete_by_id(&mut self, id: EmployeeId) -> Result<(), DirectoryError> {
        self.state()?.employees.remove(&id);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DirectoryError> {
        let mut guard = self.guard.take().ok_or(DirectoryError::TransactionClosed)?;
        *guard = std::mem::take(&mut self.working);
        debug!(employees = guard.employees.len(), "in-memory transaction committed");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DirectoryError> {
        self.guard.take().ok_or(DirectoryError::TransactionClosed)?;
        self.working = DirectoryState::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::employee::NewEmployee;

    fn person(name: &str, is_manager: bool, manager_id: Option<EmployeeId>) -> Employee {
        Employee::from_new(NewEmployee {
            name: name.to_string(),
            email: format!("{}@corp.test", name.to_lowercase()),
            department: Some("ENG".to_string()),
            salary: None,
            is_manager,
            manager_id,
        })
    }

    #[tokio::test]
    async fn test_save_assigns_sequential_ids() {
        let directory = InMemoryDirectory::new();
        let mut tx = directory.begin().await.unwrap();
        let a = tx.save(&person("Ann", true, None)).await.unwrap();
        let b = tx.save(&person("Bob", false, Some(a.id))).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(a.id, EmployeeId(1));
        assert_eq!(b.id, EmployeeId(2));
        assert_eq!(directory.snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn test_update_preserves_created_at() {
        let directory = InMemoryDirectory::new();
        let mut tx = directory.begin().await.unwrap();
        let mut ann = tx.save(&person("Ann", false, None)).await.unwrap();
        let created_at = ann.created_at;
        ann.name = "Ann B".to_string();
        ann.created_at = Utc::now() + chrono::Duration::days(1);
        let saved = tx.save(&ann).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(saved.id, ann.id);
        assert_eq!(saved.created_at, created_at);
        assert_eq!(saved.name, "Ann B");
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let directory = InMemoryDirectory::new();
        let mut tx = directory.begin().await.unwrap();
        tx.save(&person("Ann", false, None)).await.unwrap();
        let err = tx.save(&person("Ann", true, None)).await.unwrap_err();
        assert!(matches!(err, DirectoryError::DuplicateEmail(_)));
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let directory = InMemoryDirectory::new();
        {
            let mut tx = directory.begin().await.unwrap();
            tx.save(&person("Ann", false, None)).await.unwrap();
        }
        assert!(directory.snapshot().await.is_empty());

        let mut tx = directory.begin().await.unwrap();
        tx.save(&person("Bob", false, None)).await.unwrap();
        tx.rollback().await.unwrap();
        assert!(directory.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_finished_transaction_is_closed() {
        let directory = InMemoryDirectory::new();
        let mut tx = directory.begin().await.unwrap();
        tx.commit().await.unwrap();
        assert!(matches!(tx.find_all().await, Err(DirectoryError::TransactionClosed)));
        assert!(matches!(tx.commit().await, Err(DirectoryError::TransactionClosed)));
    }

    #[tokio::test]
    async fn test_queries() {
        let directory = InMemoryDirectory::new();
        let mut tx = directory.begin().await.unwrap();
        let boss = tx.save(&person("Boss", true, None)).await.unwrap();
        let mut ops = person("Olga", false, Some(boss.id));
        ops.department = Some("OPS".to_string());
        tx.save(&ops).await.unwrap();
        tx.save(&person("Eve", false, Some(boss.id))).await.unwrap();

        assert_eq!(tx.find_all_managers().await.unwrap().len(), 1);
        assert_eq!(tx.count_subordinates(boss.id).await.unwrap(), 2);
        assert_eq!(tx.find_by_department("OPS").await.unwrap().len(), 1);
        assert_eq!(tx.find_departments().await.unwrap(), vec!["ENG".to_string(), "OPS".to_string()]);
        assert!(tx.exists_by_email("eve@corp.test").await.unwrap());
        assert_eq!(tx.find_by_email("olga@corp.test").await.unwrap().unwrap().name, "Olga");

        tx.delete_by_id(boss.id).await.unwrap();
        assert!(tx.find_by_id(boss.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_roster_roundtrip_continues_ids() {
        let directory = InMemoryDirectory::new();
        let mut tx = directory.begin().await.unwrap();
        tx.save(&person("Ann", true, None)).await.unwrap();
        tx.save(&person("Bob", false, None)).await.unwrap();
        tx.commit().await.unwrap();

        let restored = InMemoryDirectory::from_roster(directory.snapshot().await).unwrap();
        let mut tx = restored.begin().await.unwrap();
        let cid = tx.save(&person("Cid", false, None)).await.unwrap();
        assert_eq!(cid.id, EmployeeId(3));
    }

    #[tokio::test]
    async fn test_save_with_unknown_id_is_rejected() {
        let directory = InMemoryDirectory::new();
        let mut tx = directory.begin().await.unwrap();
        let mut ghost = person("Ghost", false, None);
        ghost.id = EmployeeId(1);

        let err = tx.save(&ghost).await.unwrap_err();
        assert!(matches!(err, DirectoryError::RecordNotFound(EmployeeId(1))));

        // The id was not reserved; the next insert still gets 1.
        let ann = tx.save(&person("Ann", false, None)).await.unwrap();
        assert_eq!(ann.id, EmployeeId(1));
    }

    #[tokio::test]
    async fn test_roster_rejects_duplicate_email() {
        let mut a = person("Ann", false, None);
        a.id = EmployeeId(1);
        let mut b = person("Ann", false, None);
        b.id = EmployeeId(2);
        assert!(matches!(
            InMemoryDirectory::from_roster(vec![a, b]),
            Err(DirectoryError::DuplicateEmail(_))
        ));
    }
}
