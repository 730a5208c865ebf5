// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Hierarchy Application Service
//!
//! Every operation on the reporting graph goes through here. Each call is one
//! directory transaction: the validation reads and the writes they guard
//! commit together or not at all, and serialization conflicts are retried by
//! [`run_in_transaction`].
//!
//! Follows DDD application service pattern: a `HierarchyService` trait for
//! callers and a `StandardHierarchyService` over an injected [`Directory`].

use std::collections::HashSet;
use std::sync::Arc;
use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::{debug, info, warn};

use crate::application::reassignment::{apply_reassignment_plan, plan_manager_removal};
use crate::application::transaction::{run_in_transaction, RetryPolicy};
use crate::application::validation_engine::{load, ValidationEngine};
use crate::domain::directory::{Directory, DirectoryTransaction};
use crate::domain::employee::{
    matches_name_or_email, Employee, EmployeeId, EmployeePatch, EmployeeProfile,
    EmployeeUpdate, ManagerSummary, NewEmployee, SearchCriteria,
};
use crate::domain::hierarchy::{HierarchyError, ReassignmentPlan};

// ============================================================================
// Service Trait
// ============================================================================

#[async_trait]
pub trait HierarchyService: Send + Sync {
    /// Persist a new employee, validating the proposed manager first.
    async fn create_employee(&self, new: NewEmployee) -> Result<Employee, HierarchyError>;

    /// Replace every mutable field of an employee. A manager change is
    /// validated; a role flag change is not guarded (see `demote_from_manager`).
    async fn update_employee(
        &self,
        id: EmployeeId,
        update: EmployeeUpdate,
    ) -> Result<Employee, HierarchyError>;

    /// Change only the fields set in `patch`. The read and the write share one
    /// transaction, so fields changed concurrently by others are kept.
    async fn patch_employee(
        &self,
        id: EmployeeId,
        patch: EmployeePatch,
    ) -> Result<Employee, HierarchyError>;

    /// Delete a non-manager. Managers must go through `delete_manager`.
    async fn delete_employee_by_id(&self, id: EmployeeId) -> Result<(), HierarchyError>;

    /// Hand the manager's reports to the least-loaded remaining manager and
    /// delete it. Returns the plan that was applied.
    async fn delete_manager(&self, manager_id: EmployeeId) -> Result<ReassignmentPlan, HierarchyError>;

    async fn promote_to_manager(&self, id: EmployeeId) -> Result<Employee, HierarchyError>;

    /// Clear the manager flag; refused while the employee still has reports.
    async fn demote_from_manager(&self, id: EmployeeId) -> Result<Employee, HierarchyError>;

    /// Move an employee under `new_manager_id`, or make it a root with `None`.
    async fn transfer_employee(
        &self,
        id: EmployeeId,
        new_manager_id: Option<EmployeeId>,
    ) -> Result<Employee, HierarchyError>;

    /// The employee followed by each manager above it, ending at a root.
    async fn get_reporting_hierarchy(&self, id: EmployeeId) -> Result<Vec<Employee>, HierarchyError>;

    /// Dry-run of the manager assignment rules. Nothing is written.
    async fn check_manager_assignment(
        &self,
        employee_id: EmployeeId,
        manager_id: Option<EmployeeId>,
    ) -> Result<(), HierarchyError>;

    async fn get_employee(&self, id: EmployeeId) -> Result<Employee, HierarchyError>;

    async fn get_employee_by_email(&self, email: &str) -> Result<Employee, HierarchyError>;

    async fn get_all_managers(&self) -> Result<Vec<Employee>, HierarchyError>;

    async fn get_all_employees(&self) -> Result<Vec<Employee>, HierarchyError>;

    /// Direct reports of an existing employee.
    async fn get_subordinates(&self, manager_id: EmployeeId) -> Result<Vec<Employee>, HierarchyError>;

    async fn get_employee_profile(&self, id: EmployeeId) -> Result<EmployeeProfile, HierarchyError>;

    async fn get_employees_by_department(&self, department: &str) -> Result<Vec<Employee>, HierarchyError>;

    async fn get_all_departments(&self) -> Result<Vec<String>, HierarchyError>;

    async fn search_employees(&self, criteria: SearchCriteria) -> Result<Vec<Employee>, HierarchyError>;

    async fn search_by_name_or_email(&self, term: &str) -> Result<Vec<Employee>, HierarchyError>;
}

// ============================================================================
// Standard Implementation
// ============================================================================

pub struct StandardHierarchyService {
    directory: Arc<dyn Directory>,
    validation: ValidationEngine,
    retry: RetryPolicy,
}

impl StandardHierarchyService {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self {
            directory,
            validation: ValidationEngine::new(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn transact<T, F>(&self, op: F) -> Result<T, HierarchyError>
    where
        T: Send,
        F: for<'t> Fn(&'t mut dyn DirectoryTransaction) -> BoxFuture<'t, Result<T, HierarchyError>>
            + Send
            + Sync,
    {
        run_in_transaction(self.directory.as_ref(), self.retry, op).await
    }
}

#[async_trait]
impl HierarchyService for StandardHierarchyService {
    async fn create_employee(&self, new: NewEmployee) -> Result<Employee, HierarchyError> {
        let validation = self.validation;
        let result = self
            .transact(move |tx| Box::pin(create_in(validation, tx, new.clone())))
            .await;

        match &result {
            Ok(employee) => info!(
                employee_id = %employee.id,
                manager_id = ?employee.manager_id,
                is_manager = employee.is_manager,
                "Employee created"
            ),
            Err(e) => warn!(error = %e, "Employee creation rejected"),
        }
        result
    }

    async fn update_employee(
        &self,
        id: EmployeeId,
        update: EmployeeUpdate,
    ) -> Result<Employee, HierarchyError> {
        let validation = self.validation;
        let employee = self
            .transact(move |tx| Box::pin(update_in(validation, tx, id, update.clone())))
            .await?;

        info!(employee_id = %id, manager_id = ?employee.manager_id, "Employee updated");
        Ok(employee)
    }

    async fn patch_employee(
        &self,
        id: EmployeeId,
        patch: EmployeePatch,
    ) -> Result<Employee, HierarchyError> {
        let validation = self.validation;
        let employee = self
            .transact(move |tx| Box::pin(patch_in(validation, tx, id, patch.clone())))
            .await?;

        info!(employee_id = %id, manager_id = ?employee.manager_id, "Employee patched");
        Ok(employee)
    }

    async fn delete_employee_by_id(&self, id: EmployeeId) -> Result<(), HierarchyError> {
        self.transact(move |tx| Box::pin(delete_in(tx, id))).await?;
        info!(employee_id = %id, "Employee deleted");
        Ok(())
    }

    async fn delete_manager(&self, manager_id: EmployeeId) -> Result<ReassignmentPlan, HierarchyError> {
        let validation = self.validation;
        let plan = self
            .transact(move |tx| Box::pin(delete_manager_in(validation, tx, manager_id)))
            .await?;

        info!(
            manager_id = %manager_id,
            replacement = ?plan.replacement,
            reassigned = plan.subordinates.len(),
            "Manager deleted"
        );
        Ok(plan)
    }

    async fn promote_to_manager(&self, id: EmployeeId) -> Result<Employee, HierarchyError> {
        let validation = self.validation;
        let employee = self
            .transact(move |tx| Box::pin(set_role_in(validation, tx, id, true)))
            .await?;

        info!(employee_id = %id, "Employee promoted to manager");
        Ok(employee)
    }

    async fn demote_from_manager(&self, id: EmployeeId) -> Result<Employee, HierarchyError> {
        let validation = self.validation;
        let result = self
            .transact(move |tx| Box::pin(set_role_in(validation, tx, id, false)))
            .await;

        match &result {
            Ok(_) => info!(employee_id = %id, "Manager demoted"),
            Err(e) => warn!(employee_id = %id, error = %e, "Demotion rejected"),
        }
        result
    }

    async fn transfer_employee(
        &self,
        id: EmployeeId,
        new_manager_id: Option<EmployeeId>,
    ) -> Result<Employee, HierarchyError> {
        let validation = self.validation;
        let employee = self
            .transact(move |tx| Box::pin(transfer_in(validation, tx, id, new_manager_id)))
            .await?;

        info!(employee_id = %id, manager_id = ?new_manager_id, "Employee transferred");
        Ok(employee)
    }

    async fn get_reporting_hierarchy(&self, id: EmployeeId) -> Result<Vec<Employee>, HierarchyError> {
        let chain = self
            .transact(move |tx| Box::pin(reporting_chain_in(tx, id)))
            .await?;
        debug!(employee_id = %id, depth = chain.len(), "Resolved reporting hierarchy");
        Ok(chain)
    }

    async fn check_manager_assignment(
        &self,
        employee_id: EmployeeId,
        manager_id: Option<EmployeeId>,
    ) -> Result<(), HierarchyError> {
        let validation = self.validation;
        self.transact(move |tx| {
            Box::pin(check_assignment_in(validation, tx, employee_id, manager_id))
        })
        .await
    }

    async fn get_employee(&self, id: EmployeeId) -> Result<Employee, HierarchyError> {
        self.transact(move |tx| Box::pin(load(tx, id))).await
    }

    async fn get_employee_by_email(&self, email: &str) -> Result<Employee, HierarchyError> {
        let email = email.to_string();
        self.transact(move |tx| Box::pin(load_by_email_in(tx, email.clone())))
            .await
    }

    async fn get_all_managers(&self) -> Result<Vec<Employee>, HierarchyError> {
        self.transact(|tx| Box::pin(all_managers_in(tx))).await
    }

    async fn get_all_employees(&self) -> Result<Vec<Employee>, HierarchyError> {
        self.transact(|tx| Box::pin(all_employees_in(tx))).await
    }

    async fn get_subordinates(&self, manager_id: EmployeeId) -> Result<Vec<Employee>, HierarchyError> {
        self.transact(move |tx| Box::pin(subordinates_in(tx, manager_id)))
            .await
    }

    async fn get_employee_profile(&self, id: EmployeeId) -> Result<EmployeeProfile, HierarchyError> {
        self.transact(move |tx| Box::pin(profile_in(tx, id))).await
    }

    async fn get_employees_by_department(&self, department: &str) -> Result<Vec<Employee>, HierarchyError> {
        let department = department.to_string();
        self.transact(move |tx| Box::pin(department_members_in(tx, department.clone())))
            .await
    }

    async fn get_all_departments(&self) -> Result<Vec<String>, HierarchyError> {
        self.transact(|tx| Box::pin(departments_in(tx))).await
    }

    async fn search_employees(&self, criteria: SearchCriteria) -> Result<Vec<Employee>, HierarchyError> {
        let found = self
            .transact(move |tx| Box::pin(search_in(tx, criteria.clone())))
            .await?;
        debug!(matches = found.len(), "Employee search");
        Ok(found)
    }

    async fn search_by_name_or_email(&self, term: &str) -> Result<Vec<Employee>, HierarchyError> {
        let term = term.to_string();
        self.transact(move |tx| Box::pin(search_term_in(tx, term.clone())))
            .await
    }
}

// ============================================================================
// Transaction Bodies
// ============================================================================

async fn create_in(
    validation: ValidationEngine,
    tx: &mut dyn DirectoryTransaction,
    new: NewEmployee,
) -> Result<Employee, HierarchyError> {
    validation
        .validate_manager_assignment(tx, EmployeeId::UNASSIGNED, new.manager_id)
        .await?;
    Ok(tx.save(&Employee::from_new(new)).await?)
}

async fn update_in(
    validation: ValidationEngine,
    tx: &mut dyn DirectoryTransaction,
    id: EmployeeId,
    update: EmployeeUpdate,
) -> Result<Employee, HierarchyError> {
    let employee = load(tx, id).await?;
    write_update(validation, tx, employee, update).await
}

async fn patch_in(
    validation: ValidationEngine,
    tx: &mut dyn DirectoryTransaction,
    id: EmployeeId,
    patch: EmployeePatch,
) -> Result<Employee, HierarchyError> {
    let employee = load(tx, id).await?;
    let update = patch.merge_into(&employee);
    write_update(validation, tx, employee, update).await
}

async fn write_update(
    validation: ValidationEngine,
    tx: &mut dyn DirectoryTransaction,
    mut employee: Employee,
    update: EmployeeUpdate,
) -> Result<Employee, HierarchyError> {
    if update.manager_id.is_some() && update.manager_id != employee.manager_id {
        validation
            .validate_manager_assignment(tx, employee.id, update.manager_id)
            .await?;
    }

    employee.apply(update);
    Ok(tx.save(&employee).await?)
}

async fn delete_in(tx: &mut dyn DirectoryTransaction, id: EmployeeId) -> Result<(), HierarchyError> {
    let employee = load(tx, id).await?;
    if employee.is_manager {
        return Err(HierarchyError::InvalidOperation(format!(
            "employee {} is a manager; use the manager deletion path",
            id
        )));
    }
    Ok(tx.delete_by_id(id).await?)
}

async fn delete_manager_in(
    validation: ValidationEngine,
    tx: &mut dyn DirectoryTransaction,
    manager_id: EmployeeId,
) -> Result<ReassignmentPlan, HierarchyError> {
    let plan = plan_manager_removal(&validation, tx, manager_id).await?;
    apply_reassignment_plan(&validation, tx, &plan).await?;
    Ok(plan)
}

async fn set_role_in(
    validation: ValidationEngine,
    tx: &mut dyn DirectoryTransaction,
    id: EmployeeId,
    is_manager: bool,
) -> Result<Employee, HierarchyError> {
    let mut employee = if is_manager {
        validation.validate_promotion(tx, id).await?
    } else {
        let employee = validation.validate_demotion(tx, id).await?;
        let reports = tx.count_subordinates(id).await?;
        if reports > 0 {
            return Err(HierarchyError::InvalidOperation(format!(
                "employee {} still has {} direct report(s); reassign subordinates first",
                id, reports
            )));
        }
        employee
    };

    employee.is_manager = is_manager;
    Ok(tx.save(&employee).await?)
}

async fn transfer_in(
    validation: ValidationEngine,
    tx: &mut dyn DirectoryTransaction,
    id: EmployeeId,
    new_manager_id: Option<EmployeeId>,
) -> Result<Employee, HierarchyError> {
    let mut employee = load(tx, id).await?;
    validation
        .validate_manager_assignment(tx, id, new_manager_id)
        .await?;
    employee.manager_id = new_manager_id;
    Ok(tx.save(&employee).await?)
}

async fn reporting_chain_in(
    tx: &mut dyn DirectoryTransaction,
    id: EmployeeId,
) -> Result<Vec<Employee>, HierarchyError> {
    let employee = load(tx, id).await?;
    let mut visited = HashSet::from([employee.id]);
    let mut below = employee.id;
    let mut next = employee.manager_id;
    let mut chain = vec![employee];

    while let Some(manager_id) = next {
        if !visited.insert(manager_id) {
            return Err(HierarchyError::GraphCorruption(format!(
                "employee {} appears twice in the reporting chain of {}",
                manager_id, id
            )));
        }
        let manager = tx.find_by_id(manager_id).await?.ok_or_else(|| {
            HierarchyError::GraphCorruption(format!(
                "employee {} references missing manager {}",
                below, manager_id
            ))
        })?;
        below = manager.id;
        next = manager.manager_id;
        chain.push(manager);
    }

    Ok(chain)
}

async fn check_assignment_in(
    validation: ValidationEngine,
    tx: &mut dyn DirectoryTransaction,
    employee_id: EmployeeId,
    manager_id: Option<EmployeeId>,
) -> Result<(), HierarchyError> {
    validation
        .validate_manager_assignment(tx, employee_id, manager_id)
        .await
}

async fn load_by_email_in(
    tx: &mut dyn DirectoryTransaction,
    email: String,
) -> Result<Employee, HierarchyError> {
    tx.find_by_email(&email)
        .await?
        .ok_or_else(|| HierarchyError::NotFound(format!("email {}", email)))
}

async fn all_managers_in(tx: &mut dyn DirectoryTransaction) -> Result<Vec<Employee>, HierarchyError> {
    Ok(tx.find_all_managers().await?)
}

async fn all_employees_in(tx: &mut dyn DirectoryTransaction) -> Result<Vec<Employee>, HierarchyError> {
    Ok(tx.find_all().await?)
}

async fn subordinates_in(
    tx: &mut dyn DirectoryTransaction,
    manager_id: EmployeeId,
) -> Result<Vec<Employee>, HierarchyError> {
    load(tx, manager_id).await?;
    Ok(tx.find_subordinates(manager_id).await?)
}

async fn profile_in(
    tx: &mut dyn DirectoryTransaction,
    id: EmployeeId,
) -> Result<EmployeeProfile, HierarchyError> {
    let employee = load(tx, id).await?;
    let num_subordinates = tx.count_subordinates(id).await?;

    let manager = match employee.manager_id {
        Some(manager_id) => {
            let found = tx.find_by_id(manager_id).await?;
            if found.is_none() {
                warn!(employee_id = %id, manager_id = %manager_id, "Profile references missing manager");
            }
            found.as_ref().map(ManagerSummary::from)
        }
        None => None,
    };

    Ok(EmployeeProfile {
        employee,
        num_subordinates,
        manager,
    })
}

async fn department_members_in(
    tx: &mut dyn DirectoryTransaction,
    department: String,
) -> Result<Vec<Employee>, HierarchyError> {
    Ok(tx.find_by_department(&department).await?)
}

async fn departments_in(tx: &mut dyn DirectoryTransaction) -> Result<Vec<String>, HierarchyError> {
    Ok(tx.find_departments().await?)
}

async fn search_in(
    tx: &mut dyn DirectoryTransaction,
    criteria: SearchCriteria,
) -> Result<Vec<Employee>, HierarchyError> {
    let all = tx.find_all().await?;
    Ok(all.into_iter().filter(|e| criteria.matches(e)).collect())
}

async fn search_term_in(
    tx: &mut dyn DirectoryTransaction,
    term: String,
) -> Result<Vec<Employee>, HierarchyError> {
    let all = tx.find_all().await?;
    Ok(all
        .into_iter()
        .filter(|e| matches_name_or_email(e, &term))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::directory::DirectoryError;
    use crate::infrastructure::repositories::InMemoryDirectory;

    fn service() -> (InMemoryDirectory, StandardHierarchyService) {
        let directory = InMemoryDirectory::new();
        let service = StandardHierarchyService::new(Arc::new(directory.clone()))
            .with_retry_policy(RetryPolicy::no_retry());
        (directory, service)
    }

    fn new_employee(name: &str, is_manager: bool, manager_id: Option<EmployeeId>) -> NewEmployee {
        NewEmployee {
            name: name.to_string(),
            email: format!("{}@corp.test", name),
            department: Some("Engineering".to_string()),
            salary: Some(100_000.0),
            is_manager,
            manager_id,
        }
    }

    #[tokio::test]
    async fn test_create_validates_manager() {
        let (_, service) = service();
        let worker = service.create_employee(new_employee("worker", false, None)).await.unwrap();

        let err = service
            .create_employee(new_employee("intern", false, Some(worker.id)))
            .await
            .unwrap_err();
        assert!(matches!(err, HierarchyError::InvalidRole(_)));
    }

    #[tokio::test]
    async fn test_create_duplicate_email() {
        let (_, service) = service();
        service.create_employee(new_employee("ann", false, None)).await.unwrap();
        let err = service
            .create_employee(new_employee("ann", false, None))
            .await
            .unwrap_err();
        assert!(matches!(err, HierarchyError::Directory(DirectoryError::DuplicateEmail(_))));
        assert_eq!(err.kind(), "duplicate_email");
    }

    #[tokio::test]
    async fn test_update_keeps_manager_without_revalidating() {
        let (_, service) = service();
        let boss = service.create_employee(new_employee("boss", true, None)).await.unwrap();
        let worker = service
            .create_employee(new_employee("worker", false, Some(boss.id)))
            .await
            .unwrap();

        let mut update = EmployeeUpdate::from(&worker);
        update.salary = Some(120_000.0);
        let updated = service.update_employee(worker.id, update).await.unwrap();

        assert_eq!(updated.salary, Some(120_000.0));
        assert_eq!(updated.manager_id, Some(boss.id));
        assert_eq!(updated.created_at, worker.created_at);
    }

    #[tokio::test]
    async fn test_update_rejects_cycle_and_leaves_record_untouched() {
        let (_, service) = service();
        let top = service.create_employee(new_employee("top", true, None)).await.unwrap();
        let mid = service
            .create_employee(new_employee("mid", true, Some(top.id)))
            .await
            .unwrap();

        let mut update = EmployeeUpdate::from(&top);
        update.name = "renamed".to_string();
        update.manager_id = Some(mid.id);
        let err = service.update_employee(top.id, update).await.unwrap_err();
        assert!(matches!(err, HierarchyError::CycleDetected(_)));

        let stored = service.get_employee(top.id).await.unwrap();
        assert_eq!(stored.name, "top");
        assert_eq!(stored.manager_id, None);
    }

    #[tokio::test]
    async fn test_get_employee_by_email() {
        let (_, service) = service();
        let ann = service.create_employee(new_employee("ann", false, None)).await.unwrap();

        assert_eq!(service.get_employee_by_email("ann@corp.test").await.unwrap().id, ann.id);
        assert!(matches!(
            service.get_employee_by_email("nobody@corp.test").await,
            Err(HierarchyError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_profile_counts_reports() {
        let (_, service) = service();
        let boss = service.create_employee(new_employee("boss", true, None)).await.unwrap();
        service
            .create_employee(new_employee("a", false, Some(boss.id)))
            .await
            .unwrap();
        let b = service
            .create_employee(new_employee("b", false, Some(boss.id)))
            .await
            .unwrap();

        let profile = service.get_employee_profile(boss.id).await.unwrap();
        assert_eq!(profile.num_subordinates, 2);
        assert!(profile.manager.is_none());

        let profile = service.get_employee_profile(b.id).await.unwrap();
        assert_eq!(profile.num_subordinates, 0);
        assert_eq!(profile.manager.map(|m| m.id), Some(boss.id));
    }

    #[tokio::test]
    async fn test_subordinates_of_missing_manager() {
        let (_, service) = service();
        assert!(matches!(
            service.get_subordinates(EmployeeId(12)).await,
            Err(HierarchyError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_search_filters() {
        let (_, service) = service();
        service.create_employee(new_employee("alice", true, None)).await.unwrap();
        let mut bob = new_employee("bob", false, None);
        bob.department = Some("Sales".to_string());
        bob.salary = Some(50_000.0);
        service.create_employee(bob).await.unwrap();

        let criteria = SearchCriteria {
            department: Some("Engineering".to_string()),
            is_manager: Some(true),
            ..Default::default()
        };
        let found = service.search_employees(criteria).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "alice");

        let found = service.search_by_name_or_email("BOB@").await.unwrap();
        assert_eq!(found.len(), 1);

        assert_eq!(
            service.get_all_departments().await.unwrap(),
            vec!["Engineering".to_string(), "Sales".to_string()]
        );
        assert_eq!(service.get_employees_by_department("Sales").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_check_manager_assignment_writes_nothing() {
        let (directory, service) = service();
        let boss = service.create_employee(new_employee("boss", true, None)).await.unwrap();

        service
            .check_manager_assignment(EmployeeId::UNASSIGNED, Some(boss.id))
            .await
            .unwrap();
        assert!(matches!(
            service.check_manager_assignment(boss.id, Some(boss.id)).await,
            Err(HierarchyError::CycleDetected(_))
        ));
        assert_eq!(directory.snapshot().await.len(), 1);
    }
}
