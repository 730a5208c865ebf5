// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Directory Interface
//!
//! Persistence contract for [`Employee`] records, defined in the domain layer
//! and implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Role | Implementations |
//! |-------|------|-----------------|
//! | `Directory` | Opens units of work | `InMemoryDirectory`, `PostgresDirectory` |
//! | `DirectoryTransaction` | Reads and writes inside one unit of work | per backend |
//!
//! ## Transaction Boundary
//!
//! Every hierarchy operation reads graph structure and then writes based on
//! what it read. Those reads and writes run inside one
//! [`DirectoryTransaction`] with serializable isolation so that no concurrent
//! assignment can slip between a cycle check and the write it guards.
//! A transaction that is dropped without [`DirectoryTransaction::commit`]
//! discards its writes.
//!
//! The directory carries no integrity logic beyond email uniqueness.

use async_trait::async_trait;
use crate::domain::employee::{Employee, EmployeeId};

/// Storage backend selection
#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
    InMemory,
    PostgreSQL(PostgresConfig),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostgresConfig {
    pub connection_string: String,
    pub max_connections: u32,
}

/// Entry point: hands out transactions.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Begin a serializable unit of work.
    async fn begin(&self) -> Result<Box<dyn DirectoryTransaction>, DirectoryError>;
}

/// One unit of work against the directory.
#[async_trait]
pub trait DirectoryTransaction: Send {
    /// Find employee by ID
    async fn find_by_id(&mut self, id: EmployeeId) -> Result<Option<Employee>, DirectoryError>;

    /// Find employee by email (exact match)
    async fn find_by_email(&mut self, email: &str) -> Result<Option<Employee>, DirectoryError>;

    /// All employees, ordered by id
    async fn find_all(&mut self) -> Result<Vec<Employee>, DirectoryError>;

    /// All employees flagged as managers, ordered by id
    async fn find_all_managers(&mut self) -> Result<Vec<Employee>, DirectoryError>;

    /// Direct reports of `manager_id`, ordered by id
    async fn find_subordinates(&mut self, manager_id: EmployeeId) -> Result<Vec<Employee>, DirectoryError>;

    /// Employees whose department equals `department`, ordered by id
    async fn find_by_department(&mut self, department: &str) -> Result<Vec<Employee>, DirectoryError>;

    /// Distinct non-null departments, sorted
    async fn find_departments(&mut self) -> Result<Vec<String>, DirectoryError>;

    async fn exists_by_email(&mut self, email: &str) -> Result<bool, DirectoryError>;

    /// Insert (when `employee.id` is unassigned) or update. Returns the stored
    /// record with its id and timestamps. Ids are only ever assigned by the
    /// directory: an assigned id with no stored record is
    /// [`DirectoryError::RecordNotFound`].
    async fn save(&mut self, employee: &Employee) -> Result<Employee, DirectoryError>;

    /// Delete employee by ID. Deleting an absent id is not an error.
    async fn delete_by_id(&mut self, id: EmployeeId) -> Result<(), DirectoryError>;

    /// Make every write of this transaction durable.
    async fn commit(&mut self) -> Result<(), DirectoryError>;

    /// Discard every write of this transaction.
    async fn rollback(&mut self) -> Result<(), DirectoryError>;

    /// Number of direct reports, derived from the current state.
    async fn count_subordinates(&mut self, manager_id: EmployeeId) -> Result<usize, DirectoryError> {
        Ok(self.find_subordinates(manager_id).await?.len())
    }
}

/// Directory errors
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Email already in use: {0}")]
    DuplicateEmail(String),

    #[error("No stored employee with id {0}")]
    RecordNotFound(EmployeeId),

    #[error("Transaction conflict: {0}")]
    Conflict(String),

    #[error("Transaction already finished")]
    TransactionClosed,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DirectoryError {
    /// Whether re-running the whole unit of work may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DirectoryError::Conflict(_))
    }
}

/// Name of the unique constraint on `employees.email`.
pub const EMAIL_UNIQUE_CONSTRAINT: &str = "employees_email_key";

impl DirectoryError {
    /// Map a database failure by SQLSTATE and violated constraint. Only a
    /// unique violation on the email constraint is a duplicate email.
    pub fn from_database(code: Option<&str>, constraint: Option<&str>, message: &str) -> Self {
        match (code, constraint) {
            // serialization_failure, deadlock_detected
            (Some("40001") | Some("40P01"), _) => DirectoryError::Conflict(message.to_string()),
            // unique_violation
            (Some("23505"), Some(EMAIL_UNIQUE_CONSTRAINT)) => {
                DirectoryError::DuplicateEmail(message.to_string())
            }
            _ => DirectoryError::Database(message.to_string()),
        }
    }
}

impl From<sqlx::Error> for DirectoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => DirectoryError::from_database(
                db_err.code().as_deref(),
                db_err.constraint(),
                db_err.message(),
            ),
            _ => DirectoryError::Database(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for DirectoryError {
    fn from(err: serde_json::Error) -> Self {
        DirectoryError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_conflicts_are_retryable() {
        assert!(DirectoryError::Conflict("could not serialize access".into()).is_retryable());
        assert!(!DirectoryError::DuplicateEmail("a@b.c".into()).is_retryable());
        assert!(!DirectoryError::Database("connection reset".into()).is_retryable());
        assert!(!DirectoryError::TransactionClosed.is_retryable());
    }

    #[test]
    fn test_row_not_found_maps_to_database_error() {
        let err: DirectoryError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DirectoryError::Database(_)));
    }

    #[test]
    fn test_unique_violation_is_duplicate_email_only_on_email_constraint() {
        let email = DirectoryError::from_database(
            Some("23505"),
            Some(EMAIL_UNIQUE_CONSTRAINT),
            "duplicate key value violates unique constraint \"employees_email_key\"",
        );
        assert!(matches!(email, DirectoryError::DuplicateEmail(_)));

        let pkey = DirectoryError::from_database(
            Some("23505"),
            Some("employees_pkey"),
            "duplicate key value violates unique constraint \"employees_pkey\"",
        );
        assert!(matches!(pkey, DirectoryError::Database(_)));

        let unnamed = DirectoryError::from_database(Some("23505"), None, "duplicate key");
        assert!(matches!(unnamed, DirectoryError::Database(_)));
    }

    #[test]
    fn test_serialization_failures_map_to_conflict() {
        for code in ["40001", "40P01"] {
            let err = DirectoryError::from_database(Some(code), None, "could not serialize access");
            assert!(err.is_retryable());
        }
        let fk = DirectoryError::from_database(Some("23503"), Some("employees_manager_id_fkey"), "fk");
        assert!(matches!(fk, DirectoryError::Database(_)));
    }
}
