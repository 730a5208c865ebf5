// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Directory
//!
//! Production `Directory` backed by the `employees` table via `sqlx`. Every
//! unit of work is a `SERIALIZABLE` transaction; serialization failures
//! surface as `DirectoryError::Conflict` and are retried by the application
//! transaction runner.
//!
//! `manager_id` is a deferred foreign key so that reassignment followed by
//! deletion inside one transaction is checked only at commit.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::debug;

use crate::domain::directory::{Directory, DirectoryError, DirectoryTransaction};
use crate::domain::employee::{Employee, EmployeeId};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS employees (
    id          BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    name        TEXT NOT NULL,
    email       TEXT NOT NULL CONSTRAINT employees_email_key UNIQUE,
    department  TEXT,
    salary      DOUBLE PRECISION,
    is_manager  BOOLEAN NOT NULL DEFAULT FALSE,
    manager_id  BIGINT REFERENCES employees(id) DEFERRABLE INITIALLY DEFERRED,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
)
"#;

const MANAGER_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS employees_manager_id_idx ON employees (manager_id)";

const COLUMNS: &str =
    "id, name, email, department, salary, is_manager, manager_id, created_at, updated_at";

pub struct PostgresDirectory {
    pool: PgPool,
}

impl PostgresDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `employees` table and its manager index if missing.
    pub async fn ensure_schema(&self) -> Result<(), DirectoryError> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        sqlx::query(MANAGER_INDEX).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Directory for PostgresDirectory {
    async fn begin(&self) -> Result<Box<dyn DirectoryTransaction>, DirectoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;
        Ok(Box::new(PostgresTransaction { tx: Some(tx) }))
    }
}

pub struct PostgresTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PostgresTransaction {
    fn conn(&mut self) -> Result<&mut Transaction<'static, Postgres>, DirectoryError> {
        self.tx.as_mut().ok_or(DirectoryError::TransactionClosed)
    }

    async fn fetch_employees(&mut self, sql: &str, bind: Option<&str>) -> Result<Vec<Employee>, DirectoryError> {
        let tx = self.conn()?;
        let mut query = sqlx::query(sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&mut **tx).await?;
        rows.iter().map(parse_employee_row).collect()
    }
}

#[async_trait]
impl DirectoryTransaction for PostgresTransaction {
    async fn find_by_id(&mut self, id: EmployeeId) -> Result<Option<Employee>, DirectoryError> {
        let tx = self.conn()?;
        let row = sqlx::query(&format!("SELECT {} FROM employees WHERE id = $1", COLUMNS))
            .bind(id.0)
            .fetch_optional(&mut **tx)
            .await?;
        row.as_ref().map(parse_employee_row).transpose()
    }

    async fn find_by_email(&mut self, email: &str) -> Result<Option<Employee>, DirectoryError> {
        let tx = self.conn()?;
        let row = sqlx::query(&format!("SELECT {} FROM employees WHERE email = $1", COLUMNS))
            .bind(email)
            .fetch_optional(&mut **tx)
            .await?;
        row.as_ref().map(parse_employee_row).transpose()
    }

    async fn find_all(&mut self) -> Result<Vec<Employee>, DirectoryError> {
        let sql = format!("SELECT {} FROM employees ORDER BY id", COLUMNS);
        self.fetch_employees(&sql, None).await
    }

    async fn find_all_managers(&mut self) -> Result<Vec<Employee>, DirectoryError> {
        let sql = format!("SELECT {} FROM employees WHERE is_manager ORDER BY id", COLUMNS);
        self.fetch_employees(&sql, None).await
    }

    async fn find_subordinates(&mut self, manager_id: EmployeeId) -> Result<Vec<Employee>, DirectoryError> {
        let tx = self.conn()?;
        let rows = sqlx::query(&format!(
            "SELECT {} FROM employees WHERE manager_id = $1 ORDER BY id",
            COLUMNS
        ))
        .bind(manager_id.0)
        .fetch_all(&mut **tx)
        .await?;
        rows.iter().map(parse_employee_row).collect()
    }

    async fn find_by_department(&mut self, department: &str) -> Result<Vec<Employee>, DirectoryError> {
        let sql = format!("SELECT {} FROM employees WHERE department = $1 ORDER BY id", COLUMNS);
        self.fetch_employees(&sql, Some(department)).await
    }

    async fn find_departments(&mut self) -> Result<Vec<String>, DirectoryError> {
        let tx = self.conn()?;
        let rows = sqlx::query(
            "SELECT DISTINCT department FROM employees WHERE department IS NOT NULL ORDER BY department",
        )
        .fetch_all(&mut **tx)
        .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("department").map_err(DirectoryError::from))
            .collect()
    }

    async fn exists_by_email(&mut self, email: &str) -> Result<bool, DirectoryError> {
        let tx = self.conn()?;
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM employees WHERE email = $1)")
            .bind(email)
            .fetch_one(&mut **tx)
            .await?;
        Ok(exists)
    }

    async fn save(&mut self, employee: &Employee) -> Result<Employee, DirectoryError> {
        let tx = self.conn()?;

        if employee.id.is_assigned() {
            let updated = sqlx::query(&format!(
                r#"
                UPDATE employees SET
                    name = $2, email = $3, department = $4, salary = $5,
                    is_manager = $6, manager_id = $7, updated_at = now()
                WHERE id = $1
                RETURNING {}
                "#,
                COLUMNS
            ))
            .bind(employee.id.0)
            .bind(&employee.name)
            .bind(&employee.email)
            .bind(&employee.department)
            .bind(employee.salary)
            .bind(employee.is_manager)
            .bind(employee.manager_id.map(|m| m.0))
            .fetch_optional(&mut **tx)
            .await?;

            return match updated {
                Some(row) => parse_employee_row(&row),
                None => Err(DirectoryError::RecordNotFound(employee.id)),
            };
        }

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO employees (name, email, department, salary, is_manager, manager_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            COLUMNS
        ))
        .bind(&employee.name)
        .bind(&employee.email)
        .bind(&employee.department)
        .bind(employee.salary)
        .bind(employee.is_manager)
        .bind(employee.manager_id.map(|m| m.0))
        .fetch_one(&mut **tx)
        .await?;

        let stored = parse_employee_row(&row)?;
        debug!(employee_id = %stored.id, "employee inserted");
        Ok(stored)
    }

    async fn delete_by_id(&mut self, id: EmployeeId) -> Result<(), DirectoryError> {
        let tx = self.conn()?;
        sqlx::query("DELETE FROM employees WHERE id = $1")
            .bind(id.0)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DirectoryError> {
        let tx = self.tx.take().ok_or(DirectoryError::TransactionClosed)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DirectoryError> {
        let tx = self.tx.take().ok_or(DirectoryError::TransactionClosed)?;
        tx.rollback().await?;
        Ok(())
    }

    async fn count_subordinates(&mut self, manager_id: EmployeeId) -> Result<usize, DirectoryError> {
        let tx = self.conn()?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employees WHERE manager_id = $1")
            .bind(manager_id.0)
            .fetch_one(&mut **tx)
            .await?;
        Ok(count as usize)
    }
}

fn parse_employee_row(row: &PgRow) -> Result<Employee, DirectoryError> {
    Ok(Employee {
        id: EmployeeId(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        department: row.try_get("department")?,
        salary: row.try_get("salary")?,
        is_manager: row.try_get("is_manager")?,
        manager_id: row.try_get::<Option<i64>, _>("manager_id")?.map(EmployeeId),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::directory::EMAIL_UNIQUE_CONSTRAINT;

    #[test]
    fn test_schema_names_the_email_constraint() {
        assert!(SCHEMA.contains(&format!("CONSTRAINT {} UNIQUE", EMAIL_UNIQUE_CONSTRAINT)));
    }

    #[test]
    fn test_schema_reserves_id_assignment_to_the_database() {
        assert!(SCHEMA.contains("GENERATED ALWAYS AS IDENTITY"));
    }
}
