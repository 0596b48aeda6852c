// src/db/employee_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::employee::{Employee, EmployeePayload},
};

const COLUMNS: &str = "id, first_name, last_name, id_series, id_number, phone, created_at, updated_at";

const SEARCH: &str = r#"
    $1::TEXT IS NULL
    OR first_name ILIKE $1 OR last_name ILIKE $1
    OR (last_name || ' ' || first_name) ILIKE $1
"#;

#[derive(Clone)]
pub struct EmployeeRepository {
    pool: PgPool,
}

impl EmployeeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create<'e, E>(&self, executor: E, payload: &EmployeePayload) -> Result<Employee, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            INSERT INTO employees (first_name, last_name, id_series, id_number, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        );

        let employee = sqlx::query_as::<_, Employee>(&sql)
            .bind(&payload.first_name)
            .bind(&payload.last_name)
            .bind(&payload.id_series)
            .bind(&payload.id_number)
            .bind(&payload.phone)
            .fetch_one(executor)
            .await?;

        Ok(employee)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Employee>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT {COLUMNS} FROM employees WHERE id = $1");

        let employee = sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(employee)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        payload: &EmployeePayload,
    ) -> Result<Option<Employee>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            r#"
            UPDATE employees
            SET first_name = $2, last_name = $3, id_series = $4, id_number = $5,
                phone = $6, updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        );

        let employee = sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .bind(&payload.first_name)
            .bind(&payload.last_name)
            .bind(&payload.id_series)
            .bind(&payload.id_number)
            .bind(&payload.phone)
            .fetch_optional(executor)
            .await?;

        Ok(employee)
    }

    pub async fn delete<'e, E>(&self, executor: E, id: Uuid) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM employees WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        pattern: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Employee>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!(
            "SELECT {COLUMNS} FROM employees WHERE {SEARCH} ORDER BY last_name, first_name LIMIT $2 OFFSET $3"
        );

        let employees = sqlx::query_as::<_, Employee>(&sql)
            .bind(pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await?;

        Ok(employees)
    }

    pub async fn count<'e, E>(&self, executor: E, pattern: Option<&str>) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let sql = format!("SELECT COUNT(*) FROM employees WHERE {SEARCH}");

        let total: i64 = sqlx::query_scalar(&sql)
            .bind(pattern)
            .fetch_one(executor)
            .await?;

        Ok(total)
    }
}
